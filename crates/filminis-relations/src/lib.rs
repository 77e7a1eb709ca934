//! Filminis Relations: many-to-many synchronization for the movie catalog API
//!
//! A movie is linked to six kinds of reference entities (genres, directors,
//! dubbers, studios, languages, countries). The backend stores each link as a
//! row in its own join table and offers only single-row insert and delete, with
//! no transaction spanning several rows or tables. This crate converges those
//! rows to a desired state with as few writes as possible.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                      RELATION SYNC PIPELINE                          │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                                                                      │
//! │  ┌────────────┐   create/update   ┌──────────────────┐               │
//! │  │  Mutation  │──────────────────►│   Entity write   │               │
//! │  │  Helpers   │                   └──────────────────┘               │
//! │  └─────┬──────┘                                                      │
//! │        │ desired                                                     │
//! │  ┌─────▼──────┐   current   ┌──────────┐   GET /filme_genero/{id}    │
//! │  │ Reconciler │◄────────────│  Reader  │◄──────────────┐             │
//! │  └─────┬──────┘             └──────────┘               │             │
//! │        │ diff per type                          ┌──────┴──────┐      │
//! │  ┌─────▼──────┐   POST / DELETE one row         │  Transport  │      │
//! │  │   Writer   │────────────────────────────────►│   (HTTP)    │      │
//! │  └────────────┘                                 └─────────────┘      │
//! │                                                                      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//! - Minimal writes: an association present on both sides is never touched
//! - Per relation type, every removal is issued before any addition
//! - Writes are sequential; a failed write never stops the others
//! - Partial failure is reported per id in a [`SyncReport`], never rolled back
//!
//! ## Example
//!
//! ```no_run
//! use filminis_relations::{Catalog, CatalogConfig, RelationType, RelationsSnapshot};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = Catalog::from_config(&CatalogConfig::from_env()?)?;
//! let desired = RelationsSnapshot::empty()
//!     .with(RelationType::Genre, [2, 3])
//!     .with(RelationType::Director, [7]);
//!
//! let report = catalog.sync_relations(1, &desired).await;
//! if !report.is_fully_synced() {
//!     let retried = catalog.retry_failed(&report).await;
//!     println!("still failing: {:?}", retried.failed_types());
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod entities;
pub mod error;
pub mod mutation;
pub mod reader;
pub mod reconciliation;
pub mod relation_type;
pub mod snapshot;
pub mod transport;
pub mod writer;

// ============================================================================
// Re-exports
// ============================================================================

pub use catalog::Catalog;
pub use config::{CatalogConfig, ConfigError};
pub use entities::{EntityKind, EntityStore};
pub use error::{CatalogError, CatalogResult};
pub use mutation::{CreatedWithRelations, MutationHelpers};
pub use reader::RelationReader;
pub use reconciliation::{FailedOperation, RelationOutcome, RelationReconciler, SyncReport};
pub use relation_type::{
    DeleteStyle, EntityId, JoinTable, ParseRelationTypeError, RelationSchema, RelationType,
};
pub use snapshot::{AssociationSet, Diff, RelationsSnapshot};
pub use transport::{HttpTransport, Method, Transport, TransportError};
pub use writer::RelationWriter;
