//! Catalog: the session-wide entry point owning the transport and schema.

use crate::config::{CatalogConfig, ConfigError};
use crate::entities::EntityStore;
use crate::error::CatalogResult;
use crate::mutation::{CreatedWithRelations, MutationHelpers};
use crate::reader::RelationReader;
use crate::reconciliation::{RelationReconciler, SyncReport};
use crate::relation_type::{EntityId, RelationSchema, RelationType};
use crate::snapshot::{AssociationSet, Diff, RelationsSnapshot};
use crate::transport::{HttpTransport, Transport, TransportError};
use crate::writer::RelationWriter;
use serde_json::Value;
use std::sync::Arc;

/// One transport plus one relation schema, constructed once per session and
/// passed to whoever needs catalog access.
#[derive(Clone)]
pub struct Catalog {
    transport: Arc<dyn Transport>,
    schema: Arc<RelationSchema>,
}

impl Catalog {
    pub fn new(transport: Arc<dyn Transport>, schema: RelationSchema) -> Self {
        Self {
            transport,
            schema: Arc::new(schema),
        }
    }

    /// Catalog over HTTP, as described by `config`.
    pub fn from_config(config: &CatalogConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), config.schema.clone()))
    }

    pub fn schema(&self) -> &RelationSchema {
        &self.schema
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn reader(&self) -> RelationReader<'_> {
        RelationReader::new(self.transport.as_ref(), &self.schema)
    }

    pub fn writer(&self) -> RelationWriter<'_> {
        RelationWriter::new(self.transport.as_ref(), &self.schema)
    }

    pub fn reconciler(&self) -> RelationReconciler<'_> {
        RelationReconciler::new(self.reader(), self.writer())
    }

    pub fn entities(&self) -> EntityStore<'_> {
        EntityStore::new(self.transport.as_ref(), &self.schema)
    }

    pub fn mutations(&self) -> MutationHelpers<'_> {
        MutationHelpers::new(self.entities(), &self.schema, self.reconciler())
    }

    // ========================================================================
    // Shortcuts
    // ========================================================================

    pub async fn get_relations(&self, central_id: EntityId) -> RelationsSnapshot {
        self.reader().get_relations(central_id).await
    }

    pub async fn read_relation(
        &self,
        central_id: EntityId,
        relation: RelationType,
    ) -> Result<AssociationSet, TransportError> {
        self.reader().read_relation(central_id, relation).await
    }

    pub async fn add_relation(
        &self,
        central_id: EntityId,
        relation: RelationType,
        entity_id: EntityId,
    ) -> Result<(), TransportError> {
        self.writer().add_relation(central_id, relation, entity_id).await
    }

    pub async fn remove_relation(
        &self,
        central_id: EntityId,
        relation: RelationType,
        entity_id: EntityId,
    ) -> Result<(), TransportError> {
        self.writer()
            .remove_relation(central_id, relation, entity_id)
            .await
    }

    pub async fn plan(&self, central_id: EntityId, desired: &RelationsSnapshot) -> Vec<Diff> {
        self.reconciler().plan(central_id, desired).await
    }

    pub async fn sync_relations(
        &self,
        central_id: EntityId,
        desired: &RelationsSnapshot,
    ) -> SyncReport {
        self.reconciler().sync_relations(central_id, desired).await
    }

    pub async fn retry_failed(&self, previous: &SyncReport) -> SyncReport {
        self.reconciler().retry_failed(previous).await
    }

    pub async fn create_with_relations(
        &self,
        entity_data: &Value,
        desired: &RelationsSnapshot,
    ) -> CatalogResult<CreatedWithRelations> {
        self.mutations()
            .create_with_relations(entity_data, desired)
            .await
    }

    pub async fn update_with_relations(
        &self,
        central_id: EntityId,
        entity_data: &Value,
        desired: &RelationsSnapshot,
    ) -> CatalogResult<SyncReport> {
        self.mutations()
            .update_with_relations(central_id, entity_data, desired)
            .await
    }
}
