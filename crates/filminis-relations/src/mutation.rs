//! Composite mutations: write the central entity, then reconcile its relations.
//!
//! The entity write and the relation writes are separate requests with no
//! transaction between them. If reconciliation partially fails the entity
//! stays as written and the failures are returned in the report.

use crate::entities::{EntityKind, EntityStore};
use crate::error::{CatalogError, CatalogResult};
use crate::reader::id_value;
use crate::reconciliation::{RelationReconciler, SyncReport};
use crate::relation_type::{EntityId, RelationSchema};
use crate::snapshot::RelationsSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedWithRelations {
    pub central_id: EntityId,
    pub sync: SyncReport,
}

pub struct MutationHelpers<'a> {
    store: EntityStore<'a>,
    schema: &'a RelationSchema,
    reconciler: RelationReconciler<'a>,
}

impl<'a> MutationHelpers<'a> {
    pub fn new(
        store: EntityStore<'a>,
        schema: &'a RelationSchema,
        reconciler: RelationReconciler<'a>,
    ) -> Self {
        Self {
            store,
            schema,
            reconciler,
        }
    }

    /// Creates the central entity, then converges its relations to `desired`.
    ///
    /// Fails only if the entity itself cannot be created (or its id cannot be
    /// determined); relation failures are reported in the returned sync report.
    pub async fn create_with_relations(
        &self,
        entity_data: &Value,
        desired: &RelationsSnapshot,
    ) -> CatalogResult<CreatedWithRelations> {
        let response = self.store.create(EntityKind::Movie, entity_data).await?;
        let central_id = self.resolve_created_id(&response).await?;
        tracing::info!(central_id, entity = %self.schema.central_entity, "created entity");

        let sync = self.reconciler.sync_relations(central_id, desired).await;
        Ok(CreatedWithRelations { central_id, sync })
    }

    /// Updates the central entity's plain fields, then converges its relations.
    pub async fn update_with_relations(
        &self,
        central_id: EntityId,
        entity_data: &Value,
        desired: &RelationsSnapshot,
    ) -> CatalogResult<SyncReport> {
        self.store
            .update(EntityKind::Movie, central_id, entity_data)
            .await?;
        tracing::info!(central_id, entity = %self.schema.central_entity, "updated entity");

        Ok(self.reconciler.sync_relations(central_id, desired).await)
    }

    /// Id of a freshly created entity: taken from the create response when the
    /// backend echoes it, otherwise the highest id in the collection.
    ///
    /// The fallback can pick up a concurrent creation by another client.
    async fn resolve_created_id(&self, response: &Value) -> CatalogResult<EntityId> {
        let echoed = response
            .get(&self.schema.central_id_field)
            .or_else(|| response.get("id"))
            .and_then(id_value);
        if let Some(id) = echoed {
            return Ok(id);
        }

        tracing::debug!(
            entity = %self.schema.central_entity,
            "create response carries no id, listing collection"
        );
        self.store
            .max_id(EntityKind::Movie)
            .await?
            .ok_or_else(|| CatalogError::MissingCreatedId {
                resource: self.schema.central_entity.clone(),
            })
    }
}
