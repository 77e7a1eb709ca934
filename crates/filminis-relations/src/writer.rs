//! Relation Writer: inserts or deletes a single association row.
//!
//! No idempotence checks and no retries. Callers must not add a pair that
//! already exists or remove one that does not; the reconciler guarantees this.

use crate::relation_type::{EntityId, RelationSchema, RelationType};
use crate::transport::{Method, Transport, TransportError};

pub struct RelationWriter<'a> {
    transport: &'a dyn Transport,
    schema: &'a RelationSchema,
}

impl<'a> RelationWriter<'a> {
    pub fn new(transport: &'a dyn Transport, schema: &'a RelationSchema) -> Self {
        Self { transport, schema }
    }

    pub async fn add_relation(
        &self,
        central_id: EntityId,
        relation: RelationType,
        entity_id: EntityId,
    ) -> Result<(), TransportError> {
        let path = self.schema.insert_path(relation);
        let body = self.schema.insert_body(relation, central_id, entity_id);
        tracing::debug!(central_id, %relation, entity_id, "adding relation");
        self.transport
            .request(Method::Post, &path, Some(&body))
            .await
            .map(drop)
    }

    pub async fn remove_relation(
        &self,
        central_id: EntityId,
        relation: RelationType,
        entity_id: EntityId,
    ) -> Result<(), TransportError> {
        let path = self.schema.delete_path(relation, central_id, entity_id);
        tracing::debug!(central_id, %relation, entity_id, "removing relation");
        self.transport
            .request(Method::Delete, &path, None)
            .await
            .map(drop)
    }
}
