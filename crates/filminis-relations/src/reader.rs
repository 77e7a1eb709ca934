//! Relation Reader: fetches the current associations of a central entity.

use crate::relation_type::{EntityId, RelationSchema, RelationType};
use crate::snapshot::{AssociationSet, RelationsSnapshot};
use crate::transport::{Method, Transport, TransportError};
use serde_json::Value;

pub struct RelationReader<'a> {
    transport: &'a dyn Transport,
    schema: &'a RelationSchema,
}

impl<'a> RelationReader<'a> {
    pub fn new(transport: &'a dyn Transport, schema: &'a RelationSchema) -> Self {
        Self { transport, schema }
    }

    /// Reads every relation type of `central_id`.
    ///
    /// Never fails: a type whose read fails is reported as empty (and logged),
    /// so a transient error is indistinguishable from "no associations".
    pub async fn get_relations(&self, central_id: EntityId) -> RelationsSnapshot {
        let mut snapshot = RelationsSnapshot::empty();

        for relation in RelationType::ALL {
            match self.read_relation(central_id, relation).await {
                Ok(ids) => snapshot.set(relation, ids),
                Err(e) => {
                    tracing::warn!(
                        central_id,
                        %relation,
                        error = %e,
                        "relation read failed, treating as empty"
                    );
                }
            }
        }

        snapshot
    }

    /// Reads one relation type, propagating transport and decoding errors.
    pub async fn read_relation(
        &self,
        central_id: EntityId,
        relation: RelationType,
    ) -> Result<AssociationSet, TransportError> {
        let path = self.schema.read_path(relation, central_id);
        let body = self.transport.request(Method::Get, &path, None).await?;
        let field = &self.schema.table(relation).related_id_field;
        decode_rows(&body, field)
    }
}

/// Extracts the related ids from a join-table listing.
///
/// `null` is an empty listing; rows without a usable `field` are skipped.
pub fn decode_rows(body: &Value, field: &str) -> Result<AssociationSet, TransportError> {
    let rows = match body {
        Value::Null => return Ok(AssociationSet::new()),
        Value::Array(rows) => rows,
        other => {
            return Err(TransportError::InvalidResponse(format!(
                "expected an array of join rows, got {other}"
            )))
        }
    };

    let mut ids = AssociationSet::new();
    for row in rows {
        match row.get(field).and_then(id_value) {
            Some(id) => {
                ids.insert(id);
            }
            None => tracing::warn!(field, %row, "skipping join row without related id"),
        }
    }
    Ok(ids)
}

/// Accepts ids encoded as JSON numbers or numeric strings.
pub(crate) fn id_value(value: &Value) -> Option<EntityId> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_rows_extracts_related_field() {
        let body = json!([
            {"id_filme": 1, "id_genero": 3},
            {"id_filme": 1, "id_genero": 1},
            {"id_filme": 1, "id_genero": 3}
        ]);
        let ids = decode_rows(&body, "id_genero").unwrap();
        assert_eq!(ids.to_vec(), vec![1, 3]);
    }

    #[test]
    fn test_decode_rows_null_is_empty() {
        assert!(decode_rows(&Value::Null, "id_pais").unwrap().is_empty());
    }

    #[test]
    fn test_decode_rows_skips_incomplete_rows() {
        let body = json!([{"id_filme": 1}, {"id_pais": "9"}, {"id_pais": -2}]);
        assert_eq!(decode_rows(&body, "id_pais").unwrap().to_vec(), vec![9]);
    }

    #[test]
    fn test_decode_rows_rejects_objects() {
        let err = decode_rows(&json!({"error": "x"}), "id_pais").unwrap_err();
        assert!(matches!(err, TransportError::InvalidResponse(_)));
    }
}
