//! Generic CRUD over the catalog's entity resources.
//!
//! Entity fields are opaque JSON objects; only ids are interpreted here.

use crate::error::CatalogError;
use crate::reader::id_value;
use crate::relation_type::{EntityId, RelationSchema, RelationType};
use crate::transport::{Method, Transport};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Movie,
    Genre,
    Director,
    Dubber,
    Studio,
    Language,
    Country,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Movie,
        EntityKind::Genre,
        EntityKind::Director,
        EntityKind::Dubber,
        EntityKind::Studio,
        EntityKind::Language,
        EntityKind::Country,
    ];

    /// The relation type linking movies to this kind; `None` for movies.
    pub fn relation(self) -> Option<RelationType> {
        match self {
            EntityKind::Movie => None,
            EntityKind::Genre => Some(RelationType::Genre),
            EntityKind::Director => Some(RelationType::Director),
            EntityKind::Dubber => Some(RelationType::Dubber),
            EntityKind::Studio => Some(RelationType::Studio),
            EntityKind::Language => Some(RelationType::Language),
            EntityKind::Country => Some(RelationType::Country),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Movie => "movie",
            EntityKind::Genre => "genre",
            EntityKind::Director => "director",
            EntityKind::Dubber => "dubber",
            EntityKind::Studio => "studio",
            EntityKind::Language => "language",
            EntityKind::Country => "country",
        }
    }
}

impl From<RelationType> for EntityKind {
    fn from(relation: RelationType) -> Self {
        match relation {
            RelationType::Genre => EntityKind::Genre,
            RelationType::Director => EntityKind::Director,
            RelationType::Dubber => EntityKind::Dubber,
            RelationType::Studio => EntityKind::Studio,
            RelationType::Language => EntityKind::Language,
            RelationType::Country => EntityKind::Country,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        if normalized == "movie" || normalized == "filme" {
            return Ok(EntityKind::Movie);
        }
        normalized
            .parse::<RelationType>()
            .map(EntityKind::from)
            .map_err(|_| CatalogError::UnknownEntityKind(s.to_string()))
    }
}

/// CRUD over entity resources. Movies live under the schema's central
/// entity; the related kinds use the backend's resource names.
pub struct EntityStore<'a> {
    transport: &'a dyn Transport,
    schema: &'a RelationSchema,
}

impl<'a> EntityStore<'a> {
    pub fn new(transport: &'a dyn Transport, schema: &'a RelationSchema) -> Self {
        Self { transport, schema }
    }

    /// Resource name of `kind` (`filme`, `genero`, ...).
    pub fn resource(&self, kind: EntityKind) -> &str {
        match kind.relation() {
            None => &self.schema.central_entity,
            Some(relation) => relation.backend_name(),
        }
    }

    /// Primary-key field of a row of `kind` (`id_filme`, `id_genero`, ...).
    pub fn id_field(&self, kind: EntityKind) -> String {
        match kind.relation() {
            None => self.schema.central_id_field.clone(),
            Some(relation) => format!("id_{}", relation.backend_name()),
        }
    }

    /// Reads the primary key of `kind` from a row, if present.
    pub fn id_of(&self, kind: EntityKind, row: &Value) -> Option<EntityId> {
        row.get(self.id_field(kind)).and_then(id_value)
    }

    pub async fn list(&self, kind: EntityKind) -> Result<Vec<Value>, CatalogError> {
        let body = self
            .transport
            .request(Method::Get, &format!("/{}", self.resource(kind)), None)
            .await?;
        match body {
            Value::Null => Ok(Vec::new()),
            Value::Array(rows) => Ok(rows),
            other => Err(CatalogError::UnexpectedResponse(format!(
                "listing {kind}: expected an array, got {other}"
            ))),
        }
    }

    /// Fetches one row. The backend answers `{}` for unknown ids, which maps
    /// to `None`.
    pub async fn get(&self, kind: EntityKind, id: EntityId) -> Result<Option<Value>, CatalogError> {
        let path = format!("/{}/{}", self.resource(kind), id);
        let body = self.transport.request(Method::Get, &path, None).await?;
        Ok(match body {
            Value::Null => None,
            Value::Object(ref map) if map.is_empty() => None,
            row => Some(row),
        })
    }

    pub async fn create(&self, kind: EntityKind, data: &Value) -> Result<Value, CatalogError> {
        ensure_object(self.resource(kind), data)?;
        tracing::debug!(%kind, "creating entity");
        let path = format!("/{}", self.resource(kind));
        Ok(self
            .transport
            .request(Method::Post, &path, Some(data))
            .await?)
    }

    pub async fn update(
        &self,
        kind: EntityKind,
        id: EntityId,
        data: &Value,
    ) -> Result<Value, CatalogError> {
        ensure_object(self.resource(kind), data)?;
        tracing::debug!(%kind, id, "updating entity");
        let path = format!("/{}/{}", self.resource(kind), id);
        Ok(self
            .transport
            .request(Method::Put, &path, Some(data))
            .await?)
    }

    pub async fn delete(&self, kind: EntityKind, id: EntityId) -> Result<(), CatalogError> {
        tracing::debug!(%kind, id, "deleting entity");
        let path = format!("/{}/{}", self.resource(kind), id);
        self.transport.request(Method::Delete, &path, None).await?;
        Ok(())
    }

    /// Highest primary key among the rows of `kind`.
    pub async fn max_id(&self, kind: EntityKind) -> Result<Option<EntityId>, CatalogError> {
        let rows = self.list(kind).await?;
        Ok(rows.iter().filter_map(|row| self.id_of(kind, row)).max())
    }
}

pub(crate) fn ensure_object(what: &str, data: &Value) -> Result<(), CatalogError> {
    if data.is_object() {
        Ok(())
    } else {
        Err(CatalogError::InvalidEntity(format!(
            "{what} data must be a JSON object"
        )))
    }
}
