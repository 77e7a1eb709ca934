//! Relation types and the join-table schema.
//!
//! Every many-to-many association of a movie lives in its own join table. The
//! table name and the two foreign-key field names are configuration: the
//! reconciliation algorithm only ever asks the [`RelationSchema`] for them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a catalog entity (movie, genre, director, ...).
pub type EntityId = u64;

// ============================================================================
// Relation Types
// ============================================================================

/// The closed set of reference categories a movie can be linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Genre,
    Director,
    Dubber,
    Studio,
    Language,
    Country,
}

impl RelationType {
    /// All relation types, in the order reads and writes are issued.
    pub const ALL: [RelationType; 6] = [
        RelationType::Genre,
        RelationType::Director,
        RelationType::Dubber,
        RelationType::Studio,
        RelationType::Language,
        RelationType::Country,
    ];

    /// Position of this type inside [`RelationType::ALL`].
    pub fn index(self) -> usize {
        match self {
            RelationType::Genre => 0,
            RelationType::Director => 1,
            RelationType::Dubber => 2,
            RelationType::Studio => 3,
            RelationType::Language => 4,
            RelationType::Country => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RelationType::Genre => "genre",
            RelationType::Director => "director",
            RelationType::Dubber => "dubber",
            RelationType::Studio => "studio",
            RelationType::Language => "language",
            RelationType::Country => "country",
        }
    }

    /// Name of the related entity's resource on the filminis backend.
    pub fn backend_name(self) -> &'static str {
        match self {
            RelationType::Genre => "genero",
            RelationType::Director => "diretor",
            RelationType::Dubber => "dublador",
            RelationType::Studio => "produtora",
            RelationType::Language => "linguagem",
            RelationType::Country => "pais",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown relation type `{0}` (expected one of genre, director, dubber, studio, language, country)")]
pub struct ParseRelationTypeError(pub String);

impl FromStr for RelationType {
    type Err = ParseRelationTypeError;

    /// Accepts the English names as well as the backend resource names
    /// (`genero`, `pais`, ...). "actor" is an alias of dubber.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        RelationType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized || t.backend_name() == normalized)
            .or_else(|| (normalized == "actor").then_some(RelationType::Dubber))
            .ok_or_else(|| ParseRelationTypeError(s.to_string()))
    }
}

// ============================================================================
// Join-Table Schema
// ============================================================================

/// How a single association row is addressed for deletion.
///
/// Both styles name one (central, entity) pair. The deployed server must
/// route every part of that address: a server that keys the delete on the
/// central id alone drops all of the movie's rows for the type. Pick the
/// style the server actually parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteStyle {
    /// `DELETE /{join}/{central_id}/{entity_id}`
    #[default]
    PathSegments,
    /// `DELETE /{join}?{central_field}={central_id}&{related_field}={entity_id}`
    Query,
}

/// Endpoint and field names of one join table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinTable {
    pub join_name: String,
    pub central_id_field: String,
    pub related_id_field: String,
}

impl JoinTable {
    pub fn new(join_name: &str, central_id_field: &str, related_id_field: &str) -> Self {
        Self {
            join_name: join_name.to_string(),
            central_id_field: central_id_field.to_string(),
            related_id_field: related_id_field.to_string(),
        }
    }
}

/// Static configuration: central entity resource plus one [`JoinTable`] per
/// [`RelationType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSchema {
    /// Resource name of the central entity (`filme`).
    pub central_entity: String,
    /// Id field of the central entity (`id_filme`).
    pub central_id_field: String,
    #[serde(default)]
    pub delete_style: DeleteStyle,
    /// Indexed by [`RelationType::index`].
    tables: [JoinTable; 6],
}

impl RelationSchema {
    /// Builds a schema following the `{central}_{related}` naming convention,
    /// with `id_{name}` id fields on both sides.
    pub fn conventional(central_entity: &str) -> Self {
        let central_id_field = format!("id_{central_entity}");
        let tables = RelationType::ALL.map(|t| {
            JoinTable::new(
                &format!("{central_entity}_{}", t.backend_name()),
                &central_id_field,
                &format!("id_{}", t.backend_name()),
            )
        });
        Self {
            central_entity: central_entity.to_string(),
            central_id_field,
            delete_style: DeleteStyle::PathSegments,
            tables,
        }
    }

    /// The filminis backend: `filme_genero(id_filme, id_genero)` and siblings.
    pub fn filminis() -> Self {
        Self::conventional("filme")
    }

    pub fn with_delete_style(mut self, style: DeleteStyle) -> Self {
        self.delete_style = style;
        self
    }

    /// Replaces the join table of one relation type.
    pub fn with_table(mut self, relation: RelationType, table: JoinTable) -> Self {
        self.tables[relation.index()] = table;
        self
    }

    pub fn table(&self, relation: RelationType) -> &JoinTable {
        &self.tables[relation.index()]
    }

    /// `GET` path listing the association rows of one central entity.
    pub fn read_path(&self, relation: RelationType, central_id: EntityId) -> String {
        format!("/{}/{}", self.table(relation).join_name, central_id)
    }

    /// `POST` path inserting one association row.
    pub fn insert_path(&self, relation: RelationType) -> String {
        format!("/{}", self.table(relation).join_name)
    }

    /// `POST` body inserting one association row.
    pub fn insert_body(
        &self,
        relation: RelationType,
        central_id: EntityId,
        entity_id: EntityId,
    ) -> serde_json::Value {
        let table = self.table(relation);
        let mut body = serde_json::Map::new();
        body.insert(table.central_id_field.clone(), central_id.into());
        body.insert(table.related_id_field.clone(), entity_id.into());
        serde_json::Value::Object(body)
    }

    /// `DELETE` path removing one association row.
    pub fn delete_path(
        &self,
        relation: RelationType,
        central_id: EntityId,
        entity_id: EntityId,
    ) -> String {
        let table = self.table(relation);
        match self.delete_style {
            DeleteStyle::PathSegments => {
                format!("/{}/{}/{}", table.join_name, central_id, entity_id)
            }
            DeleteStyle::Query => {
                let query = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair(&table.central_id_field, &central_id.to_string())
                    .append_pair(&table.related_id_field, &entity_id.to_string())
                    .finish();
                format!("/{}?{}", table.join_name, query)
            }
        }
    }
}

impl Default for RelationSchema {
    fn default() -> Self {
        Self::filminis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_english_and_backend_names() {
        assert_eq!("genre".parse::<RelationType>(), Ok(RelationType::Genre));
        assert_eq!("Genero".parse::<RelationType>(), Ok(RelationType::Genre));
        assert_eq!("pais".parse::<RelationType>(), Ok(RelationType::Country));
        assert_eq!("actor".parse::<RelationType>(), Ok(RelationType::Dubber));
        assert!("budget".parse::<RelationType>().is_err());
    }

    #[test]
    fn test_index_matches_all_order() {
        for (i, t) in RelationType::ALL.iter().enumerate() {
            assert_eq!(t.index(), i);
        }
    }

    #[test]
    fn test_filminis_schema_tables() {
        let schema = RelationSchema::filminis();
        let studio = schema.table(RelationType::Studio);
        assert_eq!(studio.join_name, "filme_produtora");
        assert_eq!(studio.central_id_field, "id_filme");
        assert_eq!(studio.related_id_field, "id_produtora");
        assert_eq!(schema.read_path(RelationType::Country, 4), "/filme_pais/4");
    }

    #[test]
    fn test_insert_body_uses_table_fields() {
        let schema = RelationSchema::filminis();
        let body = schema.insert_body(RelationType::Language, 3, 8);
        assert_eq!(body, serde_json::json!({"id_filme": 3, "id_linguagem": 8}));
    }

    #[test]
    fn test_delete_path_styles() {
        let schema = RelationSchema::filminis();
        assert_eq!(
            schema.delete_path(RelationType::Genre, 1, 2),
            "/filme_genero/1/2"
        );

        let schema = schema.with_delete_style(DeleteStyle::Query);
        assert_eq!(
            schema.delete_path(RelationType::Genre, 1, 2),
            "/filme_genero?id_filme=1&id_genero=2"
        );
    }

    #[test]
    fn test_with_table_overrides_single_type() {
        let schema = RelationSchema::filminis().with_table(
            RelationType::Dubber,
            JoinTable::new("movie_cast", "movie_id", "actor_id"),
        );
        assert_eq!(schema.read_path(RelationType::Dubber, 7), "/movie_cast/7");
        assert_eq!(schema.read_path(RelationType::Genre, 7), "/filme_genero/7");
    }
}
