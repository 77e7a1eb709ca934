use crate::config::ConfigError;
use crate::transport::TransportError;

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Invalid entity data: {0}")]
    InvalidEntity(String),
    #[error("Unknown entity kind `{0}`")]
    UnknownEntityKind(String),
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error("Created {resource} but could not determine its id")]
    MissingCreatedId { resource: String },
}
