use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[cfg(feature = "mongodb")]
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[cfg(feature = "mongodb")]
    #[error("BSON serialization error: {0}")]
    BsonSerialization(#[from] bson::ser::Error),

    #[cfg(feature = "mongodb")]
    #[error("BSON deserialization error: {0}")]
    BsonDeserialization(#[from] bson::de::Error),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Duplicate {kind}: {id}")]
    Duplicate { kind: &'static str, id: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration {version} failed: {message}")]
    Migration { version: u32, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PersistError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        PersistError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PersistError>;
