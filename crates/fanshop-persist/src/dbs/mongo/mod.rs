pub mod client;
pub mod models;
pub mod repositories;

pub use client::MongoPersistence;
pub use repositories::{MongoConversationRepository, MongoMessageRepository, MongoRepository};

use mongodb::error::{Error, ErrorKind, WriteFailure};

const DUPLICATE_KEY: i32 = 11000;

/// True when a write collided with a unique index
pub(crate) fn is_duplicate_key(err: &Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}
