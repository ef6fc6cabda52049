//! Persistence-layer errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("board not found: {0}")]
    BoardNotFound(String),

    #[error("board {board_id} is not owned by {requestor}")]
    NotOwner { board_id: String, requestor: String },

    #[error("timelapse job not found: {0}")]
    JobNotFound(String),

    #[error("username already registered: {0}")]
    UsernameTaken(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("rejected filename: {0}")]
    UnsafeFilename(String),

    #[error("could not decode image bytes")]
    ImageDecode,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed board data: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("credential store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("password hashing error: {0}")]
    Hash(String),
}
