use thiserror::Error;

/// Rejections raised while describing a collection schema.
///
/// All of them are fatal: the collection cannot be used until the field
/// declarations are fixed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("field '{field}' has the same name as the document key; change `doc_key_name` in the engine config")]
    ReservedName { field: String },

    #[error("field '{field}' must not be of type 'id'; the document key is always the id field, use 'numeric' or 'string' instead")]
    IdentifierKind { field: String },

    #[error("'title' can only be set once (field '{field}')")]
    DuplicateTitle { field: String },

    #[error("'body' can only be set once (field '{field}')")]
    DuplicateBody { field: String },

    #[error("field '{field}' has wrong tokenizer")]
    InvalidTokenizer { field: String },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Client(#[from] anyhow::Error),

    #[error("Failed to resolve entities: {0}")]
    Resolve(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
