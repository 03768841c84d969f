use thiserror::Error;

#[derive(Error, Debug)]
#[error("unknown mutation kind: {0:?}")]
pub struct ParseMutationKindError(pub String);

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("oracle transport failed: {0}")]
    Transport(String),

    #[error("oracle answered with HTTP {0}")]
    Status(u16),

    #[error("oracle payload could not be parsed: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("oracle returned an empty sentence")]
    EmptySentence,

    #[error("network support is not compiled in")]
    Disabled,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
