use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpkeepError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("project '{0}' is not registered")]
    NotFound(String),

    #[error("registry I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("install command failed: {0}")]
    Install(String),
}

pub type Result<T> = std::result::Result<T, UpkeepError>;
