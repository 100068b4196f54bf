use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Capacity exceeded: {0}")]
    Capacity(String),

    #[error("Root directory is full")]
    DirectoryFull,

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
