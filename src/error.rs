use thiserror::Error;

#[derive(Error, Debug)]
pub enum GhStatusError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No GitHub users given")]
    NoUsers,

    #[error("No repos found for specified users")]
    NoRepositories,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GhStatusError>;
