use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage error: page {page_id} not found")]
    PageNotFound { page_id: u64 },

    #[error("storage IO error: {message}")]
    Io { message: String },
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io {
            message: e.to_string(),
        }
    }
}
