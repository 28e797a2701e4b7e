use thiserror::Error;

#[derive(Error, Debug)]
pub enum StagingError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[cfg(feature = "mysql")]
    #[error("Source database error: {0}")]
    SourceError(#[from] sqlx::Error),
    #[cfg(feature = "mongo")]
    #[error("Staging store error: {0}")]
    StoreError(#[from] mongodb::error::Error),
}

pub type Result<T> = std::result::Result<T, StagingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_and_validation_errors_display() {
        let io: StagingError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(io, StagingError::IoError(_)));
        assert_eq!(io.to_string(), "IO error: gone");

        let invalid = StagingError::ValidationError("unknown film rating: X".to_string());
        assert_eq!(invalid.to_string(), "Validation error: unknown film rating: X");
    }
}
