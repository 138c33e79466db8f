use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Failed to open process: {0}")]
    ProcessOpenFailed(String),

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Null pointer dereferenced at address {address:#x}")]
    NullPointer { address: u64 },

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Class not found: {0}")]
    ClassNotFound(String),

    #[error("Field not found: {class}.{field}")]
    FieldNotFound { class: String, field: String },

    #[error("Invalid length {length} at address {address:#x}")]
    InvalidLength { address: u64, length: i64 },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    /// Check if this error means the metadata the resolver needs is not there yet.
    ///
    /// The game registers its classes lazily, so these usually go away on a later attach.
    pub fn is_metadata_missing(&self) -> bool {
        matches!(
            self,
            Error::ClassNotFound(_) | Error::FieldNotFound { .. } | Error::NullPointer { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.is_not_found());

        let other_io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err2 = Error::Io(other_io_err);
        assert!(!err2.is_not_found());
    }

    #[test]
    fn test_error_is_metadata_missing() {
        assert!(Error::ClassNotFound("PlayerData".to_string()).is_metadata_missing());
        assert!(
            Error::FieldNotFound {
                class: "PlayerData".to_string(),
                field: "MasterInventory".to_string(),
            }
            .is_metadata_missing()
        );
        assert!(Error::NullPointer { address: 0x10 }.is_metadata_missing());
        assert!(!Error::ProcessNotFound("game".to_string()).is_metadata_missing());
    }

    #[test]
    fn test_memory_read_failed_message() {
        let err = Error::MemoryReadFailed {
            address: 0x1000,
            message: "partial copy".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to read process memory at address 0x1000: partial copy"
        );
    }
}
