//! Domain-specific error types for activity-import
//!
//! The import pipeline reports validation problems with structured context
//! (line and column) instead of logging and returning a bare boolean, which
//! keeps the core free of global logger state and lets tests assert on the
//! exact failure.

pub mod import;

// Re-export the error type
pub use import::ImportError;

/// Result type alias for import operations
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_result_alias() {
        let result: ImportResult<()> = Err(ImportError::BlankModelName);
        assert!(result.is_err());
    }
}
