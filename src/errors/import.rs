//! Activity import error types
//!
//! Structured errors for the validate-then-load pipeline. Validation errors
//! carry the line and column (1-based, counting the skipped first column)
//! where the problem was found, so callers and tests can assert on the exact
//! offending cell.
//!
//! # Examples
//!
//! ```rust
//! use activity_import::errors::ImportError;
//!
//! // Header column 3 repeats an earlier node name
//! let err = ImportError::DuplicateNodeName {
//!     column: 3,
//!     name: "N1".to_string(),
//! };
//!
//! // A value cell that is not a number
//! let err = ImportError::NotNumeric {
//!     line: 2,
//!     column: 2,
//!     value: "abc".to_string(),
//! };
//! ```

use thiserror::Error;

/// Activity import and validation errors
#[derive(Error, Debug)]
pub enum ImportError {
    /// ML model name missing or whitespace-only
    #[error("Input ML model name is blank")]
    BlankModelName,

    /// Header column with a blank node name
    #[error("Input file line #1 column #{column}: blank node name")]
    BlankNodeName { column: usize },

    /// Node name repeated within the header line
    #[error("Input file line #1 column #{column}: {name} is NOT unique")]
    DuplicateNodeName { column: usize, name: String },

    /// Node name already stored for the target model
    #[error("Input file line #1 column #{column}: Node name already exists in Node table: {name}")]
    NodeNameTaken { column: usize, name: String },

    /// Data line whose field count differs from the header's
    #[error("Input file line #{line}: Number of fields is not {expected}")]
    FieldCountMismatch { line: usize, expected: usize },

    /// Data line with a blank data-source key
    #[error("Input file line #{line}: data_source is blank")]
    BlankDataSource { line: usize },

    /// Value cell that does not parse as a floating-point number
    #[error("Input file line #{line} column #{column}: {value} can not be converted into floating type")]
    NotNumeric {
        line: usize,
        column: usize,
        value: String,
    },

    /// Node record disappeared between the validation and load passes
    #[error("Node {name} no longer exists for model {model}")]
    NodeVanished { name: String, model: String },

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImportError {
    /// True for errors found by the validation pass, i.e. everything the
    /// file's author can fix, as opposed to storage or IO failures.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            ImportError::BlankModelName
                | ImportError::BlankNodeName { .. }
                | ImportError::DuplicateNodeName { .. }
                | ImportError::NodeNameTaken { .. }
                | ImportError::FieldCountMismatch { .. }
                | ImportError::BlankDataSource { .. }
                | ImportError::NotNumeric { .. }
        )
    }
}
