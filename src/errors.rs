use thiserror::Error;

/// Severity class attached to diagnostics reported through
/// [`config::set_error_handler`](crate::config::set_error_handler).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorClass {
    None,
    Debug,
    Warning,
    Failure,
    Fatal,
}

#[derive(Debug, Error)]
pub enum GeoDataError {
    #[error("Driver '{name}' not found")]
    DriverNotFound { name: String },
    #[error("No driver registered at index {index}")]
    DriverIndexNotFound { index: usize },
    #[error("{what} not found")]
    NotFound { what: String },
    #[error("'{name}' not recognized as a supported file format")]
    UnsupportedFormat { name: String },
    #[error("Driver '{driver}' does not support {operation}")]
    UnsupportedOperation { driver: String, operation: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("'{name}' is corrupt: {msg}")]
    Corrupt { name: String, msg: String },
    #[error("Raster shapes differ: source {src:?}, destination {dst:?}")]
    ShapeMismatch {
        src: (usize, usize, usize),
        dst: (usize, usize, usize),
    },
    #[error("{what} index {index} out of range (count: {count})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        count: usize,
    },
    #[error("Dataset has been closed")]
    ClosedDataset,
    #[error("Bad argument: {0}")]
    BadArgument(String),
    #[error("Strict copy failed: {0}")]
    StrictCopy(String),
    #[error("Operation cancelled by progress callback")]
    Cancelled,
}

impl GeoDataError {
    /// `true` for lookup misses, as opposed to I/O or format faults.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GeoDataError::DriverNotFound { .. }
                | GeoDataError::DriverIndexNotFound { .. }
                | GeoDataError::NotFound { .. }
        )
    }

    pub(crate) fn unsupported(driver: &str, operation: &str) -> Self {
        GeoDataError::UnsupportedOperation {
            driver: driver.to_string(),
            operation: operation.to_string(),
        }
    }

    pub(crate) fn corrupt(name: &str, msg: impl Into<String>) -> Self {
        GeoDataError::Corrupt {
            name: name.to_string(),
            msg: msg.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeoDataError>;
