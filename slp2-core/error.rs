/// Broad classes of failure reported by every public SLP2 operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidConfiguration,
    InvalidParameter,
    DimensionError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Slp2Error {
    /// A named setting (sampling config, adapter orientation count, ...) is not recognized
    InvalidConfiguration { setting: &'static str, value: String },
    /// A numeric or structural parameter is out of range
    InvalidParameter { name: &'static str, reason: String },
    ImageTooSmall { width: usize, height: usize, levels: usize, min_size: usize },
    InvalidImageData { expected_len: usize, actual_len: usize },
    /// Sample grid was generated for a different level layout than requested
    GridMismatch { expected: String, found: String },
}

impl Slp2Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Slp2Error::InvalidConfiguration { .. } => ErrorKind::InvalidConfiguration,
            Slp2Error::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            Slp2Error::ImageTooSmall { .. }
            | Slp2Error::InvalidImageData { .. }
            | Slp2Error::GridMismatch { .. } => ErrorKind::DimensionError,
        }
    }

    pub fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Slp2Error::InvalidParameter { name, reason: reason.into() }
    }
}

impl std::fmt::Display for Slp2Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slp2Error::InvalidConfiguration { setting, value } => {
                write!(f, "Invalid configuration: unrecognized {} '{}'", setting, value)
            }
            Slp2Error::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{}': {}", name, reason)
            }
            Slp2Error::ImageTooSmall { width, height, levels, min_size } => {
                write!(
                    f,
                    "Image {}x{} too small for {} levels (minimum {}x{})",
                    width, height, levels, min_size, min_size
                )
            }
            Slp2Error::InvalidImageData { expected_len, actual_len } => {
                write!(f, "Image data length mismatch: expected {}, got {}", expected_len, actual_len)
            }
            Slp2Error::GridMismatch { expected, found } => {
                write!(f, "Sample grid mismatch: expected {}, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for Slp2Error {}

pub type Slp2Result<T> = Result<T, Slp2Error>;
