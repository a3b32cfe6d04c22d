use std::fmt;

/// Failures reported by a device backend while creating resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The device cannot provide the requested configuration.
    ///
    /// Raised at creation time and never worth retrying with the same input.
    Unsupported(String),
    /// The descriptor itself is malformed.
    InvalidDescriptor(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Unsupported(msg) => write!(f, "Unsupported device configuration: {}", msg),
            DeviceError::InvalidDescriptor(msg) => write!(f, "Invalid descriptor: {}", msg),
        }
    }
}

impl std::error::Error for DeviceError {}

pub type DeviceResult<T> = Result<T, DeviceError>;
