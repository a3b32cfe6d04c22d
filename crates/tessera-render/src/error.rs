use std::fmt;

use tessera_device::DeviceError;

/// Misuse of the begin/draw/end session protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// A draw, flush or polygon submission was issued outside `begin`/`end`.
    DrawOutsideSession,
    /// `begin` was called while a session was already active.
    SessionAlreadyActive,
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolViolation::DrawOutsideSession => {
                write!(f, "drawing requires an active session; call begin() first")
            }
            ProtocolViolation::SessionAlreadyActive => {
                write!(f, "begin() called while a session is already active")
            }
        }
    }
}

/// Errors produced by the 2D renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    ProtocolViolation(ProtocolViolation),
    /// A required input is missing or malformed.
    InvalidArgument(String),
    /// The device cannot provide the requested configuration. Not retried.
    DeviceCapability(String),
    /// Any other device-level creation failure.
    Device(DeviceError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::ProtocolViolation(violation) => {
                write!(f, "Protocol violation: {}", violation)
            }
            RenderError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            RenderError::DeviceCapability(msg) => write!(f, "Device capability error: {}", msg),
            RenderError::Device(err) => write!(f, "Device error: {}", err),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Device(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProtocolViolation> for RenderError {
    fn from(violation: ProtocolViolation) -> Self {
        RenderError::ProtocolViolation(violation)
    }
}

impl From<DeviceError> for RenderError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::Unsupported(msg) => RenderError::DeviceCapability(msg),
            other => RenderError::Device(other),
        }
    }
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_maps_to_capability_error() {
        let err: RenderError = DeviceError::Unsupported("msaa cube".into()).into();
        assert!(matches!(err, RenderError::DeviceCapability(_)));

        let err: RenderError = DeviceError::InvalidDescriptor("empty".into()).into();
        assert!(matches!(err, RenderError::Device(_)));
    }

    #[test]
    fn test_display() {
        let err = RenderError::from(ProtocolViolation::SessionAlreadyActive);
        assert_eq!(
            err.to_string(),
            "Protocol violation: begin() called while a session is already active"
        );
    }
}
