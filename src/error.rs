use crate::types::Model;

/// Errors raised while framing or decoding a response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    /// A word's CRC byte did not match the two bytes before it.
    #[error("checksum mismatch")]
    Checksum,
    /// The payload length does not fit the command's word count.
    #[error("malformed frame")]
    MalformedFrame,
}

/// All possible errors in this crate
#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    /// I²C bus error (NACK, arbitration loss, timeout)
    #[error("i2c bus error: {0:?}")]
    Io(E),
    /// CRC checksum validation failed
    #[error("checksum mismatch")]
    Checksum,
    /// Response did not have the expected number of words
    #[error("malformed frame")]
    MalformedFrame,
    /// The data-ready flag stayed low past the model's wait cap
    #[error("no data ready within the wait cap")]
    DataNotReady,
    /// The connected device is not the configured model
    #[error("configured {configured:?} but device reports {detected:?}")]
    ModelMismatch {
        configured: Model,
        detected: Option<Model>,
    },
    /// The product name does not belong to a known model
    #[error("unknown product")]
    UnknownProduct,
    /// Too many consecutive transient failures
    #[error("consecutive error threshold reached")]
    ErrorThreshold,
    /// The request is not valid in the current lifecycle phase
    #[error("invalid state for this request")]
    InvalidState,
    /// The detected model has no support for this command
    #[error("not supported by this model")]
    NotSupported,
}

impl<E> Error<E> {
    /// Transient failures are retried on the next tick and counted toward the threshold.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Checksum | Error::MalformedFrame | Error::DataNotReady
        )
    }
}

impl<E> From<ProtocolError> for Error<E> {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Checksum => Error::Checksum,
            ProtocolError::MalformedFrame => Error::MalformedFrame,
        }
    }
}

/// Rejected configuration values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} out of range")]
    OutOfRange { field: &'static str },
    #[error("poll interval must be at least one second")]
    PollInterval,
    #[error("error threshold must be at least one")]
    ErrorThreshold,
    #[error("baseline interval must be at least one hour")]
    BaselineInterval,
}
