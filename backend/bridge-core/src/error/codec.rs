use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// Failures turning envelopes into frames and back.
///
/// `Decode` never tears the connection down; the state machine logs it and
/// drops the frame.
#[derive(Debug, ThisError)]
pub enum CodecError {
    #[error("Encode Error: {message} {location}")]
    Encode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Decode Error: {message} {location}")]
    Decode {
        message: String,
        location: ErrorLocation,
    },
}

impl CodecError {
    #[track_caller]
    pub fn decode(message: impl Into<String>) -> Self {
        CodecError::Decode {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn encode(message: impl Into<String>) -> Self {
        CodecError::Encode {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, CodecError::Decode { .. })
    }
}
