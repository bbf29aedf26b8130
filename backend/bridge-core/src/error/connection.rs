use crate::error::CodecError;

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;
use tokio_tungstenite::tungstenite::Error as WsError;

#[derive(Debug, ThisError)]
pub enum ConnectionError {
    #[error("Open Error: {url}: {message} {location}")]
    Open {
        url: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Read Error: {message} {location}")]
    Read {
        message: String,
        location: ErrorLocation,
    },

    #[error("Not Connected Error: {message} {location}")]
    NotConnected {
        message: String,
        location: ErrorLocation,
    },

    #[error("Reconnect Exhausted Error: gave up after {attempts} attempts {location}")]
    ReconnectExhausted {
        attempts: u32,
        location: ErrorLocation,
    },

    #[error("Connector Stopped Error: {message} {location}")]
    Stopped {
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl ConnectionError {
    #[track_caller]
    pub fn open(url: impl Into<String>, message: impl Into<String>) -> Self {
        ConnectionError::Open {
            url: url.into(),
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn not_connected(message: impl Into<String>) -> Self {
        ConnectionError::NotConnected {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn read(message: impl Into<String>) -> Self {
        ConnectionError::Read {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn stopped() -> Self {
        ConnectionError::Stopped {
            message: "connection state machine is no longer running".to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn reconnect_exhausted(attempts: u32) -> Self {
        ConnectionError::ReconnectExhausted {
            attempts,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<WsError> for ConnectionError {
    #[track_caller]
    fn from(error: WsError) -> Self {
        ConnectionError::Send {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
