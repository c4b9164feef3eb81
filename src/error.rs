//! Error types and handling for chargemanager
//!
//! This module defines the error types used throughout the application,
//! providing consistent error handling and reporting. Malformed telemetry is
//! not an error: the telemetry store reports it as an update outcome.

use thiserror::Error;

/// Result type alias for chargemanager operations
pub type Result<T> = std::result::Result<T, ChargeManagerError>;

/// Main error type for chargemanager
#[derive(Debug, Error)]
pub enum ChargeManagerError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// MQTT broker communication errors
    #[error("MQTT error: {message}")]
    Mqtt { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },
}

impl ChargeManagerError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        ChargeManagerError::Config {
            message: message.into(),
        }
    }

    /// Create a new MQTT error
    pub fn mqtt<S: Into<String>>(message: S) -> Self {
        ChargeManagerError::Mqtt {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        ChargeManagerError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        ChargeManagerError::Io {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        ChargeManagerError::Timeout {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ChargeManagerError {
    fn from(err: std::io::Error) -> Self {
        ChargeManagerError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for ChargeManagerError {
    fn from(err: serde_yaml::Error) -> Self {
        ChargeManagerError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ChargeManagerError {
    fn from(err: serde_json::Error) -> Self {
        ChargeManagerError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<rumqttc::ClientError> for ChargeManagerError {
    fn from(err: rumqttc::ClientError) -> Self {
        ChargeManagerError::mqtt(format!("client request failed: {}", err))
    }
}

impl From<rumqttc::ConnectionError> for ChargeManagerError {
    fn from(err: rumqttc::ConnectionError) -> Self {
        ChargeManagerError::mqtt(format!("connection failed: {}", err))
    }
}
