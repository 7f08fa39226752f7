//! Error types for fundledger

use std::fmt;

#[derive(Debug, Clone)]
pub enum LedgerError {
    SerializationError(String),
    DatabaseError(String),
    IoError(String),
    ConfigError(String),
    PaymentError(String),
    InvalidBlock(String),
    InvalidCampaign(String),
    CampaignNotFound(i64),
    ApiError(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LedgerError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            LedgerError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            LedgerError::IoError(msg) => write!(f, "IO error: {}", msg),
            LedgerError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            LedgerError::PaymentError(msg) => write!(f, "Payment error: {}", msg),
            LedgerError::InvalidBlock(msg) => write!(f, "Invalid block: {}", msg),
            LedgerError::InvalidCampaign(msg) => write!(f, "Invalid campaign: {}", msg),
            LedgerError::CampaignNotFound(id) => write!(f, "Campaign {} not found", id),
            LedgerError::ApiError(msg) => write!(f, "API error: {}", msg),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::SerializationError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, LedgerError>;
