use thiserror::Error;
use std::fmt;
use reqwest::StatusCode;

mod utils;
pub use utils::*;

#[derive(Error, Debug)]
pub enum HubError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("API error: {service} - {message}")]
    Api {
        service: String,
        message: String,
        status: Option<u16>,
    },

    #[error("Wallet error: {kind} - {message}")]
    Wallet {
        kind: WalletErrorKind,
        message: String,
    },

    #[error("Validation error: {kind} - {message}")]
    Validation {
        kind: ValidationErrorKind,
        message: String,
    },

    #[error("Solana RPC error: {0}")]
    SolanaRpc(String),

    #[error("Transaction encoding error: {0}")]
    Transaction(String),

    #[error("HTTP error: {status} - {message}")]
    HttpError {
        status: StatusCode,
        message: String,
    },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    InternalError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletErrorKind {
    NotConnected,
    SigningUnsupported,
    Rejected,
    SignerMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    InsufficientBalance,
    AmountTooLow,
    NothingSelected,
    InvalidInput,
    Unsupported,
}

/// Coarse buckets used to decide how a failure is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Non-2xx, parse failure, RPC failure: toast with the server message.
    Network,
    /// Missing signer or rejected signature: toast.
    Wallet,
    /// Caught before submission: inline text, action disabled.
    Validation,
    Internal,
}

impl fmt::Display for WalletErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "Wallet not connected"),
            Self::SigningUnsupported => write!(f, "Wallet does not support signing"),
            Self::Rejected => write!(f, "Signature rejected"),
            Self::SignerMismatch => write!(f, "Wallet is not a signer of this transaction"),
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientBalance => write!(f, "Insufficient balance"),
            Self::AmountTooLow => write!(f, "Amount below minimum"),
            Self::NothingSelected => write!(f, "Nothing selected"),
            Self::InvalidInput => write!(f, "Invalid input"),
            Self::Unsupported => write!(f, "Not supported"),
        }
    }
}

pub type Result<T> = std::result::Result<T, HubError>;

impl HubError {
    pub fn api(service: impl Into<String>, message: impl Into<String>, status: Option<u16>) -> Self {
        HubError::Api {
            service: service.into(),
            message: message.into(),
            status,
        }
    }

    pub fn wallet(kind: WalletErrorKind, message: impl Into<String>) -> Self {
        HubError::Wallet {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        HubError::Validation {
            kind,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            HubError::Api { .. }
            | HubError::SolanaRpc(_)
            | HubError::Transaction(_)
            | HubError::HttpError { .. }
            | HubError::NetworkError(_)
            | HubError::Serialization(_) => ErrorCategory::Network,
            HubError::Wallet { .. } => ErrorCategory::Wallet,
            HubError::Validation { .. } => ErrorCategory::Validation,
            HubError::Config(_)
            | HubError::ConfigError(_)
            | HubError::Io(_)
            | HubError::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// The text a user should see. API failures surface the server's
    /// message verbatim rather than the wrapped Display form.
    pub fn user_message(&self) -> String {
        match self {
            HubError::Api { message, .. } => message.clone(),
            HubError::Wallet { message, .. } => message.clone(),
            HubError::Validation { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        self.category() == ErrorCategory::Validation
    }
}

impl From<reqwest::Error> for HubError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            HubError::HttpError {
                status,
                message: err.to_string(),
            }
        } else {
            HubError::NetworkError(err.to_string())
        }
    }
}

impl From<solana_client::client_error::ClientError> for HubError {
    fn from(err: solana_client::client_error::ClientError) -> Self {
        HubError::SolanaRpc(err.to_string())
    }
}
