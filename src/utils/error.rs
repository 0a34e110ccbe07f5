use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenewalError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("{operation} rejected by opportunity service (status {status}): {message}")]
    RpcFailure {
        operation: String,
        status: u16,
        message: String,
        retryable: bool,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Amount overflow while computing {context}")]
    AmountOverflow { context: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    Network,
    Configuration,
    Data,
    State,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RenewalError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn overflow(context: impl Into<String>) -> Self {
        Self::AmountOverflow {
            context: context.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::ApiError(_) | Self::RpcFailure { .. } => ErrorCategory::Network,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::IoError(_) | Self::SerializationError(_) | Self::AmountOverflow { .. } => {
                ErrorCategory::Data
            }
            Self::InvalidState { .. } => ErrorCategory::State,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::NotFound | ErrorCategory::State => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    /// 暫時性錯誤才值得重試 (逾時、連線失敗、5xx)
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ApiError(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            Self::RpcFailure { retryable, .. } => *retryable,
            _ => false,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::NotFound { entity, id } => format!("Could not find {} '{}'", entity, id),
            Self::ApiError(_) | Self::RpcFailure { .. } => {
                "The opportunity service could not be reached or refused the update".to_string()
            }
            Self::IoError(e) => format!("Could not read or write a file: {}", e),
            Self::SerializationError(e) => format!("Data file is not valid JSON: {}", e),
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => format!("Configuration problem: {}", self),
            Self::InvalidState { message } => format!("Nothing to do: {}", message),
            Self::AmountOverflow { context } => {
                format!("Service line item amounts are too large to total ({})", context)
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::NotFound => "Check the tenant and contract id",
            ErrorCategory::Network => {
                "Check the opportunity service endpoint; the next trigger will recompute"
            }
            ErrorCategory::Configuration => "Fix the configuration file and run again",
            ErrorCategory::Data => "Check the snapshot file path and format",
            ErrorCategory::State => "No action required",
        }
    }
}

pub type Result<T> = std::result::Result<T, RenewalError>;
