use thiserror::Error;

#[derive(Error, Debug)]
pub enum CcaError {
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Degenerate release schedule: {0}")]
    DegenerateSchedule(String),

    #[error("Release schedule totals {achieved} mps, expected {expected}")]
    EncodingInvariantViolation { achieved: i128, expected: u64 },

    #[error("Fetch failed: {0}")]
    FetchError(String),

    #[error("Malformed log: {0}")]
    MalformedLog(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("RPC error: {0}")]
    RpcError(#[from] ethers::providers::ProviderError),

    #[error("Transaction failed: {0}")]
    TransactionError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CcaError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CcaError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Failures after which the last-known-good state is still worth showing
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CcaError::FetchError(_) | CcaError::RpcError(_))
    }

    /// Provider refused a log query for its size; a narrower range may succeed
    pub fn is_range_limited(&self) -> bool {
        if !self.is_recoverable() {
            return false;
        }
        let message = self.to_string().to_lowercase();
        ["-32005", "timeout", "block range", "more than", "too many", "limit exceeded"]
            .iter()
            .any(|needle| message.contains(needle))
    }
}


pub type Result<T> = std::result::Result<T, CcaError>;
