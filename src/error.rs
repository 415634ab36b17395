use thiserror::Error;

/// Failures reported by exchange collaborators (market data and orders)
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Network or transport failure (connection refused, timeout, TLS)
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Request rejected by the exchange API
    #[error("Exchange API error {code}: {message}")]
    Api { code: i64, message: String },

    /// Order-specific rejection (insufficient margin, bad quantity, ...)
    #[error("Order rejected: {reason}")]
    OrderRejected { reason: String },

    /// Response body could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// Signed endpoint called without API key and secret
    #[error("API credentials not configured")]
    MissingCredentials,
}

impl ExchangeError {
    /// Map a Binance `{"code": ..., "msg": ...}` error body
    ///
    /// Order placement codes (-2010 and the -4xxx family) become
    /// `OrderRejected`; everything else stays an API error.
    pub fn from_api_response(status: u16, body: &str) -> Self {
        #[derive(serde::Deserialize)]
        struct ApiErrorBody {
            code: i64,
            msg: String,
        }

        match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(err) => Self::classify(err.code, err.msg),
            Err(_) => Self::Api {
                code: i64::from(status),
                message: body.to_string(),
            },
        }
    }

    fn classify(code: i64, message: String) -> Self {
        match code {
            -2010 | -2019 | -2021 | -2022 => Self::OrderRejected { reason: message },
            c if (-4199..=-4000).contains(&c) => Self::OrderRejected { reason: message },
            _ => Self::Api { code, message },
        }
    }

    /// Whether repeating the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connectivity(_) => true,
            // Unknown error, disconnected, too many requests, 429/5xx bodies
            Self::Api { code, .. } => {
                matches!(code, -1000 | -1001 | -1003 | -1007 | -1015 | 429 | 500..=599)
            }
            Self::OrderRejected { .. } | Self::Parse(_) | Self::MissingCredentials => false,
        }
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Connectivity(err.to_string())
        }
    }
}

/// Failure writing trade history; logged and skipped by the trade loop
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure rendering the chart; logged and skipped by the trade loop
#[derive(Debug, Error)]
pub enum VisualizationError {
    #[error("Nothing to plot")]
    NoData,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
