// =============================================================================
// Error taxonomy
// =============================================================================
//
// One error type per stage of an analysis request:
//   - IndicatorError: the indicator engine's only precondition
//   - DataFetchError: market data lookup for one symbol
//   - NarrativeServiceError: the hosted inference call
//
// None of them are retried. AnalysisError joins the first two for a single
// symbol; ApiError maps failures onto HTTP responses.
// =============================================================================

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Which step of a request produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetch,
    Indicators,
    Narrative,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Indicators => write!(f, "indicators"),
            Self::Narrative => write!(f, "narrative"),
        }
    }
}

// -----------------------------------------------------------------------------
// Indicator engine
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndicatorError {
    #[error("insufficient data: the indicator engine needs at least one bar")]
    InsufficientData,
    #[error("invalid indicator parameters: {0}")]
    InvalidParams(String),
}

// -----------------------------------------------------------------------------
// Market data
// -----------------------------------------------------------------------------

/// Rejection reasons for [`crate::types::OhlcvSeries::new`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesError {
    #[error("bar {index} at {timestamp} is not strictly after the previous bar")]
    OutOfOrder {
        index: usize,
        timestamp: DateTime<Utc>,
    },
    #[error("bar {index} at {timestamp} has high/low outside its open/close")]
    InconsistentRange {
        index: usize,
        timestamp: DateTime<Utc>,
    },
}

/// Underlying cause of a failed market data lookup.
#[derive(Debug, Error)]
pub enum FetchCause {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },
    #[error("symbol not listed")]
    UnknownSymbol,
    #[error("no market data returned")]
    Empty,
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("invalid series: {0}")]
    InvalidSeries(#[from] SeriesError),
}

/// A market data lookup for `symbol` failed.
#[derive(Debug, Error)]
#[error("failed to fetch market data for {symbol}: {cause}")]
pub struct DataFetchError {
    pub symbol: String,
    #[source]
    pub cause: FetchCause,
}

impl DataFetchError {
    pub fn new(symbol: impl Into<String>, cause: impl Into<FetchCause>) -> Self {
        Self {
            symbol: symbol.into(),
            cause: cause.into(),
        }
    }
}

// -----------------------------------------------------------------------------
// Narrative generation
// -----------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum NarrativeServiceError {
    #[error("no inference API token was supplied")]
    MissingCredential,
    #[error("inference API rejected the token (HTTP {status})")]
    Unauthorized { status: u16 },
    #[error("inference API quota exceeded")]
    QuotaExceeded,
    #[error("inference API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("inference request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected inference response: {0}")]
    MalformedResponse(String),
}

// -----------------------------------------------------------------------------
// Per-symbol pipeline
// -----------------------------------------------------------------------------

/// Failure of the fetch → indicators pipeline for one symbol.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Fetch(#[from] DataFetchError),
    #[error("indicator computation failed for {symbol}: {source}")]
    Indicators {
        symbol: String,
        #[source]
        source: IndicatorError,
    },
}

impl AnalysisError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Fetch(_) => Stage::Fetch,
            Self::Indicators { .. } => Stage::Indicators,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Self::Fetch(e) => &e.symbol,
            Self::Indicators { symbol, .. } => symbol,
        }
    }
}

// -----------------------------------------------------------------------------
// Report-level error record
// -----------------------------------------------------------------------------

/// Serializable description of a failed stage, embedded in partial results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageError {
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub message: String,
}

impl StageError {
    pub fn new(stage: Stage, symbol: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            stage,
            symbol: symbol.map(str::to_string),
            message: message.into(),
        }
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.symbol {
            Some(sym) => write!(f, "[{}:{}] {}", self.stage, sym, self.message),
            None => write!(f, "[{}] {}", self.stage, self.message),
        }
    }
}

impl From<&AnalysisError> for StageError {
    fn from(e: &AnalysisError) -> Self {
        let message = match e {
            AnalysisError::Fetch(f) => f.cause.to_string(),
            AnalysisError::Indicators { source, .. } => source.to_string(),
        };
        Self::new(e.stage(), Some(e.symbol()), message)
    }
}

// -----------------------------------------------------------------------------
// HTTP mapping
// -----------------------------------------------------------------------------

/// Errors returned directly by REST handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Analysis(AnalysisError::Fetch(e)) => match e.cause {
                FetchCause::UnknownSymbol | FetchCause::Empty => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Analysis(AnalysisError::Indicators { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        let (stage, symbol) = match &self {
            Self::BadRequest(_) => (None, None),
            Self::Analysis(e) => (Some(e.stage()), Some(e.symbol().to_string())),
        };

        let body = json!({
            "error": self.to_string(),
            "stage": stage,
            "symbol": symbol,
        });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_message_names_symbol_and_cause() {
        let e = DataFetchError::new("DOGE", FetchCause::UnknownSymbol);
        assert_eq!(
            e.to_string(),
            "failed to fetch market data for DOGE: symbol not listed"
        );
    }

    #[test]
    fn stage_error_from_fetch_failure_keeps_context() {
        let e = AnalysisError::from(DataFetchError::new("ETH", FetchCause::Empty));
        let stage = StageError::from(&e);
        assert_eq!(stage.stage, Stage::Fetch);
        assert_eq!(stage.symbol.as_deref(), Some("ETH"));
        assert_eq!(stage.to_string(), "[fetch:ETH] no market data returned");
    }

    #[test]
    fn stage_error_from_indicator_failure() {
        let e = AnalysisError::Indicators {
            symbol: "SOL".into(),
            source: IndicatorError::InsufficientData,
        };
        let stage = StageError::from(&e);
        assert_eq!(stage.stage, Stage::Indicators);
        assert_eq!(stage.symbol.as_deref(), Some("SOL"));
        assert!(stage.message.starts_with("insufficient data"));
    }

    #[test]
    fn stage_serializes_lowercase() {
        let json = serde_json::to_value(StageError::new(Stage::Narrative, None, "x")).unwrap();
        assert_eq!(json["stage"], "narrative");
        assert!(json.get("symbol").is_none());
    }

    #[test]
    fn api_error_status_codes() {
        let resp = ApiError::BadRequest("empty".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = ApiError::from(AnalysisError::from(DataFetchError::new(
            "XYZ",
            FetchCause::UnknownSymbol,
        )))
        .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = ApiError::from(AnalysisError::from(DataFetchError::new(
            "BTC",
            FetchCause::Status {
                endpoint: "/api/v3/klines",
                status: 500,
                body: "oops".into(),
            },
        )))
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let resp = ApiError::from(AnalysisError::Indicators {
            symbol: "BTC".into(),
            source: IndicatorError::InsufficientData,
        })
        .into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
