// =============================================================================
// Central Application State
// =============================================================================
//
// Shared across all request handlers via `Arc<AppState>`. Everything here is
// read-only after startup except the recent-error log, which sits behind a
// parking_lot::RwLock and is never read by the comparison logic itself.
// =============================================================================

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::analysis::ComparisonService;
use crate::error::StageError;
use crate::runtime_config::RuntimeConfig;

// =============================================================================
// Error Record
// =============================================================================

/// A failed stage, as kept in the error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    #[serde(flatten)]
    pub error: StageError,
    /// Comparison that produced the error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
    pub at: DateTime<Utc>,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
pub const MAX_RECENT_ERRORS: usize = 50;

pub struct AppState {
    pub config: RuntimeConfig,
    pub service: ComparisonService,

    /// Inference token used when a request carries no `Authorization` header.
    default_token: Option<String>,

    recent_errors: RwLock<Vec<ErrorRecord>>,

    /// Instant when the server was started. Used for uptime.
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        config: RuntimeConfig,
        service: ComparisonService,
        default_token: Option<String>,
    ) -> Self {
        Self {
            config,
            service,
            default_token: default_token.filter(|t| !t.trim().is_empty()),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    /// Request token if present, otherwise the startup default.
    pub fn credential<'a>(&'a self, request_token: Option<&'a str>) -> Option<&'a str> {
        request_token.or(self.default_token.as_deref())
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    // ── Error Log ───────────────────────────────────────────────────────

    /// Record a failed stage. The log is capped at [`MAX_RECENT_ERRORS`];
    /// oldest entries are evicted first.
    pub fn push_error(&self, error: StageError, request_id: Option<Uuid>) {
        let record = ErrorRecord {
            error,
            request_id,
            at: Utc::now(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
    }

    /// Oldest first.
    pub fn recent_errors(&self) -> Vec<ErrorRecord> {
        self.recent_errors.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::analysis::tests::{FakeMarket, FakeNarrator};
    use crate::error::Stage;
    use crate::indicators::IndicatorParams;

    fn state(default_token: Option<&str>) -> AppState {
        let service = ComparisonService::new(
            Arc::new(FakeMarket::with(&[])),
            Arc::new(FakeNarrator::ok("")),
            IndicatorParams::default(),
        );
        AppState::new(
            RuntimeConfig::default(),
            service,
            default_token.map(str::to_string),
        )
    }

    #[test]
    fn error_log_is_bounded() {
        let s = state(None);
        for i in 0..(MAX_RECENT_ERRORS + 7) {
            s.push_error(
                StageError::new(Stage::Fetch, Some("BTC"), format!("error {i}")),
                None,
            );
        }
        let errors = s.recent_errors();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors[0].error.message, "error 7");
        assert_eq!(
            errors.last().unwrap().error.message,
            format!("error {}", MAX_RECENT_ERRORS + 6)
        );
    }

    #[test]
    fn record_serialises_flat() {
        let s = state(None);
        let id = Uuid::new_v4();
        s.push_error(StageError::new(Stage::Narrative, None, "quota"), Some(id));
        let json = serde_json::to_value(&s.recent_errors()[0]).unwrap();
        assert_eq!(json["stage"], "narrative");
        assert_eq!(json["message"], "quota");
        assert_eq!(json["request_id"], id.to_string());
        assert!(json["at"].is_string());
    }

    #[test]
    fn request_token_wins_over_default() {
        let s = state(Some("env_token"));
        assert_eq!(s.credential(Some("header_token")), Some("header_token"));
        assert_eq!(s.credential(None), Some("env_token"));

        let s = state(Some("  "));
        assert_eq!(s.credential(None), None);
    }
}
