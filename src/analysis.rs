// =============================================================================
// Comparison Service — one request, two symbols, partial results
// =============================================================================
//
// 1. Normalise both symbols (trim + upper-case).
// 2. Fetch market data for both concurrently. The two lookups are independent.
// 3. Run the indicator engine on each fetched series.
// 4. If both snapshots are available, format the comparison prompt and ask the
//    narrative generator for markdown.
//
// Nothing is retried. Every failed stage is recorded in the report next to
// whatever did succeed.
// =============================================================================

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{AnalysisError, ApiError, Stage, StageError};
use crate::indicators::{compute_indicators, IndicatorParams, IndicatorSet, IndicatorSummary};
use crate::market_data::{MarketData, MarketDataSource};
use crate::narrative::{build_comparison_prompt, NarrativeGenerator, DISCLAIMER};
use crate::types::{normalize_symbol, MarketSnapshot, OhlcvSeries};

// =============================================================================
// Report types
// =============================================================================

/// Fetched data and indicators for one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolAnalysis {
    pub symbol: String,
    pub snapshot: MarketSnapshot,
    pub series: OhlcvSeries,
    pub indicators: IndicatorSet,
    pub summary: IndicatorSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SymbolOutcome {
    Ok(Box<SymbolAnalysis>),
    Failed(StageError),
}

#[derive(Debug, Clone, Serialize)]
pub struct Narrative {
    pub model: String,
    pub markdown: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum NarrativeOutcome {
    Ready(Narrative),
    Failed(StageError),
}

/// Result of a two-symbol comparison. Individual stages may have failed.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub request_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub symbols: [SymbolOutcome; 2],
    pub narrative: NarrativeOutcome,
    pub disclaimer: &'static str,
}

impl ComparisonReport {
    /// Every failed stage, in symbol order then narrative.
    pub fn errors(&self) -> Vec<&StageError> {
        let mut errors: Vec<&StageError> = self
            .symbols
            .iter()
            .filter_map(|s| match s {
                SymbolOutcome::Failed(e) => Some(e),
                SymbolOutcome::Ok(_) => None,
            })
            .collect();
        if let NarrativeOutcome::Failed(e) = &self.narrative {
            errors.push(e);
        }
        errors
    }
}

// =============================================================================
// Service
// =============================================================================

pub struct ComparisonService {
    market: Arc<dyn MarketDataSource>,
    narrator: Arc<dyn NarrativeGenerator>,
    params: IndicatorParams,
}

impl ComparisonService {
    pub fn new(
        market: Arc<dyn MarketDataSource>,
        narrator: Arc<dyn NarrativeGenerator>,
        params: IndicatorParams,
    ) -> Self {
        Self {
            market,
            narrator,
            params,
        }
    }

    /// Fetch and compute indicators for a single (raw, user-entered) symbol.
    pub async fn analyze_symbol(&self, raw_symbol: &str) -> Result<SymbolAnalysis, ApiError> {
        let symbol = normalize_symbol(raw_symbol)
            .ok_or_else(|| ApiError::BadRequest("symbol must not be empty".into()))?;
        let data = self.market.fetch(&symbol).await.map_err(AnalysisError::from)?;
        Ok(self.build_analysis(&symbol, data)?)
    }

    /// Compare two symbols. `credential` is the request's inference token.
    ///
    /// Only an empty symbol is rejected up front; every later failure is
    /// reported inside the returned report.
    #[instrument(skip(self, credential), fields(request_id = tracing::field::Empty))]
    pub async fn compare(
        &self,
        raw_a: &str,
        raw_b: &str,
        credential: Option<&str>,
    ) -> Result<ComparisonReport, ApiError> {
        let symbol_a = normalize_symbol(raw_a)
            .ok_or_else(|| ApiError::BadRequest("symbol_a must not be empty".into()))?;
        let symbol_b = normalize_symbol(raw_b)
            .ok_or_else(|| ApiError::BadRequest("symbol_b must not be empty".into()))?;

        let request_id = Uuid::new_v4();
        tracing::Span::current().record("request_id", tracing::field::display(request_id));
        info!(symbol_a = %symbol_a, symbol_b = %symbol_b, "comparison started");

        let (fetched_a, fetched_b) =
            tokio::join!(self.market.fetch(&symbol_a), self.market.fetch(&symbol_b));

        let snapshots = match (&fetched_a, &fetched_b) {
            (Ok(a), Ok(b)) => Some((a.snapshot.clone(), b.snapshot.clone())),
            _ => None,
        };

        let outcome_a = self.outcome(&symbol_a, fetched_a);
        let outcome_b = self.outcome(&symbol_b, fetched_b);

        let narrative = match snapshots {
            Some((a, b)) => self.narrate(&a, &b, credential).await,
            None => {
                let missing: Vec<&str> = [(&outcome_a, &symbol_a), (&outcome_b, &symbol_b)]
                    .into_iter()
                    .filter(|(o, _)| matches!(o, SymbolOutcome::Failed(e) if e.stage == Stage::Fetch))
                    .map(|(_, s)| s.as_str())
                    .collect();
                NarrativeOutcome::Failed(StageError::new(
                    Stage::Narrative,
                    None,
                    format!("skipped: market data unavailable for {}", missing.join(", ")),
                ))
            }
        };

        let report = ComparisonReport {
            request_id,
            generated_at: Utc::now(),
            symbols: [outcome_a, outcome_b],
            narrative,
            disclaimer: DISCLAIMER,
        };

        info!(failed_stages = report.errors().len(), "comparison finished");
        Ok(report)
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    fn build_analysis(&self, symbol: &str, data: MarketData) -> Result<SymbolAnalysis, AnalysisError> {
        let indicators = compute_indicators(data.series.bars(), &self.params).map_err(|source| {
            AnalysisError::Indicators {
                symbol: symbol.to_string(),
                source,
            }
        })?;
        let summary = indicators.summary();

        Ok(SymbolAnalysis {
            symbol: symbol.to_string(),
            snapshot: data.snapshot,
            series: data.series,
            indicators,
            summary,
        })
    }

    fn outcome(
        &self,
        symbol: &str,
        fetched: Result<MarketData, crate::error::DataFetchError>,
    ) -> SymbolOutcome {
        let result = fetched
            .map_err(AnalysisError::from)
            .and_then(|data| self.build_analysis(symbol, data));

        match result {
            Ok(analysis) => SymbolOutcome::Ok(Box::new(analysis)),
            Err(e) => {
                warn!(symbol, stage = %e.stage(), error = %e, "symbol analysis failed");
                SymbolOutcome::Failed(StageError::from(&e))
            }
        }
    }

    async fn narrate(
        &self,
        a: &MarketSnapshot,
        b: &MarketSnapshot,
        credential: Option<&str>,
    ) -> NarrativeOutcome {
        let prompt = build_comparison_prompt(a, b);

        match self.narrator.generate(&prompt, credential).await {
            Ok(markdown) => NarrativeOutcome::Ready(Narrative {
                model: self.narrator.model().to_string(),
                markdown,
            }),
            Err(e) => {
                warn!(error = %e, "narrative generation failed");
                NarrativeOutcome::Failed(StageError::new(Stage::Narrative, None, e.to_string()))
            }
        }
    }
}
