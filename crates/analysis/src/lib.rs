//! Thela Image Analysis
//!
//! Scores a single image for authenticity signals: is it a duplicate of
//! something we've seen, does it look like a retail shelf, is it a
//! stock photo. The pipeline depends only on the [`ImageAnalyzer`]
//! contract defined here, never on a specific model backend.
//!
//! Backends we ship:
//!
//! - [`StubAnalyzer`] - deterministic, hash-seeded scores. Same image
//!   bytes, same verdict, every time. Good for development and tests.
//! - [`FixedAnalyzer`] - returns exactly the verdict you configure.
//!   The injectable test double for exercising threshold behavior.
//!
//! A real model backend implements the same trait and slots in without
//! any pipeline change.
//!
//! ## Failure semantics
//!
//! Analysis must never silently auto-verify. [`analyze_with_timeout`]
//! bounds the engine call and, on timeout or engine failure, returns
//! the [`fallback_verdict`]: maximum duplicate score, zero confidence,
//! an `analysis_failed` flag. Callers treat that as flagged-for-manual-
//! review, so a broken model degrades to more human work, not to
//! unverified inventory passing as authentic.

mod error;
mod stub;

pub use crate::error::AnalysisError;
pub use crate::stub::{FixedAnalyzer, StubAnalyzer};

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Where the image under analysis came from; affects model routing in a
/// real backend, carried as an opaque tag here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisContext {
    Product,
    Document,
    LiveInventory,
}

/// Full authenticity verdict for one image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysisResult {
    pub is_duplicate: bool,
    /// Likelihood this image duplicates a known one, in [0, 1].
    pub duplicate_score: f32,
    pub retail_store_detected: bool,
    /// Likelihood this is a stock photo rather than a live capture.
    pub stock_photo_likelihood: f32,
    pub inappropriate_content: bool,
    /// Overall model confidence in this verdict, in [0, 1].
    pub confidence: f32,
    /// String tags assembled from threshold crossings.
    pub flags: Vec<String>,
}

impl ImageAnalysisResult {
    /// Threshold above which `stock_photo_likelihood` raises a flag.
    pub const STOCK_PHOTO_FLAG_THRESHOLD: f32 = 0.7;

    /// Rebuild the flag set from the score fields: `duplicate` iff
    /// `is_duplicate`, `retail_store` iff `retail_store_detected`,
    /// `stock_photo` iff the likelihood crosses the threshold.
    pub fn with_assembled_flags(mut self) -> Self {
        self.flags.clear();
        if self.is_duplicate {
            self.flags.push("duplicate".to_string());
        }
        if self.retail_store_detected {
            self.flags.push("retail_store".to_string());
        }
        if self.stock_photo_likelihood > Self::STOCK_PHOTO_FLAG_THRESHOLD {
            self.flags.push("stock_photo".to_string());
        }
        self
    }
}

/// The reduced verdict used on the live-photo ingestion path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LivePhotoVerdict {
    pub duplicate_score: f32,
    pub retail_store_detected: bool,
    pub confidence: f32,
}

impl From<&ImageAnalysisResult> for LivePhotoVerdict {
    fn from(result: &ImageAnalysisResult) -> Self {
        Self {
            duplicate_score: result.duplicate_score,
            retail_store_detected: result.retail_store_detected,
            confidence: result.confidence,
        }
    }
}

/// Runtime configuration for analysis calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    /// Hard bound on a single engine call, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AnalysisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Pluggable authenticity scoring capability.
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    /// Score a raw image payload. Implementations should return an
    /// error rather than guessing when the payload is unusable; the
    /// pipeline maps failures to the safe fallback verdict.
    async fn analyze(
        &self,
        image: &[u8],
        ctx: AnalysisContext,
    ) -> Result<ImageAnalysisResult, AnalysisError>;
}

/// Safe default verdict when the engine cannot produce one: treated as
/// flagged by every caller, never as verified.
pub fn fallback_verdict() -> ImageAnalysisResult {
    ImageAnalysisResult {
        is_duplicate: false,
        duplicate_score: 1.0,
        retail_store_detected: false,
        stock_photo_likelihood: 0.0,
        inappropriate_content: false,
        confidence: 0.0,
        flags: vec!["analysis_failed".to_string()],
    }
}

/// Run the engine with a hard timeout. Timeouts and engine failures
/// degrade to [`fallback_verdict`] so an upload is never lost and never
/// auto-verified because the model was unavailable.
pub async fn analyze_with_timeout(
    analyzer: &dyn ImageAnalyzer,
    image: &[u8],
    ctx: AnalysisContext,
    cfg: &AnalysisConfig,
) -> ImageAnalysisResult {
    match tokio::time::timeout(cfg.timeout(), analyzer.analyze(image, ctx)).await {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => {
            warn!(context = ?ctx, error = %err, "analysis engine failed, using fallback verdict");
            fallback_verdict()
        }
        Err(_) => {
            warn!(
                context = ?ctx,
                timeout_ms = cfg.timeout_ms,
                "analysis timed out, using fallback verdict"
            );
            fallback_verdict()
        }
    }
}
