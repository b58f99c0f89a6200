use async_trait::async_trait;
use fxhash::hash64;
use tracing::debug;

use crate::{AnalysisContext, AnalysisError, ImageAnalysisResult, ImageAnalyzer, LivePhotoVerdict};

/// Deterministic scoring engine used when no real model backend is
/// wired in. Scores are derived from a hash of the image bytes, so the
/// same payload always gets the same verdict and different payloads
/// spread over realistic-looking distributions: roughly 5% of images
/// score as duplicates and 8% as retail-store shots.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubAnalyzer;

impl StubAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Sixteen hash bits starting at `shift`, scaled to [0, 1].
    fn unit(h: u64, shift: u32) -> f32 {
        ((h >> shift) & 0xFFFF) as f32 / 65_535.0
    }
}

#[async_trait]
impl ImageAnalyzer for StubAnalyzer {
    async fn analyze(
        &self,
        image: &[u8],
        ctx: AnalysisContext,
    ) -> Result<ImageAnalysisResult, AnalysisError> {
        if image.is_empty() {
            return Err(AnalysisError::EmptyImage);
        }

        let h = hash64(image);
        let is_duplicate = Self::unit(h, 0) < 0.05;
        let duplicate_score = if is_duplicate {
            0.8 + Self::unit(h, 16) * 0.2
        } else {
            Self::unit(h, 16) * 0.3
        };
        let retail_store_detected = Self::unit(h, 32) < 0.08;
        let stock_photo_likelihood = Self::unit(h, 48) * 0.3;
        let confidence = 0.82 + Self::unit(h, 8) * 0.15;

        debug!(
            context = ?ctx,
            bytes = image.len(),
            duplicate_score,
            retail_store_detected,
            "stub analysis complete"
        );

        Ok(ImageAnalysisResult {
            is_duplicate,
            duplicate_score,
            retail_store_detected,
            stock_photo_likelihood,
            inappropriate_content: false,
            confidence,
            flags: vec![],
        }
        .with_assembled_flags())
    }
}

/// Engine that returns the exact verdict it was built with. Used in
/// tests to drive a specific threshold outcome through the pipeline.
#[derive(Debug, Clone)]
pub struct FixedAnalyzer {
    result: ImageAnalysisResult,
}

impl FixedAnalyzer {
    pub fn new(result: ImageAnalysisResult) -> Self {
        Self {
            result: result.with_assembled_flags(),
        }
    }

    /// A verdict that clears every flagging rule.
    pub fn clean() -> Self {
        Self::new(ImageAnalysisResult {
            is_duplicate: false,
            duplicate_score: 0.1,
            retail_store_detected: false,
            stock_photo_likelihood: 0.05,
            inappropriate_content: false,
            confidence: 0.95,
            flags: vec![],
        })
    }

    /// A verdict with the given live-photo scores and neutral values
    /// for everything else.
    pub fn scoring(verdict: LivePhotoVerdict) -> Self {
        Self::new(ImageAnalysisResult {
            is_duplicate: verdict.duplicate_score >= 0.8,
            duplicate_score: verdict.duplicate_score,
            retail_store_detected: verdict.retail_store_detected,
            stock_photo_likelihood: 0.05,
            inappropriate_content: false,
            confidence: verdict.confidence,
            flags: vec![],
        })
    }
}

#[async_trait]
impl ImageAnalyzer for FixedAnalyzer {
    async fn analyze(
        &self,
        image: &[u8],
        _ctx: AnalysisContext,
    ) -> Result<ImageAnalysisResult, AnalysisError> {
        if image.is_empty() {
            return Err(AnalysisError::EmptyImage);
        }
        Ok(self.result.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_is_deterministic_for_the_same_bytes() {
        let analyzer = StubAnalyzer::new();
        let a = analyzer
            .analyze(b"jpeg bytes", AnalysisContext::LiveInventory)
            .await
            .unwrap();
        let b = analyzer
            .analyze(b"jpeg bytes", AnalysisContext::LiveInventory)
            .await
            .unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn stub_scores_stay_in_unit_range() {
        let analyzer = StubAnalyzer::new();
        for seed in 0..64u8 {
            let payload = vec![seed; 128];
            let result = analyzer
                .analyze(&payload, AnalysisContext::Product)
                .await
                .unwrap();
            assert!((0.0..=1.0).contains(&result.duplicate_score));
            assert!((0.0..=1.0).contains(&result.stock_photo_likelihood));
            assert!((0.0..=1.0).contains(&result.confidence));
            // Duplicate scores land in the high band only when flagged
            // as duplicates.
            if result.is_duplicate {
                assert!(result.duplicate_score >= 0.8);
                assert!(result.flags.contains(&"duplicate".to_string()));
            } else {
                assert!(result.duplicate_score <= 0.3);
            }
        }
    }

    #[tokio::test]
    async fn stub_rejects_empty_payloads() {
        let analyzer = StubAnalyzer::new();
        let result = analyzer.analyze(b"", AnalysisContext::Document).await;
        assert_eq!(result, Err(AnalysisError::EmptyImage));
    }

    #[tokio::test]
    async fn fixed_analyzer_returns_its_configured_verdict() {
        let analyzer = FixedAnalyzer::scoring(LivePhotoVerdict {
            duplicate_score: 0.9,
            retail_store_detected: false,
            confidence: 0.8,
        });
        let result = analyzer
            .analyze(b"anything", AnalysisContext::LiveInventory)
            .await
            .unwrap();
        assert!((result.duplicate_score - 0.9).abs() < f32::EPSILON);
        assert!(result.is_duplicate);
        assert!(result.flags.contains(&"duplicate".to_string()));
    }

    #[tokio::test]
    async fn clean_verdict_carries_no_flags() {
        let analyzer = FixedAnalyzer::clean();
        let result = analyzer
            .analyze(b"anything", AnalysisContext::LiveInventory)
            .await
            .unwrap();
        assert!(result.flags.is_empty());
        assert!(!result.retail_store_detected);
    }
}
