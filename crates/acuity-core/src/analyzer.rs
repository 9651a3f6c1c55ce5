//! Pipeline orchestration.

use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use serde_json::{json, Value};
use tracing::debug;

use acuity_cache::{Fingerprint, ResultCache};
use acuity_images::{PathValidator, Preprocessor, ProcessedImage};
use acuity_providers::{
    complete_with_structured_fallback, CompletionRequest, Message, Provider,
};

use crate::config::AcuityConfig;
use crate::coords::remap_boxes;
use crate::error::AnalysisError;
use crate::models::AnalysisRequest;
use crate::modes::AnalysisMode;
use crate::prompt::{PromptBuilder, PROMPT_VERSION};
use crate::repair::parse_or_repair;

/// Sequences the analysis pipeline and builds the caller-facing envelope.
///
/// Owns the path validator, the provider handles, and the result cache; all
/// are injected at construction so the host controls their lifecycle. Safe
/// to share across concurrent requests: per-request state is call-scoped and
/// the cache serializes its own bookkeeping.
pub struct Analyzer {
    config: AcuityConfig,
    validator: PathValidator,
    vision: Arc<dyn Provider>,
    repair: Arc<dyn Provider>,
    cache: ResultCache<Value>,
}

impl Analyzer {
    /// Create an analyzer with distinct vision and repair providers.
    pub fn new(
        config: AcuityConfig,
        vision: Arc<dyn Provider>,
        repair: Arc<dyn Provider>,
    ) -> Self {
        let validator = PathValidator::with_max_size(&config.base_dir, config.max_file_size_mb);
        let cache = ResultCache::new(
            config.cache_capacity,
            Duration::from_secs(config.cache_ttl_secs),
        );

        Self {
            config,
            validator,
            vision,
            repair,
            cache,
        }
    }

    /// Create an analyzer using one provider for both vision and repair.
    pub fn with_provider(config: AcuityConfig, provider: Arc<dyn Provider>) -> Self {
        Self::new(config, Arc::clone(&provider), provider)
    }

    /// Analyze one image request.
    ///
    /// Always returns a well-formed envelope: either the success shape with
    /// `mode`/`metadata`/`content`, or `{"error": ..., "path": ...}`. No
    /// internal failure escapes as a panic or error.
    pub async fn analyze(&self, request: AnalysisRequest) -> Value {
        match self.run(&request).await {
            Ok(envelope) => envelope,
            Err(err) => json!({"error": err.to_string(), "path": request.path}),
        }
    }

    async fn run(&self, request: &AnalysisRequest) -> Result<Value, AnalysisError> {
        // Cheapest checks first; nothing below touches the filesystem or the
        // network until both pass.
        let mode = AnalysisMode::parse(&request.mode)
            .ok_or_else(|| AnalysisError::InvalidMode(request.mode.clone()))?;
        if mode == AnalysisMode::Query
            && request.question.as_deref().map_or(true, str::is_empty)
        {
            return Err(AnalysisError::MissingQuestion);
        }

        let canonical = self.validator.confine(&request.path)?;
        let mtime_nanos = std::fs::metadata(&canonical)?
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or(0);

        let key = Fingerprint {
            canonical_path: canonical.display().to_string(),
            mtime_nanos,
            mode: mode.as_str().to_string(),
            question: request.question.clone(),
            region: request.region,
            prompt_version: PROMPT_VERSION.to_string(),
        }
        .digest();

        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let processed = Preprocessor::process(&canonical, request.region, &mode.render_plan())?;

        let (system, user) =
            PromptBuilder::build(mode, request.question.as_deref(), processed.sent_size);
        let completion = CompletionRequest::new(
            &self.config.vision_model,
            vec![
                Message::system(system),
                Message::user_with_image(user, processed.data_url()),
            ],
        );

        let raw = complete_with_structured_fallback(self.vision.as_ref(), &completion).await?;

        let mut content =
            parse_or_repair(raw, self.repair.as_ref(), &self.config.repair_model).await;
        remap_boxes(
            &mut content,
            processed.crop_bbox,
            processed.sent_size,
            processed.original_size,
        );

        let envelope = build_envelope(mode, request, &processed, content);
        self.cache.set(key, envelope.clone());
        debug!(mode = mode.as_str(), path = %request.path, "analysis complete");
        Ok(envelope)
    }
}

fn build_envelope(
    mode: AnalysisMode,
    request: &AnalysisRequest,
    processed: &ProcessedImage,
    content: Value,
) -> Value {
    // crop_bbox is only reported when the caller asked for a region; the
    // internal full-image crop box stays an implementation detail.
    let crop_bbox = if request.region.is_some() {
        json!(processed.crop_bbox.to_vec())
    } else {
        Value::Null
    };

    json!({
        "mode": mode.as_str(),
        "metadata": {
            "original_path": request.path,
            "original_size": {
                "width": processed.original_size.0,
                "height": processed.original_size.1,
            },
            "crop_bbox": crop_bbox,
            "sent_size": {
                "width": processed.sent_size.0,
                "height": processed.sent_size.1,
            },
            "prompt_version": PROMPT_VERSION,
        },
        "content": content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use acuity_providers::{ProviderError, RawOutput};
    use async_trait::async_trait;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Reply =
        Box<dyn Fn(&CompletionRequest) -> Result<RawOutput, ProviderError> + Send + Sync>;

    struct StubProvider {
        reply: Reply,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn text(text: &str) -> Arc<Self> {
            let text = text.to_string();
            Self::with(move |_| Ok(RawOutput::Text(text.clone())))
        }

        fn with(
            reply: impl Fn(&CompletionRequest) -> Result<RawOutput, ProviderError>
                + Send
                + Sync
                + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                reply: Box::new(reply),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn id(&self) -> &str {
            "stub"
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<RawOutput, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.reply)(request)
        }
    }

    fn write_png(dir: &Path, name: &str, w: u32, h: u32) -> String {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([50, 100, 150])));
        let path = dir.join(name);
        img.save(&path).unwrap();
        path.display().to_string()
    }

    fn config_for(base: &Path) -> AcuityConfig {
        AcuityConfig {
            base_dir: base.to_path_buf(),
            ..AcuityConfig::default()
        }
    }

    const UI_REPLY: &str = r#"{"elements": [{"type": "button", "label": "OK",
        "bbox": [0.1, 0.2, 0.5, 0.6]}], "uncertainties": []}"#;

    #[tokio::test]
    async fn test_invalid_mode_rejected_before_path_checks() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer =
            Analyzer::with_provider(config_for(dir.path()), StubProvider::text("{}"));

        // The path does not exist; an invalid-mode error proves validation
        // ran before any filesystem access.
        let envelope = analyzer
            .analyze(AnalysisRequest::new("/nonexistent/nope.png", "foo"))
            .await;
        let error = envelope["error"].as_str().unwrap();
        assert!(error.contains("Invalid mode 'foo'"));
        assert_eq!(envelope["path"], "/nonexistent/nope.png");
    }

    #[tokio::test]
    async fn test_query_without_question_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer =
            Analyzer::with_provider(config_for(dir.path()), StubProvider::text("{}"));

        let envelope = analyzer
            .analyze(AnalysisRequest::new("/nonexistent/nope.png", "query"))
            .await;
        assert!(envelope["error"].as_str().unwrap().contains("question"));
    }

    #[tokio::test]
    async fn test_query_with_empty_question_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer =
            Analyzer::with_provider(config_for(dir.path()), StubProvider::text("{}"));

        let request =
            AnalysisRequest::new("/nonexistent/nope.png", "query").with_question("");
        let envelope = analyzer.analyze(request).await;
        assert!(envelope["error"].as_str().unwrap().contains("question"));
    }

    #[tokio::test]
    async fn test_path_outside_base_is_denied() {
        let base = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let path = write_png(outside.path(), "secret.png", 10, 10);

        let provider = StubProvider::text("{}");
        let analyzer = Analyzer::with_provider(config_for(base.path()), provider.clone());

        let envelope = analyzer.analyze(AnalysisRequest::new(&path, "general")).await;
        assert!(envelope["error"].as_str().unwrap().contains("Access denied"));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_successful_ui_analysis_builds_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "screen.png", 100, 80);
        let analyzer =
            Analyzer::with_provider(config_for(dir.path()), StubProvider::text(UI_REPLY));

        let envelope = analyzer.analyze(AnalysisRequest::new(&path, "ui")).await;

        assert_eq!(envelope["mode"], "ui");
        assert_eq!(envelope["metadata"]["original_path"], path);
        assert_eq!(envelope["metadata"]["original_size"]["width"], 100);
        assert_eq!(envelope["metadata"]["original_size"]["height"], 80);
        assert_eq!(envelope["metadata"]["crop_bbox"], Value::Null);
        assert_eq!(envelope["metadata"]["sent_size"]["width"], 100);
        assert_eq!(envelope["metadata"]["prompt_version"], PROMPT_VERSION);

        // Normalized bbox scaled by the 100x80 sent size.
        assert_eq!(
            envelope["content"]["elements"][0]["bbox"],
            json!([10, 16, 50, 48])
        );
    }

    #[tokio::test]
    async fn test_region_is_reported_in_crop_bbox() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "screen.png", 100, 80);
        let analyzer =
            Analyzer::with_provider(config_for(dir.path()), StubProvider::text("{}"));

        let request = AnalysisRequest::new(&path, "general").with_region([10, 10, 50, 40]);
        let envelope = analyzer.analyze(request).await;

        assert_eq!(envelope["metadata"]["crop_bbox"], json!([10, 10, 50, 40]));
        assert_eq!(envelope["metadata"]["sent_size"]["width"], 40);
        assert_eq!(envelope["metadata"]["sent_size"]["height"], 30);
    }

    #[tokio::test]
    async fn test_invalid_region_produces_error_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "screen.png", 800, 600);
        let analyzer =
            Analyzer::with_provider(config_for(dir.path()), StubProvider::text("{}"));

        let request = AnalysisRequest::new(&path, "general").with_region([500, 500, 100, 100]);
        let envelope = analyzer.analyze(request).await;
        assert!(envelope["error"].as_str().unwrap().contains("Invalid region"));
    }

    #[tokio::test]
    async fn test_repeat_request_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "screen.png", 100, 80);
        let provider = StubProvider::text(UI_REPLY);
        let analyzer = Analyzer::with_provider(config_for(dir.path()), provider.clone());

        let first = analyzer.analyze(AnalysisRequest::new(&path, "ui")).await;
        let second = analyzer.analyze(AnalysisRequest::new(&path, "ui")).await;

        assert_eq!(first, second);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_different_modes_do_not_share_cache_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "screen.png", 100, 80);
        let provider = StubProvider::text("{\"description\": \"a square\"}");
        let analyzer = Analyzer::with_provider(config_for(dir.path()), provider.clone());

        analyzer.analyze(AnalysisRequest::new(&path, "general")).await;
        analyzer.analyze(AnalysisRequest::new(&path, "ocr")).await;
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_structured_output_rejection_falls_back_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "screen.png", 100, 80);

        let provider = StubProvider::with(|request| {
            if request.structured_json {
                Err(ProviderError::StructuredOutputUnsupported)
            } else {
                Ok(RawOutput::Text("{\"description\": \"ok\"}".to_string()))
            }
        });
        let analyzer = Analyzer::with_provider(config_for(dir.path()), provider.clone());

        let envelope = analyzer.analyze(AnalysisRequest::new(&path, "general")).await;
        assert_eq!(envelope["content"]["description"], "ok");
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_fatal_provider_error_becomes_error_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "screen.png", 100, 80);

        let provider =
            StubProvider::with(|_| Err(ProviderError::Network("connection reset".to_string())));
        let analyzer = Analyzer::with_provider(config_for(dir.path()), provider);

        let envelope = analyzer.analyze(AnalysisRequest::new(&path, "general")).await;
        assert!(envelope["error"].as_str().unwrap().contains("Network error"));
        assert_eq!(envelope["path"], path);
    }

    #[tokio::test]
    async fn test_unrepairable_output_degrades_to_sentinel_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "screen.png", 100, 80);

        let vision = StubProvider::text("complete garbage");
        let repair = StubProvider::text("also garbage");
        let analyzer = Analyzer::new(config_for(dir.path()), vision, repair.clone());

        let envelope = analyzer.analyze(AnalysisRequest::new(&path, "general")).await;
        // The request still succeeds; only the content is the sentinel.
        assert_eq!(envelope["mode"], "general");
        assert_eq!(envelope["content"]["error"], "JSON Parse Failed");
        assert_eq!(repair.calls(), 1);
    }

    #[tokio::test]
    async fn test_error_envelopes_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "screen.png", 100, 80);

        let provider =
            StubProvider::with(|_| Err(ProviderError::Network("down".to_string())));
        let analyzer = Analyzer::with_provider(config_for(dir.path()), provider.clone());

        analyzer.analyze(AnalysisRequest::new(&path, "general")).await;
        analyzer.analyze(AnalysisRequest::new(&path, "general")).await;
        assert_eq!(provider.calls(), 2);
    }
}
