//! Pipeline orchestration: the two operations callers actually use.
//!
//! [`AppealComposer`] owns one of each collaborator (validator, content
//! extractor, inference gateway) and strings them together:
//!
//! * [`AppealComposer::analyze_fine`]: upload → validate → extract → infer → parse
//! * [`AppealComposer::generate_appeal`]: fine data + options → prompt → infer → cleanup
//!
//! Each stage either succeeds or aborts the whole operation with a typed
//! [`AppealError`]. There is no partial result and no fallback record.
//! The configured wall-clock limit bounds a whole invocation: one deadline
//! is fixed when the operation starts and every awaited stage runs against
//! it. Stage events are reported to the optional progress callback.
//!
//! A composer is cheap to share: wrap it in an `Arc` and call it from as many
//! tasks as needed. Requests do not share mutable state.

use crate::config::AppealConfig;
use crate::error::AppealError;
use crate::model::{AppealDocument, AppealOptions, FineRecord, UploadedFile};
use crate::pipeline::extract::{ContentExtractor, FileContentExtractor};
use crate::pipeline::llm::{InferenceGateway, LlmGateway};
use crate::pipeline::parse;
use crate::pipeline::validate::FileValidator;
use crate::progress::Stage;
use crate::prompts;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Runs the fine → appeal pipeline.
pub struct AppealComposer {
    gateway: Arc<dyn InferenceGateway>,
    extractor: Arc<dyn ContentExtractor>,
    validator: FileValidator,
    config: AppealConfig,
}

impl AppealComposer {
    /// Compose a pipeline around an existing gateway.
    ///
    /// The content extractor and the validator are derived from `config`.
    pub fn new(gateway: Arc<dyn InferenceGateway>, config: AppealConfig) -> Self {
        Self {
            gateway,
            extractor: Arc::new(FileContentExtractor::from_config(&config)),
            validator: FileValidator::new(config.max_upload_bytes),
            config,
        }
    }

    /// Compose a pipeline backed by the configured LLM provider.
    ///
    /// Fails with a configuration error when no provider can be resolved.
    pub fn from_config(config: AppealConfig) -> Result<Self, AppealError> {
        let gateway = LlmGateway::from_config(&config)?;
        Ok(Self::new(Arc::new(gateway), config))
    }

    /// Replace the content extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn ContentExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &AppealConfig {
        &self.config
    }

    /// Turn an uploaded fine document into structured fine data.
    pub async fn analyze_fine(&self, file: UploadedFile) -> Result<FineRecord, AppealError> {
        let total_start = Instant::now();
        let deadline = self.deadline();
        info!(
            "Analyzing fine: {} ({}, {} bytes)",
            file.file_name.as_deref().unwrap_or("<upload>"),
            file.mime_type,
            file.bytes.len()
        );

        // ── Step 1: Validate ─────────────────────────────────────────────
        let started = self.stage_start(Stage::Validate);
        let kind = self.stage_end(Stage::Validate, started, self.validator.validate(&file))?;

        // ── Step 2: Extract content ──────────────────────────────────────
        // PDF parsing and image transcoding are CPU-bound.
        let started = self.stage_start(Stage::Extract);
        let extractor = Arc::clone(&self.extractor);
        let result = self
            .before_deadline(deadline, async move {
                tokio::task::spawn_blocking(move || extractor.extract(&file, kind))
                    .await
                    .map_err(|e| AppealError::ExtractionFailed {
                        detail: format!("extraction task failed: {e}"),
                    })?
            })
            .await;
        let content = self.stage_end(Stage::Extract, started, result)?;

        // ── Step 3: Infer ────────────────────────────────────────────────
        let started = self.stage_start(Stage::Infer);
        let prompt = prompts::build_extraction_prompt(&content);
        let result = self
            .before_deadline(deadline, self.gateway.extract_structured(&prompt))
            .await;
        let raw = self.stage_end(Stage::Infer, started, result)?;
        debug!("Extraction answer: {} chars", raw.len());

        // ── Step 4: Parse ────────────────────────────────────────────────
        let started = self.stage_start(Stage::Parse);
        let record = self.stage_end(Stage::Parse, started, parse::parse_fine_record(&raw))?;

        info!(
            "Fine analyzed in {}ms (reference '{}')",
            total_start.elapsed().as_millis(),
            record.reference_number
        );
        Ok(record)
    }

    /// Write an appeal letter for a fine.
    pub async fn generate_appeal(
        &self,
        fine: &FineRecord,
        options: &AppealOptions,
    ) -> Result<AppealDocument, AppealError> {
        let total_start = Instant::now();
        let deadline = self.deadline();
        info!(
            "Generating {} appeal for '{}'",
            options.appeal_type, fine.reference_number
        );

        // ── Step 1: Validate ─────────────────────────────────────────────
        let started = self.stage_start(Stage::Validate);
        let result = if fine.is_blank() {
            Err(AppealError::MissingField(
                "fineData needs at least one of referenceNumber, date, amount, location, reason, vehicle"
                    .into(),
            ))
        } else {
            Ok(())
        };
        self.stage_end(Stage::Validate, started, result)?;

        // ── Step 2: Infer ────────────────────────────────────────────────
        let started = self.stage_start(Stage::Infer);
        let prompt = prompts::build_appeal_prompt(fine, options);
        let result = self
            .before_deadline(deadline, self.gateway.generate_text(&prompt))
            .await;
        let raw = self.stage_end(Stage::Infer, started, result)?;

        // ── Step 3: Clean up ─────────────────────────────────────────────
        let started = self.stage_start(Stage::Parse);
        let text = self.stage_end(Stage::Parse, started, parse::parse_appeal_text(&raw))?;

        info!(
            "Appeal generated in {}ms ({} chars)",
            total_start.elapsed().as_millis(),
            text.len()
        );
        Ok(AppealDocument::new(text, fine, options.appeal_type))
    }

    fn deadline(&self) -> tokio::time::Instant {
        tokio::time::Instant::now() + Duration::from_secs(self.config.timeout_secs)
    }

    /// Run `fut` against the invocation deadline.
    async fn before_deadline<T, F>(
        &self,
        deadline: tokio::time::Instant,
        fut: F,
    ) -> Result<T, AppealError>
    where
        F: Future<Output = Result<T, AppealError>>,
    {
        tokio::time::timeout_at(deadline, fut)
            .await
            .map_err(|_| AppealError::Timeout {
                secs: self.config.timeout_secs,
            })?
    }

    fn stage_start(&self, stage: Stage) -> Instant {
        debug!("Stage {} started", stage);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage_start(stage);
        }
        Instant::now()
    }

    fn stage_end<T>(
        &self,
        stage: Stage,
        started: Instant,
        result: Result<T, AppealError>,
    ) -> Result<T, AppealError> {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => {
                debug!("Stage {} finished in {}ms", stage, elapsed_ms);
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_stage_complete(stage, elapsed_ms);
                }
            }
            Err(e) => {
                warn!("Stage {} failed after {}ms: {}", stage, elapsed_ms, e);
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_stage_error(stage, &e.to_string());
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{AppealType, ExtractedContent, FileKind};
    use crate::progress::PipelineProgressCallback;
    use crate::prompts::PromptSpec;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const FINE_JSON: &str = r#"{"referenceNumber":"PCN-1","date":"2024-03-02","amount":"70","location":"High St","reason":"Parking","vehicle":"AB12CDE"}"#;

    struct StubGateway {
        structured: String,
        text: String,
        delay: Option<Duration>,
        prompts: Mutex<Vec<String>>,
    }

    impl StubGateway {
        fn new(structured: &str, text: &str) -> Self {
            Self {
                structured: structured.into(),
                text: text.into(),
                delay: None,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl InferenceGateway for StubGateway {
        async fn extract_structured(&self, prompt: &PromptSpec) -> Result<String, AppealError> {
            self.prompts.lock().unwrap().push(prompt.user.clone());
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            Ok(self.structured.clone())
        }

        async fn generate_text(&self, prompt: &PromptSpec) -> Result<String, AppealError> {
            self.prompts.lock().unwrap().push(prompt.user.clone());
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            Ok(self.text.clone())
        }
    }

    #[derive(Default)]
    struct TextExtractor {
        calls: AtomicUsize,
    }

    impl ContentExtractor for TextExtractor {
        fn extract(
            &self,
            _file: &UploadedFile,
            _kind: FileKind,
        ) -> Result<ExtractedContent, AppealError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ExtractedContent::Text("PENALTY CHARGE NOTICE PCN-1".into()))
        }
    }

    #[derive(Default)]
    struct StageLog {
        events: Mutex<Vec<String>>,
    }

    impl PipelineProgressCallback for StageLog {
        fn on_stage_complete(&self, stage: Stage, _elapsed_ms: u64) {
            self.events.lock().unwrap().push(format!("ok:{stage}"));
        }

        fn on_stage_error(&self, stage: Stage, _error: &str) {
            self.events.lock().unwrap().push(format!("err:{stage}"));
        }
    }

    struct SlowExtractor(Duration);

    impl ContentExtractor for SlowExtractor {
        fn extract(
            &self,
            _file: &UploadedFile,
            _kind: FileKind,
        ) -> Result<ExtractedContent, AppealError> {
            std::thread::sleep(self.0);
            Ok(ExtractedContent::Text("PENALTY CHARGE NOTICE PCN-1".into()))
        }
    }

    fn pdf_upload() -> UploadedFile {
        UploadedFile::new(b"%PDF-1.4 stub".to_vec(), "application/pdf")
    }

    #[tokio::test]
    async fn analyze_runs_every_stage() {
        let log = Arc::new(StageLog::default());
        let config = AppealConfig::builder()
            .progress_callback(log.clone())
            .build()
            .unwrap();
        let gateway = Arc::new(StubGateway::new(FINE_JSON, ""));
        let extractor = Arc::new(TextExtractor::default());
        let composer =
            AppealComposer::new(gateway.clone(), config).with_extractor(extractor.clone());

        let rec = composer.analyze_fine(pdf_upload()).await.unwrap();
        assert_eq!(rec.reference_number, "PCN-1");
        assert_eq!(rec.additional_info, "");
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
        assert!(gateway.prompts.lock().unwrap()[0].contains("PCN-1"));
        assert_eq!(
            *log.events.lock().unwrap(),
            vec!["ok:validate", "ok:extract", "ok:infer", "ok:parse"]
        );
    }

    #[tokio::test]
    async fn rejected_upload_stops_before_extraction() {
        let gateway = Arc::new(StubGateway::new(FINE_JSON, ""));
        let extractor = Arc::new(TextExtractor::default());
        let composer = AppealComposer::new(gateway.clone(), AppealConfig::default())
            .with_extractor(extractor.clone());

        let file = UploadedFile::new(b"GIF89a".to_vec(), "image/gif");
        let err = composer.analyze_fine(file).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
        assert!(gateway.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn prose_answer_is_a_parse_error() {
        let log = Arc::new(StageLog::default());
        let config = AppealConfig::builder()
            .progress_callback(log.clone())
            .build()
            .unwrap();
        let gateway = Arc::new(StubGateway::new("Sorry, I can't help", ""));
        let composer = AppealComposer::new(gateway, config)
            .with_extractor(Arc::new(TextExtractor::default()));

        let err = composer.analyze_fine(pdf_upload()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert_eq!(log.events.lock().unwrap().last().unwrap(), "err:parse");
    }

    #[tokio::test]
    async fn slow_inference_times_out() {
        let config = AppealConfig::builder().timeout_secs(1).build().unwrap();
        let mut stub = StubGateway::new(FINE_JSON, "Dear Sir");
        stub.delay = Some(Duration::from_secs(5));
        let composer = AppealComposer::new(Arc::new(stub), config);

        let fine: FineRecord = serde_json::from_str(FINE_JSON).unwrap();
        let err = composer
            .generate_appeal(&fine, &AppealOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppealError::Timeout { secs: 1 }));
        assert_eq!(err.kind(), ErrorKind::Inference);
    }

    #[tokio::test]
    async fn limit_covers_extraction_and_inference_together() {
        let log = Arc::new(StageLog::default());
        let config = AppealConfig::builder()
            .timeout_secs(1)
            .progress_callback(log.clone())
            .build()
            .unwrap();
        let mut stub = StubGateway::new(FINE_JSON, "");
        stub.delay = Some(Duration::from_millis(700));
        let composer = AppealComposer::new(Arc::new(stub), config)
            .with_extractor(Arc::new(SlowExtractor(Duration::from_millis(700))));

        // Each stage alone fits in the limit; together they do not.
        let err = composer.analyze_fine(pdf_upload()).await.unwrap_err();
        assert!(matches!(err, AppealError::Timeout { secs: 1 }), "got {err:?}");
        assert_eq!(
            *log.events.lock().unwrap(),
            vec!["ok:validate", "ok:extract", "err:infer"]
        );
    }

    #[tokio::test]
    async fn generate_returns_cleaned_text_with_reference() {
        let gateway = Arc::new(StubGateway::new("", "Dear Sir,\n\n\n\nI **dispute** this.  \n"));
        let composer = AppealComposer::new(gateway.clone(), AppealConfig::default());
        let fine: FineRecord = serde_json::from_str(FINE_JSON).unwrap();
        let options = AppealOptions {
            appeal_type: AppealType::Factual,
            ..Default::default()
        };

        let doc = composer.generate_appeal(&fine, &options).await.unwrap();
        assert_eq!(doc.appeal_text, "Dear Sir,\n\nI **dispute** this.");
        assert_eq!(doc.reference_number, "PCN-1");
        assert_eq!(doc.appeal_type, AppealType::Factual);
        assert!(gateway.prompts.lock().unwrap()[0].contains("Reference number: PCN-1"));
    }

    #[tokio::test]
    async fn blank_fine_is_rejected_without_inference() {
        let gateway = Arc::new(StubGateway::new("", "text"));
        let composer = AppealComposer::new(gateway.clone(), AppealConfig::default());
        let err = composer
            .generate_appeal(&FineRecord::default(), &AppealOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(gateway.prompts.lock().unwrap().is_empty());
    }
}
