//! The processing pipeline.
//!
//! [`Pipeline`] is the single owner of all state: the source image, the
//! current filter, the slider values and the cached output. Every mutation
//! goes through its methods and each of them runs to completion before the
//! next one starts.
//!
//! Rendering is split into [`Pipeline::prepare_render`], which stamps a
//! [`RenderJob`] with a fresh generation, and [`Pipeline::commit_render`],
//! which installs the result only if no newer job was prepared meanwhile.
//! The synchronous [`Pipeline::recompute`] runs both back to back; the
//! [`PipelineWorker`] runs the job on a background thread in between.

pub mod decode;
pub mod observer;
pub mod worker;

pub use decode::{FormatDecoder, ImageDecoder};
pub use observer::{ObserverCallback, Observers, PipelineEvent};
pub use worker::PipelineWorker;

use crate::core::error::{DecodeError, EngineFailure, RangeError, ShareError};
use crate::core::types::{BoundParameters, FilterKind, OutputImage, ParameterName, ParameterSet, SourceImage};
use crate::filters::{BuiltinEngine, FilterDescriptor, FilterEngine, FilterRegistry};
use crate::review::{CounterStore, MemoryStore, ReviewThrottle, DEFAULT_REVIEW_THRESHOLD};
use crate::share::{self, ShareFormat, SharedAsset};
use image::DynamicImage;
use log::{debug, info, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// One full reprocessing of the source with the current filter.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Generation stamped when the job was prepared.
    pub generation: u64,
    /// Filter to apply.
    pub kind: FilterKind,
    /// Image to filter.
    pub source: SourceImage,
    /// Parameters the filter accepts.
    pub parameters: BoundParameters,
}

impl RenderJob {
    /// Run the job on an engine.
    ///
    /// A panicking engine is reported as [`EngineFailure::Internal`].
    pub fn run(&self, engine: &dyn FilterEngine) -> RenderOutcome {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            engine.process(self.kind, &self.source, &self.parameters)
        }))
        .unwrap_or_else(|payload| {
            Err(EngineFailure::Internal(format!(
                "filter engine panicked: {}",
                panic_message(&*payload)
            )))
        });
        RenderOutcome {
            generation: self.generation,
            kind: self.kind,
            result,
        }
    }
}

/// What a [`RenderJob`] produced.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    /// Generation of the job that produced this.
    pub generation: u64,
    /// Filter that was applied.
    pub kind: FilterKind,
    /// The rendered image or the engine's failure.
    pub result: Result<DynamicImage, EngineFailure>,
}

/// Observable pipeline state at one point in time.
#[derive(Debug, Clone)]
pub struct PipelineSnapshot {
    /// Current filter.
    pub filter: FilterKind,
    /// Current slider values.
    pub parameters: ParameterSet,
    /// Current output, if any.
    pub output: Option<OutputImage>,
    /// Dimensions of the current source, if one is loaded.
    pub source_dimensions: Option<(u32, u32)>,
    /// Review counter value.
    pub review_count: u32,
    /// Latest prepared render generation.
    pub generation: u64,
    /// Failure of the last render, if it failed.
    pub last_failure: Option<EngineFailure>,
}

/// Single owner of the filter state.
pub struct Pipeline {
    registry: FilterRegistry,
    engine: Arc<dyn FilterEngine>,
    decoder: Arc<dyn ImageDecoder>,
    throttle: ReviewThrottle,
    observers: Observers,
    source: Option<SourceImage>,
    filter: FilterKind,
    parameters: ParameterSet,
    output: Option<OutputImage>,
    last_failure: Option<EngineFailure>,
    generation: u64,
}

impl Pipeline {
    /// Pipeline with the built-in engine, an in-memory review counter and
    /// default slider values.
    pub fn new() -> Self {
        PipelineBuilder::new().build()
    }

    /// Start configuring a pipeline.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Decode picker bytes, install them as the source and recompute.
    ///
    /// On a decode failure the previous source and output are kept.
    pub fn load_source(&mut self, bytes: &[u8]) -> Result<(), DecodeError> {
        match decode::decode_guarded(self.decoder.as_ref(), bytes) {
            Ok(source) => {
                self.install_source(source);
                self.recompute();
                Ok(())
            }
            Err(error) => {
                self.report_decode_failure(&error);
                Err(error)
            }
        }
    }

    /// Replace the current filter, count the change and recompute.
    ///
    /// Slider values are kept even if the new filter ignores some of them.
    pub fn set_filter_kind(&mut self, kind: FilterKind) {
        self.select_filter(kind);
        self.recompute();
    }

    /// Update one slider and recompute.
    ///
    /// A value outside the slider's range is rejected and nothing changes.
    pub fn set_parameter(&mut self, name: ParameterName, value: f64) -> Result<(), RangeError> {
        self.assign_parameter(name, value)?;
        self.recompute();
        Ok(())
    }

    /// Reprocess the source with the current filter and parameters.
    ///
    /// Without a source this is a no-op. Returns the new output, which is
    /// `None` if the engine failed.
    pub fn recompute(&mut self) -> Option<&OutputImage> {
        let job = self.prepare_render()?;
        let outcome = job.run(self.engine.as_ref());
        self.commit_render(outcome);
        self.output.as_ref()
    }

    // ========================================================================
    // Staged mutation, shared with the worker
    // ========================================================================

    /// Install a decoded source without rendering.
    pub(crate) fn install_source(&mut self, source: SourceImage) {
        info!("Loaded source image {}x{}", source.width(), source.height());
        self.observers.notify(PipelineEvent::SourceLoaded {
            width: source.width(),
            height: source.height(),
        });
        self.source = Some(source);
    }

    /// Surface a decode failure without touching state.
    pub(crate) fn report_decode_failure(&self, error: &DecodeError) {
        warn!("Failed to decode picked image: {}", error);
        self.observers.notify(PipelineEvent::DecodeFailed {
            error: error.clone(),
        });
    }

    /// Replace the filter and count the change, without rendering.
    pub(crate) fn select_filter(&mut self, kind: FilterKind) {
        debug!("Filter changed {} -> {}", self.filter, kind);
        self.filter = kind;
        self.observers.notify(PipelineEvent::FilterChanged { kind });

        if self.throttle.on_filter_changed().is_some() {
            info!("Requesting app review");
            self.observers.notify(PipelineEvent::ReviewRequested);
        }
    }

    /// Validate and store a slider value, without rendering.
    pub(crate) fn assign_parameter(&mut self, name: ParameterName, value: f64) -> Result<(), RangeError> {
        self.parameters.set(name, value)?;
        self.observers.notify(PipelineEvent::ParameterChanged { name, value });
        Ok(())
    }

    /// Stamp a render of the current state with a new generation.
    ///
    /// Any job prepared earlier becomes stale. Returns `None` if there is no
    /// source yet.
    pub fn prepare_render(&mut self) -> Option<RenderJob> {
        let source = self.source.clone()?;
        self.generation += 1;

        Some(RenderJob {
            generation: self.generation,
            kind: self.filter,
            source,
            parameters: self.registry.bind(self.filter, &self.parameters),
        })
    }

    /// Install a render outcome if it is still the latest.
    ///
    /// Returns `false` when the outcome was stale and dropped.
    pub fn commit_render(&mut self, outcome: RenderOutcome) -> bool {
        if outcome.generation != self.generation {
            debug!(
                "Dropping stale render {} (latest is {})",
                outcome.generation, self.generation
            );
            return false;
        }

        match outcome.result {
            Ok(image) => {
                debug!("Render {} ({}) complete", outcome.generation, outcome.kind);
                self.output = Some(OutputImage::new(image, outcome.kind, outcome.generation));
                self.last_failure = None;
                self.observers.notify(PipelineEvent::OutputUpdated {
                    generation: outcome.generation,
                });
            }
            Err(failure) => {
                warn!("Render {} ({}) failed: {}", outcome.generation, outcome.kind, failure);
                self.output = None;
                self.last_failure = Some(failure.clone());
                self.observers.notify(PipelineEvent::OutputCleared {
                    generation: outcome.generation,
                    failure,
                });
            }
        }
        true
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Subscribe to pipeline events.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&PipelineEvent) + Send + Sync + 'static,
    {
        self.observers.subscribe(callback);
    }

    /// Shared subscriber list.
    pub fn observers(&self) -> &Observers {
        &self.observers
    }

    /// Current output image.
    pub fn output(&self) -> Option<&OutputImage> {
        self.output.as_ref()
    }

    /// Current source image.
    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    /// Current filter.
    pub fn filter_kind(&self) -> FilterKind {
        self.filter
    }

    /// Current slider values.
    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    /// Descriptor for the current filter: which sliders apply to it.
    pub fn active_filter(&self) -> Option<&FilterDescriptor> {
        self.registry.descriptor(self.filter)
    }

    /// Sliders the current filter accepts.
    pub fn active_parameters(&self) -> Vec<ParameterName> {
        self.registry.parameters_accepted(self.filter)
    }

    /// Whether the sliders and filter button should be enabled.
    ///
    /// They stay disabled until there is something to preview.
    pub fn controls_enabled(&self) -> bool {
        self.output.is_some()
    }

    /// The filter registry.
    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    /// Failure of the last render, if it failed.
    pub fn last_failure(&self) -> Option<&EngineFailure> {
        self.last_failure.as_ref()
    }

    /// Review counter value.
    pub fn review_count(&self) -> u32 {
        self.throttle.count()
    }

    /// Latest prepared render generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Shared handle to the engine.
    pub fn engine(&self) -> Arc<dyn FilterEngine> {
        Arc::clone(&self.engine)
    }

    /// Shared handle to the decoder.
    pub fn decoder(&self) -> Arc<dyn ImageDecoder> {
        Arc::clone(&self.decoder)
    }

    /// Capture the observable state.
    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            filter: self.filter,
            parameters: self.parameters,
            output: self.output.clone(),
            source_dimensions: self.source.as_ref().map(|s| (s.width(), s.height())),
            review_count: self.throttle.count(),
            generation: self.generation,
            last_failure: self.last_failure.clone(),
        }
    }

    /// Serialize the current output for the share sheet.
    pub fn export(&self, format: ShareFormat) -> Result<SharedAsset, ShareError> {
        let output = self.output.as_ref().ok_or(ShareError::NoOutput)?;
        share::export(output, format)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("filter", &self.filter)
            .field("parameters", &self.parameters)
            .field("has_source", &self.source.is_some())
            .field("has_output", &self.output.is_some())
            .field("generation", &self.generation)
            .field("throttle", &self.throttle)
            .finish()
    }
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    engine: Option<Arc<dyn FilterEngine>>,
    decoder: Option<Arc<dyn ImageDecoder>>,
    store: Option<Box<dyn CounterStore>>,
    review_threshold: u32,
    filter: FilterKind,
    parameters: ParameterSet,
}

impl PipelineBuilder {
    /// Create a builder with defaults.
    pub fn new() -> Self {
        Self {
            engine: None,
            decoder: None,
            store: None,
            review_threshold: DEFAULT_REVIEW_THRESHOLD,
            filter: FilterKind::default(),
            parameters: ParameterSet::default(),
        }
    }

    /// Use a specific filter engine.
    pub fn with_engine<E: FilterEngine + 'static>(mut self, engine: E) -> Self {
        self.engine = Some(Arc::new(engine));
        self
    }

    /// Use a specific image decoder.
    pub fn with_decoder<D: ImageDecoder + 'static>(mut self, decoder: D) -> Self {
        self.decoder = Some(Arc::new(decoder));
        self
    }

    /// Persist the review counter in `store`.
    pub fn with_counter_store<S: CounterStore + 'static>(mut self, store: S) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Set the number of filter changes between review prompts.
    pub fn with_review_threshold(mut self, threshold: u32) -> Self {
        self.review_threshold = threshold;
        self
    }

    /// Set the initial filter.
    pub fn with_filter(mut self, kind: FilterKind) -> Self {
        self.filter = kind;
        self
    }

    /// Set the initial slider values.
    ///
    /// Fails if any value is out of range.
    pub fn with_parameters(mut self, parameters: ParameterSet) -> Result<Self, RangeError> {
        parameters.validate()?;
        self.parameters = parameters;
        Ok(self)
    }

    /// Build the pipeline.
    pub fn build(self) -> Pipeline {
        let store = self.store.unwrap_or_else(|| Box::new(MemoryStore::new()));

        Pipeline {
            registry: FilterRegistry::new(),
            engine: self.engine.unwrap_or_else(|| Arc::new(BuiltinEngine::new())),
            decoder: self.decoder.unwrap_or_else(|| Arc::new(FormatDecoder)),
            throttle: ReviewThrottle::new(store, self.review_threshold),
            observers: Observers::new(),
            source: None,
            filter: self.filter,
            parameters: self.parameters,
            output: None,
            last_failure: None,
            generation: 0,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::review::FILTER_COUNT_KEY;

    #[test]
    fn test_defaults() {
        let pipeline = Pipeline::new();
        assert_eq!(pipeline.filter_kind(), FilterKind::SepiaTone);
        assert_eq!(*pipeline.parameters(), ParameterSet::default());
        assert!(pipeline.output().is_none());
        assert!(!pipeline.controls_enabled());
        assert_eq!(pipeline.review_count(), 0);
    }

    #[test]
    fn test_recompute_without_source_is_noop() {
        let mut pipeline = Pipeline::new();
        assert!(pipeline.recompute().is_none());
        assert_eq!(pipeline.generation(), 0);
        assert!(pipeline.output().is_none());
    }

    #[test]
    fn test_load_then_switch_to_pixellate() {
        let engine = RecordingEngine::default();
        let mut pipeline = Pipeline::builder().with_engine(engine.clone()).build();

        pipeline.load_source(&png(16, 12, [100, 50, 25, 255])).unwrap();
        assert!(pipeline.output().is_some());
        assert!(pipeline.controls_enabled());
        assert_eq!(pipeline.filter_kind(), FilterKind::SepiaTone);
        assert_eq!(pipeline.parameters().intensity, 0.5);

        pipeline.set_filter_kind(FilterKind::Pixellate);
        assert_eq!(pipeline.review_count(), 1);
        assert_eq!(pipeline.output().unwrap().kind(), FilterKind::Pixellate);
        assert_eq!(pipeline.parameters().intensity, 0.5);

        let calls = engine.calls.lock();
        assert_eq!(calls.len(), 2);
        let (kind, bound) = &calls[1];
        assert_eq!(*kind, FilterKind::Pixellate);
        assert_eq!(bound.names().collect::<Vec<_>>(), vec![ParameterName::Scale]);
        assert_eq!(bound.get(ParameterName::Scale), Some(5.0));
    }

    #[test]
    fn test_recompute_is_deterministic() {
        let mut pipeline = Pipeline::new();
        pipeline.load_source(&png(20, 20, [10, 200, 90, 255])).unwrap();
        pipeline.set_filter_kind(FilterKind::Crystallize);
        pipeline.set_parameter(ParameterName::Radius, 4.0).unwrap();

        let first = pipeline.recompute().cloned().unwrap();
        let second = pipeline.recompute().cloned().unwrap();
        assert_eq!(first, second);
        assert!(second.generation() > first.generation());
    }

    #[test]
    fn test_out_of_range_parameter_leaves_state() {
        let mut pipeline = Pipeline::new();
        pipeline.load_source(&png(8, 8, [1, 2, 3, 255])).unwrap();
        let before = pipeline.snapshot();

        let err = pipeline.set_parameter(ParameterName::Radius, 250.0).unwrap_err();
        assert_eq!(err.name, ParameterName::Radius);
        assert_eq!(err.max, 200.0);

        let after = pipeline.snapshot();
        assert_eq!(after.parameters, before.parameters);
        assert_eq!(after.generation, before.generation);
        assert_eq!(after.output, before.output);
        assert_eq!(
            after.output.unwrap().generation(),
            before.output.unwrap().generation()
        );
    }

    #[test]
    fn test_malformed_bytes_keep_previous_output() {
        let mut pipeline = Pipeline::new();
        let events = record_events(pipeline.observers());
        pipeline.load_source(&png(8, 8, [40, 40, 40, 255])).unwrap();
        let before = pipeline.output().cloned();

        let err = pipeline.load_source(b"\x89PNG but not really").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_) | DecodeError::Unsupported(_) | DecodeError::UnknownFormat));
        assert_eq!(pipeline.output().cloned(), before);
        assert_eq!(pipeline.source().unwrap().width(), 8);
        assert!(events
            .lock()
            .iter()
            .any(|e| matches!(e, PipelineEvent::DecodeFailed { .. })));
    }

    #[test]
    fn test_parameter_change_rerenders_only_when_relevant_values_bound() {
        let engine = RecordingEngine::default();
        let mut pipeline = Pipeline::builder().with_engine(engine.clone()).build();
        pipeline.load_source(&png(8, 8, [1, 2, 3, 255])).unwrap();

        pipeline.set_parameter(ParameterName::Angle, 0.9).unwrap();
        let calls = engine.calls.lock();
        let (_, bound) = calls.last().unwrap();
        // Sepia ignores Angle, but the value is still stored
        assert!(!bound.contains(ParameterName::Angle));
        assert_eq!(pipeline.parameters().angle, 0.9);
    }

    #[test]
    fn test_engine_failure_clears_output() {
        let mut pipeline = Pipeline::builder()
            .with_engine(BuiltinEngine::new().with_max_extent(10))
            .build();
        let events = record_events(pipeline.observers());

        pipeline.load_source(&png(8, 8, [1, 2, 3, 255])).unwrap();
        assert!(pipeline.output().is_some());

        pipeline.load_source(&png(12, 8, [1, 2, 3, 255])).unwrap();
        assert!(pipeline.output().is_none());
        assert!(matches!(
            pipeline.last_failure(),
            Some(EngineFailure::UnsupportedExtent { .. })
        ));
        assert!(events
            .lock()
            .iter()
            .any(|e| matches!(e, PipelineEvent::OutputCleared { .. })));

        // Next successful state change recovers
        pipeline.load_source(&png(4, 4, [1, 2, 3, 255])).unwrap();
        assert!(pipeline.output().is_some());
        assert!(pipeline.last_failure().is_none());
    }

    #[test]
    fn test_five_filter_changes_request_one_review() {
        let store = MemoryStore::new();
        let mut pipeline = Pipeline::builder()
            .with_counter_store(store.clone())
            .build();
        let events = record_events(pipeline.observers());

        for _ in 0..4 {
            pipeline.set_filter_kind(FilterKind::SepiaTone);
        }
        assert_eq!(pipeline.review_count(), 4);
        assert!(!events.lock().contains(&PipelineEvent::ReviewRequested));

        pipeline.set_filter_kind(FilterKind::Vignette);
        assert_eq!(pipeline.review_count(), 0);
        assert_eq!(store.get(FILTER_COUNT_KEY), Some(0));
        let requests = events
            .lock()
            .iter()
            .filter(|e| **e == PipelineEvent::ReviewRequested)
            .count();
        assert_eq!(requests, 1);
    }

    #[test]
    fn test_stale_commit_is_dropped() {
        let mut pipeline = Pipeline::new();
        pipeline.load_source(&png(8, 8, [1, 2, 3, 255])).unwrap();

        let old = pipeline.prepare_render().unwrap();
        pipeline.assign_parameter(ParameterName::Intensity, 1.0).unwrap();
        let new = pipeline.prepare_render().unwrap();

        let engine = BuiltinEngine::new();
        assert!(pipeline.commit_render(new.run(&engine)));
        let committed = pipeline.output().cloned();
        assert!(!pipeline.commit_render(old.run(&engine)));
        assert_eq!(pipeline.output().cloned(), committed);
        assert_eq!(pipeline.output().unwrap().generation(), new.generation);
    }

    #[test]
    fn test_engine_panic_is_reported_as_failure() {
        struct Exploding;

        impl FilterEngine for Exploding {
            fn process(
                &self,
                _kind: FilterKind,
                _image: &SourceImage,
                _parameters: &BoundParameters,
            ) -> Result<DynamicImage, EngineFailure> {
                panic!("boom");
            }
        }

        let mut pipeline = Pipeline::builder().with_engine(Exploding).build();
        pipeline.load_source(&png(4, 4, [1, 2, 3, 255])).unwrap();
        assert!(pipeline.output().is_none());
        assert_eq!(
            pipeline.last_failure(),
            Some(&EngineFailure::Internal("filter engine panicked: boom".to_string()))
        );
    }

    #[test]
    fn test_subnormal_blur_radius_renders() {
        let mut pipeline = Pipeline::new();
        pipeline.load_source(&png(8, 8, [1, 2, 3, 255])).unwrap();
        pipeline.set_filter_kind(FilterKind::GaussianBlur);
        pipeline.set_parameter(ParameterName::Radius, 1e-46).unwrap();

        assert!(pipeline.output().is_some());
        assert!(pipeline.last_failure().is_none());
    }

    #[test]
    fn test_builder_rejects_bad_parameters() {
        let params = ParameterSet {
            scale: 11.0,
            ..ParameterSet::default()
        };
        assert!(Pipeline::builder().with_parameters(params).is_err());
    }

    #[test]
    fn test_active_parameters_follow_filter() {
        let mut pipeline = Pipeline::new();
        assert_eq!(pipeline.active_parameters(), vec![ParameterName::Intensity]);
        pipeline.set_filter_kind(FilterKind::HueAdjust);
        assert_eq!(pipeline.active_parameters(), vec![ParameterName::Angle]);
        assert_eq!(pipeline.active_filter().unwrap().name, "Hue");
    }

    #[test]
    fn test_export_requires_output() {
        let mut pipeline = Pipeline::new();
        assert!(matches!(
            pipeline.export(ShareFormat::Png),
            Err(ShareError::NoOutput)
        ));
        pipeline.load_source(&png(4, 4, [1, 2, 3, 255])).unwrap();
        let asset = pipeline.export(ShareFormat::Png).unwrap();
        assert_eq!(asset.mime_type, "image/png");
    }
}
