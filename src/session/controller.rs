// Session controller - drives the tracker and the render engine
//
// This module contains the Session, which coordinates between:
// - HandTracker (detector initialization, per-frame callback)
// - RenderEngine (lighting, occluders, wearable loads, engine-wide events)
// - SessionStateMachine (lifecycle and the model-load guard)
// - Overlay (host UI toggles)
//
// Everything runs on one logical thread of control: collaborator futures are
// awaited inside the session, and engine events and queued commands are only
// consumed from the session's own select loops. Engine signals raised during
// startup belong to startup assets and are drained before the session goes Idle.

use super::handle::{COMMAND_QUEUE_CAPACITY, SessionCommand, SessionHandle};
use super::overlay::{LogOverlay, Overlay};
use super::SessionError;
use crate::metrics::SessionMetrics;
use crate::models::{Material, SessionState, Settings};
use crate::services::frame_adapter::{AuthoredTransform, FrameAdapter, TransformOp};
use crate::services::occlusion::setup_occlusion;
use crate::services::{
    BoxFuture, CanvasSize, DetectState, DetectionCallback, EngineEvent, HandTracker,
    OutputEncoding, RenderEngine, ToneMapping, TrackerInit,
};
use crate::state::{LoadDecision, SessionStateMachine, StateChange};
use glam::Vec3;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};

/// Result of a model-load request
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The model is attached; carries the transform mutations applied to it
    Attached {
        model: String,
        ops: Vec<TransformOp>,
    },

    /// The guard dropped the request; nothing happened
    Rejected(LoadDecision),
}

/// One step of a select loop
enum Step<T> {
    Done(T),
    Engine(EngineEvent),
    Command(Option<SessionCommand>),
}

/// A single try-on session
///
/// Owns the lifecycle state machine and drives both collaborators through it.
///
/// # Example
/// ```ignore
/// let (session, handle) = Session::new(settings, tracker, engine)?;
/// let task = tokio::spawn(session.run());
///
/// handle.wait_for_state(SessionState::Running).await?;
/// handle.request_model("braceletDemo").await?;
/// handle.shutdown().await?;
/// task.await??;
/// ```
pub struct Session<T: HandTracker, E: RenderEngine> {
    settings: Arc<Settings>,
    tracker: Arc<T>,
    engine: Arc<E>,
    overlay: Arc<dyn Overlay>,
    canvas: CanvasSize,

    machine: SessionStateMachine,
    metrics: Arc<SessionMetrics>,

    commands: mpsc::Receiver<SessionCommand>,
    commands_closed: bool,
    engine_events: Option<broadcast::Receiver<EngineEvent>>,

    loading_hidden: bool,
    shutdown_requested: bool,
}

impl<T: HandTracker, E: RenderEngine> Session<T, E> {
    /// Create a session and its handle
    ///
    /// # Errors
    /// Returns [`SessionError::Settings`] if the settings fail validation.
    pub fn new(
        settings: Settings,
        tracker: Arc<T>,
        engine: Arc<E>,
    ) -> Result<(Self, SessionHandle), SessionError> {
        settings.validate()?;

        let machine = SessionStateMachine::new();
        let (command_tx, commands) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let handle = SessionHandle::new(command_tx, machine.watch(), machine.change_sender());

        let session = Self {
            settings: Arc::new(settings),
            tracker,
            engine,
            overlay: Arc::new(LogOverlay),
            canvas: CanvasSize::default(),
            machine,
            metrics: Arc::new(SessionMetrics::new()),
            commands,
            commands_closed: false,
            engine_events: None,
            loading_hidden: false,
            shutdown_requested: false,
        };

        Ok((session, handle))
    }

    pub fn with_overlay(mut self, overlay: Arc<dyn Overlay>) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn with_canvas(mut self, canvas: CanvasSize) -> Self {
        self.canvas = canvas;
        self
    }

    pub fn state(&self) -> SessionState {
        self.machine.state()
    }

    pub fn attached_model(&self) -> Option<&str> {
        self.machine.attached_model()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.machine.subscribe()
    }

    pub fn metrics(&self) -> Arc<SessionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run startup: tracker, lighting, occlusion. Ends in `Idle`.
    ///
    /// # Errors
    /// - [`SessionError::TrackerInit`] if the detector fails to start
    /// - [`SessionError::OcclusionSetup`] if a rigid occluder fails to load
    ///
    /// Both abort startup and return the session to `NotLoaded`.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        let settings = Arc::clone(&self.settings);
        let mode = settings.initial_mode()?;

        self.machine.begin_start()?;
        if settings.debug.any() {
            tracing::warn!("Debug diagnostics enabled: {:?}", settings.debug);
        }

        let params = TrackerInit::from_mode(mode, &settings, self.canvas, self.detection_callback());
        if let Err(err) = self.tracker.init(params).await {
            tracing::error!("Tracker initialization failed: {}", err);
            self.machine.abort_start();
            return Err(SessionError::TrackerInit(err));
        }
        self.machine.tracker_ready()?;

        self.engine_events = Some(self.engine.subscribe_events());
        self.setup_lighting().await;

        match setup_occlusion(self.engine.as_ref(), &mode.occluder, settings.debug.occluder).await
        {
            Ok(outcome) => tracing::debug!("Occlusion ready: {:?}", outcome),
            Err(err) => {
                tracing::error!("Occluder setup failed: {}", err);
                self.machine.abort_start();
                return Err(SessionError::OcclusionSetup(err));
            }
        }

        self.drain_startup_events();
        self.machine.occlusion_resolved()?;
        Ok(())
    }

    /// Load a wearable and attach it
    ///
    /// The request goes through the load guard first: outside `Idle`/`Running`,
    /// while another load is pending, or for the model already attached it is
    /// dropped with no side effect and [`LoadOutcome::Rejected`] is returned.
    ///
    /// While the asset is in flight, engine events keep being applied and queued
    /// commands keep being drained (and dropped by the guard).
    ///
    /// # Errors
    /// - [`SessionError::UnknownModel`] if the guard lets the request through
    ///   but `model_id` is not configured
    /// - [`SessionError::ModelLoad`] if the fetch fails; the session is left
    ///   `Idle` with no wearable attached
    pub async fn load_model(&mut self, model_id: &str) -> Result<LoadOutcome, SessionError> {
        let decision = self.machine.check_model_load(model_id);
        if !decision.is_accepted() {
            tracing::debug!("Load of {} dropped: {:?}", model_id, decision);
            self.metrics.record_load_rejected();
            return Ok(LoadOutcome::Rejected(decision));
        }

        let settings = Arc::clone(&self.settings);
        let Some(model) = settings.model(model_id) else {
            return Err(SessionError::UnknownModel(model_id.to_string()));
        };
        self.machine.request_model_load(model_id);

        let started = Instant::now();
        tracing::info!("Loading model {} from {}", model_id, model.url);

        // Previous wearable goes, occluders stay
        self.engine.clear_wearables();

        let fetch = self.engine.load_asset(&model.url);
        let mut node = match self.drive(fetch).await {
            Ok(node) => node,
            Err(err) => {
                tracing::error!("Failed to load model {}: {}", model_id, err);
                self.metrics.record_load_failure();
                self.machine.model_load_failed(model_id);
                return Err(SessionError::ModelLoad {
                    model: model_id.to_string(),
                    source: err,
                });
            }
        };

        // Wearables are normalized to unit scale before adaptation
        node.transform.scale = Vec3::ONE;
        if settings.debug.mesh_material {
            node.material = Material::Normal;
        }
        let ops = FrameAdapter::apply(&AuthoredTransform::from(model), &mut node.transform);

        self.engine.attach_wearable(node);
        self.machine.model_attached(model_id)?;
        self.metrics.record_model_loaded(started.elapsed());

        Ok(LoadOutcome::Attached {
            model: model_id.to_string(),
            ops,
        })
    }

    /// Apply an engine-wide event
    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::AllAssetsLoaded => {
                tracing::info!("All engine assets are loaded");
                self.hide_loading();
                self.machine.all_assets_loaded();
            }
        }
    }

    /// Consume engine signals raised while still `Loading`
    ///
    /// They come from startup assets (rigid occluder, environment). No wearable
    /// is attached yet, so they only hide the loading overlay and never set
    /// `Running`.
    fn drain_startup_events(&mut self) {
        let Some(events) = self.engine_events.as_mut() else {
            return;
        };

        let mut drained = 0u64;
        loop {
            match events.try_recv() {
                Ok(EngineEvent::AllAssetsLoaded) => drained += 1,
                Err(TryRecvError::Lagged(skipped)) => drained += skipped,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        if drained > 0 {
            tracing::debug!("Startup assets loaded ({} engine signals)", drained);
            self.hide_loading();
        }
    }

    fn hide_loading(&mut self) {
        if !self.loading_hidden {
            self.overlay.hide_loading();
            self.loading_hidden = true;
        }
    }

    /// Run the whole session until shutdown
    ///
    /// Starts the session if needed, loads the initial model, then serves
    /// queued commands and engine events. Wearable load failures are logged
    /// and the loop keeps serving; startup failures end the session.
    pub async fn run(mut self) -> Result<(), SessionError> {
        if !self.machine.state().is_started() {
            self.start().await?;
        }

        let initial_model = self.settings.initial_model.clone();
        self.serve_load(&initial_model).await?;

        while !self.shutdown_requested {
            let step = tokio::select! {
                event = next_engine_event(&mut self.engine_events) => Step::<()>::Engine(event),
                command = self.commands.recv(), if !self.commands_closed => Step::Command(command),
            };

            match step {
                Step::Engine(event) => self.handle_engine_event(event),
                Step::Command(Some(SessionCommand::LoadModel(model_id))) => {
                    self.serve_load(&model_id).await?
                }
                Step::Command(Some(SessionCommand::Shutdown)) | Step::Command(None) => {
                    tracing::info!("Session shutting down");
                    self.shutdown_requested = true;
                }
                Step::Done(()) => {}
            }
        }

        self.metrics.log_summary();
        Ok(())
    }

    /// Load a model from the loop, logging recoverable failures
    async fn serve_load(&mut self, model_id: &str) -> Result<(), SessionError> {
        match self.load_model(model_id).await {
            Ok(LoadOutcome::Attached { model, ops }) => {
                tracing::info!("Model {} attached ({} transform ops)", model, ops.len());
                Ok(())
            }
            Ok(LoadOutcome::Rejected(_)) => Ok(()),
            Err(err @ (SessionError::ModelLoad { .. } | SessionError::UnknownModel(_))) => {
                tracing::warn!("Model request failed: {}", err);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Await a collaborator future while still serving engine events and commands
    async fn drive<R>(&mut self, mut fut: BoxFuture<'static, R>) -> R {
        loop {
            let step = tokio::select! {
                result = &mut fut => Step::Done(result),
                event = next_engine_event(&mut self.engine_events) => Step::Engine(event),
                command = self.commands.recv(), if !self.commands_closed => Step::Command(command),
            };

            match step {
                Step::Done(result) => return result,
                Step::Engine(event) => self.handle_engine_event(event),
                Step::Command(command) => self.handle_command_in_flight(command),
            }
        }
    }

    /// Commands arriving while a load is in flight
    fn handle_command_in_flight(&mut self, command: Option<SessionCommand>) {
        match command {
            Some(SessionCommand::LoadModel(model_id)) => {
                // Cannot be accepted while a load is pending
                let decision = self.machine.request_model_load(&model_id);
                tracing::info!("Load of {} dropped while busy: {:?}", model_id, decision);
                self.metrics.record_load_rejected();
            }
            Some(SessionCommand::Shutdown) => {
                tracing::info!("Shutdown requested, finishing current load first");
                self.shutdown_requested = true;
            }
            None => {
                tracing::debug!("All session handles dropped");
                self.commands_closed = true;
                self.shutdown_requested = true;
            }
        }
    }

    async fn setup_lighting(&self) {
        self.engine
            .configure_output(ToneMapping::AcesFilmic, OutputEncoding::Srgb);

        let url = &self.settings.environment_map;
        match self.engine.load_environment(url).await {
            Ok(()) => tracing::info!("Environment map {} installed", url),
            // Lighting is cosmetic, the session goes on without it
            Err(err) => tracing::warn!("Environment map unavailable: {}", err),
        }
    }

    /// Per-frame callback handed to the tracker
    fn detection_callback(&self) -> DetectionCallback {
        let overlay = Arc::clone(&self.overlay);
        let metrics = Arc::clone(&self.metrics);
        let instructions_hidden = Arc::new(AtomicBool::new(false));

        Arc::new(move |detect: &DetectState| {
            metrics.record_frame(detect.is_detected);
            if detect.is_detected && !instructions_hidden.swap(true, Ordering::SeqCst) {
                overlay.hide_instructions();
            }
        })
    }
}

/// Next engine event; pends forever when not subscribed or closed
async fn next_engine_event(events: &mut Option<broadcast::Receiver<EngineEvent>>) -> EngineEvent {
    loop {
        let Some(receiver) = events.as_mut() else {
            return std::future::pending().await;
        };

        match receiver.recv().await {
            Ok(event) => return event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!("Skipped {} engine events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::debug!("Engine event channel closed");
                *events = None;
            }
        }
    }
}
