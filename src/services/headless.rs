//! In-memory tracker and render engine.
//!
//! These backends drive a [`Session`](crate::session::Session) without a camera
//! or a GPU: the demo binary runs on them, and so do the integration tests.
//!
//! [`HeadlessEngine`] behaves like a loading-manager based engine: every asset
//! load is counted, and when the last in-flight load succeeds the engine-wide
//! [`EngineEvent::AllAssetsLoaded`] fires *before* the load itself resolves.

use super::BoxFuture;
use super::engine::{AssetError, EngineEvent, OutputEncoding, RenderEngine, ToneMapping};
use super::tracker::{DetectState, HandTracker, TrackerError, TrackerInit};
use crate::models::{SceneNode, SoftOccluder};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, watch};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Snapshot of everything the headless engine was asked to do
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadlessScene {
    pub wearables: Vec<SceneNode>,
    pub occluders: Vec<SceneNode>,
    pub soft_occluders: Vec<SoftOccluder>,
    pub environment: Option<String>,
    pub output: Option<(ToneMapping, OutputEncoding)>,
    /// Asset URLs in request order
    pub load_requests: Vec<String>,
    pub wearable_attach_count: usize,
    pub clear_count: usize,
}

/// Holds a registered asset load until released
pub struct LoadGate {
    tx: watch::Sender<bool>,
}

impl LoadGate {
    pub fn release(self) {
        self.tx.send_replace(true);
    }
}

struct Shared {
    scene: Mutex<HeadlessScene>,
    assets: Mutex<HashMap<String, Result<SceneNode, AssetError>>>,
    failing_environments: Mutex<HashSet<String>>,
    gates: Mutex<HashMap<String, watch::Receiver<bool>>>,
    events_tx: broadcast::Sender<EngineEvent>,
    in_flight: AtomicUsize,
    auto_signal: AtomicBool,
}

/// Render engine keeping its scene in memory
#[derive(Clone)]
pub struct HeadlessEngine {
    shared: Arc<Shared>,
}

impl HeadlessEngine {
    /// Engine that emits `AllAssetsLoaded` automatically
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(16);
        Self {
            shared: Arc::new(Shared {
                scene: Mutex::new(HeadlessScene::default()),
                assets: Mutex::new(HashMap::new()),
                failing_environments: Mutex::new(HashSet::new()),
                gates: Mutex::new(HashMap::new()),
                events_tx,
                in_flight: AtomicUsize::new(0),
                auto_signal: AtomicBool::new(true),
            }),
        }
    }

    /// Engine that only emits `AllAssetsLoaded` through [`emit_all_loaded`](Self::emit_all_loaded)
    pub fn manual_signal() -> Self {
        let engine = Self::new();
        engine.shared.auto_signal.store(false, Ordering::SeqCst);
        engine
    }

    /// Make `url` resolve to `node`
    pub fn register_asset(&self, url: impl Into<String>, node: SceneNode) {
        lock(&self.shared.assets).insert(url.into(), Ok(node));
    }

    /// Make `url` fail with a fetch error
    pub fn register_failure(&self, url: impl Into<String>, reason: impl Into<String>) {
        let url = url.into();
        let err = AssetError::Fetch {
            url: url.clone(),
            reason: reason.into(),
        };
        lock(&self.shared.assets).insert(url, Err(err));
    }

    pub fn fail_environment(&self, url: impl Into<String>) {
        lock(&self.shared.failing_environments).insert(url.into());
    }

    /// Keep loads of `url` in flight until the returned gate is released
    pub fn hold(&self, url: impl Into<String>) -> LoadGate {
        let (tx, rx) = watch::channel(false);
        lock(&self.shared.gates).insert(url.into(), rx);
        LoadGate { tx }
    }

    pub fn emit_all_loaded(&self) {
        // Ignore send errors - it's OK if no one is listening
        let _ = self.shared.events_tx.send(EngineEvent::AllAssetsLoaded);
    }

    pub fn scene(&self) -> HeadlessScene {
        lock(&self.shared.scene).clone()
    }
}

impl Default for HeadlessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderEngine for HeadlessEngine {
    fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.shared.events_tx.subscribe()
    }

    fn configure_output(&self, tone_mapping: ToneMapping, encoding: OutputEncoding) {
        lock(&self.shared.scene).output = Some((tone_mapping, encoding));
    }

    fn load_environment(&self, url: &str) -> BoxFuture<'static, Result<(), AssetError>> {
        let url = url.to_string();
        let shared = Arc::clone(&self.shared);
        Box::pin(async move {
            if lock(&shared.failing_environments).contains(&url) {
                return Err(AssetError::Fetch {
                    url,
                    reason: "environment map unavailable".to_string(),
                });
            }
            lock(&shared.scene).environment = Some(url);
            Ok(())
        })
    }

    fn load_asset(&self, url: &str) -> BoxFuture<'static, Result<SceneNode, AssetError>> {
        let url = url.to_string();
        let shared = Arc::clone(&self.shared);

        lock(&shared.scene).load_requests.push(url.clone());
        shared.in_flight.fetch_add(1, Ordering::SeqCst);
        let gate = lock(&shared.gates).get(&url).cloned();

        Box::pin(async move {
            if let Some(mut gate) = gate {
                // A dropped gate counts as released
                let _ = gate.wait_for(|released| *released).await;
            }

            let result = lock(&shared.assets)
                .get(&url)
                .cloned()
                .unwrap_or_else(|| {
                    Err(AssetError::Fetch {
                        url: url.clone(),
                        reason: "not found".to_string(),
                    })
                });

            let remaining = shared.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
            if remaining == 0 && result.is_ok() && shared.auto_signal.load(Ordering::SeqCst) {
                tracing::debug!("Headless engine: all assets loaded");
                let _ = shared.events_tx.send(EngineEvent::AllAssetsLoaded);
            }

            result
        })
    }

    fn attach_wearable(&self, node: SceneNode) {
        let mut scene = lock(&self.shared.scene);
        scene.wearables.push(node);
        scene.wearable_attach_count += 1;
    }

    fn attach_occluder(&self, node: SceneNode) {
        lock(&self.shared.scene).occluders.push(node);
    }

    fn attach_soft_occluder(&self, occluder: SoftOccluder) {
        lock(&self.shared.scene).soft_occluders.push(occluder);
    }

    fn clear_wearables(&self) {
        let mut scene = lock(&self.shared.scene);
        scene.wearables.clear();
        scene.clear_count += 1;
    }
}

/// Tracker with a predetermined initialization outcome
///
/// After a successful init, [`emit`](Self::emit) replays detection frames
/// through the callback the session supplied.
pub struct ScriptedTracker {
    outcome: Result<(), TrackerError>,
    received: Mutex<Option<TrackerInit>>,
}

impl ScriptedTracker {
    pub fn ready() -> Self {
        Self {
            outcome: Ok(()),
            received: Mutex::new(None),
        }
    }

    pub fn failing(err: TrackerError) -> Self {
        Self {
            outcome: Err(err),
            received: Mutex::new(None),
        }
    }

    /// Parameters of the last init call
    pub fn init_params(&self) -> Option<TrackerInit> {
        lock(&self.received).clone()
    }

    /// Feed one frame to the detection callback; false if never initialized
    pub fn emit(&self, state: &DetectState) -> bool {
        let callback = lock(&self.received)
            .as_ref()
            .map(|params| Arc::clone(&params.on_detect));

        match callback {
            Some(on_detect) => {
                on_detect(state);
                true
            }
            None => false,
        }
    }
}

impl HandTracker for ScriptedTracker {
    fn init(&self, params: TrackerInit) -> BoxFuture<'static, Result<(), TrackerError>> {
        tracing::debug!("Scripted tracker init: {:?}", params);
        *lock(&self.received) = Some(params);
        let outcome = self.outcome.clone();
        Box::pin(async move { outcome })
    }
}
