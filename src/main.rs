//! tryon - headless virtual try-on session
//!
//! Runs one session against the in-memory tracker and render engine:
//!
//! 1. Initialize logging → logs/tryon.<date>
//! 2. Load `tryon.yaml` from the config directory (defaults when missing)
//! 3. Register every configured asset with the headless engine
//! 4. Start the session on a single-threaded runtime, wait for `Running`
//! 5. Print the attached wearable's transform, then shut down
//!
//! # Usage
//!
//! ```text
//! tryon [config_dir]
//! ```
//!
//! `config_dir` defaults to `tryon Data`.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::sync::Arc;
use tryon::logging::{LogOptions, setup_logging};
use tryon::models::{OccluderSettings, SceneNode};
use tryon::services::{DetectState, HeadlessEngine, ScriptedTracker};
use tryon::{APP_NAME, ConfigManager, Session, SessionState, Settings, VERSION};

fn main() -> Result<()> {
    let _guard = setup_logging(&LogOptions::new("logs", "tryon").console(true))?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let config_dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tryon Data".to_string());
    let config_manager = ConfigManager::new(&config_dir)?;
    let settings = config_manager.load_settings()?;

    // Session state is only touched from one logical thread
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(run_headless(settings))?;

    tracing::info!("Application shutdown complete");
    Ok(())
}

async fn run_headless(settings: Settings) -> Result<()> {
    let engine = Arc::new(HeadlessEngine::new());
    register_assets(&engine, &settings);

    let tracker = Arc::new(ScriptedTracker::ready());
    let initial_model = settings.initial_model.clone();

    let (session, handle) = Session::new(settings, Arc::clone(&tracker), Arc::clone(&engine))?;
    let task = tokio::spawn(session.run());

    handle.wait_for_state(SessionState::Running).await?;
    tracker.emit(&DetectState { is_detected: true });

    let scene = engine.scene();
    for node in &scene.wearables {
        println!(
            "{} attached: position={:?} rotation={:?} scale={:?}",
            node.name, node.transform.position, node.transform.rotation, node.transform.scale
        );
    }
    println!(
        "Session {} with model {} ({} occluders, {} soft occluders)",
        handle.state(),
        initial_model,
        scene.occluders.len(),
        scene.soft_occluders.len()
    );

    handle.shutdown().await?;
    task.await.context("Session task panicked")??;
    Ok(())
}

/// Every model and rigid occluder resolves to a node named after its file
fn register_assets(engine: &HeadlessEngine, settings: &Settings) {
    let occluder_urls = settings.modes.values().filter_map(|mode| match &mode.occluder {
        OccluderSettings::Model { url, .. } => Some(url),
        _ => None,
    });
    let model_urls = settings.models.values().map(|model| &model.url);

    for url in model_urls.chain(occluder_urls) {
        let name = Utf8Path::new(url).file_stem().unwrap_or(url);
        engine.register_asset(url.clone(), SceneNode::named(name));
    }
}
