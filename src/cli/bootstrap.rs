//! CLI bootstrap - wire settings, the backend client and a headless runtime
//! into a navigation controller.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ngw_generation::Client;

use crate::controller::{ControllerConfig, NavigationController};
use crate::runtime::{BrowserRuntime, HeadlessRuntime};
use crate::settings::{
    get_with_env_fallback, SettingsManager, ENV_API_ENDPOINT, ENV_API_KEY, ENV_SITE_ID,
    ENV_VERSION_ID,
};

use super::args::Args;

/// Everything a CLI run needs.
pub struct CliContext {
    pub controller: NavigationController,

    /// The same runtime the controller writes to, kept concrete for
    /// history traversal and event inspection
    pub runtime: Arc<HeadlessRuntime>,

    pub settings_manager: Arc<SettingsManager>,

    pub args: Args,
}

impl CliContext {
    pub async fn shutdown(self) -> Result<()> {
        if let Err(e) = self.runtime.shutdown().await {
            tracing::warn!("Runtime shutdown error: {}", e);
        }
        Ok(())
    }
}

/// Initialize logging, settings and the controller.
pub async fn initialize(args: &Args) -> Result<CliContext> {
    // Install TLS provider (required for rustls 0.23+)
    let _ = rustls::crypto::ring::default_provider().install_default();

    if let Err(e) = dotenvy::dotenv() {
        // A missing .env is fine
        if !matches!(e, dotenvy::Error::Io(_)) {
            tracing::warn!("Failed to load .env file: {}", e);
        }
    }

    let log_level = if args.verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("ngw_lib={}", log_level).parse()?)
                .add_directive(format!("ngw_generation={}", log_level).parse()?),
        )
        .try_init();

    let landing = args.landing.as_deref().context("No landing page given")?;
    let landing_html = tokio::fs::read_to_string(landing)
        .await
        .with_context(|| format!("Failed to read landing page: {}", landing.display()))?;

    let settings_manager = Arc::new(
        SettingsManager::new()
            .await
            .context("Failed to initialize settings manager")?,
    );
    if let Err(e) = settings_manager.ensure_settings_file().await {
        tracing::warn!("Failed to create settings template: {}", e);
    }
    let settings = settings_manager.get().await;

    let site_id = args
        .site_id
        .clone()
        .or_else(|| get_with_env_fallback(&settings.site.site_id, &[ENV_SITE_ID], None))
        .context("No site id: pass --site-id, set NGW_SITE_ID or site.site_id")?;
    let version_id = args
        .version_id
        .clone()
        .or_else(|| get_with_env_fallback(&settings.site.version_id, &[ENV_VERSION_ID], None))
        .context("No version id: pass --version-id, set NGW_VERSION_ID or site.version_id")?;
    let endpoint = args
        .api_endpoint
        .clone()
        .or_else(|| get_with_env_fallback(&settings.api.endpoint, &[ENV_API_ENDPOINT], None))
        .context("No API endpoint: pass --api-endpoint, set NGW_API_ENDPOINT or api.endpoint")?;
    let api_key = args
        .api_key
        .clone()
        .or_else(|| get_with_env_fallback(&settings.api.api_key, &[ENV_API_KEY], None));

    if args.verbose {
        eprintln!(
            "[cli] Settings loaded from {}",
            settings_manager.path().display()
        );
        eprintln!("[cli] Site: {} / {}", site_id, version_id);
        eprintln!("[cli] Backend: {}", endpoint);
    }

    let mut client = Client::new(&endpoint)
        .context("Failed to create generation client")?
        .with_request_timeout(Duration::from_secs(settings.api.request_timeout_secs));
    if let Some(key) = api_key {
        client = client.with_api_key(key);
    }

    let runtime = Arc::new(HeadlessRuntime::new());
    let config = ControllerConfig::from_settings(&settings, site_id, version_id);
    let controller =
        NavigationController::new(config, Arc::new(client), runtime.clone(), landing_html);
    controller.init();

    Ok(CliContext {
        controller,
        runtime,
        settings_manager,
        args: args.clone(),
    })
}
