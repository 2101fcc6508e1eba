//! TOML settings for the navigator.
//!
//! Settings are loaded from `~/.ngw/settings.toml` with environment variable
//! interpolation. Values left unset fall back to `NGW_*` environment
//! variables through `get_with_env_fallback`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ngw_lib::settings::{get_with_env_fallback, SettingsManager, ENV_SITE_ID};
//!
//! let manager = SettingsManager::new().await?;
//! let settings = manager.get().await;
//! let site_id = get_with_env_fallback(&settings.site.site_id, &[ENV_SITE_ID], None);
//! ```

pub mod loader;
pub mod schema;

pub use loader::{
    get_with_env_fallback, settings_path, SettingsManager, ENV_API_ENDPOINT, ENV_API_KEY,
    ENV_SITE_ID, ENV_VERSION_ID,
};
pub use schema::NavigatorSettings;
