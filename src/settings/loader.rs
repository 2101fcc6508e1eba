//! Reads and writes `~/.ngw/settings.toml`.
//!
//! String fields may hold `$VAR` or `${VAR}`; these are swapped for the
//! variable's value at load time. Writes go through a sibling `.tmp` file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::sync::RwLock;

use super::schema::NavigatorSettings;

/// Written on first run so the user has something to edit.
const TEMPLATE: &str = include_str!("template.toml");

pub const ENV_API_ENDPOINT: &str = "NGW_API_ENDPOINT";
pub const ENV_API_KEY: &str = "NGW_API_KEY";
pub const ENV_SITE_ID: &str = "NGW_SITE_ID";
pub const ENV_VERSION_ID: &str = "NGW_VERSION_ID";

/// `~/.ngw/settings.toml`, or `./.ngw/settings.toml` without a home directory.
pub fn settings_path() -> PathBuf {
    let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    [".ngw", "settings.toml"].iter().fold(base, |p, c| p.join(c))
}

/// Owns the settings file and an in-memory copy with references expanded.
pub struct SettingsManager {
    current: RwLock<NavigatorSettings>,
    path: PathBuf,
}

impl SettingsManager {
    pub async fn new() -> Result<Self> {
        Self::with_path(settings_path()).await
    }

    /// Same as [`SettingsManager::new`] but rooted at `path`.
    pub async fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let current = RwLock::new(Self::load_from_path(&path).await?);
        Ok(Self { current, path })
    }

    async fn load_from_path(path: &Path) -> Result<NavigatorSettings> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, defaults apply");
                return Ok(NavigatorSettings::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Cannot read settings at {}", path.display()))
            }
        };

        let mut parsed: NavigatorSettings = toml::from_str(&raw)
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        expand_env_refs(&mut parsed);

        tracing::info!(path = %path.display(), "settings loaded");
        Ok(parsed)
    }

    /// Snapshot of the current settings.
    pub async fn get(&self) -> NavigatorSettings {
        self.current.read().await.clone()
    }

    /// Replace the settings and write them to disk.
    pub async fn update(&self, next: NavigatorSettings) -> Result<()> {
        let serialized =
            toml::to_string_pretty(&next).context("Settings could not be serialized")?;
        write_replacing(&self.path, serialized.as_bytes()).await?;
        *self.current.write().await = next;

        tracing::info!(path = %self.path.display(), "settings saved");
        Ok(())
    }

    /// Look up one value by dotted path, e.g. `navigation.prefer_streaming`.
    pub async fn get_value(&self, key: &str) -> Result<serde_json::Value> {
        let tree = serde_json::to_value(&*self.current.read().await)?;
        tree.pointer(&json_pointer(key))
            .cloned()
            .with_context(|| format!("Unknown setting '{}'", key))
    }

    /// Set one value by dotted path and save.
    ///
    /// The key must name a schema field and the value must fit its type;
    /// otherwise nothing changes.
    pub async fn set_value(&self, key: &str, value: serde_json::Value) -> Result<()> {
        let pointer = json_pointer(key);
        let unknown = || format!("Unknown setting '{}'", key);
        let (parent, leaf) = pointer.rsplit_once('/').with_context(unknown)?;

        let mut tree = serde_json::to_value(self.get().await)?;
        tree.pointer_mut(parent)
            .and_then(serde_json::Value::as_object_mut)
            .with_context(unknown)?
            .insert(leaf.to_string(), value);

        let next: NavigatorSettings = serde_json::from_value(tree)
            .with_context(|| format!("Invalid value for '{}'", key))?;
        // Unknown keys are ignored on deserialize; make sure the value landed
        if serde_json::to_value(&next)?.pointer(&pointer).is_none() {
            anyhow::bail!(unknown());
        }
        self.update(next).await
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the template if no file is present. `true` when one was written.
    pub async fn ensure_settings_file(&self) -> Result<bool> {
        if self.exists() {
            return Ok(false);
        }
        ensure_parent(&self.path).await?;
        tokio::fs::write(&self.path, TEMPLATE)
            .await
            .with_context(|| format!("Cannot write template to {}", self.path.display()))?;
        tracing::info!(path = %self.path.display(), "settings template created");
        Ok(true)
    }
}

/// `a.b.c` as the JSON pointer `/a/b/c`.
fn json_pointer(key: &str) -> String {
    key.split('.').flat_map(|seg| ["/", seg]).collect()
}

fn expand_env_refs(settings: &mut NavigatorSettings) {
    let fields = [
        &mut settings.api.endpoint,
        &mut settings.api.api_key,
        &mut settings.site.site_id,
        &mut settings.site.version_id,
        &mut settings.site.project_id,
    ];
    for field in fields {
        if let Some(expanded) = field.as_deref().and_then(resolve_env_ref) {
            *field = Some(expanded);
        }
    }
}

async fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Cannot create {}", dir.display())),
        _ => Ok(()),
    }
}

/// Write to `<path>.tmp` then rename over `path`.
async fn write_replacing(path: &Path, contents: &[u8]) -> Result<()> {
    ensure_parent(path).await?;
    let staging = path.with_extension("toml.tmp");
    tokio::fs::write(&staging, contents).await?;
    tokio::fs::rename(&staging, path)
        .await
        .with_context(|| format!("Cannot replace {}", path.display()))
}

/// Value of the variable named by `$NAME` or `${NAME}`.
///
/// `None` for plain strings and for variables that are unset.
fn resolve_env_ref(value: &str) -> Option<String> {
    let name = value.trim().strip_prefix('$')?;
    let name = match name.strip_prefix('{') {
        Some(braced) => braced.strip_suffix('}')?,
        None => name,
    };
    std::env::var(name).ok()
}

/// First non-empty value among the setting, then `env_vars` in order,
/// then `default`.
pub fn get_with_env_fallback(
    setting: &Option<String>,
    env_vars: &[&str],
    default: Option<String>,
) -> Option<String> {
    setting
        .iter()
        .cloned()
        .chain(env_vars.iter().filter_map(|name| std::env::var(name).ok()))
        .find(|v| !v.is_empty())
        .or(default)
}
