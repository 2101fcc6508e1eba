//! Settings schema for the navigator.
//!
//! Every struct uses `#[serde(default)]` so partial files load; missing
//! fields take the defaults below.

use serde::{Deserialize, Serialize};

/// Root of `~/.ngw/settings.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorSettings {
    /// Schema version for migrations
    pub version: u32,

    /// Generation backend
    pub api: ApiSettings,

    /// Which generated site this navigator drives
    pub site: SiteSettings,

    /// Navigation behavior
    pub navigation: NavigationSettings,

    /// Third-party assets every generated page needs
    pub assets: AssetSettings,

    /// Behavior signal collection
    pub tracking: TrackingSettings,

    /// Lead capture
    pub leads: LeadSettings,
}

/// Generation backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// API base URL (supports $ENV_VAR syntax)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Bearer token (supports $ENV_VAR syntax)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Timeout for single-shot requests, in seconds
    pub request_timeout_secs: u64,
}

/// Site identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,

    /// Project id sent with answer-page requests (defaults to the site id)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationSettings {
    /// Upper bound for one generation, stream or JSON
    pub generation_timeout_secs: u64,

    /// Segment and topic pages use the SSE endpoint first
    pub prefer_streaming: bool,

    /// Replace generated navigation with the breadcrumb bar
    pub inject_nav_bar: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// `<script src>` of the CSS framework
    pub framework_script: String,

    /// Stylesheet of the icon font
    pub icon_stylesheet: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingSettings {
    /// Collect behavior signals and attach them to generation requests
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadSettings {
    /// `source` field of submitted leads
    pub source: String,
}

impl Default for NavigatorSettings {
    fn default() -> Self {
        Self {
            version: 1,
            api: ApiSettings::default(),
            site: SiteSettings::default(),
            navigation: NavigationSettings::default(),
            assets: AssetSettings::default(),
            tracking: TrackingSettings::default(),
            leads: LeadSettings::default(),
        }
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            request_timeout_secs: 60,
        }
    }
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            generation_timeout_secs: 60,
            prefer_streaming: true,
            inject_nav_bar: true,
        }
    }
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            framework_script: "https://cdn.tailwindcss.com".to_string(),
            icon_stylesheet:
                "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.5.1/css/all.min.css"
                    .to_string(),
        }
    }
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for LeadSettings {
    fn default() -> Self {
        Self {
            source: "generated-site".to_string(),
        }
    }
}
