//! Command-line flags for `ngw-nav`.

use clap::Parser;
use std::path::PathBuf;

/// ngw-nav - Headless driver for the navigation controller
#[derive(Parser, Debug, Clone)]
#[command(name = "ngw-nav")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Landing page HTML the controller starts from
    #[arg(required_unless_present_any = ["get_setting", "set_setting"])]
    pub landing: Option<PathBuf>,

    /// Site id (overrides settings)
    #[arg(long, env = "NGW_SITE_ID")]
    pub site_id: Option<String>,

    /// Site version id (overrides settings)
    #[arg(long, env = "NGW_VERSION_ID")]
    pub version_id: Option<String>,

    /// Generation backend base URL (overrides settings)
    #[arg(long, env = "NGW_API_ENDPOINT")]
    pub api_endpoint: Option<String>,

    /// API key (overrides settings)
    #[arg(long, env = "NGW_API_KEY")]
    pub api_key: Option<String>,

    /// Run a single step and exit, e.g. `segment pricing`
    #[arg(short = 'e', long, conflicts_with = "file")]
    pub execute: Option<String>,

    /// Run steps from a file (one per line)
    #[arg(short = 'f', long, conflicts_with = "execute")]
    pub file: Option<PathBuf>,

    /// Output events and outcomes as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Only print the final document
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Log controller and backend activity at debug level
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Write the final document to this file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Print one setting by dotted key, e.g. `navigation.prefer_streaming`
    #[arg(long, value_name = "KEY", conflicts_with_all = ["set_setting", "execute", "file"])]
    pub get_setting: Option<String>,

    /// Save one setting, e.g. `navigation.generation_timeout_secs=90`
    #[arg(long, value_name = "KEY=VALUE", conflicts_with_all = ["execute", "file"])]
    pub set_setting: Option<String>,
}
