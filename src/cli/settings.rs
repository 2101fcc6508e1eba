//! `--get-setting` / `--set-setting`: read or edit `~/.ngw/settings.toml`
//! without starting the controller.

use std::io::{self, Write};

use anyhow::{Context, Result};
use serde_json::Value;

use crate::settings::SettingsManager;

use super::args::Args;

/// Run a settings command if one was requested. `false` when there was none.
pub async fn run_settings_command(args: &Args, manager: &SettingsManager) -> Result<bool> {
    if let Some(key) = &args.get_setting {
        let value = manager.get_value(key).await?;
        let mut stdout = io::stdout();
        writeln!(stdout, "{}", value)?;
        stdout.flush()?;
        return Ok(true);
    }

    if let Some(assignment) = &args.set_setting {
        let (key, value) = parse_assignment(assignment)?;
        manager.set_value(&key, value).await?;
        if !args.quiet {
            eprintln!("[settings] {} saved to {}", key, manager.path().display());
        }
        return Ok(true);
    }

    Ok(false)
}

/// `key=value`, where the value is JSON when it parses as JSON and a plain
/// string otherwise.
fn parse_assignment(assignment: &str) -> Result<(String, Value)> {
    let (key, raw) = assignment
        .split_once('=')
        .with_context(|| format!("Expected KEY=VALUE, got '{}'", assignment))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("Missing setting key in '{}'", assignment);
    }
    let raw = raw.trim();
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_assignment_values() {
        assert_eq!(
            parse_assignment("navigation.generation_timeout_secs=90").unwrap(),
            ("navigation.generation_timeout_secs".to_string(), serde_json::json!(90))
        );
        assert_eq!(
            parse_assignment("tracking.enabled = false").unwrap().1,
            serde_json::json!(false)
        );
        assert_eq!(
            parse_assignment("api.endpoint=https://gen.example.com/api").unwrap().1,
            serde_json::json!("https://gen.example.com/api")
        );
        assert!(parse_assignment("tracking.enabled").is_err());
        assert!(parse_assignment("=1").is_err());
    }

    #[tokio::test]
    async fn test_set_then_get_setting() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SettingsManager::with_path(dir.path().join("settings.toml"))
            .await
            .unwrap();

        let args = Args::parse_from(["ngw-nav", "-q", "--set-setting", "site.site_id=acme"]);
        assert!(run_settings_command(&args, &manager).await.unwrap());
        assert_eq!(manager.get().await.site.site_id.as_deref(), Some("acme"));

        let args = Args::parse_from(["ngw-nav", "--get-setting", "site.site_id"]);
        assert!(run_settings_command(&args, &manager).await.unwrap());

        let args = Args::parse_from(["ngw-nav", "landing.html"]);
        assert!(!run_settings_command(&args, &manager).await.unwrap());
    }
}
