//! ngw-nav - Headless driver for the navigation controller
//!
//! Loads a landing document, replays visitor steps against the generation
//! backend and prints the resulting document.
//!
//! # Usage
//!
//! ```bash
//! cargo build --features cli --bin ngw-nav
//!
//! # Open a segment page
//! ./target/debug/ngw-nav landing.html -e "segment pricing"
//!
//! # Replay a script, JSON lines for every event and step
//! ./target/debug/ngw-nav landing.html -f steps.txt --json
//!
//! # Save the final document
//! ./target/debug/ngw-nav landing.html -e "topic pricing teams" --quiet --out page.html
//!
//! # Read or change a setting
//! ./target/debug/ngw-nav --get-setting navigation.prefer_streaming
//! ./target/debug/ngw-nav --set-setting navigation.generation_timeout_secs=90
//! ```

use anyhow::{Context, Result};
use clap::Parser;

use ngw_lib::cli::{
    execute_batch, execute_once, initialize, run_settings_command, write_document, Args,
};
use ngw_lib::settings::SettingsManager;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.get_setting.is_some() || args.set_setting.is_some() {
        let manager = SettingsManager::new()
            .await
            .context("Failed to initialize settings manager")?;
        run_settings_command(&args, &manager).await?;
        return Ok(());
    }

    let mut ctx = initialize(&args).await?;

    let result = if let Some(ref step) = args.execute {
        execute_once(&mut ctx, step).await
    } else if let Some(ref file) = args.file {
        execute_batch(&mut ctx, file).await
    } else {
        Ok(())
    };

    if result.is_ok() && !args.json {
        write_document(&ctx.controller, args.out.as_deref())?;
    }

    ctx.shutdown().await?;

    result
}
