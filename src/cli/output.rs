//! CLI output handling - window events, step results and the final document.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::controller::{NavOutcome, NavigationController};
use crate::dispatch::NavAction;
use crate::events::WindowEvent;
use crate::leads::FormKind;

/// What a step did.
#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
    Navigation(NavOutcome),
    /// `None` when no dispatch rule matched
    Click(Option<NavAction>),
    Form(FormKind),
    /// `back`/`forward` at the end of history
    NoHistory,
}

impl StepResult {
    fn summary(&self) -> String {
        match self {
            StepResult::Navigation(outcome) => format!("{:?}", outcome),
            StepResult::Click(Some(action)) => format!("click {}", action),
            StepResult::Click(None) => "click ignored".to_string(),
            StepResult::Form(kind) => format!("lead form '{}' opened", kind.as_str()),
            StepResult::NoHistory => "no history entry".to_string(),
        }
    }
}

/// Print window events until the runtime drops the sender.
pub async fn run_event_loop(
    mut event_rx: mpsc::UnboundedReceiver<WindowEvent>,
    json_mode: bool,
    quiet_mode: bool,
) -> Result<()> {
    while let Some(event) = event_rx.recv().await {
        if json_mode {
            println!("{}", serde_json::to_string(&event)?);
            io::stdout().flush()?;
        } else if !quiet_mode {
            eprintln!("[event] {}", describe_event(&event));
        }
    }
    Ok(())
}

fn describe_event(event: &WindowEvent) -> String {
    match event {
        WindowEvent::ContentReplaced { page } => format!("{} page={}", event.name(), page),
        WindowEvent::AnswerReady {
            question_slug,
            cached,
        } => format!("{} {} cached={}", event.name(), question_slug, cached),
        WindowEvent::AnswerError {
            question_slug,
            message,
        } => format!("{} {}: {}", event.name(), question_slug, message),
    }
}

pub fn print_step_result(
    step: &str,
    result: &StepResult,
    controller: &NavigationController,
    json_mode: bool,
    quiet_mode: bool,
) -> Result<()> {
    if json_mode {
        let json = serde_json::json!({
            "type": "step",
            "step": step,
            "result": result.summary(),
            "view": controller.view().page(),
            "navigationStack": controller.navigation_stack(),
            "cachedPages": controller.cache_len(),
        });
        println!("{}", json);
        io::stdout().flush()?;
    } else if !quiet_mode {
        eprintln!(
            "[step] {} -> {} (view: {})",
            step,
            result.summary(),
            controller.view()
        );
    }
    Ok(())
}

/// Write the final document to `out`, or to stdout.
pub fn write_document(controller: &NavigationController, out: Option<&Path>) -> Result<()> {
    let html = controller.document_html();
    match out {
        Some(path) => std::fs::write(path, html)
            .with_context(|| format!("Failed to write document to {}", path.display()))?,
        None => {
            let mut stdout = io::stdout();
            stdout.write_all(html.as_bytes())?;
            writeln!(stdout)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
