//! CLI step runner.
//!
//! A step is one visitor interaction, written as a line of text:
//!
//! ```text
//! segment pricing
//! topic pricing teams
//! click [data-segment="features"]
//! cta demo Book a demo
//! answer how-sso-works How does SSO work?
//! back
//! landing
//! ```

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::dispatch::ClickTarget;
use crate::events::{GenerateAnswerRequest, WindowEvent};

use super::bootstrap::CliContext;
use super::output::{print_step_result, run_event_loop, StepResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Segment(String),
    Topic { parent: String, slug: String },
    Landing,
    Back,
    Forward,
    /// Click the first element matching a CSS selector in the live document
    Click(String),
    Cta { cta_type: String, label: String },
    Answer { slug: String, question: String },
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        let words: Vec<&str> = rest.split_whitespace().collect();

        let step = match (command, words.as_slice()) {
            ("segment", [slug]) => Step::Segment(slug.to_string()),
            ("topic", [parent, slug]) => Step::Topic {
                parent: parent.to_string(),
                slug: slug.to_string(),
            },
            ("landing", []) => Step::Landing,
            ("back", []) => Step::Back,
            ("forward", []) => Step::Forward,
            ("click", [_, ..]) => Step::Click(rest.to_string()),
            ("cta", [cta_type, label @ ..]) => Step::Cta {
                cta_type: cta_type.to_string(),
                label: label.join(" "),
            },
            ("answer", [slug, question @ ..]) if !question.is_empty() => Step::Answer {
                slug: slug.to_string(),
                question: question.join(" "),
            },
            _ => anyhow::bail!("Unrecognized step: '{}'", line),
        };
        Ok(step)
    }
}

/// Run one step and print what happened.
pub async fn execute_once(ctx: &mut CliContext, line: &str) -> Result<()> {
    let step: Step = line.parse()?;

    // Fresh channel per step; the output loop ends when the sender is dropped
    let (event_tx, event_rx) = mpsc::unbounded_channel::<WindowEvent>();
    ctx.runtime.clear_emitted();
    ctx.runtime.replace_event_tx(event_tx);

    let json_mode = ctx.args.json;
    let quiet_mode = ctx.args.quiet;
    let output_handle: JoinHandle<Result<()>> =
        tokio::spawn(async move { run_event_loop(event_rx, json_mode, quiet_mode).await });

    let result = run_step(ctx, &step).await;
    drop(ctx.runtime.take_event_tx());

    match output_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!("Output handler error: {}", e);
        }
        Err(e) => {
            tracing::warn!("Output handler panicked: {}", e);
        }
    }

    let result = result?;
    print_step_result(line.trim(), &result, &ctx.controller, json_mode, quiet_mode)?;
    Ok(())
}

/// Run steps from a file, one per line. Blank lines and `#` comments are skipped.
pub async fn execute_batch(ctx: &mut CliContext, file_path: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(file_path)
        .await
        .with_context(|| format!("Failed to read step file: {}", file_path.display()))?;

    let steps: Vec<&str> = content
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect();

    if steps.is_empty() {
        anyhow::bail!("No steps found in file: {}", file_path.display());
    }

    let total = steps.len();
    for (i, step) in steps.iter().enumerate() {
        if !ctx.args.quiet && !ctx.args.json {
            eprintln!("[batch] [{}/{}] {}", i + 1, total, step);
        }
        execute_once(ctx, step).await?;
    }
    Ok(())
}

async fn run_step(ctx: &CliContext, step: &Step) -> Result<StepResult> {
    let controller = &ctx.controller;
    let result = match step {
        Step::Segment(slug) => StepResult::Navigation(controller.navigate_to_segment(slug).await),
        Step::Topic { parent, slug } => {
            StepResult::Navigation(controller.navigate_to_topic(parent, slug).await)
        }
        Step::Landing => StepResult::Navigation(controller.navigate_to_landing().await),
        Step::Back => match ctx.runtime.back() {
            Some(state) => StepResult::Navigation(controller.handle_pop_state(state).await),
            None => StepResult::NoHistory,
        },
        Step::Forward => match ctx.runtime.forward() {
            Some(state) => StepResult::Navigation(controller.handle_pop_state(state).await),
            None => StepResult::NoHistory,
        },
        Step::Click(css) => {
            let target = ClickTarget::from_document(&controller.document_html(), css)?
                .with_context(|| format!("No element matches '{}'", css))?;
            StepResult::Click(controller.handle_click(&target).await)
        }
        Step::Cta { cta_type, label } => {
            StepResult::Form(controller.handle_cta_action(cta_type, label))
        }
        Step::Answer { slug, question } => {
            let request = GenerateAnswerRequest {
                question: question.clone(),
                question_slug: slug.clone(),
                question_title: question.clone(),
                content: String::new(),
                pre_generated_html: None,
            };
            StepResult::Navigation(controller.handle_generate_answer(request).await)
        }
    };
    Ok(result)
}
