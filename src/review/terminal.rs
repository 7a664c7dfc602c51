use anyhow::{Context, Result};
use async_trait::async_trait;
use console::style;
use dialoguer::{Input, Select, theme::ColorfulTheme};
use std::sync::Arc;

use super::{ReviewDecision, ReviewRequest, ReviewSurface};
use crate::ui::OrchestratorUI;
use crate::ui::icons::{CROSS, REVIEW};

const FALLBACK_WIDTH: usize = 100;

/// Interactive review in the terminal.
///
/// Content is wrapped to the terminal width and the decision is taken with a
/// `dialoguer` selection while the progress bars are suspended.
pub struct TerminalReviewSurface {
    ui: Option<Arc<OrchestratorUI>>,
}

impl TerminalReviewSurface {
    pub fn new(ui: Option<Arc<OrchestratorUI>>) -> Self {
        Self { ui }
    }
}

#[async_trait]
impl ReviewSurface for TerminalReviewSurface {
    async fn review(&mut self, request: &ReviewRequest) -> Result<ReviewDecision> {
        let request = request.clone();
        let ui = self.ui.clone();
        tokio::task::spawn_blocking(move || match ui {
            Some(ui) => ui.suspend(|| prompt(&request)),
            None => prompt(&request),
        })
        .await
        .context("Review prompt task panicked")?
    }
}

fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(terminal_size::Width(w), _)| usize::from(w))
        .unwrap_or(FALLBACK_WIDTH)
        .clamp(40, 160)
}

/// Render the request body for display.
pub(crate) fn render(request: &ReviewRequest, width: usize) -> String {
    let mut out = String::new();
    let chapter = request
        .chapter
        .map(|n| format!(" · chapter {}", n))
        .unwrap_or_default();
    out.push_str(&format!(
        "\n{}{} · {}{} {}\n",
        REVIEW,
        style(request.role.label()).cyan().bold(),
        request.task_name,
        chapter,
        style(format!("(attempt {})", request.attempt)).dim()
    ));
    out.push_str(&format!("{}\n", style("─".repeat(width)).dim()));

    if let Some(reason) = &request.error {
        out.push_str(&format!(
            "{}{}\n",
            CROSS,
            style(format!("Generation failed: {}", reason)).red()
        ));
    } else {
        for line in textwrap::wrap(&request.content, width) {
            out.push_str(&line);
            out.push('\n');
        }
    }
    out.push_str(&format!("{}\n", style("─".repeat(width)).dim()));
    out
}

fn prompt(request: &ReviewRequest) -> Result<ReviewDecision> {
    println!("{}", render(request, terminal_width()));

    let theme = ColorfulTheme::default();
    if request.is_error() {
        let options = &["Retry", "Retry with guidance", "Skip this task"];
        let selection = Select::with_theme(&theme)
            .with_prompt("How should the run continue?")
            .items(options)
            .default(0)
            .interact()?;
        return match selection {
            0 => Ok(ReviewDecision::Reject),
            1 => Ok(ReviewDecision::Modify(ask_guidance(&theme)?)),
            2 => Ok(ReviewDecision::Approve),
            _ => unreachable!(),
        };
    }

    let options = &["Approve", "Reject and regenerate", "Request changes"];
    let selection = Select::with_theme(&theme)
        .with_prompt("Accept this output?")
        .items(options)
        .default(0)
        .interact()?;

    match selection {
        0 => Ok(ReviewDecision::Approve),
        1 => Ok(ReviewDecision::Reject),
        2 => Ok(ReviewDecision::Modify(ask_guidance(&theme)?)),
        _ => unreachable!(),
    }
}

fn ask_guidance(theme: &ColorfulTheme) -> Result<String> {
    let text: String = Input::with_theme(theme)
        .with_prompt("What should change?")
        .interact_text()?;
    Ok(text)
}
