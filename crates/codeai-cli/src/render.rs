//! Terminal rendering of the request lifecycle.
//!
//! Everything here builds plain `String`s so the output can be checked
//! without a terminal. Styling is only applied when [`RenderOptions::color`]
//! is set.

use std::io::{self, IsTerminal};

use codeai_core::interpret::Block;
use codeai_core::lifecycle::LifecycleState;
use crossterm::style::Stylize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const IDLE_HINT: &str = "Enter a prompt to see the result here.";
pub const PENDING_INDICATOR: &str = "Thinking...";
const ERROR_MARKER: &str = "❌";
const CODE_INDENT: &str = "    ";

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub color: bool,
}

impl RenderOptions {
    /// Colors only when stdout is a terminal and `no_color` is unset.
    pub fn detect(no_color: bool) -> Self {
        Self {
            color: !no_color && io::stdout().is_terminal(),
        }
    }
}

/// Renders the state as the result area would show it.
pub fn render_state(state: &LifecycleState, opts: RenderOptions) -> String {
    match state {
        LifecycleState::Idle => idle_hint(opts),
        LifecycleState::Pending => {
            if opts.color {
                format!("{}\n", PENDING_INDICATOR.italic())
            } else {
                format!("{PENDING_INDICATOR}\n")
            }
        }
        // An empty reply leaves nothing to show.
        LifecycleState::Success { blocks } if blocks.is_empty() => idle_hint(opts),
        LifecycleState::Success { blocks } => render_blocks(blocks, opts),
        LifecycleState::Error { message } => {
            let line = format!("{ERROR_MARKER} {message}");
            if opts.color {
                format!("{}\n", line.red())
            } else {
                format!("{line}\n")
            }
        }
    }
}

pub fn render_blocks(blocks: &[Block], opts: RenderOptions) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            Block::Heading { level, text } => {
                let line = format!("{} {text}", "#".repeat(usize::from(*level)));
                if opts.color {
                    out.push_str(&line.bold().to_string());
                } else {
                    out.push_str(&line);
                }
                out.push('\n');
            }
            Block::Paragraph { text } => {
                out.push_str(text);
                out.push_str("\n\n");
            }
            Block::CodeBlock { lines } => {
                for line in lines {
                    let indented = format!("{CODE_INDENT}{line}");
                    if opts.color {
                        out.push_str(&indented.dim().to_string());
                    } else {
                        out.push_str(&indented);
                    }
                    out.push('\n');
                }
                out.push('\n');
            }
        }
    }
    out
}

fn idle_hint(opts: RenderOptions) -> String {
    if opts.color {
        format!("{}\n", IDLE_HINT.dim())
    } else {
        format!("{IDLE_HINT}\n")
    }
}

/// Prints the pending indicator to stderr each time a request starts.
///
/// Returns `None` when stderr is not a terminal.
pub fn spawn_pending_indicator(
    mut states: watch::Receiver<LifecycleState>,
) -> Option<JoinHandle<()>> {
    if !io::stderr().is_terminal() {
        return None;
    }
    Some(tokio::spawn(async move {
        while states.changed().await.is_ok() {
            if states.borrow_and_update().is_pending() {
                eprintln!("{}", PENDING_INDICATOR.italic());
            }
        }
    }))
}
