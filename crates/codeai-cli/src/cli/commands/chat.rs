//! Chat command handler.
//!
//! Reads prompts from stdin, one per line, and renders each settled reply.
//! `/quit` or end of input ends the session.

use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use codeai_core::config::Config;
use codeai_core::lifecycle::{InputSurface, LifecycleController, Submission};
use codeai_core::providers::{GeminiClient, GeminiConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::render::{self, RenderOptions};

const QUIT_COMMAND: &str = "/quit";

/// The line being submitted.
#[derive(Default)]
struct Draft(Mutex<String>);

impl Draft {
    fn set(&self, text: &str) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = text.to_string();
    }

    fn text(&self) -> String {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl InputSurface for Draft {
    fn clear(&self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

pub async fn run(config: &Config, opts: RenderOptions) -> Result<()> {
    let gemini = GeminiConfig::from_config(config).context("configure Gemini")?;
    let draft = Arc::new(Draft::default());
    let input: Arc<dyn InputSurface> = Arc::clone(&draft) as Arc<dyn InputSurface>;
    let controller = LifecycleController::new(GeminiClient::new(gemini)?).with_input(input);

    let interactive = io::stdin().is_terminal();
    if interactive {
        print!("{}", render::render_state(&controller.state(), opts));
    }
    let indicator = render::spawn_pending_indicator(controller.subscribe());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if interactive {
            eprint!("> ");
            let _ = io::stderr().flush();
        }

        let Some(line) = lines.next_line().await.context("read prompt")? else {
            break;
        };
        if line.trim() == QUIT_COMMAND {
            break;
        }

        draft.set(&line);
        match controller.submit(&draft.text()).await {
            Submission::Ignored => draft.clear(),
            outcome => {
                debug!(?outcome, "prompt settled");
                print!("{}", render::render_state(&controller.state(), opts));
                let _ = io::stdout().flush();
            }
        }
    }

    if let Some(handle) = indicator {
        handle.abort();
    }
    Ok(())
}
