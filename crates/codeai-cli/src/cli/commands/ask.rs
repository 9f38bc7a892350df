//! Ask command handler.

use anyhow::{Context, Result};
use codeai_core::config::Config;
use codeai_core::lifecycle::{LifecycleController, LifecycleState, Submission};
use codeai_core::providers::{GeminiClient, GeminiConfig};

use crate::render::{self, RenderOptions};

pub async fn run(
    prompt: &str,
    config: &Config,
    model_override: Option<&str>,
    opts: RenderOptions,
) -> Result<()> {
    // Apply overrides if provided
    let config = {
        let mut c = config.clone();
        if let Some(model) = model_override {
            c.model = model.to_string();
        }
        c
    };

    let gemini = GeminiConfig::from_config(&config).context("configure Gemini")?;
    let controller = LifecycleController::new(GeminiClient::new(gemini)?);

    let indicator = render::spawn_pending_indicator(controller.subscribe());
    let outcome = controller.submit(prompt).await;
    if let Some(handle) = indicator {
        handle.abort();
    }

    if outcome == Submission::Ignored {
        return Ok(());
    }

    match controller.state() {
        LifecycleState::Error { message } => anyhow::bail!("{message}"),
        state => {
            print!("{}", render::render_state(&state, opts));
            Ok(())
        }
    }
}
