pub mod app;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod debounce;
pub mod env_manager;
pub mod form;
pub mod mail;
pub mod notify;
pub mod rate_limit;
pub mod submitter;
pub mod validation;
pub mod workflow;

use anyhow::Result;
use log::*;

pub async fn run(cli: cli::Cli) -> Result<()> {
    let config = Config::load()?;
    info!("Initializing formrelay");
    let app = app::Application::new(config)?;
    app.run(cli).await
}

// Re-export commonly used types
pub use config::Config;
pub use form::{Form, FormKind, FormPayload};
pub use submitter::{SubmissionOutcome, Submitter};
pub use workflow::SubmissionWorkflow;
