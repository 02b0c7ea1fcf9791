use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use formrelay::cli::Cli;
use log::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = formrelay::env_manager::load_env_file() {
        eprintln!("Could not prepare .env file: {}", e);
    }

    // FORMRELAY_LOG_LEVEL takes precedence over RUST_LOG
    let env = if std::env::var("FORMRELAY_LOG_LEVEL").is_ok() {
        Env::default().filter("FORMRELAY_LOG_LEVEL")
    } else {
        Env::default().default_filter_or("info")
    };
    env_logger::Builder::from_env(env)
        .format(|buf, record| {
            use chrono::Local;
            use std::io::Write;
            writeln!(
                buf,
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    info!("Starting formrelay");
    let cli = Cli::parse();

    if let Err(err) = formrelay::run(cli).await {
        error!("{:?}", err);
        return Err(err);
    }
    Ok(())
}
