//! `shadematch` -- command-line client for the hair-colour analysis service.
//!
//! Analyses photos, manages colour profiles and drives training against a
//! running backend.
//!
//! # Environment variables
//!
//! | Variable                   | Default                 | Description                              |
//! |----------------------------|-------------------------|------------------------------------------|
//! | `API_BASE_URL`             | `http://localhost:8000` | Backend base URL                         |
//! | `MANAGER_PASSWORD`         | --                      | Password for the manager commands        |
//! | `SHADEMATCH_STATE_DIR`     | `.shadematch`           | Where the unlock record is kept          |
//! | `PREPROCESS_MAX_DIMENSION` | `1024`                  | Longest side after downscaling, in px    |
//! | `PREPROCESS_QUALITY`       | `0.7`                   | JPEG quality for recompressed uploads    |

use std::process::ExitCode;

use shadematch_cli::commands::{parse_args, App, CliError};
use shadematch_cli::config::CliConfig;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "shadematch_cli=info,shadematch_client=info,shadematch_core=info";

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        // clap renders help, version and usage errors itself; only the
        // latter go to stderr.
        Err(CliError::Usage(e)) => {
            e.print().ok();
            if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), CliError> {
    let command = parse_args(std::env::args_os())?;
    let mut out = std::io::stdout();

    let config = CliConfig::from_env()?;
    tracing::debug!(
        api_base_url = %config.api_base_url,
        state_dir = %config.state_dir.display(),
        manager_password_set = config.manager_password.is_some(),
        "Configuration loaded",
    );

    App::from_config(&config).execute(command, &mut out).await
}
