//! Command parsing and dispatch.
//!
//! Arguments are parsed up front so usage errors never touch the network.
//! Manager commands check the unlock gate before issuing any request.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use shadematch_client::api::{ApiError, ShadeMatchApi};
use shadematch_client::progress::{TrainingError, TRAINING_COMPLETE};
use shadematch_client::workflow::{self, WorkflowError};
use shadematch_core::batch::UploadBatch;
use shadematch_core::catalog;
use shadematch_core::error::CoreError;
use shadematch_core::file::ImageFile;
use shadematch_core::gate::{FileUnlockStore, ManagerGate, Navigation, UnlockStore, View};
use shadematch_core::preprocess::PreprocessConfig;
use shadematch_core::types::DbId;
use tokio::io::AsyncBufReadExt;

use crate::config::{CliConfig, ConfigError};
use crate::render;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Bad arguments, or a `--help`/`--version` request.
    #[error("{0}")]
    Usage(#[from] clap::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Training(#[from] TrainingError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("Cannot read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Command-line client for the hair-colour analysis service.
#[derive(Debug, Parser)]
#[command(name = "shadematch", version, arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Analyse up to 5 photos.
    Analyze {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Analyse with the predefined palette.
    AnalyzeLegacy {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Search the shade catalogue.
    Suggest {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Unlock the manager commands. Prompts when no password is given.
    Unlock { password: Option<String> },
    /// Lock the manager commands again.
    Lock,
    /// Manage colour profiles (requires unlock).
    #[command(subcommand)]
    Colors(ColorsCommand),
    /// Retrain a colour with 3+ images (requires unlock).
    Train { id: DbId },
    /// Create a colour, upload its photos and train it (requires unlock).
    Wizard {
        name: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Inspect or clear the analysis cache (requires unlock).
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum ColorsCommand {
    List,
    /// Create a colour; words after the name form its description.
    Create {
        name: String,
        description: Vec<String>,
    },
    Delete { id: DbId },
    /// List the training images of a colour.
    Images { id: DbId },
    /// Upload one training image.
    Upload { id: DbId, file: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum CacheCommand {
    Stats,
    Clear,
}

impl Command {
    /// Commands that operate on the manager view.
    pub fn requires_manager(&self) -> bool {
        matches!(
            self,
            Command::Colors(_) | Command::Train { .. } | Command::Wizard { .. } | Command::Cache(_)
        )
    }
}

/// Parse command-line arguments, including the program name.
pub fn parse_args<I, T>(args: I) -> Result<Command, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Ok(Cli::try_parse_from(args)?.command)
}

/* --------------------------------------------------------------------------
Execution
-------------------------------------------------------------------------- */

/// Everything a command needs to run.
pub struct App<S> {
    pub api: ShadeMatchApi,
    pub gate: ManagerGate<S>,
    pub preprocess: PreprocessConfig,
}

impl App<FileUnlockStore> {
    pub fn from_config(config: &CliConfig) -> Self {
        Self {
            api: ShadeMatchApi::new(config.api_base_url.clone()),
            gate: ManagerGate::new(
                config.manager_password.clone(),
                FileUnlockStore::in_dir(&config.state_dir),
            ),
            preprocess: config.preprocess,
        }
    }
}

async fn load_file(path: &Path) -> Result<ImageFile, CliError> {
    ImageFile::load(path).await.map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

async fn load_files(paths: &[PathBuf]) -> Result<Vec<ImageFile>, CliError> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(load_file(path).await?);
    }
    Ok(files)
}

async fn read_password() -> Result<String, CliError> {
    let mut line = String::new();
    tokio::io::BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(line)
}

impl<S: UnlockStore> App<S> {
    /// Run `command`, writing human-readable output to `out`.
    pub async fn execute<W: Write>(&self, command: Command, out: &mut W) -> Result<(), CliError> {
        if command.requires_manager() {
            self.gate.require_unlocked()?;
        }
        tracing::debug!(manager = command.requires_manager(), "Executing command");

        match command {
            Command::Analyze { files } => {
                let batch = UploadBatch::from_selection(load_files(&files).await?);
                let response = workflow::analyze_batch(&self.api, batch, self.preprocess).await?;
                write!(out, "{}", render::render_analysis(&response))?;
            }

            Command::AnalyzeLegacy { files } => {
                let batch = UploadBatch::from_selection(load_files(&files).await?);
                let results = self.api.analyze_images_legacy(batch.files()).await?;
                let pretty = serde_json::to_string_pretty(&results)
                    .map_err(|e| ApiError::Decode(e.to_string()))?;
                writeln!(out, "{pretty}")?;
            }

            Command::Suggest { query } => {
                let shades = catalog::suggest(&query.join(" "));
                write!(out, "{}", render::render_suggestions(&shades))?;
            }

            Command::Unlock { password } => match self.gate.navigate(View::Manager) {
                Navigation::Allowed(_) => writeln!(out, "Manager already unlocked.")?,
                Navigation::PasswordRequired(_) => {
                    let password = match password {
                        Some(password) => password,
                        None => {
                            write!(out, "Password: ")?;
                            out.flush()?;
                            read_password().await?
                        }
                    };
                    self.gate.submit_password(&password)?;
                    writeln!(out, "Manager unlocked.")?;
                }
            },

            Command::Lock => {
                self.gate.lock()?;
                writeln!(out, "Manager locked.")?;
            }

            Command::Colors(ColorsCommand::List) => {
                let colors = self.api.list_colors().await?;
                write!(out, "{}", render::render_colors(&colors))?;
            }

            Command::Colors(ColorsCommand::Create { name, description }) => {
                let color = self.api.create_color(&name, &description.join(" ")).await?;
                writeln!(out, "Created color [{}] {}", color.id, color.name)?;
                if let Some(shade) = catalog::find(&color.name) {
                    writeln!(out, "Catalogue swatch: {}", shade.hex)?;
                }
            }

            Command::Colors(ColorsCommand::Delete { id }) => {
                self.api.delete_color(id).await?;
                writeln!(out, "Deleted color {id}")?;
            }

            Command::Colors(ColorsCommand::Images { id }) => {
                let images = self.api.list_training_images(id).await?;
                write!(
                    out,
                    "{}",
                    render::render_training_images(&images, |p| self.api.resolve(p))
                )?;
            }

            Command::Colors(ColorsCommand::Upload { id, file }) => {
                let file = load_file(&file).await?;
                let image = self.api.upload_training_image(id, &file).await?;
                writeln!(out, "Uploaded image [{}] {}", image.id, image.image_path)?;
            }

            Command::Train { id } => {
                let response = workflow::train_existing(&self.api, id).await?;
                writeln!(out, "{}", response.message)?;
            }

            Command::Wizard { name, files } => {
                let batch = UploadBatch::from_selection(load_files(&files).await?);
                let run = workflow::create_color_and_train(&self.api, &name, &batch).await?;
                writeln!(
                    out,
                    "Created color [{}] {} with {} image(s)",
                    run.color.id,
                    run.color.name,
                    run.images.len()
                )?;

                let mut progress = run.progress;
                let cancel = progress.cancel_handle();
                let interrupt = tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        cancel.cancel();
                    }
                });

                let outcome = async {
                    while let Some(update) = progress.next().await {
                        writeln!(out, "{}", render::render_progress(&update?))?;
                    }
                    Ok::<_, CliError>(())
                }
                .await;
                interrupt.abort();

                outcome?;
                writeln!(out, "{TRAINING_COMPLETE}")?;
            }

            Command::Cache(CacheCommand::Stats) => {
                let stats = self.api.cache_stats().await?;
                writeln!(out, "Cached results: {}", stats.cached_results)?;
            }

            Command::Cache(CacheCommand::Clear) => {
                let response = self.api.clear_cache().await?;
                writeln!(out, "{}", response.message)?;
            }
        }

        Ok(())
    }
}
