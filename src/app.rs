use tracing::debug;

use crate::client::{GridClient, InitOutcome};
use crate::grid::GridError;
use crate::repo::{RepoError, Repository};
use crate::schema::{SchemaError, SchemaRegistry};
use crate::settings::Settings;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0} not found")]
    NotFound(String),
}

impl AppError {
    pub fn is_uninitialized(&self) -> bool {
        match self {
            AppError::Grid(err) => err.is_uninitialized(),
            AppError::Repo(err) => err.is_uninitialized(),
            _ => false,
        }
    }
}

/// Process-wide handle: one grid client over the built-in schema.
pub struct App {
    client: GridClient,
}

impl App {
    pub fn new(settings: Settings) -> Result<Self, AppError> {
        let schema = SchemaRegistry::builtin()?;
        Ok(Self {
            client: GridClient::new(settings, schema),
        })
    }

    /// Strict initialization for the `init` command: a missing credential
    /// location is an error here rather than a skip.
    pub fn initialize(&self) -> Result<InitOutcome, AppError> {
        match self.client.initialize()? {
            InitOutcome::Skipped => Err(AppError::InvalidArgument(
                "no credential location configured; set --credentials or GOOGLE_APPLICATION_CREDENTIALS"
                    .to_string(),
            )),
            ready => Ok(ready),
        }
    }

    /// Connects if possible and hands out the repository. Data operations on
    /// an unconnected client fail with "grid store is not initialized".
    pub fn repo(&self) -> Repository<'_> {
        if !self.client.is_initialized() && self.client.initialize_or_log() {
            if let Ok(store_id) = self.client.store_id() {
                debug!(store_id, "grid store ready");
            }
        }
        Repository::new(&self.client)
    }
}
