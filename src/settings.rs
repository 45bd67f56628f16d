use std::path::PathBuf;

use clap::ValueEnum;

pub const DEFAULT_STORE_TITLE: &str = "EduMind Datastore";
pub const DEFAULT_LOCAL_DB: &str = ".edumind/grid.sqlite";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Google Sheets through a service-account key.
    Sheets,
    /// SQLite file on this machine.
    Local,
}

/// What the grid client needs to connect. Built once by the composition root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend: Backend,
    /// Service-account key for Sheets, database path for the local grid.
    pub credentials: Option<PathBuf>,
    pub store_id: Option<String>,
    pub store_title: String,
}

impl Settings {
    pub fn sheets(credentials: Option<PathBuf>, store_id: Option<String>) -> Self {
        Self {
            backend: Backend::Sheets,
            credentials: credentials.filter(|path| !path.as_os_str().is_empty()),
            store_id: non_empty(store_id),
            store_title: DEFAULT_STORE_TITLE.to_string(),
        }
    }

    pub fn local(path: PathBuf) -> Self {
        Self {
            backend: Backend::Local,
            credentials: Some(path),
            store_id: None,
            store_title: DEFAULT_STORE_TITLE.to_string(),
        }
    }

    pub fn with_store_title(mut self, title: &str) -> Self {
        let title = title.trim();
        if !title.is_empty() {
            self.store_title = title.to_string();
        }
        self
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
