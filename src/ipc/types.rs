use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::auth::AuthManager;
use crate::roster::RosterManager;
use crate::store::Store;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything behind a selected workspace: the store plus both managers,
/// hydrated from it.
pub struct App {
    pub store: Store,
    pub auth: AuthManager,
    pub roster: RosterManager,
}

impl App {
    pub fn open(workspace: &Path) -> anyhow::Result<App> {
        let mut store = Store::open_workspace(workspace)?;
        let auth = AuthManager::load(&mut store);
        let roster = RosterManager::load(&store);
        Ok(App {
            store,
            auth,
            roster,
        })
    }
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub app: Option<App>,
}
