//! Paper portfolio persisted as a pretty-printed JSON file.
//!
//! Writers coordinate through an advisory lock on a `<state>.lock` sidecar,
//! so separate `fxlab paper` processes never lose each other's updates.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fd_lock::RwLock;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::domain::error::FxlabError;
use crate::domain::portfolio::Portfolio;
use crate::ports::portfolio_store::PortfolioStore;

pub struct JsonStoreAdapter {
    path: PathBuf,
}

impl JsonStoreAdapter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    fn state_dir(&self) -> Result<&Path, FxlabError> {
        match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                Ok(parent)
            }
            None => Ok(Path::new(".")),
        }
    }
}

impl PortfolioStore for JsonStoreAdapter {
    fn load(&self) -> Result<Option<Portfolio>, FxlabError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(FxlabError::Io(e)),
        };
        let portfolio: Portfolio =
            serde_json::from_str(&content).map_err(|e| FxlabError::Store {
                reason: format!("failed to parse {}: {}", self.path.display(), e),
            })?;
        portfolio.check_ids().map_err(|e| FxlabError::Store {
            reason: format!("inconsistent state in {}: {}", self.path.display(), e),
        })?;
        debug!(path = %self.path.display(), "loaded portfolio");
        Ok(Some(portfolio))
    }

    fn save(&self, portfolio: &Portfolio) -> Result<(), FxlabError> {
        let json = serde_json::to_string_pretty(portfolio).map_err(|e| FxlabError::Store {
            reason: format!("failed to serialize portfolio: {}", e),
        })?;
        // A temp file per writer, renamed over the target, so readers never
        // see half a file.
        let mut tmp = NamedTempFile::new_in(self.state_dir()?)?;
        tmp.write_all(json.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| FxlabError::Io(e.error))?;
        debug!(path = %self.path.display(), "saved portfolio");
        Ok(())
    }

    fn with_exclusive(
        &self,
        update: &mut dyn FnMut() -> Result<(), FxlabError>,
    ) -> Result<(), FxlabError> {
        self.state_dir()?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        let mut lock = RwLock::new(file);
        let _guard = lock.write()?;
        debug!(lock = %self.lock_path().display(), "holding state lock");
        update()
    }
}
