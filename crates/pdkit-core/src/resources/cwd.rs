use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error};

static WORKING_DIR: RwLock<()> = RwLock::new(());

/// Holds the process working directory steady while relative paths are resolved.
pub fn shared() -> RwLockReadGuard<'static, ()> {
    WORKING_DIR.read().unwrap_or_else(PoisonError::into_inner)
}

/// Changes the working directory for its lifetime and restores the original one on drop.
///
/// The guard holds the process-wide working-directory lock exclusively, so it must not be
/// created while the same thread holds [`shared`].
#[derive(Debug)]
pub struct WorkingDirGuard {
    original: PathBuf,
    _lock: RwLockWriteGuard<'static, ()>,
}

impl WorkingDirGuard {
    pub fn change_to(dir: &Path) -> io::Result<Self> {
        let lock = WORKING_DIR.write().unwrap_or_else(PoisonError::into_inner);
        let original = env::current_dir()?;
        env::set_current_dir(dir)?;
        debug!("Working directory changed to {}", dir.display());
        Ok(Self {
            original,
            _lock: lock,
        })
    }

    pub fn original(&self) -> &Path {
        &self.original
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        match env::set_current_dir(&self.original) {
            Ok(()) => debug!("Working directory restored to {}", self.original.display()),
            Err(e) => error!(
                "Failed to restore working directory {}: {}",
                self.original.display(),
                e
            ),
        }
    }
}
