use super::cwd::WorkingDirGuard;
use super::lut::{self, LookupTable, LookupTables, LutError};
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Relative folders tried after the ones derived from the invocation path.
const FALLBACK_DIRS: [&str; 3] = [".", "..", "../.."];

/// Number of trailing segments stripped from the invocation path, deepest strip first.
const MAX_STRIPPED_SEGMENTS: usize = 3;

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("Could not find {files} in any of: {}", display_paths(.searched))]
    NotFound { files: String, searched: Vec<PathBuf> },

    #[error("Failed to load lookup tables: {0}")]
    Load(#[from] LutError),

    #[error("Cannot enter resource folder {path}: {source}")]
    WorkingDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Candidate resource folders for a program invoked as `invocation_path`, in search order.
///
/// Up to three candidates come from cutting the path at its last `/` one, two and three times;
/// the one with the most segments removed is tried first. Cutting `/app` leaves the root.
pub fn candidate_folders(invocation_path: &str, folder: &str) -> Vec<PathBuf> {
    let mut stripped = Vec::with_capacity(MAX_STRIPPED_SEGMENTS);
    let mut dir = invocation_path;
    for _ in 0..MAX_STRIPPED_SEGMENTS {
        let Some(idx) = dir.rfind('/') else { break };
        dir = &dir[..idx];
        stripped.push(dir);
    }
    stripped
        .into_iter()
        .rev()
        .chain(FALLBACK_DIRS)
        .map(|dir| PathBuf::from(format!("{}/{}", dir, folder)))
        .collect()
}

fn has_all(dir: &Path, files: &[String]) -> bool {
    files.iter().all(|f| dir.join(f).is_file())
}

/// The first candidate folder that contains every file in `files`.
///
/// # Errors
///
/// Returns [`LocateError::NotFound`], listing every folder searched, if no candidate has all
/// the files.
pub fn find_resource_folder(
    invocation_path: &str,
    folder: &str,
    files: &[String],
) -> Result<PathBuf, LocateError> {
    let candidates = candidate_folders(invocation_path, folder);
    for candidate in &candidates {
        if has_all(candidate, files) {
            debug!("Resource folder found at {}", candidate.display());
            return Ok(candidate.clone());
        }
        debug!("No lookup tables in {}", candidate.display());
    }
    Err(LocateError::NotFound {
        files: files.join(" and "),
        searched: candidates,
    })
}

/// Locates the resource folder, then runs `loader` with the working directory set to it.
///
/// The original working directory is restored whether or not the loader succeeds.
///
/// # Arguments
///
/// * `invocation_path` - The path the program was started as, usually `argv[0]`.
/// * `folder` - Name of the resource folder to look for, relative to each candidate base.
/// * `files` - Files that must all be present for a candidate to match.
/// * `loader` - Reads the files by their bare names, relative to the resource folder.
///
/// # Return
///
/// Returns the absolute path of the folder that matched and the loader's result.
///
/// # Errors
///
/// Returns [`LocateError::NotFound`] if no candidate matches, [`LocateError::WorkingDir`] if
/// the folder cannot be entered, and [`LocateError::Load`] if the loader fails.
pub fn locate_with<T>(
    invocation_path: &str,
    folder: &str,
    files: &[String],
    loader: impl FnOnce(&[String]) -> Result<T, LutError>,
) -> Result<(PathBuf, T), LocateError> {
    let found = find_resource_folder(invocation_path, folder, files)?;
    let guard = WorkingDirGuard::change_to(&found).map_err(|source| LocateError::WorkingDir {
        path: found.clone(),
        source,
    })?;
    let absolute = env::current_dir().unwrap_or_else(|_| found.clone());
    let loaded = loader(files);
    drop(guard);
    Ok((absolute, loaded?))
}

/// Locates and reads the lookup tables.
///
/// # Errors
///
/// See [`locate_with`].
pub fn locate_and_load(
    invocation_path: &str,
    folder: &str,
    files: &[String],
) -> Result<LookupTables, LocateError> {
    let (folder, tables): (PathBuf, Vec<LookupTable>) =
        locate_with(invocation_path, folder, files, lut::load_from_working_dir)?;
    info!(
        "Loaded {} lookup table(s) from {}",
        tables.len(),
        folder.display()
    );
    Ok(LookupTables::new(folder, tables))
}
