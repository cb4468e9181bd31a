use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LutError {
    #[error("Failed to read lookup table '{file}': {source}")]
    Io {
        file: String,
        #[source]
        source: io::Error,
    },

    #[error("Lookup table '{0}' is empty")]
    Empty(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTable {
    pub file_name: String,
    pub lines: usize,
    pub bytes: usize,
}

/// The lookup tables read at startup and the folder they were found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTables {
    folder: PathBuf,
    tables: Vec<LookupTable>,
}

impl LookupTables {
    pub fn new(folder: PathBuf, tables: Vec<LookupTable>) -> Self {
        Self { folder, tables }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn tables(&self) -> &[LookupTable] {
        &self.tables
    }

    pub fn table(&self, file_name: &str) -> Option<&LookupTable> {
        self.tables.iter().find(|t| t.file_name == file_name)
    }
}

/// Reads every named table relative to the current working directory.
pub fn load_from_working_dir(files: &[String]) -> Result<Vec<LookupTable>, LutError> {
    files
        .iter()
        .map(|name| {
            let content = fs::read(name).map_err(|source| LutError::Io {
                file: name.clone(),
                source,
            })?;
            if content.is_empty() {
                return Err(LutError::Empty(name.clone()));
            }
            let lines = content.iter().filter(|b| **b == b'\n').count().max(1);
            debug!("Read lookup table {} ({} bytes)", name, content.len());
            Ok(LookupTable {
                file_name: name.clone(),
                lines,
                bytes: content.len(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::cwd::WorkingDirGuard;
    use crate::test_support::{LOOKUP_TABLE_FILES, write_file, write_lookup_tables};
    use serial_test::serial;

    fn names() -> Vec<String> {
        LOOKUP_TABLE_FILES.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    #[serial]
    fn tables_are_read_relative_to_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_lookup_tables(dir.path());
        let _guard = WorkingDirGuard::change_to(dir.path()).unwrap();
        let tables = load_from_working_dir(&names()).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].file_name, "POWV9.dat");
        assert_eq!(tables[0].lines, 3);
        assert_eq!(tables[1].bytes, 10);
    }

    #[test]
    #[serial]
    fn empty_or_missing_tables_fail() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "POWV9.dat", "");
        let _guard = WorkingDirGuard::change_to(dir.path()).unwrap();
        assert!(matches!(
            load_from_working_dir(&names()),
            Err(LutError::Empty(name)) if name == "POWV9.dat"
        ));
        assert!(matches!(
            load_from_working_dir(&names()[1..]),
            Err(LutError::Io { .. })
        ));
    }
}
