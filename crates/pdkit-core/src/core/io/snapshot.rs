//! Binary database image.
//!
//! An image is an 8-byte magic header followed by the `bincode` encoding of the [`Database`].
//! The revision counter is not part of the image.

use crate::core::models::database::Database;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub const SNAPSHOT_MAGIC: &[u8; 8] = b"PDKITDB\x01";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Not a database image (bad magic header)")]
    BadMagic,
    #[error("Failed to encode or decode database image: {0}")]
    Encode(#[from] bincode::Error),
}

/// Writes the magic header followed by the encoded database.
pub fn write_snapshot(db: &Database, writer: &mut impl Write) -> Result<(), SnapshotError> {
    writer.write_all(SNAPSHOT_MAGIC)?;
    bincode::serialize_into(&mut *writer, db)?;
    Ok(())
}

/// Reads an image written by [`write_snapshot`].
///
/// # Errors
///
/// Returns [`SnapshotError::BadMagic`] if the input does not start with the image header
/// (including input shorter than the header), and [`SnapshotError::Encode`] if the body does
/// not decode.
pub fn read_snapshot(reader: &mut impl Read) -> Result<Database, SnapshotError> {
    let mut magic = [0u8; 8];
    match reader.read_exact(&mut magic) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Err(SnapshotError::BadMagic),
        Err(e) => return Err(e.into()),
    }
    if &magic != SNAPSHOT_MAGIC {
        return Err(SnapshotError::BadMagic);
    }
    Ok(bincode::deserialize_from(reader)?)
}

pub fn save_snapshot<P: AsRef<Path>>(db: &Database, path: P) -> Result<(), SnapshotError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    write_snapshot(db, &mut writer)?;
    writer.flush()?;
    debug!("Wrote database image to {}", path.as_ref().display());
    Ok(())
}

pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Database, SnapshotError> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    let db = read_snapshot(&mut reader)?;
    debug!("Read database image from {}", path.as_ref().display());
    Ok(db)
}
