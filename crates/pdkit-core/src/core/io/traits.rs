use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for parsing a design file format into its in-memory document.
///
/// Readers only parse. Committing a document into the [`Database`] is a separate step so that
/// callers decide what happens to partially usable input.
///
/// [`Database`]: crate::core::models::database::Database
pub trait FormatReader {
    /// The parsed, not yet committed, content of one file.
    type Document;

    /// The error type for parse and I/O failures.
    type Error: Error + From<io::Error>;

    /// Parses a document from a buffered reader.
    ///
    /// # Arguments
    ///
    /// * `reader` - The buffered reader to read from.
    ///
    /// # Return
    ///
    /// Returns the parsed document; nothing has been committed to a database yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is malformed or reading fails.
    fn read_from(reader: &mut impl BufRead) -> Result<Self::Document, Self::Error>;

    /// Parses a document from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self::Document, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }
}

/// Defines the interface for serializing a view of the database to a design file format.
pub trait FormatWriter {
    /// What gets written, usually a borrowed view of the database.
    type Source<'a>;

    /// Writer options, such as deterministic ordering.
    type Options: Default;

    /// The error type for serialization and I/O failures.
    type Error: Error + From<io::Error>;

    /// Writes `source` to `writer`.
    ///
    /// # Arguments
    ///
    /// * `source` - What to write.
    /// * `options` - Format-specific writer options.
    /// * `writer` - The writer to output to.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails or the source is inconsistent.
    fn write_to(
        source: Self::Source<'_>,
        options: &Self::Options,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    /// Writes `source` to a file path, creating or truncating the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(
        source: Self::Source<'_>,
        options: &Self::Options,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(source, options, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
