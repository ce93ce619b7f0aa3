//! Catalog of the avatar emoji available to rooms, loaded once at startup
//! and read-only thereafter.

use std::{collections::HashSet, fs, io, path::Path};

use derive_more::{Display, From};

/// Errors that can occur while loading a [`Catalog`].
#[derive(Debug, Display, From)]
pub enum CatalogError {
    /// Catalog file couldn't be read.
    #[display(fmt = "Failed to read catalog file: {}", _0)]
    Io(io::Error),

    /// Catalog file contains a blank line.
    #[display(fmt = "Blank line {} in catalog file", line)]
    #[from(ignore)]
    BlankLine {
        /// 1-based number of the offending line.
        line: usize,
    },

    /// Catalog file contains a line that is not a hex codepoint.
    #[display(fmt = "Bad entry {:?} on line {} of catalog file", value, line)]
    #[from(ignore)]
    InvalidEntry {
        /// 1-based number of the offending line.
        line: usize,

        /// The rejected line.
        value: String,
    },
}

impl std::error::Error for CatalogError {}

/// Immutable set of avatar emoji ids, shared across all rooms.
///
/// Order of ids follows the catalog file; duplicates collapse onto their
/// first occurrence.
#[derive(Clone, Debug)]
pub struct Catalog {
    ids: Vec<String>,
}

impl Catalog {
    /// Creates a new [`Catalog`] of the given ids, dropping duplicates.
    #[must_use]
    pub fn new(ids: Vec<String>) -> Self {
        let mut seen = HashSet::new();
        Self {
            ids: ids.into_iter().filter(|id| seen.insert(id.clone())).collect(),
        }
    }

    /// Reads a newline-delimited list of hex emoji codepoints from the
    /// file at `path`.
    ///
    /// # Errors
    ///
    /// Errors if the file can't be read, contains a blank line, or
    /// contains a line that doesn't parse as a hex codepoint.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)?;
        let mut ids = Vec::new();
        for (num, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                return Err(CatalogError::BlankLine { line: num + 1 });
            }
            if u32::from_str_radix(line, 16).is_err() {
                return Err(CatalogError::InvalidEntry {
                    line: num + 1,
                    value: line.to_owned(),
                });
            }
            ids.push(line.to_owned());
        }
        Ok(Self::new(ids))
    }

    /// Emoji ids of this catalog, in file order.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Number of distinct emoji in this catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Indicates whether this catalog holds no emoji at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn loads_ids_in_file_order() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "1F600\n1F9A9\n1F600\n2728").unwrap();

        let catalog = Catalog::load(file.path()).unwrap();

        assert_eq!(catalog.ids(), ["1F600", "1F9A9", "2728"]);
    }

    #[test]
    fn rejects_blank_lines() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "1F600\n\n1F9A9").unwrap();

        match Catalog::load(file.path()) {
            Err(CatalogError::BlankLine { line }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn rejects_non_hex_entries() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "1F600\ngrinning").unwrap();

        match Catalog::load(file.path()) {
            Err(CatalogError::InvalidEntry { line, value }) => {
                assert_eq!(line, 2);
                assert_eq!(value, "grinning");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = Catalog::load("definitely/not/a/real/path.txt");

        assert!(matches!(result, Err(CatalogError::Io(_))));
    }
}
