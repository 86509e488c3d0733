//! Bluetooth SIG company identifier lookup.
//!
//! The table is loaded from a TOML document:
//!
//! ```toml
//! [[company_identifiers]]
//! value = 0x004C
//! name = "Apple, Inc."
//! ```
//!
//! A missing, unreadable, malformed or empty table is an error. An empty
//! directory would silently resolve everything to `"Unknown"`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Name returned for identifiers that are not in the table.
pub const UNKNOWN_COMPANY: &str = "Unknown";

/// Errors raised while loading the company table.
#[derive(Debug, Error)]
pub enum CompanyTableError {
    /// The table file does not exist.
    #[error("Company identifier table not found at: {}", .0.display())]
    NotFound(PathBuf),

    /// The table file exists but could not be read.
    #[error("Failed to read company identifier table {}: {source}", path.display())]
    ReadError {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The table file is not valid TOML or has the wrong shape.
    #[error("Failed to parse company identifier table {}: {source}", path.display())]
    ParseError {
        /// File that failed.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// The table parsed but lists no companies.
    #[error("Company identifier table {} contains no entries", .0.display())]
    Empty(PathBuf),
}

#[derive(Debug, Deserialize)]
struct CompanyTable {
    company_identifiers: Vec<CompanyEntry>,
}

#[derive(Debug, Deserialize)]
struct CompanyEntry {
    value: u16,
    name: String,
}

/// Resolves company identifiers to names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyDirectory {
    names: HashMap<u16, String>,
}

impl CompanyDirectory {
    /// Load the table from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, malformed or empty.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CompanyTableError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CompanyTableError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| CompanyTableError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let table: CompanyTable =
            toml::from_str(&content).map_err(|source| CompanyTableError::ParseError {
                path: path.to_path_buf(),
                source,
            })?;
        if table.company_identifiers.is_empty() {
            return Err(CompanyTableError::Empty(path.to_path_buf()));
        }

        let directory = Self::from_entries(
            table
                .company_identifiers
                .into_iter()
                .map(|entry| (entry.value, entry.name)),
        );
        tracing::debug!(path = %path.display(), companies = directory.len(), "Loaded company identifier table");
        Ok(directory)
    }

    /// Build a directory from `(identifier, name)` pairs. Later duplicates win.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u16, S)>,
        S: Into<String>,
    {
        Self {
            names: entries
                .into_iter()
                .map(|(id, name)| (id, name.into()))
                .collect(),
        }
    }

    /// Resolve an identifier, falling back to [`UNKNOWN_COMPANY`].
    #[must_use]
    pub fn resolve(&self, company_id: u16) -> &str {
        self.names
            .get(&company_id)
            .map_or(UNKNOWN_COMPANY, String::as_str)
    }

    /// Number of known companies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the directory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_table(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_table() {
        let file = write_table(
            r#"
[[company_identifiers]]
value = 76
name = "Apple, Inc."

[[company_identifiers]]
value = 0x00E0
name = "Google"
"#,
        );

        let directory = CompanyDirectory::load(file.path()).unwrap();
        assert_eq!(directory.len(), 2);
        assert_eq!(directory.resolve(0x004C), "Apple, Inc.");
        assert_eq!(directory.resolve(224), "Google");
    }

    #[test]
    fn test_unknown_identifier() {
        let directory = CompanyDirectory::from_entries([(76u16, "Apple, Inc.")]);
        assert_eq!(directory.resolve(0xFFFF), UNKNOWN_COMPANY);
    }

    #[test]
    fn test_missing_file() {
        let err = CompanyDirectory::load("/nonexistent/company_identifiers.toml").unwrap_err();
        assert!(matches!(err, CompanyTableError::NotFound(_)));
    }

    #[test]
    fn test_malformed_file() {
        let file = write_table("company_identifiers = [{ value = 1, name = \"Test Co\"");
        let err = CompanyDirectory::load(file.path()).unwrap_err();
        assert!(matches!(err, CompanyTableError::ParseError { .. }));
    }

    #[test]
    fn test_wrong_shape() {
        let file = write_table("[[company_identifiers]]\nvalue = \"not a number\"\nname = \"X\"\n");
        let err = CompanyDirectory::load(file.path()).unwrap_err();
        assert!(matches!(err, CompanyTableError::ParseError { .. }));
    }

    #[test]
    fn test_empty_table_is_an_error() {
        let file = write_table("company_identifiers = []\n");
        let err = CompanyDirectory::load(file.path()).unwrap_err();
        assert!(matches!(err, CompanyTableError::Empty(_)));
    }

    #[test]
    fn test_shipped_table_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/company_identifiers.toml");
        let directory = CompanyDirectory::load(path).unwrap();
        assert_eq!(directory.resolve(0x004C), "Apple, Inc.");
        assert_eq!(directory.resolve(0x0075), "Samsung Electronics Co. Ltd.");
        assert_eq!(directory.resolve(0x067C), "Tile, Inc.");
        assert!(directory.len() >= 30);
    }
}
