//! Resource catalog: the ordered list of sample names the server can provide.
//!
//! Loaded once at startup from the embedded list or a user-supplied JSON
//! file, then shared read-only.

use std::fmt;
use std::path::Path;

const DEFAULT_CATALOG: &str = include_str!("../catalog.json");

/// Catalog name whose file on the server carries a different name.
const RENAMED: (&str, &str) = ("circularstring", "circularstring-128");

/// Name a catalog entry is fetched and installed under.
pub fn resolve_name(name: &str) -> &str {
    if name == RENAMED.0 {
        RENAMED.1
    } else {
        name
    }
}

#[derive(Debug)]
pub enum CatalogError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl From<std::io::Error> for CatalogError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for CatalogError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceCatalog {
    names: Vec<String>,
}

impl ResourceCatalog {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn embedded() -> Self {
        Self::from_json(DEFAULT_CATALOG).expect("Failed to parse embedded catalog.json")
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let names: Vec<String> = serde_json::from_str(json)?;
        Ok(Self { names })
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// The configured override if it loads, otherwise the embedded catalog.
    pub fn load(override_path: Option<&Path>) -> Self {
        if let Some(path) = override_path {
            match Self::from_file(path) {
                Ok(catalog) => {
                    log::info!(
                        target: "provision",
                        "loaded {} catalog entries from {}",
                        catalog.len(),
                        path.display()
                    );
                    return catalog;
                }
                Err(e) => {
                    log::warn!(target: "provision", "ignoring catalog {}: {}", path.display(), e);
                }
            }
        }
        Self::embedded()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
