//! Template catalog: maps template ids to the location of their file

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A registered template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateEntry {
    pub id: String,
    pub url: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    entries: HashMap<String, TemplateEntry>,
}

impl TemplateCatalog {
    pub fn new(entries: impl IntoIterator<Item = TemplateEntry>) -> Self {
        Self { entries: entries.into_iter().map(|e| (e.id.clone(), e)).collect() }
    }

    /// Parse a JSON array of entries
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<TemplateEntry> = serde_json::from_str(json).map_err(Error::CatalogParse)?;
        Ok(Self::new(entries))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|source| Error::ReadFile { path: path.to_path_buf(), source })?;
        Self::from_json(&json)
    }

    pub fn get(&self, id: &str) -> Option<&TemplateEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_catalog() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "offer-2024", "url": "https://files.example.com/offer.pptx", "fileName": "offer.pptx"}}]"#
        )
        .unwrap();

        let catalog = TemplateCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("offer-2024").unwrap().file_name, "offer.pptx");
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn test_invalid_catalog() {
        assert!(matches!(TemplateCatalog::from_json("{}"), Err(Error::CatalogParse(_))));
        assert!(matches!(
            TemplateCatalog::load(Path::new("/nonexistent/catalog.json")),
            Err(Error::ReadFile { .. })
        ));
    }
}
