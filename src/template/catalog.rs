//! Template catalog for storing and retrieving template definitions

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::model::TemplateData;

/// Name of the index file listing the templates of a catalog directory
pub const INDEX_FILE: &str = "template-index.json";

/// Errors that can occur while building or querying the catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Template not found in catalog
    #[error("template not found: {id}")]
    NotFound { id: String },

    /// Duplicate template definition
    #[error("duplicate template definition: {id}")]
    Duplicate { id: String },

    /// Error reading a template or index file
    #[error("error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed template JSON
    #[error("invalid template JSON in {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One entry of `template-index.json`
#[derive(Debug, Clone, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub file: String,
    #[serde(default)]
    pub slides: Option<u32>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// Read-only set of templates keyed by id
#[derive(Debug, Default)]
pub struct TemplateCatalog {
    templates: HashMap<String, TemplateData>,
}

impl TemplateCatalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a JSON object mapping template id to template
    pub fn from_bundle_json(json: &str) -> Result<Self, CatalogError> {
        let bundle: HashMap<String, TemplateData> =
            serde_json::from_str(json).map_err(|source| CatalogError::Parse {
                origin: "bundle".to_string(),
                source,
            })?;

        let mut catalog = Self::new();
        for (_, template) in bundle {
            catalog.register(template)?;
        }
        Ok(catalog)
    }

    /// Load every template listed in a directory's `template-index.json`.
    ///
    /// Entries whose file is missing are skipped with a warning.
    pub fn from_dir(dir: &Path) -> Result<Self, CatalogError> {
        let index_path = dir.join(INDEX_FILE);
        let index = read(&index_path)?;
        let entries: Vec<IndexEntry> =
            serde_json::from_str(&index).map_err(|source| CatalogError::Parse {
                origin: index_path.display().to_string(),
                source,
            })?;

        let mut catalog = Self::new();
        for entry in entries {
            let path = dir.join(&entry.file);
            if !path.exists() {
                tracing::warn!(template = %entry.id, file = %path.display(), "template file not found, skipping");
                continue;
            }
            let template = parse_template_file(&path)?;
            if template.id != entry.id {
                tracing::warn!(
                    index_id = %entry.id,
                    template_id = %template.id,
                    "index id differs from template id, using template id"
                );
            }
            catalog.register(template)?;
        }
        Ok(catalog)
    }

    /// Load a catalog from a path: a directory with an index, a bundle
    /// object keyed by id, or a single template document
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        if path.is_dir() {
            return Self::from_dir(path);
        }

        let content = read(path)?;
        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|source| CatalogError::Parse {
                origin: path.display().to_string(),
                source,
            })?;

        if value.get("nodeTree").is_some() {
            let mut catalog = Self::new();
            catalog.register(parse_value(value, path)?)?;
            Ok(catalog)
        } else {
            let bundle: HashMap<String, TemplateData> =
                serde_json::from_value(value).map_err(|source| CatalogError::Parse {
                    origin: path.display().to_string(),
                    source,
                })?;
            let mut catalog = Self::new();
            for (_, template) in bundle {
                catalog.register(template)?;
            }
            Ok(catalog)
        }
    }

    /// Register a template
    pub fn register(&mut self, template: TemplateData) -> Result<(), CatalogError> {
        if self.templates.contains_key(&template.id) {
            return Err(CatalogError::Duplicate { id: template.id });
        }
        self.templates.insert(template.id.clone(), template);
        Ok(())
    }

    /// Get a template by id
    pub fn get(&self, id: &str) -> Option<&TemplateData> {
        self.templates.get(id)
    }

    /// Get a template by id or a `NotFound` error
    pub fn require(&self, id: &str) -> Result<&TemplateData, CatalogError> {
        self.get(id).ok_or_else(|| CatalogError::NotFound { id: id.to_string() })
    }

    /// Check if a template exists
    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    /// All template ids, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.templates.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Parse a single template document from disk
pub fn parse_template_file(path: &Path) -> Result<TemplateData, CatalogError> {
    let content = read(path)?;
    serde_json::from_str(&content).map_err(|source| CatalogError::Parse {
        origin: path.display().to_string(),
        source,
    })
}

fn parse_value(value: serde_json::Value, path: &Path) -> Result<TemplateData, CatalogError> {
    serde_json::from_value(value).map_err(|source| CatalogError::Parse {
        origin: path.display().to_string(),
        source,
    })
}

fn read(path: &Path) -> Result<String, CatalogError> {
    std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template_json(id: &str) -> String {
        format!(
            r#"{{
                "id": "{id}", "name": "Template {id}", "version": 1,
                "width": 2160, "height": 1350, "slideWidth": 1080, "slideHeight": 1350,
                "slides": 2, "photoLayerNamePrefix": "photo-",
                "nodeTree": {{ "id": "0:1", "type": "FRAME", "name": "root" }}
            }}"#
        )
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "carousel-catalog-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_bundle_json() {
        let json = format!(r#"{{ "a": {}, "b": {} }}"#, template_json("a"), template_json("b"));
        let catalog = TemplateCatalog::from_bundle_json(&json).expect("Should parse");
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.ids(), vec!["a", "b"]);
        assert_eq!(catalog.require("a").unwrap().name, "Template a");
    }

    #[test]
    fn test_missing_template() {
        let catalog = TemplateCatalog::new();
        assert!(catalog.is_empty());
        let err = catalog.require("nope").unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_duplicate_registration() {
        let mut catalog = TemplateCatalog::new();
        let template: TemplateData = serde_json::from_str(&template_json("a")).unwrap();
        catalog.register(template.clone()).unwrap();
        let err = catalog.register(template).unwrap_err();
        assert!(matches!(err, CatalogError::Duplicate { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let err = TemplateCatalog::from_bundle_json("{ not json").unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
    }

    #[test]
    fn test_from_dir_skips_missing_files() {
        let dir = scratch_dir("index");
        std::fs::write(dir.join("t1.json"), template_json("t1")).unwrap();
        std::fs::write(
            dir.join(INDEX_FILE),
            r#"[
                { "id": "t1", "name": "One", "file": "t1.json", "slides": 2 },
                { "id": "t2", "file": "missing.json" }
            ]"#,
        )
        .unwrap();

        let catalog = TemplateCatalog::load(&dir).expect("Should load");
        assert_eq!(catalog.ids(), vec!["t1"]);
        assert!(!catalog.contains("t2"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_single_template_file() {
        let dir = scratch_dir("single");
        let path = dir.join("only.json");
        std::fs::write(&path, template_json("only")).unwrap();
        let catalog = TemplateCatalog::load(&path).expect("Should load");
        assert!(catalog.contains("only"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
