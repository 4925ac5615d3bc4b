/// Template lookup by name.
use std::path::PathBuf;
use tracing::debug;

use super::model::Template;
use super::parser;
use crate::error::TemplateError;

/// Extension of template files inside the template directory.
pub const TEMPLATE_EXTENSION: &str = "conf";

/// Resolves a template name to its parsed sections.
///
/// A missing template is `Ok(None)`, not an error: the loader decides whether
/// the absence matters.
pub trait TemplateStore {
    fn resolve(&self, name: &str) -> Result<Option<Template>, TemplateError>;
}

/// Templates stored as `<root>/<name>.conf`.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{TEMPLATE_EXTENSION}"))
    }
}

impl TemplateStore for DirectoryStore {
    fn resolve(&self, name: &str) -> Result<Option<Template>, TemplateError> {
        let path = self.path_for(name);
        if !path.is_file() {
            debug!("Template file not found: {}", path.display());
            return Ok(None);
        }
        parser::parse_template_file(name, &path).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_store_resolves_conf_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("banner.conf"),
            "[config]\nformat = png\n",
        )
        .unwrap();

        let store = DirectoryStore::new(dir.path());
        let template = store.resolve("banner").unwrap().unwrap();
        assert_eq!(template.name, "banner");
        assert_eq!(template.section("config").unwrap().get("format"), Some("png"));

        assert!(store.resolve("missing").unwrap().is_none());
    }
}
