use chrono_tz::Tz;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::element::placeholder::DEFAULT_MAX_PASSES;

/// Default bound on nested template imports.
pub const DEFAULT_MAX_IMPORT_DEPTH: usize = 8;

/// Template served when the request names none.
pub const DEFAULT_TEMPLATE: &str = "default";

/// Query parameter selecting the template.
pub const DEFAULT_QUERY_PARAMETER: &str = "p";

/// Top-level generator configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Directory holding `<name>.conf` templates
    pub template_dir: PathBuf,
    pub resources: ResourceLayout,
    pub listen: SocketAddr,
    pub default_template: String,
    pub query_parameter: String,
    pub max_import_depth: usize,
    pub max_substitution_passes: usize,
    /// Zone used by Date/Timer elements without a `timezone` key
    pub default_timezone: Tz,
    pub error_policy: ErrorPolicy,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("templates"),
            resources: ResourceLayout::new("resources"),
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            default_template: DEFAULT_TEMPLATE.to_string(),
            query_parameter: DEFAULT_QUERY_PARAMETER.to_string(),
            max_import_depth: DEFAULT_MAX_IMPORT_DEPTH,
            max_substitution_passes: DEFAULT_MAX_PASSES,
            default_timezone: Tz::UTC,
            error_policy: ErrorPolicy::default(),
        }
    }
}

/// What to do with an image whose template had element errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Emit no image; report the collected messages instead
    #[default]
    Report,
    /// Emit the image of everything that loaded, log the failures
    Render,
}

impl std::str::FromStr for ErrorPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "report" | "strict" => Ok(ErrorPolicy::Report),
            "render" | "lenient" => Ok(ErrorPolicy::Render),
            _ => Err(format!("Unknown error policy: {s}")),
        }
    }
}

/// Where template fonts and images live:
/// `<root>/fonts/<template>/<file>` and `<root>/images/<template>/<file>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLayout {
    root: PathBuf,
}

impl ResourceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn font_path(&self, template: &str, file: &str) -> PathBuf {
        self.root.join("fonts").join(template).join(file)
    }

    pub fn image_path(&self, template: &str, file: &str) -> PathBuf {
        self.root.join("images").join(template).join(file)
    }
}
