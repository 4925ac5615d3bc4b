/// Error types for template loading, rendering and encoding.
///
/// Element errors are scoped to one template section: the loader records them
/// and keeps going. Everything in [`GeneratorError`] aborts the render and no
/// image is produced.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to build a single element from its template section.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElementError {
    #[error("No element type \"{type_tag}\" for element {element}")]
    UnresolvedType { element: String, type_tag: String },

    #[error("Parameter \"{field}\" not found for element {element}")]
    MissingField { element: String, field: &'static str },

    #[error("Resource path {} for element {element} is invalid", path.display())]
    ResourceNotFound { element: String, path: PathBuf },

    #[error("Invalid value \"{value}\" for {field} of element {element}: {reason}")]
    InvalidValue {
        element: String,
        field: &'static str,
        value: String,
        reason: String,
    },
}

impl ElementError {
    pub(crate) fn invalid(
        element: &str,
        field: &'static str,
        value: &str,
        reason: impl Into<String>,
    ) -> Self {
        ElementError::InvalidValue {
            element: element.to_string(),
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(element: &str, field: &'static str) -> Self {
        ElementError::MissingField {
            element: element.to_string(),
            field,
        }
    }
}

/// Failure to read or parse a template file.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to read template {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Syntax error in template \"{template}\" line {line}: {message}")]
    Syntax {
        template: String,
        line: usize,
        message: String,
    },
}

/// Failure inside the graphics backend or the fallback encoder.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("GIF encoding error: {0}")]
    Gif(#[from] gif::EncodingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid canvas size {width}x{height}")]
    InvalidCanvas { width: u32, height: u32 },

    #[error("Unable to load font {}", path.display())]
    Font { path: PathBuf },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Fatal render failure: no image is produced.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("No [config] section in template \"{template}\"")]
    MissingConfigSection { template: String },

    #[error("Invalid [config] section in template \"{template}\": {source}")]
    InvalidConfigSection {
        template: String,
        #[source]
        source: ElementError,
    },

    #[error("Invalid renderer {0}")]
    InvalidRenderer(String),

    #[error("Import cycle detected: {}", chain.join(" -> "))]
    ImportCycle { chain: Vec<String> },

    #[error("Import of \"{template}\" exceeds the maximum depth of {max_depth}")]
    ImportTooDeep { template: String, max_depth: usize },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type Result<T, E = GeneratorError> = std::result::Result<T, E>;
