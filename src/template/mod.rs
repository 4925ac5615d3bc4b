pub mod loader;
pub mod model;
pub mod parser;
pub mod store;

pub use loader::{LoadedTemplate, TemplateLoader};
pub use model::{Section, Template};
pub use store::{DirectoryStore, TemplateStore};
