/// Resolves a template name into its configuration and element map,
/// following `import` chains parent first.
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use super::model::{sanitize_name, CONFIG_SECTION};
use super::store::TemplateStore;
use crate::config::{ResourceLayout, DEFAULT_MAX_IMPORT_DEPTH};
use crate::element::placeholder::DEFAULT_MAX_PASSES;
use crate::element::{
    BuildContext, ConfigMeta, Element, ElementFactory, ElementMap, PlaceholderResolver,
};
use crate::error::{ElementError, GeneratorError, Result};

/// A fully resolved template, ready to render.
#[derive(Debug, Clone)]
pub struct LoadedTemplate {
    pub name: String,
    pub config: ConfigMeta,
    pub elements: ElementMap,
    /// Sections that failed to build; the rest of the template still loaded
    pub errors: Vec<ElementError>,
    pub warnings: Vec<String>,
}

impl LoadedTemplate {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Accumulated state while walking an import chain.
#[derive(Default)]
struct Resolution {
    config: Option<ConfigMeta>,
    elements: ElementMap,
    errors: Vec<ElementError>,
    warnings: Vec<String>,
}

pub struct TemplateLoader<'a> {
    store: &'a dyn TemplateStore,
    resources: &'a ResourceLayout,
    placeholders: &'a dyn PlaceholderResolver,
    max_import_depth: usize,
    max_substitution_passes: usize,
    default_timezone: Tz,
    now: DateTime<Utc>,
}

impl<'a> TemplateLoader<'a> {
    pub fn new(
        store: &'a dyn TemplateStore,
        resources: &'a ResourceLayout,
        placeholders: &'a dyn PlaceholderResolver,
    ) -> Self {
        Self {
            store,
            resources,
            placeholders,
            max_import_depth: DEFAULT_MAX_IMPORT_DEPTH,
            max_substitution_passes: DEFAULT_MAX_PASSES,
            default_timezone: Tz::UTC,
            now: Utc::now(),
        }
    }

    pub fn with_max_import_depth(mut self, depth: usize) -> Self {
        self.max_import_depth = depth;
        self
    }

    pub fn with_max_substitution_passes(mut self, passes: usize) -> Self {
        self.max_substitution_passes = passes;
        self
    }

    pub fn with_default_timezone(mut self, timezone: Tz) -> Self {
        self.default_timezone = timezone;
        self
    }

    /// Evaluate Date and Timer elements at `now` instead of the current time.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn load(&self, name: &str) -> Result<LoadedTemplate> {
        let name = sanitize_name(name);
        let mut resolution = Resolution::default();
        let mut chain = Vec::new();
        self.resolve_into(&name, &mut chain, &mut resolution)?;

        let Resolution {
            config,
            mut elements,
            mut errors,
            warnings,
        } = resolution;
        let config = config.ok_or_else(|| GeneratorError::MissingConfigSection {
            template: name.clone(),
        })?;

        // Imported timers follow the frame count actually rendered
        for element in elements.values_mut() {
            if let Element::Timer(timer) = element {
                if let Err(err) = timer.expand(config.frames, config.interval) {
                    errors.push(err);
                }
            }
        }
        for base in elements.values().filter_map(Element::base) {
            base.check_frames(config.frames);
        }

        info!(
            "Loaded template {}: {} element(s), {} error(s), {} frame(s)",
            name,
            elements.len(),
            errors.len(),
            config.frames
        );

        Ok(LoadedTemplate {
            name,
            config,
            elements,
            errors,
            warnings,
        })
    }

    fn context<'c>(&'c self, template: &'c str, config: Option<&'c ConfigMeta>) -> BuildContext<'c> {
        BuildContext {
            template,
            config,
            resources: self.resources,
            placeholders: self.placeholders,
            max_substitution_passes: self.max_substitution_passes,
            now: self.now,
            default_timezone: self.default_timezone,
        }
    }

    fn resolve_into(
        &self,
        name: &str,
        chain: &mut Vec<String>,
        acc: &mut Resolution,
    ) -> Result<()> {
        if chain.iter().any(|seen| seen == name) {
            let mut cycle = chain.clone();
            cycle.push(name.to_string());
            return Err(GeneratorError::ImportCycle { chain: cycle });
        }
        if chain.len() > self.max_import_depth {
            return Err(GeneratorError::ImportTooDeep {
                template: name.to_string(),
                max_depth: self.max_import_depth,
            });
        }

        let top_level = chain.is_empty();
        let Some(template) = self.store.resolve(name)? else {
            if top_level {
                warn!("Template {} not found", name);
            } else {
                warn!("Imported template {} not found", name);
                acc.warnings
                    .push(format!("Imported template \"{name}\" not found"));
            }
            return Ok(());
        };

        if let Some(parent) = template.import_name().map(sanitize_name) {
            if !parent.is_empty() {
                debug!("Template {} imports {}", name, parent);
                chain.push(name.to_string());
                let result = self.resolve_into(&parent, chain, acc);
                chain.pop();
                result?;
            }
        }

        if let Some(section) = template.section(CONFIG_SECTION) {
            let ctx = self.context(name, acc.config.as_ref());
            match ElementFactory::config(name, section, &ctx) {
                Ok(config) => acc.config = Some(config),
                Err(source) if top_level => {
                    return Err(GeneratorError::InvalidConfigSection {
                        template: name.to_string(),
                        source,
                    });
                }
                Err(err) => {
                    warn!("Ignoring [config] of imported template {}: {}", name, err);
                    acc.errors.push(err);
                }
            }
        }

        let ctx = self.context(name, acc.config.as_ref());
        for section in template.element_sections() {
            match ElementFactory::from_section(name, section, &ctx) {
                Ok(element) => {
                    debug!("Loaded {} element {}", element.kind(), section.name);
                    acc.elements.insert(section.name.clone(), element);
                }
                Err(err) => {
                    warn!("Template {}: {}", name, err);
                    // A failed declaration still replaces the inherited element
                    acc.elements.remove(&section.name);
                    acc.errors.push(err);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::NoPlaceholders;
    use crate::error::TemplateError;
    use crate::template::model::Template;
    use crate::template::parser::parse_template_str;
    use chrono::TimeZone;
    use std::collections::HashMap;

    /// In-memory store for loader tests.
    #[derive(Default)]
    struct MemoryStore {
        templates: HashMap<String, String>,
    }

    impl MemoryStore {
        fn with(mut self, name: &str, source: &str) -> Self {
            self.templates.insert(name.to_string(), source.to_string());
            self
        }
    }

    impl TemplateStore for MemoryStore {
        fn resolve(&self, name: &str) -> std::result::Result<Option<Template>, TemplateError> {
            self.templates
                .get(name)
                .map(|source| parse_template_str(name, source))
                .transpose()
        }
    }

    fn load(store: &MemoryStore, name: &str) -> Result<LoadedTemplate> {
        let resources = ResourceLayout::new("/nonexistent");
        TemplateLoader::new(store, &resources, &NoPlaceholders)
            .at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            .load(name)
    }

    #[test]
    fn test_missing_config_section_is_fatal() {
        let store = MemoryStore::default().with("plain", "[t]\ntype = text\n");
        assert!(matches!(
            load(&store, "plain"),
            Err(GeneratorError::MissingConfigSection { template }) if template == "plain"
        ));

        let store = MemoryStore::default();
        assert!(matches!(
            load(&store, "nothing"),
            Err(GeneratorError::MissingConfigSection { .. })
        ));
    }

    #[test]
    fn test_invalid_top_level_config_is_fatal() {
        let store = MemoryStore::default().with("bad", "[config]\nframes = 0\n");
        assert!(matches!(
            load(&store, "bad"),
            Err(GeneratorError::InvalidConfigSection { .. })
        ));
    }

    #[test]
    fn test_name_is_sanitized() {
        let store = MemoryStore::default().with("banner", "[config]\nformat = png\n");
        let loaded = load(&store, "../ban-ner").unwrap();
        assert_eq!(loaded.name, "banner");
    }

    #[test]
    fn test_child_overrides_parent() {
        let store = MemoryStore::default()
            .with(
                "base",
                "[config]\nformat = png\nlayout = title,footer\n\n\
                 [title]\ntype = text\nstring = Parent\n\n\
                 [footer]\ntype = text\nstring = Footer\n",
            )
            .with(
                "child",
                "[import]\nconfiguration = base\n\n[title]\ntype = text\nstring = Child\n",
            );

        let loaded = load(&store, "child").unwrap();
        assert_eq!(loaded.config.format.to_string(), "png");
        assert_eq!(loaded.config.layout, vec!["title", "footer"]);

        let Some(Element::Text(title)) = loaded.elements.get("title") else {
            panic!("title should be a text element");
        };
        assert_eq!(title.string, "Child");
        assert!(loaded.elements.contains_key("footer"));
        assert!(!loaded.has_errors());
    }

    #[test]
    fn test_failed_child_declaration_drops_parent_element() {
        let store = MemoryStore::default()
            .with(
                "base",
                "[config]\nlayout = title\n\n[title]\ntype = text\nstring = Parent\n",
            )
            .with(
                "child",
                "[import]\nconfiguration = base\n\n\
                 [title]\ntype = text\nstring = Child\nsize = big\n",
            );

        let loaded = load(&store, "child").unwrap();
        assert_eq!(loaded.errors.len(), 1);
        assert!(!loaded.elements.contains_key("title"));
        assert_eq!(loaded.config.layout, vec!["title"]);
    }

    #[test]
    fn test_child_config_replaces_parent_config() {
        let store = MemoryStore::default()
            .with("base", "[config]\nformat = png\nframes = 4\n")
            .with("child", "[config]\nimport = base\nformat = gif\n");

        let loaded = load(&store, "child").unwrap();
        assert_eq!(loaded.config.format.to_string(), "gif");
        assert_eq!(loaded.config.frames, 1);
    }

    #[test]
    fn test_imported_timer_follows_final_frame_count() {
        let store = MemoryStore::default()
            .with(
                "base",
                "[config]\nframes = 1\n\n[clock]\ntype = timer\nstring = %S\n",
            )
            .with(
                "child",
                "[import]\nconfiguration = base\n\n[config]\nframes = 3\ninterval = 2\n",
            );

        let loaded = load(&store, "child").unwrap();
        let Some(Element::Timer(timer)) = loaded.elements.get("clock") else {
            panic!("clock should be a timer");
        };
        assert_eq!(timer.strings, vec!["00", "02", "04"]);
    }

    #[test]
    fn test_element_errors_do_not_stop_loading() {
        let store = MemoryStore::default().with(
            "mixed",
            "[config]\n\n[a]\ntype = sparkle\n\n[b]\ntype = text\n\n[c]\ntype = image\n",
        );

        let loaded = load(&store, "mixed").unwrap();
        assert!(loaded.elements.contains_key("b"));
        assert_eq!(loaded.errors.len(), 2);
        assert!(loaded.has_errors());
        assert!(loaded.error_messages()[0].contains("sparkle"));
    }

    #[test]
    fn test_missing_import_is_a_warning() {
        let store = MemoryStore::default().with("child", "[config]\nimport = ghost\n");
        let loaded = load(&store, "child").unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert!(!loaded.has_errors());
    }

    #[test]
    fn test_import_cycle_is_detected() {
        let store = MemoryStore::default()
            .with("a", "[config]\nimport = b\n")
            .with("b", "[config]\nimport = a\n");

        match load(&store, "a") {
            Err(GeneratorError::ImportCycle { chain }) => assert_eq!(chain, vec!["a", "b", "a"]),
            other => panic!("expected an import cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_import_depth_is_bounded() {
        let mut store = MemoryStore::default();
        for i in 0..12 {
            store = store.with(&format!("t{i}"), &format!("[config]\nimport = t{}\n", i + 1));
        }
        store = store.with("t12", "[config]\n");

        let resources = ResourceLayout::new("/nonexistent");
        let result = TemplateLoader::new(&store, &resources, &NoPlaceholders)
            .with_max_import_depth(3)
            .load("t0");
        assert!(matches!(
            result,
            Err(GeneratorError::ImportTooDeep { max_depth: 3, .. })
        ));

        let loaded = TemplateLoader::new(&store, &resources, &NoPlaceholders)
            .with_max_import_depth(12)
            .load("t0")
            .unwrap();
        assert!(!loaded.has_errors());
    }
}
