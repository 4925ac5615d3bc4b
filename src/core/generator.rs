/// Render session: load a template, composite its frames, encode the result.
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::config::{ErrorPolicy, GeneratorConfig};
use crate::element::{PlaceholderResolver, RenderContext};
use crate::error::Result;
use crate::render::backend::GraphicsBackend;
use crate::render::compositor::Compositor;
use crate::render::encoder::{EncodedImage, OutputEncoder};
use crate::render::gif::{AnimatedEncoder, GifFallbackEncoder};
use crate::render::raster::RasterBackend;
use crate::template::loader::{LoadedTemplate, TemplateLoader};
use crate::template::store::{DirectoryStore, TemplateStore};

/// Result of one render request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Image {
        image: EncodedImage,
        /// Non-fatal problems (unresolved fonts, missing imports, tolerated element errors)
        warnings: Vec<String>,
    },
    /// Elements failed to load and the error policy forbids a partial image
    Rejected { errors: Vec<String> },
}

pub struct Generator {
    config: GeneratorConfig,
    store: Box<dyn TemplateStore + Send + Sync>,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        let store = DirectoryStore::new(config.template_dir.clone());
        Self::with_store(config, store)
    }

    pub fn with_store(
        config: GeneratorConfig,
        store: impl TemplateStore + Send + Sync + 'static,
    ) -> Self {
        Self {
            config,
            store: Box::new(store),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Template to render for a requested name; blank means the default one.
    pub fn template_name<'n>(&'n self, requested: Option<&'n str>) -> &'n str {
        match requested.map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => &self.config.default_template,
        }
    }

    pub fn render(
        &self,
        template: &str,
        placeholders: &dyn PlaceholderResolver,
    ) -> Result<RenderOutcome> {
        self.render_at(template, placeholders, Utc::now())
    }

    /// Render with Date and Timer elements evaluated at `now`.
    pub fn render_at(
        &self,
        template: &str,
        placeholders: &dyn PlaceholderResolver,
        now: DateTime<Utc>,
    ) -> Result<RenderOutcome> {
        let loaded = self.load(template, placeholders, now)?;
        let renderer = loaded.config.renderer()?;
        let backend = RasterBackend::new(renderer);
        self.render_loaded(&loaded, &backend, &GifFallbackEncoder::new())
    }

    pub fn load(
        &self,
        template: &str,
        placeholders: &dyn PlaceholderResolver,
        now: DateTime<Utc>,
    ) -> Result<LoadedTemplate> {
        TemplateLoader::new(self.store.as_ref(), &self.config.resources, placeholders)
            .with_max_import_depth(self.config.max_import_depth)
            .with_max_substitution_passes(self.config.max_substitution_passes)
            .with_default_timezone(self.config.default_timezone)
            .at(now)
            .load(template)
    }

    /// Composite and encode an already loaded template on `backend`.
    pub fn render_loaded(
        &self,
        loaded: &LoadedTemplate,
        backend: &dyn GraphicsBackend,
        fallback: &dyn AnimatedEncoder,
    ) -> Result<RenderOutcome> {
        let mut warnings = loaded.warnings.clone();

        if loaded.has_errors() {
            let errors = loaded.error_messages();
            match self.config.error_policy {
                ErrorPolicy::Report => {
                    warn!(
                        "Template {} has {} element error(s), no image rendered",
                        loaded.name,
                        errors.len()
                    );
                    return Ok(RenderOutcome::Rejected { errors });
                }
                ErrorPolicy::Render => {
                    for error in &errors {
                        warn!("Template {}: {}", loaded.name, error);
                    }
                    warnings.extend(errors);
                }
            }
        }

        let composed = Compositor::new(RenderContext {
            config: &loaded.config,
            elements: &loaded.elements,
            backend,
        })
        .render()?;
        warnings.extend(composed.warnings);

        let image = OutputEncoder::new(backend, fallback).encode(composed.frames, &loaded.config)?;
        info!(
            "Rendered template {} as {} ({} bytes)",
            loaded.name,
            image.content_type,
            image.bytes.len()
        );
        Ok(RenderOutcome::Image { image, warnings })
    }
}

/// Query values with control characters removed, for `%token%` substitution.
pub fn sanitize_params(
    params: impl IntoIterator<Item = (String, String)>,
) -> HashMap<String, String> {
    params
        .into_iter()
        .map(|(key, value)| (key, value.chars().filter(|c| !c.is_control()).collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::NoPlaceholders;
    use crate::error::{GeneratorError, TemplateError};
    use crate::geometry::Point;
    use crate::render::backend::Renderer;
    use crate::render::test_support::RecordingBackend;
    use crate::template::model::Template;
    use crate::template::parser::parse_template_str;
    use chrono::TimeZone;
    use std::io::Cursor;

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

    /// Generator whose resources contain an (empty) font `Sans.ttf` for template `tpl`.
    fn generator(store: MemoryStore, policy: ErrorPolicy) -> (Generator, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let fonts = dir.path().join("fonts").join("tpl");
        std::fs::create_dir_all(&fonts).unwrap();
        std::fs::write(fonts.join("Sans.ttf"), b"").unwrap();

        let config = GeneratorConfig {
            resources: crate::config::ResourceLayout::new(dir.path()),
            error_policy: policy,
            ..GeneratorConfig::default()
        };
        (Generator::with_store(config, store), dir)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap()
    }

    const HELLO: &str = "\
[config]
format = jpg
layout = sans, missing, hello

[sans]
type = font
file = Sans.ttf

[hello]
type = text
string = Hello
font = sans
position = 10,10
";

    #[test]
    fn test_static_jpeg_end_to_end() {
        let (generator, _dir) =
            generator(MemoryStore::default().with("tpl", HELLO), ErrorPolicy::Report);
        let loaded = generator.load("tpl", &NoPlaceholders, now()).unwrap();
        assert!(!loaded.has_errors());

        let backend = RecordingBackend::new(Renderer::Gd);
        let outcome = generator
            .render_loaded(&loaded, &backend, &GifFallbackEncoder::new())
            .unwrap();

        let RenderOutcome::Image { image, warnings } = outcome else {
            panic!("expected an image");
        };
        assert!(warnings.is_empty());
        assert_eq!(image.content_type, "image/jpeg");
        assert_eq!(image.filename, None);
        let decoded = image::load_from_memory(&image.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (200, 100));

        let texts = backend.texts();
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].text, "Hello");
        assert_eq!(texts[0].position, Point::new(10, 10));
    }

    #[test]
    fn test_timer_gif_on_gd_uses_fallback() {
        let source = "\
[config]
format = gif
renderer = Gd
frames = 3
interval = 1
layout = sans, clock

[sans]
type = font
file = Sans.ttf

[clock]
type = timer
string = %H:%M:%S
font = sans
";
        let (generator, _dir) =
            generator(MemoryStore::default().with("tpl", source), ErrorPolicy::Report);
        let loaded = generator.load("tpl", &NoPlaceholders, now()).unwrap();
        let backend = RecordingBackend::new(loaded.config.renderer().unwrap());

        let RenderOutcome::Image { image, .. } = generator
            .render_loaded(&loaded, &backend, &GifFallbackEncoder::new())
            .unwrap()
        else {
            panic!("expected an image");
        };
        assert_eq!(image.content_type, "image/gif");
        assert_eq!(image.filename.as_deref(), Some("output.gif"));

        let mut decoder = gif::DecodeOptions::new()
            .read_info(Cursor::new(image.bytes))
            .unwrap();
        let mut delays = Vec::new();
        while let Some(frame) = decoder.read_next_frame().unwrap() {
            delays.push(frame.delay);
        }
        assert_eq!(delays, vec![100, 100, 100]);
        assert!(matches!(decoder.repeat(), gif::Repeat::Infinite));

        let drawn: Vec<String> = backend.texts().into_iter().map(|t| t.text).collect();
        assert_eq!(drawn, vec!["08:30:00", "08:30:01", "08:30:02"]);
    }

    #[test]
    fn test_element_errors_reject_under_report_policy() {
        let source = format!("{HELLO}\n[broken]\ntype = sparkle\n");
        let (generator, _dir) =
            generator(MemoryStore::default().with("tpl", &source), ErrorPolicy::Report);
        let outcome = generator.render_at("tpl", &NoPlaceholders, now()).unwrap();

        let RenderOutcome::Rejected { errors } = outcome else {
            panic!("expected a rejection");
        };
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("sparkle"));
    }

    #[test]
    fn test_element_errors_become_warnings_under_render_policy() {
        let source = "[config]\nformat = png\nlayout = broken\n\n[broken]\ntype = sparkle\n";
        let (generator, _dir) =
            generator(MemoryStore::default().with("tpl", source), ErrorPolicy::Render);
        let outcome = generator.render_at("tpl", &NoPlaceholders, now()).unwrap();

        let RenderOutcome::Image { image, warnings } = outcome else {
            panic!("expected an image");
        };
        assert_eq!(image.content_type, "image/png");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_invalid_renderer_is_fatal() {
        let (generator, _dir) = generator(
            MemoryStore::default().with("tpl", "[config]\nrenderer = Cairo\n"),
            ErrorPolicy::Report,
        );
        assert!(matches!(
            generator.render_at("tpl", &NoPlaceholders, now()),
            Err(GeneratorError::InvalidRenderer(name)) if name == "Cairo"
        ));
    }

    #[test]
    fn test_missing_template_is_fatal() {
        let (generator, _dir) = generator(MemoryStore::default(), ErrorPolicy::Report);
        assert!(matches!(
            generator.render_at("nowhere", &NoPlaceholders, now()),
            Err(GeneratorError::MissingConfigSection { .. })
        ));
    }

    #[test]
    fn test_template_name_defaults() {
        let (generator, _dir) = generator(MemoryStore::default(), ErrorPolicy::Report);
        assert_eq!(generator.template_name(None), "default");
        assert_eq!(generator.template_name(Some("  ")), "default");
        assert_eq!(generator.template_name(Some("promo")), "promo");
    }

    #[test]
    fn test_sanitize_params_strips_control_characters() {
        let params = sanitize_params(vec![("name".to_string(), "Ada\r\n\tL\u{7}".to_string())]);
        assert_eq!(params["name"], "AdaL");
    }
}
