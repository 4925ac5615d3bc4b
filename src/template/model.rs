/// Section holding the template-wide settings.
pub const CONFIG_SECTION: &str = "config";
/// Section naming the parent template to import.
pub const IMPORT_SECTION: &str = "import";
/// Key of the import section holding the parent template name.
pub const IMPORT_KEY: &str = "configuration";

/// One `[name]` block of a template file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    entries: Vec<(String, String)>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Insert or overwrite a key, keeping the first position of the key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A named template in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    pub sections: Vec<Section>,
}

impl Template {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sections: Vec::new(),
        }
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Get a section for writing, creating it at the end if it does not exist yet.
    pub fn section_mut(&mut self, name: &str) -> &mut Section {
        let idx = match self.sections.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.sections.push(Section::new(name));
                self.sections.len() - 1
            }
        };
        &mut self.sections[idx]
    }

    /// Name of the parent template, from `[import] configuration=` or `[config] import=`.
    pub fn import_name(&self) -> Option<&str> {
        self.section(IMPORT_SECTION)
            .and_then(|s| s.get(IMPORT_KEY))
            .or_else(|| self.section(CONFIG_SECTION).and_then(|s| s.get("import")))
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Element sections in file order (everything but `config` and `import`).
    pub fn element_sections(&self) -> impl Iterator<Item = &Section> {
        self.sections
            .iter()
            .filter(|s| s.name != CONFIG_SECTION && s.name != IMPORT_SECTION)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

// -- Helpers --

/// Strip everything but ASCII alphanumerics from a template name.
pub fn sanitize_name(name: &str) -> String {
    name.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// Split a comma-separated value into trimmed items, dropping empty ones.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_set_overwrites_in_place() {
        let mut section = Section::new("t1");
        section.set("type", "text");
        section.set("string", "Hello");
        section.set("type", "date");

        let keys: Vec<_> = section.entries().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["type", "string"]);
        assert_eq!(section.get("type"), Some("date"));
    }

    #[test]
    fn test_import_name_prefers_import_section() {
        let mut template = Template::new("child");
        template.section_mut("config").set("import", "fromconfig");
        assert_eq!(template.import_name(), Some("fromconfig"));

        template
            .section_mut(IMPORT_SECTION)
            .set(IMPORT_KEY, " parent ");
        assert_eq!(template.import_name(), Some("parent"));
    }

    #[test]
    fn test_element_sections_skip_special_ones() {
        let mut template = Template::new("t");
        template.section_mut("import");
        template.section_mut("f1");
        template.section_mut("config");
        template.section_mut("t1");

        let names: Vec<_> = template.element_sections().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["f1", "t1"]);
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_name("Banner2024"), "Banner2024");
        assert_eq!(sanitize_name("été"), "t");
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" bg, t1 ,,t2 "), vec!["bg", "t1", "t2"]);
        assert!(split_list("").is_empty());
    }
}
