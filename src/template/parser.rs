/// INI template parser.
/// Parses `.conf` template files into ordered sections.
use ini::{Ini, ParseOption};
use std::path::Path;
use tracing::{debug, warn};

use super::model::Template;
use crate::error::TemplateError;

/// Parse a template file from disk
pub fn parse_template_file(name: &str, path: &Path) -> Result<Template, TemplateError> {
    let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_template_str(name, &source)
}

/// Parse template source text.
///
/// Repeated sections are merged, later keys winning. Keys appearing before
/// the first section header are ignored.
pub fn parse_template_str(name: &str, source: &str) -> Result<Template, TemplateError> {
    let syntax = |line: usize, message: String| TemplateError::Syntax {
        template: name.to_string(),
        line,
        message,
    };

    let options = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        enabled_indented_mutiline_value: false,
        ..ParseOption::default()
    };
    let ini = Ini::load_from_str_opt(source, options)
        .map_err(|e| syntax(e.line, e.msg.to_string()))?;

    let mut template = Template::new(name);
    for (section_name, properties) in ini.iter() {
        let Some(section_name) = section_name.map(str::trim) else {
            for (key, _) in properties.iter() {
                warn!(
                    "Template \"{}\": key \"{}\" outside of any section ignored",
                    name, key
                );
            }
            continue;
        };
        if section_name.is_empty() {
            let line = line_of(source, |line| {
                line.starts_with('[') && line[1..].trim_start().starts_with(']')
            });
            return Err(syntax(line, "empty section name".to_string()));
        }

        let section = template.section_mut(section_name);
        for (key, raw) in properties.iter() {
            let key = key.trim();
            let value = parse_value(raw).map_err(|message| {
                let line = line_of(source, |line| {
                    line.starts_with(key) && line.contains('=') && line.contains(raw.trim())
                });
                syntax(line, message.to_string())
            })?;
            section.set(key, value);
        }
    }

    debug!(
        "Parsed template \"{}\" with {} section(s)",
        name,
        template.sections.len()
    );
    Ok(template)
}

/// 1-based number of the first trimmed line matching `pred`, 0 if none does.
fn line_of(source: &str, pred: impl Fn(&str) -> bool) -> usize {
    source
        .lines()
        .position(|line| pred(line.trim()))
        .map_or(0, |idx| idx + 1)
}

/// Unquote a raw value. Quoted values are taken verbatim, unquoted values lose
/// their inline `;` comment and surrounding whitespace.
fn parse_value(raw: &str) -> Result<String, &'static str> {
    let raw = raw.trim();
    if let Some(quoted) = raw.strip_prefix('"') {
        let end = quoted.find('"').ok_or("unterminated quoted value")?;
        if !strip_comment(&quoted[end + 1..]).is_empty() {
            return Err("unexpected text after quoted value");
        }
        return Ok(quoted[..end].to_string());
    }
    Ok(strip_comment(raw).to_string())
}

fn strip_comment(text: &str) -> &str {
    match text.find(';') {
        Some(pos) => text[..pos].trim(),
        None => text.trim(),
    }
}
