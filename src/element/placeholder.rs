/// `%token%` substitution in text strings.
///
/// Values come from the request layer. A substituted value may itself contain
/// a token, so passes repeat until none is left, up to a fixed bound.
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Default bound on substitution passes.
pub const DEFAULT_MAX_PASSES: usize = 8;

static TOKEN: OnceLock<Regex> = OnceLock::new();

fn token_pattern() -> &'static Regex {
    TOKEN.get_or_init(|| Regex::new(r"%([A-Za-z0-9]+)%").expect("valid placeholder pattern"))
}

/// Supplies values for `%name%` tokens.
pub trait PlaceholderResolver {
    fn resolve(&self, name: &str) -> Option<String>;
}

impl PlaceholderResolver for HashMap<String, String> {
    fn resolve(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Resolver without any values: every token becomes the empty string.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPlaceholders;

impl PlaceholderResolver for NoPlaceholders {
    fn resolve(&self, _name: &str) -> Option<String> {
        None
    }
}

/// Result of [`substitute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub text: String,
    pub passes: usize,
    /// Tokens were still present when the pass bound was reached.
    pub exhausted: bool,
}

/// What happens to a token the resolver has no value for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownTokens {
    /// Replaced by the empty string
    Blank,
    /// Left verbatim, so `%H%M` in a date format survives
    Keep,
}

/// Replace tokens by resolver values (absent values become empty) until no
/// token remains or `max_passes` passes ran.
pub fn substitute(
    input: &str,
    resolver: &dyn PlaceholderResolver,
    max_passes: usize,
) -> Substitution {
    substitute_with(input, resolver, max_passes, UnknownTokens::Blank)
}

/// [`substitute`] with a choice for unknown tokens. With
/// [`UnknownTokens::Keep`] passes only repeat while a known token remains,
/// and every `%` is tried as a token start so `%H%name%` finds `name`.
pub fn substitute_with(
    input: &str,
    resolver: &dyn PlaceholderResolver,
    max_passes: usize,
    unknown: UnknownTokens,
) -> Substitution {
    let pattern = token_pattern();
    let mut text = input.to_string();
    let mut passes = 0;

    loop {
        let next = match unknown {
            UnknownTokens::Blank => pattern.is_match(&text).then(|| {
                pattern
                    .replace_all(&text, |caps: &Captures| {
                        resolver.resolve(&caps[1]).unwrap_or_default()
                    })
                    .into_owned()
            }),
            UnknownTokens::Keep => replace_known(&text, resolver),
        };
        let Some(next) = next else {
            break;
        };
        if passes >= max_passes {
            return Substitution {
                text,
                passes,
                exhausted: true,
            };
        }
        text = next;
        passes += 1;
    }

    Substitution {
        text,
        passes,
        exhausted: false,
    }
}

/// One pass over `text` replacing only tokens the resolver knows; `None`
/// when there are none.
fn replace_known(text: &str, resolver: &dyn PlaceholderResolver) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut replaced = false;
    let mut rest = text;

    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let value = after.find('%').and_then(|end| {
            let name = &after[..end];
            let is_token = !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric());
            is_token
                .then(|| resolver.resolve(name))
                .flatten()
                .map(|value| (value, end))
        });
        match value {
            Some((value, end)) => {
                out.push_str(&value);
                rest = &after[end + 1..];
                replaced = true;
            }
            None => {
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);

    replaced.then_some(out)
}
