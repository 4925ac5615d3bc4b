/// Formatted dates. A Date is formatted once at load time; a Timer holds one
/// string per frame, advancing by the configured interval.
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use std::fmt::Write;

use crate::element::placeholder::UnknownTokens;
use crate::element::text::TextElement;
use crate::element::{BuildContext, Draw, ElementBase, ElementKind, FrameRenderer, RenderContext};
use crate::error::{BackendError, ElementError};
use crate::render::canvas::Canvas;
use crate::template::model::Section;

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format `instant` in `timezone` with a strftime pattern, rejecting
/// malformed patterns.
fn format_instant(
    element: &str,
    format: &str,
    instant: DateTime<Utc>,
    timezone: Tz,
) -> Result<String, ElementError> {
    let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(ElementError::invalid(
            element,
            "string",
            format,
            "invalid date format",
        ));
    }

    let mut out = String::new();
    write!(
        out,
        "{}",
        instant.with_timezone(&timezone).format_with_items(items.iter())
    )
    .map_err(|_| ElementError::invalid(element, "string", format, "date cannot be formatted"))?;
    Ok(out)
}

fn load_timezone(text: &TextElement, section: &Section) -> Result<Option<Tz>, ElementError> {
    section
        .get("timezone")
        .map(|value| {
            value.trim().parse::<Tz>().map_err(|_| {
                ElementError::invalid(&text.base.name, "timezone", value, "unknown timezone")
            })
        })
        .transpose()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateElement {
    /// `text.string` holds the format until load completes, the formatted date after
    pub text: TextElement,
    pub timezone: Tz,
}

impl ElementKind for DateElement {
    fn with_defaults(base: ElementBase, ctx: &BuildContext<'_>) -> Self {
        let mut text = TextElement::with_defaults(base, ctx);
        text.string = DEFAULT_DATE_FORMAT.to_string();
        Self {
            text,
            timezone: ctx.default_timezone,
        }
    }

    fn load_section(&mut self, section: &Section) -> Result<(), ElementError> {
        self.text.load_section(section)?;
        if let Some(timezone) = load_timezone(&self.text, section)? {
            self.timezone = timezone;
        }
        Ok(())
    }

    fn post_load(&mut self, ctx: &BuildContext<'_>) -> Result<(), ElementError> {
        // Strftime specifiers look like tokens, only known names are replaced
        self.text.substitute_placeholders(ctx, UnknownTokens::Keep);
        self.text.string = format_instant(
            &self.text.base.name,
            &self.text.string,
            ctx.now,
            self.timezone,
        )?;
        Ok(())
    }
}

impl FrameRenderer for DateElement {
    fn render_to_frame(
        &self,
        ctx: &RenderContext<'_>,
        _frame: usize,
        target: &mut Canvas,
    ) -> Result<Draw, BackendError> {
        self.text.draw_string(ctx, target, &self.text.string)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimerElement {
    pub text: TextElement,
    pub timezone: Tz,
    /// Format after placeholder substitution
    pub format: String,
    /// Instant of frame 0
    pub anchor: DateTime<Utc>,
    /// One formatted string per frame
    pub strings: Vec<String>,
}

impl TimerElement {
    /// Recompute one string per frame, frame `i` showing
    /// `anchor + i * interval` seconds.
    pub fn expand(&mut self, frames: usize, interval: u32) -> Result<(), ElementError> {
        self.strings = (0..frames.max(1))
            .map(|i| {
                let instant = Duration::try_seconds(i as i64 * i64::from(interval))
                    .and_then(|offset| self.anchor.checked_add_signed(offset))
                    .ok_or_else(|| {
                        ElementError::invalid(
                            &self.text.base.name,
                            "string",
                            &self.format,
                            format!("frame {i} is out of the date range"),
                        )
                    })?;
                format_instant(&self.text.base.name, &self.format, instant, self.timezone)
            })
            .collect::<Result<_, _>>()?;
        Ok(())
    }

    /// String shown on `frame`; frames past the end repeat the last one.
    pub fn string_for(&self, frame: usize) -> &str {
        self.strings
            .get(frame)
            .or(self.strings.last())
            .map(String::as_str)
            .unwrap_or_default()
    }
}

impl ElementKind for TimerElement {
    fn with_defaults(base: ElementBase, ctx: &BuildContext<'_>) -> Self {
        let date = DateElement::with_defaults(base, ctx);
        Self {
            format: date.text.string.clone(),
            text: date.text,
            timezone: date.timezone,
            anchor: ctx.now,
            strings: Vec::new(),
        }
    }

    fn load_section(&mut self, section: &Section) -> Result<(), ElementError> {
        self.text.load_section(section)?;
        if let Some(timezone) = load_timezone(&self.text, section)? {
            self.timezone = timezone;
        }
        Ok(())
    }

    fn post_load(&mut self, ctx: &BuildContext<'_>) -> Result<(), ElementError> {
        self.text.substitute_placeholders(ctx, UnknownTokens::Keep);
        self.format = self.text.string.clone();
        self.anchor = ctx.now;

        let (frames, interval) = ctx
            .config
            .map(|config| (config.frames, config.interval))
            .unwrap_or((1, 1));
        self.expand(frames, interval)?;
        self.text.string = self.strings.first().cloned().unwrap_or_default();
        Ok(())
    }
}

impl FrameRenderer for TimerElement {
    fn render_to_frame(
        &self,
        ctx: &RenderContext<'_>,
        frame: usize,
        target: &mut Canvas,
    ) -> Result<Draw, BackendError> {
        self.text.draw_string(ctx, target, self.string_for(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceLayout;
    use crate::element::test_support::{context, section};
    use crate::element::{ConfigMeta, NoPlaceholders};
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_date_defaults_to_iso_like_format() {
        let resources = ResourceLayout::new("/nonexistent");
        let ctx = context("tpl", None, &resources, &NoPlaceholders, instant());

        let date =
            DateElement::build(ElementBase::new("tpl", "d"), &section("d", &[]), &ctx).unwrap();
        assert_eq!(date.text.string, "2024-03-01 12:00:00");
        assert_eq!(date.timezone, Tz::UTC);
    }

    #[test]
    fn test_date_uses_timezone() {
        let resources = ResourceLayout::new("/nonexistent");
        let ctx = context("tpl", None, &resources, &NoPlaceholders, instant());

        let date = DateElement::build(
            ElementBase::new("tpl", "d"),
            &section("d", &[("string", "%H:%M %Z"), ("timezone", "Europe/Paris")]),
            &ctx,
        )
        .unwrap();
        assert_eq!(date.text.string, "13:00 CET");
    }

    #[test]
    fn test_date_rejects_bad_format_and_timezone() {
        let resources = ResourceLayout::new("/nonexistent");
        let ctx = context("tpl", None, &resources, &NoPlaceholders, instant());

        let err = DateElement::build(
            ElementBase::new("tpl", "d"),
            &section("d", &[("string", "%Q")]),
            &ctx,
        )
        .unwrap_err();
        assert!(matches!(err, ElementError::InvalidValue { field: "string", .. }));

        let err = DateElement::build(
            ElementBase::new("tpl", "d"),
            &section("d", &[("timezone", "Mars/Olympus")]),
            &ctx,
        )
        .unwrap_err();
        assert!(matches!(err, ElementError::InvalidValue { field: "timezone", .. }));
    }

    #[test]
    fn test_adjacent_specifiers_survive_placeholders() {
        let resources = ResourceLayout::new("/nonexistent");
        let ctx = context("tpl", None, &resources, &NoPlaceholders, instant());

        let build = |format: &str| {
            DateElement::build(
                ElementBase::new("tpl", "d"),
                &section("d", &[("string", format)]),
                &ctx,
            )
            .unwrap()
            .text
            .string
        };
        assert_eq!(build("%d%m%Y"), "01032024");
        assert_eq!(build("%H%M"), "1200");

        let values: HashMap<String, String> = [("sep".to_string(), "h".to_string())].into();
        let ctx = context("tpl", None, &resources, &values, instant());
        let date = DateElement::build(
            ElementBase::new("tpl", "d"),
            &section("d", &[("string", "%H%sep%%M")]),
            &ctx,
        )
        .unwrap();
        assert_eq!(date.text.string, "12h00");
    }

    #[test]
    fn test_timer_keeps_adjacent_specifiers() {
        let resources = ResourceLayout::new("/nonexistent");
        let config = ConfigMeta {
            frames: 2,
            interval: 60,
            ..ConfigMeta::default()
        };
        let ctx = context("tpl", Some(&config), &resources, &NoPlaceholders, instant());

        let timer = TimerElement::build(
            ElementBase::new("tpl", "clock"),
            &section("clock", &[("string", "%H%M")]),
            &ctx,
        )
        .unwrap();
        assert_eq!(timer.strings, vec!["1200", "1201"]);
    }

    #[test]
    fn test_timer_past_date_range_is_invalid() {
        let resources = ResourceLayout::new("/nonexistent");
        let ctx = context("tpl", None, &resources, &NoPlaceholders, instant());

        let mut timer = TimerElement::build(
            ElementBase::new("tpl", "clock"),
            &section("clock", &[("string", "%S")]),
            &ctx,
        )
        .unwrap();
        timer.anchor = DateTime::<Utc>::MAX_UTC;
        let err = timer.expand(2, 1).unwrap_err();
        assert!(matches!(err, ElementError::InvalidValue { field: "string", .. }));
    }

    #[test]
    fn test_timer_has_one_string_per_frame() {
        let resources = ResourceLayout::new("/nonexistent");
        let config = ConfigMeta {
            frames: 3,
            interval: 1,
            ..ConfigMeta::default()
        };
        let ctx = context("tpl", Some(&config), &resources, &NoPlaceholders, instant());

        let timer = TimerElement::build(
            ElementBase::new("tpl", "clock"),
            &section("clock", &[("string", "%H:%M:%S")]),
            &ctx,
        )
        .unwrap();
        assert_eq!(timer.strings, vec!["12:00:00", "12:00:01", "12:00:02"]);
        assert_eq!(timer.text.string, "12:00:00");
    }

    #[test]
    fn test_timer_reexpands_from_anchor() {
        let resources = ResourceLayout::new("/nonexistent");
        let ctx = context("tpl", None, &resources, &NoPlaceholders, instant());

        let mut timer = TimerElement::build(
            ElementBase::new("tpl", "clock"),
            &section("clock", &[("string", "%M:%S")]),
            &ctx,
        )
        .unwrap();
        assert_eq!(timer.strings, vec!["00:00"]);

        timer.expand(4, 30).unwrap();
        assert_eq!(timer.strings, vec!["00:00", "00:30", "01:00", "01:30"]);
    }

    #[test]
    fn test_timer_clamps_to_last_string() {
        let resources = ResourceLayout::new("/nonexistent");
        let ctx = context("tpl", None, &resources, &NoPlaceholders, instant());

        let mut timer = TimerElement::build(
            ElementBase::new("tpl", "clock"),
            &section("clock", &[("string", "%S")]),
            &ctx,
        )
        .unwrap();
        timer.expand(2, 5).unwrap();
        assert_eq!(timer.string_for(0), "00");
        assert_eq!(timer.string_for(1), "05");
        assert_eq!(timer.string_for(7), "05");
    }
}
