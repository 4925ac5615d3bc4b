/// Output format and export options.
use std::fmt;
use std::str::FromStr;

/// Encoded output format of a template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Jpg,
    Png,
    Gif,
}

impl OutputFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Jpg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Gif => "image/gif",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Gif => "gif",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(OutputFormat::Jpg),
            "png" => Ok(OutputFormat::Png),
            "gif" => Ok(OutputFormat::Gif),
            _ => Err(format!("Unknown output format: {s}")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Options handed to the backend's export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub flatten: bool,
    pub animated: bool,
    /// Delay between animation frames, in milliseconds
    pub animated_delay_ms: Option<u32>,
    /// Loop count, 0 = forever
    pub animated_loops: Option<u16>,
    pub jpeg_quality: Option<u8>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            flatten: true,
            animated: false,
            animated_delay_ms: None,
            animated_loops: None,
            jpeg_quality: None,
        }
    }
}
