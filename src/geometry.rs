/// Small value types shared by elements and the graphics backend.
use std::fmt;
use std::str::FromStr;

/// Top-left position on a canvas, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0, y: 0 };

    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl FromStr for Point {
    type Err = String;

    /// Parse `"x,y"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [x, y] = parse_components::<2>(s)?;
        Ok(Point { x, y })
    }
}

/// Canvas or image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when `other` does not fit inside `self` in at least one dimension.
    pub fn is_exceeded_by(&self, other: Size) -> bool {
        other.width > self.width || other.height > self.height
    }
}

impl FromStr for Size {
    type Err = String;

    /// Parse `"width,height"`, both strictly positive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [width, height] = parse_components::<2>(s)?;
        if width == 0 || height == 0 {
            return Err("width and height must be greater than 0".to_string());
        }
        Ok(Size { width, height })
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Opaque colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Attach an opacity percentage (0-100).
    pub fn with_opacity(self, opacity: u8) -> Rgba {
        let alpha = (u32::from(opacity.min(100)) * 255 + 50) / 100;
        Rgba {
            r: self.r,
            g: self.g,
            b: self.b,
            a: alpha as u8,
        }
    }
}

impl FromStr for Rgb {
    type Err = String;

    /// Parse `"R,G,B"`, each component 0-255.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [r, g, b] = parse_components::<3>(s)?;
        let channel = |v: u32| u8::try_from(v).map_err(|_| format!("component {v} exceeds 255"));
        Ok(Rgb {
            r: channel(r)?,
            g: channel(g)?,
            b: channel(b)?,
        })
    }
}

/// Colour with straight (non-premultiplied) alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Parse exactly `N` comma-separated unsigned integers.
fn parse_components<const N: usize>(s: &str) -> Result<[u32; N], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != N {
        return Err(format!("expected {N} comma-separated values"));
    }
    let mut out = [0u32; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part
            .parse()
            .map_err(|_| format!("\"{part}\" is not a non-negative integer"))?;
    }
    Ok(out)
}
