//! RGBA color type used by the expression engine.
//!
//! Channels are stored as floating point values so that chains of color
//! functions (`lighten(spin(@c, 10), 5%)`) do not accumulate rounding
//! error; values are clamped and rounded only when rendered.
//!
//! ## Supported literal formats
//!
//! - **Hex**: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`
//! - **Named**: CSS color keywords like `red`, `aliceblue`, `rebeccapurple`
//! - **Special**: `transparent`
//!
//! Functional notations (`rgb()`, `hsl()`, ...) are evaluated by the
//! function library, which builds colors with [`Color::rgba`] and
//! [`Color::from_hsl`].

use std::fmt;

/// Error returned when color parsing fails.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorParseError {
    /// Human-readable description of the parsing error.
    pub message: String,
}

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ColorParseError {}

static NAMED_COLORS: phf::Map<&'static str, [u8; 3]> = phf::phf_map! {
    "aliceblue" => [240, 248, 255],
    "antiquewhite" => [250, 235, 215],
    "aqua" => [0, 255, 255],
    "aquamarine" => [127, 255, 212],
    "azure" => [240, 255, 255],
    "beige" => [245, 245, 220],
    "bisque" => [255, 228, 196],
    "black" => [0, 0, 0],
    "blanchedalmond" => [255, 235, 205],
    "blue" => [0, 0, 255],
    "blueviolet" => [138, 43, 226],
    "brown" => [165, 42, 42],
    "burlywood" => [222, 184, 135],
    "cadetblue" => [95, 158, 160],
    "chartreuse" => [127, 255, 0],
    "chocolate" => [210, 105, 30],
    "coral" => [255, 127, 80],
    "cornflowerblue" => [100, 149, 237],
    "cornsilk" => [255, 248, 220],
    "crimson" => [220, 20, 60],
    "cyan" => [0, 255, 255],
    "darkblue" => [0, 0, 139],
    "darkcyan" => [0, 139, 139],
    "darkgoldenrod" => [184, 134, 11],
    "darkgray" => [169, 169, 169],
    "darkgreen" => [0, 100, 0],
    "darkgrey" => [169, 169, 169],
    "darkkhaki" => [189, 183, 107],
    "darkmagenta" => [139, 0, 139],
    "darkolivegreen" => [85, 107, 47],
    "darkorange" => [255, 140, 0],
    "darkorchid" => [153, 50, 204],
    "darkred" => [139, 0, 0],
    "darksalmon" => [233, 150, 122],
    "darkseagreen" => [143, 188, 143],
    "darkslateblue" => [72, 61, 139],
    "darkslategray" => [47, 79, 79],
    "darkslategrey" => [47, 79, 79],
    "darkturquoise" => [0, 206, 209],
    "darkviolet" => [148, 0, 211],
    "deeppink" => [255, 20, 147],
    "deepskyblue" => [0, 191, 255],
    "dimgray" => [105, 105, 105],
    "dimgrey" => [105, 105, 105],
    "dodgerblue" => [30, 144, 255],
    "firebrick" => [178, 34, 34],
    "floralwhite" => [255, 250, 240],
    "forestgreen" => [34, 139, 34],
    "fuchsia" => [255, 0, 255],
    "gainsboro" => [220, 220, 220],
    "ghostwhite" => [248, 248, 255],
    "gold" => [255, 215, 0],
    "goldenrod" => [218, 165, 32],
    "gray" => [128, 128, 128],
    "green" => [0, 128, 0],
    "greenyellow" => [173, 255, 47],
    "grey" => [128, 128, 128],
    "honeydew" => [240, 255, 240],
    "hotpink" => [255, 105, 180],
    "indianred" => [205, 92, 92],
    "indigo" => [75, 0, 130],
    "ivory" => [255, 255, 240],
    "khaki" => [240, 230, 140],
    "lavender" => [230, 230, 250],
    "lavenderblush" => [255, 240, 245],
    "lawngreen" => [124, 252, 0],
    "lemonchiffon" => [255, 250, 205],
    "lightblue" => [173, 216, 230],
    "lightcoral" => [240, 128, 128],
    "lightcyan" => [224, 255, 255],
    "lightgoldenrodyellow" => [250, 250, 210],
    "lightgray" => [211, 211, 211],
    "lightgreen" => [144, 238, 144],
    "lightgrey" => [211, 211, 211],
    "lightpink" => [255, 182, 193],
    "lightsalmon" => [255, 160, 122],
    "lightseagreen" => [32, 178, 170],
    "lightskyblue" => [135, 206, 250],
    "lightslategray" => [119, 136, 153],
    "lightslategrey" => [119, 136, 153],
    "lightsteelblue" => [176, 196, 222],
    "lightyellow" => [255, 255, 224],
    "lime" => [0, 255, 0],
    "limegreen" => [50, 205, 50],
    "linen" => [250, 240, 230],
    "magenta" => [255, 0, 255],
    "maroon" => [128, 0, 0],
    "mediumaquamarine" => [102, 205, 170],
    "mediumblue" => [0, 0, 205],
    "mediumorchid" => [186, 85, 211],
    "mediumpurple" => [147, 112, 219],
    "mediumseagreen" => [60, 179, 113],
    "mediumslateblue" => [123, 104, 238],
    "mediumspringgreen" => [0, 250, 154],
    "mediumturquoise" => [72, 209, 204],
    "mediumvioletred" => [199, 21, 133],
    "midnightblue" => [25, 25, 112],
    "mintcream" => [245, 255, 250],
    "mistyrose" => [255, 228, 225],
    "moccasin" => [255, 228, 181],
    "navajowhite" => [255, 222, 173],
    "navy" => [0, 0, 128],
    "oldlace" => [253, 245, 230],
    "olive" => [128, 128, 0],
    "olivedrab" => [107, 142, 35],
    "orange" => [255, 165, 0],
    "orangered" => [255, 69, 0],
    "orchid" => [218, 112, 214],
    "palegoldenrod" => [238, 232, 170],
    "palegreen" => [152, 251, 152],
    "paleturquoise" => [175, 238, 238],
    "palevioletred" => [219, 112, 147],
    "papayawhip" => [255, 239, 213],
    "peachpuff" => [255, 218, 185],
    "peru" => [205, 133, 63],
    "pink" => [255, 192, 203],
    "plum" => [221, 160, 221],
    "powderblue" => [176, 224, 230],
    "purple" => [128, 0, 128],
    "rebeccapurple" => [102, 51, 153],
    "red" => [255, 0, 0],
    "rosybrown" => [188, 143, 143],
    "royalblue" => [65, 105, 225],
    "saddlebrown" => [139, 69, 19],
    "salmon" => [250, 128, 114],
    "sandybrown" => [244, 164, 96],
    "seagreen" => [46, 139, 87],
    "seashell" => [255, 245, 238],
    "sienna" => [160, 82, 45],
    "silver" => [192, 192, 192],
    "skyblue" => [135, 206, 235],
    "slateblue" => [106, 90, 205],
    "slategray" => [112, 128, 144],
    "slategrey" => [112, 128, 144],
    "snow" => [255, 250, 250],
    "springgreen" => [0, 255, 127],
    "steelblue" => [70, 130, 180],
    "tan" => [210, 180, 140],
    "teal" => [0, 128, 128],
    "thistle" => [216, 191, 216],
    "tomato" => [255, 99, 71],
    "turquoise" => [64, 224, 208],
    "violet" => [238, 130, 238],
    "wheat" => [245, 222, 179],
    "white" => [255, 255, 255],
    "whitesmoke" => [245, 245, 245],
    "yellow" => [255, 255, 0],
    "yellowgreen" => [154, 205, 50],
};

/// An RGBA color.
///
/// `has_alpha` records whether the color was written or computed with an
/// explicit alpha channel; arithmetic between two colors only keeps alpha
/// when both sides carry one. `original` keeps the literal text so an
/// untouched `#fff` or `red` renders exactly as written.
///
/// # Examples
///
/// ```
/// use lesscss::types::Color;
///
/// let red = Color::rgb(255.0, 0.0, 0.0);
/// let parsed = Color::parse("#ff0000").unwrap();
/// assert_eq!(red.argb(), parsed.argb());
/// assert_eq!(Color::parse("coral").unwrap().to_hex(), "#ff7f50");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Color {
    /// Red component (0-255).
    pub r: f64,
    /// Green component (0-255).
    pub g: f64,
    /// Blue component (0-255).
    pub b: f64,
    /// Alpha component (0.0 = transparent, 1.0 = opaque).
    pub a: f64,
    /// When `true`, the alpha channel is significant.
    pub has_alpha: bool,
    /// Literal source text, dropped as soon as the color is modified.
    pub original: Option<String>,
}

impl Default for Color {
    fn default() -> Self {
        Self {
            r: 0.0,
            g: 0.0,
            b: 0.0,
            a: 1.0,
            has_alpha: false,
            original: None,
        }
    }
}

impl Color {
    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self {
            r,
            g,
            b,
            ..Default::default()
        }
    }

    pub fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self {
            r,
            g,
            b,
            a: a.clamp(0.0, 1.0),
            has_alpha: true,
            original: None,
        }
    }

    /// Returns a fully transparent black.
    pub fn transparent() -> Self {
        Self::rgba(0.0, 0.0, 0.0, 0.0)
    }

    /// Returns a copy of this color with the specified alpha value.
    pub fn with_alpha(&self, alpha: f64) -> Self {
        Self::rgba(self.r, self.g, self.b, alpha)
    }

    /// Returns the same channels without the literal text.
    pub fn computed(&self) -> Self {
        Self {
            original: None,
            ..self.clone()
        }
    }

    /// Parses a hex literal or a color keyword.
    pub fn parse(input: &str) -> Result<Self, ColorParseError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ColorParseError {
                message: "empty color string".to_string(),
            });
        }

        let mut color = if let Some(hex) = input.strip_prefix('#') {
            Self::parse_hex(hex)?
        } else {
            Self::named(input).ok_or_else(|| ColorParseError {
                message: format!("unknown color name: {}", input),
            })?
        };
        color.original = Some(input.to_string());
        Ok(color)
    }

    /// Looks up a CSS color keyword, case-insensitively.
    pub fn named(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower == "transparent" {
            return Some(Self::transparent());
        }
        NAMED_COLORS
            .get(lower.as_str())
            .map(|[r, g, b]| Self::rgb(f64::from(*r), f64::from(*g), f64::from(*b)))
    }

    /// Returns `true` if `name` is a CSS color keyword.
    pub fn is_keyword(name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        lower == "transparent" || NAMED_COLORS.contains_key(lower.as_str())
    }

    fn parse_hex(hex: &str) -> Result<Self, ColorParseError> {
        let digits = hex
            .chars()
            .map(Self::parse_hex_digit)
            .collect::<Result<Vec<u8>, _>>()?;

        let channel = |hi: u8, lo: u8| f64::from(hi * 16 + lo);
        match digits.as_slice() {
            [r, g, b] => Ok(Self::rgb(
                f64::from(r * 17),
                f64::from(g * 17),
                f64::from(b * 17),
            )),
            [r, g, b, a] => Ok(Self::rgba(
                f64::from(r * 17),
                f64::from(g * 17),
                f64::from(b * 17),
                f64::from(a * 17) / 255.0,
            )),
            [r1, r2, g1, g2, b1, b2] => Ok(Self::rgb(
                channel(*r1, *r2),
                channel(*g1, *g2),
                channel(*b1, *b2),
            )),
            [r1, r2, g1, g2, b1, b2, a1, a2] => Ok(Self::rgba(
                channel(*r1, *r2),
                channel(*g1, *g2),
                channel(*b1, *b2),
                channel(*a1, *a2) / 255.0,
            )),
            _ => Err(ColorParseError {
                message: format!("invalid hex color length: {}", digits.len()),
            }),
        }
    }

    fn parse_hex_digit(c: char) -> Result<u8, ColorParseError> {
        c.to_digit(16)
            .map(|d| d as u8)
            .ok_or_else(|| ColorParseError {
                message: format!("invalid hex digit: {}", c),
            })
    }

    /// Channels clamped to 0-255 and rounded.
    pub fn channels(&self) -> [u8; 3] {
        [self.r, self.g, self.b].map(|c| c.round().clamp(0.0, 255.0) as u8)
    }

    /// Packs the color into `0xAARRGGBB`, used for ordering comparisons.
    pub fn argb(&self) -> u32 {
        let [r, g, b] = self.channels();
        let a = (self.a.clamp(0.0, 1.0) * 255.0).round() as u32;
        (a << 24) | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
    }

    /// Six digit lowercase hex form, ignoring alpha.
    pub fn to_hex(&self) -> String {
        let [r, g, b] = self.channels();
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }

    /// Three digit form when every channel is a multiple of 17.
    pub fn to_short_hex(&self) -> String {
        let [r, g, b] = self.channels();
        if r % 17 == 0 && g % 17 == 0 && b % 17 == 0 {
            format!("#{:x}{:x}{:x}", r / 17, g / 17, b / 17)
        } else {
            self.to_hex()
        }
    }

    /// Eight digit `#AARRGGBB` form as used by `argb()`.
    pub fn to_argb_hex(&self) -> String {
        format!("#{:08x}", self.argb())
    }

    /// Relative luminance (ITU-R BT.709), between 0.0 and 1.0.
    pub fn luma(&self) -> f64 {
        let r = Self::srgb_to_linear(self.r / 255.0);
        let g = Self::srgb_to_linear(self.g / 255.0);
        let b = Self::srgb_to_linear(self.b / 255.0);
        0.2126 * r + 0.7152 * g + 0.0722 * b
    }

    fn srgb_to_linear(c: f64) -> f64 {
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }

    /// Hue in degrees, saturation and lightness in 0.0-1.0.
    pub fn to_hsl(&self) -> (f64, f64, f64) {
        let r = self.r / 255.0;
        let g = self.g / 255.0;
        let b = self.b / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;

        if max == min {
            return (0.0, 0.0, l);
        }

        let d = max - min;
        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        (h * 60.0, s, l)
    }

    /// Builds a color from hue in degrees, saturation and lightness in 0.0-1.0.
    pub fn from_hsl(h: f64, s: f64, l: f64, a: f64) -> Self {
        let h = (h.rem_euclid(360.0)) / 360.0;
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);
        let (r, g, b) = if s == 0.0 {
            (l, l, l)
        } else {
            let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
            let p = 2.0 * l - q;
            (
                Self::hue_to_rgb(p, q, h + 1.0 / 3.0),
                Self::hue_to_rgb(p, q, h),
                Self::hue_to_rgb(p, q, h - 1.0 / 3.0),
            )
        };
        Self::rgba(r * 255.0, g * 255.0, b * 255.0, a)
    }

    fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            return p + (q - p) * 6.0 * t;
        }
        if t < 1.0 / 2.0 {
            return q;
        }
        if t < 2.0 / 3.0 {
            return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
        }
        p
    }

    /// Hue in degrees, saturation and value in 0.0-1.0.
    pub fn to_hsv(&self) -> (f64, f64, f64) {
        let (r, g, b) = (self.r / 255.0, self.g / 255.0, self.b / 255.0);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let d = max - min;
        let s = if max == 0.0 { 0.0 } else { d / max };
        if d == 0.0 {
            return (0.0, s, max);
        }
        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        (h * 60.0, s, max)
    }

    /// Builds a color from hue in degrees, saturation and value in 0.0-1.0.
    pub fn from_hsv(h: f64, s: f64, v: f64, a: f64) -> Self {
        let h = h.rem_euclid(360.0);
        let s = s.clamp(0.0, 1.0);
        let v = v.clamp(0.0, 1.0);
        let sector = (h / 60.0).floor();
        let f = h / 60.0 - sector;
        let p = v * (1.0 - s);
        let q = v * (1.0 - f * s);
        let t = v * (1.0 - (1.0 - f) * s);
        let (r, g, b) = match sector as u8 % 6 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };
        Self::rgba(r * 255.0, g * 255.0, b * 255.0, a)
    }
}


#[cfg(test)]
mod manipulation_tests {
    use super::*;

    #[test]
    fn test_hsl_roundtrip() {
        let original = Color::rgb(100.0, 150.0, 200.0);
        let (h, s, l) = original.to_hsl();
        let back = Color::from_hsl(h, s, l, 1.0);
        assert_eq!(back.channels(), original.channels());
    }

    #[test]
    fn test_hsv_roundtrip() {
        let original = Color::rgb(10.0, 200.0, 90.0);
        let (h, s, v) = original.to_hsv();
        assert_eq!(Color::from_hsv(h, s, v, 1.0).channels(), original.channels());
    }

    #[test]
    fn test_short_hex() {
        assert_eq!(Color::rgb(255.0, 255.0, 255.0).to_short_hex(), "#fff");
        assert_eq!(Color::rgb(0.0, 0x11 as f64, 0x22 as f64).to_short_hex(), "#012");
        assert_eq!(Color::rgb(0x12 as f64, 0.0, 0.0).to_short_hex(), "#120000");
    }

    #[test]
    fn test_channels_clamp() {
        let color = Color::rgb(300.0, -20.0, 127.6);
        assert_eq!(color.channels(), [255, 0, 128]);
        assert_eq!(color.to_hex(), "#ff0080");
    }

    #[test]
    fn test_argb_ordering() {
        let opaque_black = Color::rgb(0.0, 0.0, 0.0);
        let translucent_white = Color::rgba(255.0, 255.0, 255.0, 0.5);
        assert!(opaque_black.argb() > translucent_white.argb());
        assert_eq!(Color::rgba(255.0, 0.0, 0.0, 0.5).to_argb_hex(), "#80ff0000");
    }

    #[test]
    fn test_luma() {
        assert!((Color::rgb(255.0, 255.0, 255.0).luma() - 1.0).abs() < 1e-9);
        assert_eq!(Color::rgb(0.0, 0.0, 0.0).luma(), 0.0);
    }
}
