use core::fmt;

/// An RGBA color with 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

const NAMED_COLORS: &[(&str, Color)] = &[
    ("black", Color::rgb(0, 0, 0)),
    ("white", Color::rgb(255, 255, 255)),
    ("red", Color::rgb(255, 0, 0)),
    ("green", Color::rgb(0, 255, 0)),
    ("blue", Color::rgb(0, 0, 255)),
    ("transparent", Color::rgba(0, 0, 0, 0)),
];

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Build a color from unclamped channel values.
    pub fn from_channels(r: i64, g: i64, b: i64, a: i64) -> Self {
        let clamp = |c: i64| c.clamp(0, 255) as u8;
        Self::rgba(clamp(r), clamp(g), clamp(b), clamp(a))
    }

    /// Average of the red, green and blue channels.
    pub fn average(&self) -> i64 {
        (self.r as i64 + self.g as i64 + self.b as i64) / 3
    }

    /// Parse `rgb(r,g,b)`, `rgba(r,g,b,a)`, `#rrggbb`, `#rrggbbaa` or a color name.
    pub fn parse(text: &str) -> Option<Color> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            return Self::parse_hex(hex);
        }
        if let Some(args) = call_args(text, "rgba") {
            let [r, g, b, a] = parse_channels::<4>(args)?;
            return Some(Self::rgba(r, g, b, a));
        }
        if let Some(args) = call_args(text, "rgb") {
            let [r, g, b] = parse_channels::<3>(args)?;
            return Some(Self::rgb(r, g, b));
        }
        NAMED_COLORS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(text))
            .map(|(_, color)| *color)
    }

    fn parse_hex(hex: &str) -> Option<Color> {
        if !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self::rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }
}

fn call_args<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    text.strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn parse_channels<const N: usize>(args: &str) -> Option<[u8; N]> {
    let mut channels = [0u8; N];
    let mut parts = args.split(',');
    for channel in channels.iter_mut() {
        *channel = parts.next()?.trim().parse().ok()?;
    }
    parts.next().is_none().then_some(channels)
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "rgb({},{},{})", self.r, self.g, self.b)
        } else {
            write!(f, "rgba({},{},{},{})", self.r, self.g, self.b, self.a)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(Color::parse("rgb(1, 2, 3)"), Some(Color::rgb(1, 2, 3)));
        assert_eq!(Color::parse("rgba(1,2,3,4)"), Some(Color::rgba(1, 2, 3, 4)));
        assert_eq!(Color::parse("#ff8000"), Some(Color::rgb(255, 128, 0)));
        assert_eq!(Color::parse("#ff800080"), Some(Color::rgba(255, 128, 0, 128)));
        assert_eq!(Color::parse("White"), Some(Color::rgb(255, 255, 255)));
        assert_eq!(Color::parse("rgb(1,2)"), None);
        assert_eq!(Color::parse("rgb(1,2,300)"), None);
        assert_eq!(Color::parse("#ff80"), None);
    }

    #[test]
    fn test_display_round_trips() {
        for color in [Color::rgb(10, 20, 30), Color::rgba(10, 20, 30, 40)] {
            assert_eq!(Color::parse(&color.to_string()), Some(color));
        }
    }

    #[test]
    fn test_from_channels_clamps() {
        assert_eq!(Color::from_channels(-5, 300, 7, 255), Color::rgb(0, 255, 7));
        assert_eq!(Color::rgb(30, 60, 90).average(), 60);
    }
}
