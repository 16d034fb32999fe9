/// Packed `0xRRGGBB` color as the lighting executable understands it.
///
/// The value is carried as-is. Anything above `0xFFFFFF` is not a valid color, but
/// only the config layer checks that (see [`Color::is_valid`]); the animation engine
/// forwards whatever it was given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct Color(u32);

impl Color {
    pub const MAX: u32 = 0xFF_FF_FF;

    pub const WHITE: Color = Color(0xFF_FF_FF);

    pub const fn new(packed: u32) -> Self {
        Self(packed)
    }

    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub const fn packed(self) -> u32 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 <= Self::MAX
    }

    /// Lowercase hex, zero padded to six digits
    pub fn to_hex(self) -> String {
        format!("{:06x}", self.0)
    }
}

impl From<u32> for Color {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Color;

    #[test]
    fn test_hex_is_zero_padded_lowercase() {
        assert_eq!(Color::new(0xFF).to_hex(), "0000ff");
        assert_eq!(Color::new(0xABCDEF).to_hex(), "abcdef");
        assert_eq!(Color::new(0).to_hex(), "000000");
    }

    #[test]
    fn test_from_rgb() {
        let c = Color::from_rgb(0x12, 0x34, 0x56);
        assert_eq!(c.packed(), 0x123456);
    }

    #[test]
    fn test_validity() {
        assert!(Color::WHITE.is_valid());
        assert!(!Color::new(0x1_00_00_00).is_valid());
    }

    #[test]
    fn test_out_of_range_is_forwarded_verbatim() {
        assert_eq!(Color::new(0x1_00_00_00).to_hex(), "1000000");
    }
}
