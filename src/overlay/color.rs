use anyhow::{anyhow, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

/// Parses `#RRGGBB` (the leading `#` is optional).
pub fn parse_hex_color(value: &str) -> Result<Rgb> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(anyhow!("invalid color '{}': expected #RRGGBB", value));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16)
            .map_err(|_| anyhow!("invalid color '{}': bad hex digit", value))
    };
    Ok(Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_channels() {
        assert_eq!(parse_hex_color("#FF00AA").unwrap(), Rgb(255, 0, 170));
        assert_eq!(parse_hex_color("#000000").unwrap(), Rgb(0, 0, 0));
        assert_eq!(parse_hex_color("#ffffff").unwrap(), Rgb(255, 255, 255));
        assert_eq!(parse_hex_color("1a2B3c").unwrap(), Rgb(0x1a, 0x2b, 0x3c));
    }

    #[test]
    fn rejects_malformed_input() {
        for value in ["", "#", "#FFF", "#GGGGGG", "#FF00AA00", "#ÄÄÄ"] {
            assert!(parse_hex_color(value).is_err(), "{value} should fail");
        }
    }

    #[test]
    fn hex_output_is_uppercase() {
        assert_eq!(Rgb(255, 0, 170).to_hex(), "#FF00AA");
    }
}
