pub mod check;
pub mod listen;

use pingseed_core::Seed;

/// How seeds are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedFormat {
    Decimal,
    Hex,
    Json,
}

/// Parse an output format string into the enum.
pub fn parse_format(s: &str) -> SeedFormat {
    match s {
        "decimal" | "dec" => SeedFormat::Decimal,
        "hex" => SeedFormat::Hex,
        "json" => SeedFormat::Json,
        _ => {
            eprintln!("Unknown format '{s}', using decimal");
            SeedFormat::Decimal
        }
    }
}

/// Render one seed as a single output line (without newline).
pub fn format_seed(seed: Seed, format: SeedFormat) -> String {
    match format {
        SeedFormat::Decimal => seed.to_string(),
        SeedFormat::Hex => format!("{seed:016x}"),
        SeedFormat::Json => serde_json::json!({ "seed": seed }).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats() {
        assert_eq!(parse_format("decimal"), SeedFormat::Decimal);
        assert_eq!(parse_format("dec"), SeedFormat::Decimal);
        assert_eq!(parse_format("hex"), SeedFormat::Hex);
        assert_eq!(parse_format("json"), SeedFormat::Json);
    }

    #[test]
    fn test_parse_unknown_defaults_decimal() {
        assert_eq!(parse_format(""), SeedFormat::Decimal);
        assert_eq!(parse_format("HEX"), SeedFormat::Decimal); // case-sensitive
    }

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_seed(499_999_872, SeedFormat::Decimal), "499999872");
        assert_eq!(format_seed(-1020, SeedFormat::Decimal), "-1020");
    }

    #[test]
    fn test_format_hex_is_twos_complement() {
        assert_eq!(format_seed(255, SeedFormat::Hex), "00000000000000ff");
        assert_eq!(format_seed(-1, SeedFormat::Hex), "ffffffffffffffff");
    }

    #[test]
    fn test_format_json() {
        assert_eq!(format_seed(42, SeedFormat::Json), r#"{"seed":42}"#);
    }
}
