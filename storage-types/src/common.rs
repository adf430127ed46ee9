//! Size formatting helpers shared by clients

use anyhow::Result;
use num_format::{Locale, ToFormattedString};

const UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Convert bytes to human-readable format (e.g., "1.50 GB")
pub fn bytes_to_pretty(bytes: &u64, add_bytes: bool) -> String {
    let mut steps = 0;
    let mut val: f64 = *bytes as f64;

    while val > 1024. && steps < UNITS.len() - 1 {
        val /= 1024.;
        steps += 1;
    }

    let unit = UNITS[steps];

    if add_bytes {
        let bytes_str = bytes.to_formatted_string(&Locale::en);
        format!("{:.2} {} ({} bytes)", val, unit, bytes_str)
    } else {
        format!("{:.2} {}", val, unit)
    }
}

/// Parse human-readable format to bytes (e.g., "1.5 GB" -> bytes)
///
/// A bare number is taken as bytes.
pub fn pretty_to_bytes(pretty: &str) -> Result<u64> {
    let split = pretty.split_whitespace().collect::<Vec<&str>>();
    let string_value = split
        .first()
        .ok_or_else(|| anyhow::anyhow!("Invalid input"))?;

    if split.len() == 1 {
        return Ok(string_value.parse()?);
    }

    let mut val: f64 = string_value.parse()?;
    let unit = *split
        .last()
        .ok_or_else(|| anyhow::anyhow!("Invalid input"))?;

    let mut steps = UNITS
        .iter()
        .position(|candidate| *candidate == unit)
        .ok_or_else(|| anyhow::anyhow!("Invalid unit: {}", unit))?;

    while steps > 0 {
        val *= 1024.;
        steps -= 1;
    }

    Ok(val as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_mebibytes() {
        assert_eq!(bytes_to_pretty(&(4 * 1024 * 1024 + 1), false), "4.00 MB");
        assert_eq!(bytes_to_pretty(&512, true), "512.00 B (512 bytes)");
    }

    #[test]
    fn parses_units_and_bare_numbers() {
        assert_eq!(pretty_to_bytes("4 MB").unwrap(), 4 * 1024 * 1024);
        assert_eq!(pretty_to_bytes("1.5 GB").unwrap(), 1_610_612_736);
        assert_eq!(pretty_to_bytes("4096").unwrap(), 4096);
        assert!(pretty_to_bytes("4 parsecs").is_err());
        assert!(pretty_to_bytes("").is_err());
    }
}
