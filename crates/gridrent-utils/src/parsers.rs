use crate::errors::{ParseError, Result, UtilsError};
use gridrent_core::AvailabilityState;
use regex::Regex;
use std::sync::OnceLock;

/// Trait for parsing command-line inputs
pub trait Parser {
    type Output;

    fn parse(&self, input: &str) -> Result<Self::Output>;
}

fn memory_regex() -> Option<&'static Regex> {
    static MEMORY: OnceLock<Option<Regex>> = OnceLock::new();
    MEMORY
        .get_or_init(|| Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*(tb|gb|mb)?\b").ok())
        .as_ref()
}

/// Memory size parser: `24`, `24GB`, `80 GB HBM2e`, `1TB`, `512MB` -> gigabytes
pub struct MemoryParser;

impl Parser for MemoryParser {
    type Output = f64;

    fn parse(&self, input: &str) -> Result<f64> {
        let caps = memory_regex()
            .and_then(|re| re.captures(input))
            .ok_or_else(|| {
                ParseError::InvalidFormat(format!(
                    "'{}' is not a memory size (expected e.g. 24GB)",
                    input
                ))
            })?;

        let amount: f64 = caps[1]
            .parse()
            .map_err(|_| ParseError::InvalidValue(format!("invalid number in '{}'", input)))?;

        let unit = caps
            .get(2)
            .map(|m| m.as_str().to_ascii_lowercase())
            .unwrap_or_else(|| "gb".to_string());

        Ok(match unit.as_str() {
            "tb" => amount * 1024.0,
            "mb" => amount / 1024.0,
            _ => amount,
        })
    }
}

/// Inclusive range parser: `MIN-MAX`, `MIN-` or `-MAX`, each side parsed by `bound`
pub struct RangeParser<F> {
    bound: F,
}

impl<F> RangeParser<F>
where
    F: Fn(&str) -> Result<f64>,
{
    pub fn new(bound: F) -> Self {
        Self { bound }
    }
}

impl<F> Parser for RangeParser<F>
where
    F: Fn(&str) -> Result<f64>,
{
    type Output = (Option<f64>, Option<f64>);

    fn parse(&self, input: &str) -> Result<Self::Output> {
        let (min_str, max_str) = input.trim().split_once('-').ok_or_else(|| {
            ParseError::InvalidFormat(format!(
                "range '{}' must be in format 'min-max' (e.g. '0.5-2.0', '0.5-' or '-2.0')",
                input
            ))
        })?;

        let side = |s: &str| -> Result<Option<f64>> {
            let s = s.trim();
            if s.is_empty() {
                Ok(None)
            } else {
                (self.bound)(s).map(Some)
            }
        };

        let min = side(min_str)?;
        let max = side(max_str)?;

        match (min, max) {
            (None, None) => Err(UtilsError::Parse(ParseError::InvalidFormat(
                "range needs at least one bound".to_string(),
            ))),
            (Some(lo), Some(hi)) if lo > hi => Err(UtilsError::Parse(ParseError::InvalidValue(
                format!("minimum {} is greater than maximum {}", lo, hi),
            ))),
            bounds => Ok(bounds),
        }
    }
}

fn parse_number(s: &str) -> Result<f64> {
    let value: f64 = s
        .parse()
        .map_err(|_| ParseError::InvalidValue(format!("'{}' is not a number", s)))?;
    if !value.is_finite() || value < 0.0 {
        return Err(UtilsError::Parse(ParseError::InvalidValue(format!(
            "'{}' must be a non-negative number",
            s
        ))));
    }
    Ok(value)
}

// Convenience functions
pub fn parse_memory_gb(input: &str) -> Result<f64> {
    MemoryParser.parse(input)
}

/// Parse a price range such as `0.5-2.0` (per hour)
pub fn parse_price_range(input: &str) -> Result<(Option<f64>, Option<f64>)> {
    RangeParser::new(parse_number).parse(input)
}

/// Parse a VRAM range such as `24GB-80GB` or `16-`
pub fn parse_vram_range(input: &str) -> Result<(Option<f64>, Option<f64>)> {
    RangeParser::new(parse_memory_gb).parse(input)
}

pub fn parse_statuses<S: AsRef<str>>(values: &[S]) -> Result<Vec<AvailabilityState>> {
    values
        .iter()
        .map(|v| v.as_ref().parse::<AvailabilityState>().map_err(UtilsError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_parsing() {
        assert_eq!(parse_memory_gb("24").unwrap(), 24.0);
        assert_eq!(parse_memory_gb("24GB GDDR6X").unwrap(), 24.0);
        assert_eq!(parse_memory_gb("80 gb HBM2e").unwrap(), 80.0);
        assert_eq!(parse_memory_gb("1TB").unwrap(), 1024.0);
        assert_eq!(parse_memory_gb("512MB").unwrap(), 0.5);
        assert!(parse_memory_gb("lots").is_err());
        assert!(parse_memory_gb("").is_err());
    }

    #[test]
    fn test_price_range_parsing() {
        assert_eq!(parse_price_range("0.5-2.0").unwrap(), (Some(0.5), Some(2.0)));
        assert_eq!(parse_price_range("0.5-").unwrap(), (Some(0.5), None));
        assert_eq!(parse_price_range("-1.0").unwrap(), (None, Some(1.0)));
        assert_eq!(parse_price_range("1-1").unwrap(), (Some(1.0), Some(1.0)));

        assert!(parse_price_range("2.0-0.5").is_err());
        assert!(parse_price_range("invalid").is_err());
        assert!(parse_price_range("-").is_err());
        assert!(parse_price_range("a-b").is_err());
    }

    #[test]
    fn test_vram_range_parsing() {
        assert_eq!(parse_vram_range("24GB-80GB").unwrap(), (Some(24.0), Some(80.0)));
        assert_eq!(parse_vram_range("16-").unwrap(), (Some(16.0), None));
        assert!(parse_vram_range("80GB-24GB").is_err());
    }

    #[test]
    fn test_status_parsing() {
        let statuses = parse_statuses(&["online", "BUSY"]).unwrap();
        assert_eq!(
            statuses,
            vec![AvailabilityState::Online, AvailabilityState::Busy]
        );

        let err = parse_statuses(&["rented"]).unwrap_err();
        assert!(matches!(err, UtilsError::Core(_)));
    }
}
