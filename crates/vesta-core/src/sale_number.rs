//! # Sale Numbers
//!
//! Human-readable receipt numbers.
//!
//! ## Formats
//! ```text
//! full:   [PREFIX-]YYYYMMDD-CODE6-SEQ05[-C]     20250101-OUTLET-00001
//! short:  [PREFIX-]CODE4-SEQ[-C]                OUTL-001
//!
//! CODE   outlet name, uppercased, non-alphanumerics stripped,
//!        right-padded with '0', truncated
//! C      base-36 checksum of everything before it
//! ```
//!
//! The checksum is the sum of the character codes modulo 36. It catches
//! typos, it is not tamper-proof.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::validation::validate_required;

const FULL_CODE_LEN: usize = 6;
const FULL_SEQ_DIGITS: usize = 5;
const FULL_SEQ_MAX: u32 = 99_999;

const SHORT_CODE_LEN: usize = 4;
const SHORT_SEQ_DIGITS: usize = 3;
const SHORT_SEQ_MAX: u32 = 999;

const DATE_FORMAT: &str = "%Y%m%d";
const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Which layout to generate.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct SaleNumberFormat {
    /// Leading segment, e.g. `POS`. ASCII alphanumerics only.
    pub prefix: Option<String>,
    /// Append a checksum segment.
    pub checksum: bool,
    /// Use the short `CODE-SEQ` layout (no date).
    pub short: bool,
}

/// Segments recovered from a sale number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSaleNumber {
    pub prefix: Option<String>,
    /// `None` for short numbers.
    pub date: Option<NaiveDate>,
    pub outlet_code: String,
    pub sequence: u32,
    pub checksum: Option<char>,
}

impl ParsedSaleNumber {
    pub fn is_short(&self) -> bool {
        self.date.is_none()
    }
}

// =============================================================================
// Generation
// =============================================================================

/// Full format, no prefix or checksum.
///
/// ```rust
/// use chrono::NaiveDate;
/// use vesta_core::sale_number;
///
/// let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
/// let number = sale_number::generate("outlet-main", 1, date).unwrap();
/// assert_eq!(number, "20250101-OUTLET-00001");
/// ```
pub fn generate(outlet_name: &str, sequence: u32, date: NaiveDate) -> CoreResult<String> {
    generate_with(&SaleNumberFormat::default(), outlet_name, sequence, date)
}

/// Short format, no prefix or checksum.
pub fn generate_short(outlet_name: &str, sequence: u32) -> CoreResult<String> {
    let format = SaleNumberFormat {
        short: true,
        ..SaleNumberFormat::default()
    };
    // The date is not part of a short number.
    generate_with(&format, outlet_name, sequence, NaiveDate::MIN)
}

pub fn generate_with(
    format: &SaleNumberFormat,
    outlet_name: &str,
    sequence: u32,
    date: NaiveDate,
) -> CoreResult<String> {
    validate_required("outlet_name", outlet_name)?;

    let mut segments: Vec<String> = Vec::with_capacity(5);
    if let Some(prefix) = &format.prefix {
        validate_prefix(prefix)?;
        segments.push(prefix.clone());
    }

    if format.short {
        check_sequence(sequence, SHORT_SEQ_MAX)?;
        segments.push(outlet_code(outlet_name, SHORT_CODE_LEN));
        segments.push(format!("{:0width$}", sequence, width = SHORT_SEQ_DIGITS));
    } else {
        check_sequence(sequence, FULL_SEQ_MAX)?;
        segments.push(date.format(DATE_FORMAT).to_string());
        segments.push(outlet_code(outlet_name, FULL_CODE_LEN));
        segments.push(format!("{:0width$}", sequence, width = FULL_SEQ_DIGITS));
    }

    let mut number = segments.join("-");
    if format.checksum {
        let check = calculate_checksum(&number);
        number.push('-');
        number.push(check);
    }
    Ok(number)
}

/// Derives the fixed-width outlet code from an outlet name.
///
/// ```rust
/// use vesta_core::sale_number::outlet_code;
///
/// assert_eq!(outlet_code("outlet-main", 6), "OUTLET");
/// assert_eq!(outlet_code("N°7", 4), "N700");
/// ```
pub fn outlet_code(name: &str, len: usize) -> String {
    let mut code: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .take(len)
        .collect();
    while code.len() < len {
        code.push('0');
    }
    code
}

/// Base-36 digit of the character-code sum of `body`.
pub fn calculate_checksum(body: &str) -> char {
    let sum: u64 = body.chars().map(|c| u64::from(u32::from(c))).sum();
    char::from(BASE36[(sum % 36) as usize])
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses either layout, with or without prefix and checksum.
///
/// Segment shapes are fixed, so at most one reading of a string fits:
/// the plain reading is tried first, then checksum, prefix, and both.
/// The checksum value itself is not verified here; see [`verify_checksum`].
pub fn parse(number: &str) -> CoreResult<ParsedSaleNumber> {
    let segments: Vec<&str> = number.split('-').collect();

    for (has_prefix, has_checksum) in [(false, false), (false, true), (true, false), (true, true)]
    {
        if let Some(parsed) = parse_segments(&segments, has_prefix, has_checksum) {
            return Ok(parsed);
        }
    }

    Err(ValidationError::invalid_format(
        "sale_number",
        format!("'{}' does not match a sale number layout", number),
    )
    .into())
}

pub fn is_valid_format(number: &str) -> bool {
    parse(number).is_ok()
}

/// `None` for short numbers or unparseable input.
pub fn extract_date(number: &str) -> Option<NaiveDate> {
    parse(number).ok().and_then(|p| p.date)
}

pub fn extract_outlet_code(number: &str) -> Option<String> {
    parse(number).ok().map(|p| p.outlet_code)
}

pub fn extract_sequence(number: &str) -> Option<u32> {
    parse(number).ok().map(|p| p.sequence)
}

/// True when the trailing segment is the checksum of everything before it.
pub fn verify_checksum(number: &str) -> bool {
    let Some((body, check)) = number.rsplit_once('-') else {
        return false;
    };
    let mut chars = check.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => !body.is_empty() && c == calculate_checksum(body),
        _ => false,
    }
}

fn parse_segments(
    segments: &[&str],
    has_prefix: bool,
    has_checksum: bool,
) -> Option<ParsedSaleNumber> {
    let mut body = segments;

    let prefix = if has_prefix {
        let (first, rest) = body.split_first()?;
        if !is_prefix(first) {
            return None;
        }
        body = rest;
        Some((*first).to_string())
    } else {
        None
    };

    let checksum = if has_checksum {
        let (last, rest) = body.split_last()?;
        let mut chars = last.chars();
        let c = match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_digit() || c.is_ascii_uppercase() => c,
            _ => return None,
        };
        body = rest;
        Some(c)
    } else {
        None
    };

    match body {
        [date, code, seq] => {
            if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let date = NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?;
            Some(ParsedSaleNumber {
                prefix,
                date: Some(date),
                outlet_code: parse_code(code, FULL_CODE_LEN)?,
                sequence: parse_sequence(seq, FULL_SEQ_DIGITS)?,
                checksum,
            })
        }
        [code, seq] => Some(ParsedSaleNumber {
            prefix,
            date: None,
            outlet_code: parse_code(code, SHORT_CODE_LEN)?,
            sequence: parse_sequence(seq, SHORT_SEQ_DIGITS)?,
            checksum,
        }),
        _ => None,
    }
}

fn parse_code(segment: &str, len: usize) -> Option<String> {
    let valid = segment.len() == len
        && segment
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase());
    valid.then(|| segment.to_string())
}

fn parse_sequence(segment: &str, digits: usize) -> Option<u32> {
    if segment.len() != digits || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse::<u32>().ok().filter(|&n| n > 0)
}

fn is_prefix(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn validate_prefix(prefix: &str) -> CoreResult<()> {
    if !is_prefix(prefix) {
        return Err(ValidationError::invalid_format(
            "prefix",
            format!("'{}' must be non-empty ASCII letters or digits", prefix),
        )
        .into());
    }
    Ok(())
}

fn check_sequence(sequence: u32, max: u32) -> CoreResult<()> {
    if sequence == 0 || sequence > max {
        return Err(ValidationError::OutOfRange {
            field: "sequence".to_string(),
            min: 1,
            max: i64::from(max),
        }
        .into());
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    fn new_year() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn flip_last(number: &str) -> String {
        let mut chars: Vec<char> = number.chars().collect();
        if let Some(last) = chars.last_mut() {
            *last = if *last == '0' { '1' } else { '0' };
        }
        chars.into_iter().collect()
    }

    #[test]
    fn test_generate_full() {
        let number = generate("outlet-main", 1, new_year()).unwrap();
        assert_eq!(number, "20250101-OUTLET-00001");
        assert!(number.contains("OUTLET"));
        assert!(number.contains("-00001"));
        assert_eq!(extract_sequence(&number), Some(1));
        assert_eq!(extract_date(&number), Some(new_year()));
        assert_eq!(extract_outlet_code(&number).as_deref(), Some("OUTLET"));
    }

    #[test]
    fn test_generate_short() {
        let number = generate_short("Mall #2", 42).unwrap();
        assert_eq!(number, "MALL-042");
        let parsed = parse(&number).unwrap();
        assert!(parsed.is_short());
        assert_eq!(parsed.sequence, 42);
    }

    #[test]
    fn test_outlet_code_padding_and_truncation() {
        assert_eq!(outlet_code("ab", 6), "AB0000");
        assert_eq!(outlet_code("Centro Histórico", 6), "CENTRO");
        assert_eq!(outlet_code("--", 4), "0000");
    }

    #[test]
    fn test_sequence_range() {
        for bad in [0, 100_000] {
            assert!(matches!(
                generate("main", bad, new_year()),
                Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
            ));
        }
        assert!(generate("main", 99_999, new_year()).is_ok());
        assert!(generate_short("main", 1000).is_err());
    }

    #[test]
    fn test_checksum_verifies_and_flip_fails() {
        let format = SaleNumberFormat {
            prefix: Some("POS".to_string()),
            checksum: true,
            short: false,
        };
        for seq in [1, 7, 512, 99_999] {
            let number = generate_with(&format, "outlet-main", seq, new_year()).unwrap();
            assert!(verify_checksum(&number), "{number}");
            assert!(!verify_checksum(&flip_last(&number)), "{number}");

            let parsed = parse(&number).unwrap();
            assert_eq!(parsed.prefix.as_deref(), Some("POS"));
            assert_eq!(parsed.sequence, seq);
            assert!(parsed.checksum.is_some());
        }
    }

    #[test]
    fn test_short_with_checksum_and_prefix() {
        let format = SaleNumberFormat {
            prefix: Some("T1".to_string()),
            checksum: true,
            short: true,
        };
        let number = generate_with(&format, "kiosk", 5, new_year()).unwrap();
        assert!(number.starts_with("T1-KIOS-005-"));
        assert!(verify_checksum(&number));
        assert_eq!(extract_date(&number), None);
        assert_eq!(extract_sequence(&number), Some(5));
    }

    #[test]
    fn test_invalid_formats() {
        for bad in [
            "",
            "20250101-OUTLET",
            "20251301-OUTLET-00001",
            "20250101-outlet-00001",
            "20250101-OUTLET-00000",
            "20250101-OUTLET-1",
            "OUTL-0001",
            "POS--OUTL-001",
        ] {
            assert!(!is_valid_format(bad), "{bad}");
        }
        assert!(!verify_checksum("no-checksum-here"));
        assert!(!verify_checksum("X"));
    }

    #[test]
    fn test_invalid_prefix_rejected() {
        let format = SaleNumberFormat {
            prefix: Some("A-B".to_string()),
            ..SaleNumberFormat::default()
        };
        assert!(generate_with(&format, "main", 1, new_year()).is_err());
    }
}
