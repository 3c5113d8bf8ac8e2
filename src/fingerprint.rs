//! Schema identity: a 32-bit rolling hash over a schema's canonical template text.
//!
//! The hash is rendered as lowercase hex of its magnitude, with a leading `M`
//! standing in for the minus sign, so that it stays a single alphanumeric token:
//!
//! ```text
//! 0x00000c21  ->  "c21"
//! -255        ->  "Mff"
//! ```

use std::fmt;
use std::str::FromStr;

/// A schema fingerprint, stored as the signed 32-bit hash it is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(i32);

impl Fingerprint {
    /// Hash `text` with `hash = hash * 31 + unit` over its UTF-16 code units,
    /// wrapping at 32 bits, starting from zero.
    pub fn of_text(text: &str) -> Self {
        let hash = text
            .encode_utf16()
            .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32));
        Fingerprint(hash)
    }

    pub fn from_raw(raw: i32) -> Self {
        Fingerprint(raw)
    }

    /// The signed value written into buffer headers.
    pub fn raw(self) -> i32 {
        self.0
    }

    pub fn to_be_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    pub fn from_be_bytes(bytes: [u8; 4]) -> Self {
        Fingerprint(i32::from_be_bytes(bytes))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            write!(f, "M{:x}", self.0.unsigned_abs())
        } else {
            write!(f, "{:x}", self.0)
        }
    }
}

/// Error returned when a string is not a rendered fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid fingerprint '{0}'")]
pub struct ParseFingerprintError(String);

impl FromStr for Fingerprint {
    type Err = ParseFingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseFingerprintError(s.to_string());
        let (negative, digits) = match s.strip_prefix('M') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let canonical = |b: u8| b.is_ascii_digit() || (b'a'..=b'f').contains(&b);
        if digits.is_empty()
            || digits.len() > 8
            || (digits.len() > 1 && digits.starts_with('0'))
            || !digits.bytes().all(canonical)
        {
            return Err(invalid());
        }
        let magnitude = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
        let value = if negative {
            if magnitude == 0 || magnitude > 0x8000_0000 {
                return Err(invalid());
            }
            (magnitude as i64).wrapping_neg() as i32
        } else {
            i32::try_from(magnitude).map_err(|_| invalid())?
        };
        Ok(Fingerprint(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_known_values() {
        assert_eq!(Fingerprint::of_text("").raw(), 0);
        assert_eq!(Fingerprint::of_text("a").raw(), 97);
        assert_eq!(Fingerprint::of_text("ab").raw(), 97 * 31 + 98);
    }

    #[test]
    fn test_hash_wraps() {
        // Long enough to overflow 32 bits several times over.
        let text = "{aBooleanbooleanagainbooleandateNumberint64}";
        let expected = text
            .chars()
            .fold(0i64, |h, c| ((h * 31 + c as i64) as i32) as i64);
        assert_eq!(Fingerprint::of_text(text).raw() as i64, expected);
    }

    #[test]
    fn test_display() {
        assert_eq!(Fingerprint::from_raw(0xc21).to_string(), "c21");
        assert_eq!(Fingerprint::from_raw(-255).to_string(), "Mff");
        assert_eq!(Fingerprint::from_raw(i32::MIN).to_string(), "M80000000");
    }

    #[test]
    fn test_parse() {
        for raw in [0, 1, 0xc21, -255, i32::MAX, i32::MIN] {
            let fp = Fingerprint::from_raw(raw);
            assert_eq!(fp.to_string().parse::<Fingerprint>(), Ok(fp));
        }
        assert!("".parse::<Fingerprint>().is_err());
        assert!("M".parse::<Fingerprint>().is_err());
        assert!("80000000".parse::<Fingerprint>().is_err());
        assert!("xyz".parse::<Fingerprint>().is_err());
    }

    #[test]
    fn test_parse_accepts_only_displayed_forms() {
        for text in ["+1", "C21", "MFF", "M+1", "M-1", "-1", " 1", "0c21", "M01"] {
            assert!(text.parse::<Fingerprint>().is_err(), "{}", text);
        }
        assert_eq!("c21".parse::<Fingerprint>(), Ok(Fingerprint::from_raw(0xc21)));
    }

    #[test]
    fn test_header_bytes() {
        let fp = Fingerprint::from_raw(-2);
        assert_eq!(fp.to_be_bytes(), [0xff, 0xff, 0xff, 0xfe]);
        assert_eq!(Fingerprint::from_be_bytes([0xff, 0xff, 0xff, 0xfe]), fp);
    }
}
