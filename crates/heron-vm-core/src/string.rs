//! JavaScript strings
//!
//! Strings are immutable sequences of UTF-16 code units shared by `Arc`.
//! Lone surrogates are preserved; conversion to Rust strings is lossy.

use std::fmt;
use std::sync::Arc;

/// Largest valid array index (2^32 - 2)
const MAX_ARRAY_INDEX: u64 = u32::MAX as u64 - 1;

/// An immutable JavaScript string
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsString(Arc<[u16]>);

impl JsString {
    /// Create a string from UTF-8 text
    pub fn new(s: &str) -> Self {
        Self(s.encode_utf16().collect::<Vec<u16>>().into())
    }

    /// Create a string from UTF-16 code units
    pub fn from_utf16(units: impl Into<Arc<[u16]>>) -> Self {
        Self(units.into())
    }

    /// The empty string
    pub fn empty() -> Self {
        Self(Arc::from(&[][..]))
    }

    /// UTF-16 code units
    #[inline]
    pub fn units(&self) -> &[u16] {
        &self.0
    }

    /// Length in code units
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lossy conversion to a Rust string
    pub fn to_rust_string(&self) -> String {
        String::from_utf16_lossy(&self.0)
    }

    /// Compare with UTF-8 text
    pub fn eq_str(&self, s: &str) -> bool {
        self.0.iter().copied().eq(s.encode_utf16())
    }

    /// Concatenate two strings
    pub fn concat(&self, other: &JsString) -> JsString {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let mut units = Vec::with_capacity(self.len() + other.len());
        units.extend_from_slice(&self.0);
        units.extend_from_slice(&other.0);
        Self(units.into())
    }

    /// The single code unit at `index` as a string
    pub fn char_at(&self, index: usize) -> Option<JsString> {
        self.0
            .get(index)
            .map(|unit| Self(Arc::from(&[*unit][..])))
    }

    /// Canonical array index (`"0"`, `"17"`, never `"017"` or `"1.0"`)
    pub fn as_array_index(&self) -> Option<u32> {
        let units = self.units();
        if units.is_empty() || units.len() > 10 {
            return None;
        }
        if units.len() > 1 && units[0] == u16::from(b'0') {
            return None;
        }
        let mut value: u64 = 0;
        for &unit in units {
            let digit = char::from_u32(u32::from(unit))?.to_digit(10)?;
            value = value * 10 + u64::from(digit);
        }
        (value <= MAX_ARRAY_INDEX).then_some(value as u32)
    }
}

impl Default for JsString {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl From<&String> for JsString {
    fn from(s: &String) -> Self {
        Self::new(s)
    }
}

impl From<Vec<u16>> for JsString {
    fn from(units: Vec<u16>) -> Self {
        Self(units.into())
    }
}

impl From<&[u16]> for JsString {
    fn from(units: &[u16]) -> Self {
        Self(units.into())
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rust_string())
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_rust_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf16_roundtrip() {
        let s = JsString::new("héllo 👋");
        assert_eq!(s.len(), 8);
        assert_eq!(s.to_rust_string(), "héllo 👋");
        assert!(s.eq_str("héllo 👋"));
    }

    #[test]
    fn test_concat() {
        let a = JsString::new("ab");
        let b = JsString::new("cd");
        assert_eq!(a.concat(&b), JsString::new("abcd"));
        assert_eq!(a.concat(&JsString::empty()), a);
    }

    #[test]
    fn test_array_index() {
        assert_eq!(JsString::new("0").as_array_index(), Some(0));
        assert_eq!(JsString::new("42").as_array_index(), Some(42));
        assert_eq!(JsString::new("042").as_array_index(), None);
        assert_eq!(JsString::new("1.5").as_array_index(), None);
        assert_eq!(JsString::new("-1").as_array_index(), None);
        assert_eq!(JsString::new("4294967295").as_array_index(), None);
        assert_eq!(JsString::new("4294967294").as_array_index(), Some(4294967294));
    }

    #[test]
    fn test_code_unit_ordering() {
        assert!(JsString::new("a") < JsString::new("b"));
        assert!(JsString::new("Z") < JsString::new("a"));
        assert!(JsString::new("ab") < JsString::new("abc"));
    }
}
