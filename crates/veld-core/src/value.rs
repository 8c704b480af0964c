//! Compile-time constant values.
//!
//! [`ConstValue`] is the value half of a constant-annotated expression.
//! It also carries the normalization used when comparing `case` labels:
//! enum and character constants compare by their integral value, not by
//! their written form.

use std::fmt;

/// A constant value known at compile time.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    /// The untyped null literal.
    Null,
    Bool(bool),
    Char(char),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
}

impl ConstValue {
    /// Whether this constant is the numeric zero of its kind.
    ///
    /// Used by lowering to pick single-operand test instructions and to
    /// skip widening conversions on a zero operand.
    pub fn is_zero(&self) -> bool {
        match self {
            ConstValue::Int(v) => *v == 0,
            ConstValue::Long(v) => *v == 0,
            ConstValue::Float(v) => *v == 0.0,
            ConstValue::Double(v) => *v == 0.0,
            ConstValue::Char(c) => *c == '\0',
            _ => false,
        }
    }

    /// Whether this is the untyped null literal.
    pub fn is_null(&self) -> bool {
        matches!(self, ConstValue::Null)
    }

    /// Boolean value, if this is a boolean constant.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConstValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral value used for `case` label comparison.
    ///
    /// Chars and enum constants (stored as `Int`/`Long`) normalize to the
    /// same key space, so `case 'a'` and `case 97` collide.
    pub fn case_key(&self) -> Option<CaseKey> {
        match self {
            ConstValue::Bool(b) => Some(CaseKey::Integral(*b as i64)),
            ConstValue::Char(c) => Some(CaseKey::Integral(*c as i64)),
            ConstValue::Int(v) => Some(CaseKey::Integral(*v as i64)),
            ConstValue::Long(v) => Some(CaseKey::Integral(*v)),
            ConstValue::Str(s) => Some(CaseKey::Text(s.clone())),
            _ => None,
        }
    }
}

/// Normalized `case` label key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CaseKey {
    Integral(i64),
    Text(String),
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Null => write!(f, "null"),
            ConstValue::Bool(b) => write!(f, "{b}"),
            ConstValue::Char(c) => write!(f, "'{c}'"),
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::Long(v) => write!(f, "{v}"),
            ConstValue::Float(v) => write!(f, "{v}"),
            ConstValue::Double(v) => write!(f, "{v}"),
            ConstValue::Str(s) => write!(f, "{s:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_detection() {
        assert!(ConstValue::Int(0).is_zero());
        assert!(ConstValue::Long(0).is_zero());
        assert!(ConstValue::Double(0.0).is_zero());
        assert!(!ConstValue::Int(1).is_zero());
        assert!(!ConstValue::Str(String::new()).is_zero());
    }

    #[test]
    fn char_and_int_share_case_keys() {
        assert_eq!(
            ConstValue::Char('a').case_key(),
            ConstValue::Int(97).case_key()
        );
    }

    #[test]
    fn floats_have_no_case_key() {
        assert_eq!(ConstValue::Double(1.5).case_key(), None);
    }
}
