use std::fmt;

/// Represents a cell value in a sheet
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl CellValue {
    /// Check if the value is null
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Check if the value is null or a whitespace-only string
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Try to get the value as an integer.
    ///
    /// Floats only convert when they have no fractional part.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CellValue::Int(i) => Some(*i),
            CellValue::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
            CellValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Try to get the value as a finite number.
    ///
    /// Booleans are not numbers here; spreadsheets that put TRUE in a count
    /// column are malformed rather than counting one.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        let value = match self {
            CellValue::Float(f) => *f,
            CellValue::Int(i) => *i as f64,
            CellValue::String(s) => s.trim().parse().ok()?,
            CellValue::Null | CellValue::Bool(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Get the value as a string
    #[must_use]
    pub fn as_str(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::String(s) => s.clone(),
        }
    }

    /// Parse a string into a `CellValue` with type inference
    /// Tries: null -> bool -> int -> float -> string
    #[must_use]
    pub fn parse(s: &str) -> CellValue {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return CellValue::Null;
        }

        // "1"/"0" are parsed as Int, not Bool
        match trimmed.to_lowercase().as_str() {
            "true" => return CellValue::Bool(true),
            "false" => return CellValue::Bool(false),
            _ => {}
        }

        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Int(i);
        }

        if let Ok(f) = trimmed.parse::<f64>() {
            return CellValue::Float(f);
        }

        CellValue::String(s.to_string())
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Null
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, ""),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(fl) => write!(f, "{fl}"),
            CellValue::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<i32> for CellValue {
    fn from(i: i32) -> Self {
        CellValue::Int(i64::from(i))
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => CellValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_null() {
        assert_eq!(CellValue::parse(""), CellValue::Null);
        assert_eq!(CellValue::parse("  "), CellValue::Null);
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(CellValue::parse("2021"), CellValue::Int(2021));
        assert_eq!(CellValue::parse("-123"), CellValue::Int(-123));
        assert_eq!(CellValue::parse("12.5"), CellValue::Float(12.5));
    }

    #[test]
    fn test_parse_string() {
        assert_eq!(
            CellValue::parse("HERO MOTOCORP"),
            CellValue::String("HERO MOTOCORP".to_string())
        );
        assert_eq!(CellValue::parse("TRUE"), CellValue::Bool(true));
    }

    #[test]
    fn test_as_int_rejects_fractional_floats() {
        assert_eq!(CellValue::Float(2021.0).as_int(), Some(2021));
        assert_eq!(CellValue::Float(2021.5).as_int(), None);
        assert_eq!(CellValue::String(" 2022 ".to_string()).as_int(), Some(2022));
        assert_eq!(CellValue::Bool(true).as_int(), None);
    }

    #[test]
    fn test_as_float() {
        assert_eq!(CellValue::Int(42).as_float(), Some(42.0));
        assert_eq!(CellValue::String("3.5".to_string()).as_float(), Some(3.5));
        assert_eq!(CellValue::String("n/a".to_string()).as_float(), None);
        assert_eq!(CellValue::Float(f64::NAN).as_float(), None);
        assert_eq!(CellValue::Bool(true).as_float(), None);
        assert_eq!(CellValue::Null.as_float(), None);
    }

    #[test]
    fn test_is_blank() {
        assert!(CellValue::Null.is_blank());
        assert!(CellValue::String("   ".to_string()).is_blank());
        assert!(!CellValue::Int(0).is_blank());
    }
}
