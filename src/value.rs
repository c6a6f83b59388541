use crate::Error;
use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;

/// A field value produced by an extraction.
///
/// Untyped fields are always [`Value::String`]; the other variants come from a
/// conversion suffix such as `%{NUMBER:bytes:int}`.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    String(String),
    /// `int` / `integer`
    Int(i32),
    /// `long`
    Long(i64),
    /// `decimal`
    Decimal(Decimal),
    /// `double`
    Double(f64),
    /// `boolean`
    Bool(bool),
}

impl Value {
    /// Returns the raw text if this is an unconverted field.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(v) => f.write_str(v),
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

/// A typed parse applied to a captured field, named by the third segment of a
/// reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Conversion {
    /// `int` or `integer`: 32-bit signed integer.
    Int,
    /// `long`: 64-bit signed integer.
    Long,
    /// `decimal`: exact base-10 number.
    Decimal,
    /// `double`: 64-bit float.
    Double,
    /// `boolean`: `true` or `false`.
    Boolean,
}

impl Conversion {
    /// The canonical keyword for this conversion.
    pub fn as_str(&self) -> &'static str {
        match self {
            Conversion::Int => "int",
            Conversion::Long => "long",
            Conversion::Decimal => "decimal",
            Conversion::Double => "double",
            Conversion::Boolean => "boolean",
        }
    }

    /// Parses `raw`, the text captured for `field`.
    pub fn convert(self, field: &str, raw: &str) -> Result<Value, Error> {
        let converted = match self {
            Conversion::Int => raw.parse().ok().map(Value::Int),
            Conversion::Long => raw.parse().ok().map(Value::Long),
            Conversion::Decimal => raw.parse().ok().map(Value::Decimal),
            Conversion::Double => raw.parse().ok().map(Value::Double),
            Conversion::Boolean => raw.parse().ok().map(Value::Bool),
        };
        converted.ok_or_else(|| Error::Conversion {
            field: field.to_string(),
            conversion: self,
            raw: raw.to_string(),
        })
    }
}

impl FromStr for Conversion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" | "integer" => Ok(Conversion::Int),
            "long" => Ok(Conversion::Long),
            "decimal" => Ok(Conversion::Decimal),
            "double" => Ok(Conversion::Double),
            "boolean" => Ok(Conversion::Boolean),
            _ => Err(Error::UnknownConversion(s.to_string())),
        }
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An exact base-10 number: `mantissa * 10^-scale`.
///
/// Trailing fractional zeros are dropped on construction, so `12.30` and
/// `12.3` compare equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Decimal {
    mantissa: i128,
    scale: u32,
}

impl Decimal {
    pub fn new(mut mantissa: i128, mut scale: u32) -> Self {
        while scale > 0 && mantissa % 10 == 0 {
            mantissa /= 10;
            scale -= 1;
        }
        Self { mantissa, scale }
    }

    pub fn mantissa(&self) -> i128 {
        self.mantissa
    }

    /// Number of digits after the decimal point.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Nearest `f64`; may lose precision.
    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    /// Accepts an optional sign, digits, and an optional fractional part:
    /// `-12`, `+0.5`, `.25`, `3.`. Exponents are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, digits) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(ParseDecimalError);
        }

        let mut mantissa: i128 = 0;
        for b in whole.bytes().chain(fraction.bytes()) {
            if !b.is_ascii_digit() {
                return Err(ParseDecimalError);
            }
            mantissa = mantissa
                .checked_mul(10)
                .and_then(|m| m.checked_add(i128::from(b - b'0')))
                .ok_or(ParseDecimalError)?;
        }
        let scale = u32::try_from(fraction.len()).map_err(|_| ParseDecimalError)?;

        Ok(Decimal::new(if negative { -mantissa } else { mantissa }, scale))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mantissa < 0 {
            f.write_str("-")?;
        }
        let digits = self.mantissa.unsigned_abs().to_string();
        let scale = self.scale as usize;
        if scale == 0 {
            f.write_str(&digits)
        } else if digits.len() > scale {
            let (whole, fraction) = digits.split_at(digits.len() - scale);
            write!(f, "{whole}.{fraction}")
        } else {
            write!(f, "0.{}{digits}", "0".repeat(scale - digits.len()))
        }
    }
}

/// The text is not a plain decimal literal, or does not fit in 128 bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseDecimalError;

impl fmt::Display for ParseDecimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid decimal literal")
    }
}

impl StdError for ParseDecimalError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_keywords() {
        for (keyword, expected) in [
            ("int", Conversion::Int),
            ("integer", Conversion::Int),
            ("long", Conversion::Long),
            ("decimal", Conversion::Decimal),
            ("double", Conversion::Double),
            ("boolean", Conversion::Boolean),
        ] {
            assert_eq!(expected, keyword.parse::<Conversion>().unwrap());
        }
        assert_eq!(
            Err(Error::UnknownConversion("float".into())),
            "float".parse::<Conversion>()
        );
        assert_eq!("int", Conversion::Int.to_string());
    }

    #[test]
    fn test_convert() {
        assert_eq!(Value::Int(123), Conversion::Int.convert("n", "123").unwrap());
        assert_eq!(Value::Int(-7), Conversion::Int.convert("n", "-7").unwrap());
        assert_eq!(
            Value::Long(123456789012),
            Conversion::Long.convert("n", "123456789012").unwrap()
        );
        assert_eq!(
            Value::Decimal(Decimal::new(1234, 2)),
            Conversion::Decimal.convert("n", "12.34").unwrap()
        );
        assert_eq!(
            Value::Double(12.34),
            Conversion::Double.convert("n", "12.34").unwrap()
        );
        assert_eq!(
            Value::Bool(true),
            Conversion::Boolean.convert("n", "true").unwrap()
        );
        assert_eq!(
            Value::Bool(false),
            Conversion::Boolean.convert("n", "false").unwrap()
        );
    }

    #[test]
    fn test_convert_failures() {
        for conversion in [
            Conversion::Int,
            Conversion::Long,
            Conversion::Decimal,
            Conversion::Double,
            Conversion::Boolean,
        ] {
            let err = conversion.convert("number", "abc").unwrap_err();
            assert_eq!(
                Error::Conversion {
                    field: "number".into(),
                    conversion,
                    raw: "abc".into(),
                },
                err
            );
            assert!(err.to_string().contains("number"), "{err}");
        }
        // Out of range for 32 bits, fine for 64.
        assert!(Conversion::Int.convert("n", "3000000000").is_err());
        assert!(Conversion::Long.convert("n", "3000000000").is_ok());
        // Rust's canonical boolean spelling is lower case only.
        assert!(Conversion::Boolean.convert("n", "True").is_err());
        assert!(Conversion::Int.convert("n", "").is_err());
    }

    #[test]
    fn test_decimal_parse() {
        assert_eq!(Ok(Decimal::new(1234, 2)), "12.34".parse::<Decimal>());
        assert_eq!(Ok(Decimal::new(-5, 1)), "-0.5".parse::<Decimal>());
        assert_eq!(Ok(Decimal::new(25, 2)), ".25".parse::<Decimal>());
        assert_eq!(Ok(Decimal::new(3, 0)), "+3.".parse::<Decimal>());
        assert_eq!("12.3".parse::<Decimal>(), "12.300".parse::<Decimal>());
        for bad in ["", ".", "-", "abc", "1.2.3", "1e5", " 1", "1_000"] {
            assert_eq!(Err(ParseDecimalError), bad.parse::<Decimal>(), "{bad:?}");
        }
        assert!("1".repeat(40).parse::<Decimal>().is_err());
    }

    #[test]
    fn test_decimal_display() {
        assert_eq!("12.34", Decimal::new(1234, 2).to_string());
        assert_eq!("-0.05", Decimal::new(-5, 2).to_string());
        assert_eq!("7", Decimal::new(700, 2).to_string());
        assert_eq!(0.05, Decimal::new(5, 2).to_f64());
        assert_eq!(1, Decimal::new(100, 2).mantissa());
        assert_eq!(0, Decimal::new(100, 2).scale());
    }

    #[test]
    fn test_value_display() {
        assert_eq!("abc", Value::from("abc").to_string());
        assert_eq!("42", Value::Int(42).to_string());
        assert_eq!("true", Value::Bool(true).to_string());
        assert_eq!(Some("abc"), Value::String("abc".into()).as_str());
        assert_eq!(None, Value::Long(1).as_str());
    }
}
