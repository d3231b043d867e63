use std::borrow::Cow;
use std::fmt::Display;

/// A single table cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Missing value (blank cell or a configured null literal)
    #[default]
    Empty,
    /// Text, including dates and booleans rendered by the reader
    Text(String),
    /// Numeric cell
    Number(f64),
}

impl Value {
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Numeric reading used for ranking.
    ///
    /// Numbers count as-is, text counts when its trimmed content parses as a
    /// finite number. Everything else (blank, free text, NaN, infinities) is `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(number) => Some(*number),
            Value::Text(text) => text.trim().parse::<f64>().ok(),
            Value::Empty => None,
        }
        .filter(|number| number.is_finite())
    }

    /// String form used for keyword and footer matching. Empty values become `""`.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Value::Text(text) => Cow::Borrowed(text.as_str()),
            Value::Empty => Cow::Borrowed(""),
            Value::Number(_) => Cow::Owned(self.to_string()),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Text(text) => write!(f, "{text}"),
            // f64 Display already drops the fraction of integral values: 10.0 -> "10"
            Value::Number(number) => write!(f, "{number}"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_forms() {
        assert_eq!(Value::from(10.0).as_text(), "10");
        assert_eq!(Value::from(2.5).as_text(), "2.5");
        assert_eq!(Value::from(-3i64).as_text(), "-3");
        assert_eq!(Value::Empty.as_text(), "");
        assert_eq!(Value::from("Grand Total").as_text(), "Grand Total");
    }

    #[test]
    fn numeric_reading() {
        assert_eq!(Value::from(7.0).as_number(), Some(7.0));
        assert_eq!(Value::from(" 12.5 ").as_number(), Some(12.5));
        assert_eq!(Value::from("n/a").as_number(), None);
        assert_eq!(Value::from("NaN").as_number(), None);
        assert_eq!(Value::from(f64::NAN).as_number(), None);
        assert_eq!(Value::Empty.as_number(), None);
        assert_eq!(Value::from(None::<f64>), Value::Empty);
    }
}
