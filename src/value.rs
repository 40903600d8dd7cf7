use rust_decimal::Decimal;

/// A field's current value.
///
/// The store treats values as opaque; only the built-in validators and the
/// registration-time truthiness check inspect the variant. `Missing` stands
/// for a value that was never supplied, `Null` for one that was explicitly
/// cleared.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Value {
    Missing,
    Null,
    Bool(bool),
    Int(i64),
    Number(Decimal),
    Text(String),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Whether registration should kick off an immediate validation pass.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Missing | Value::Null => false,
            Value::Bool(value) => *value,
            Value::Int(value) => *value != 0,
            Value::Number(value) => !value.is_zero(),
            Value::Text(value) => !value.is_empty(),
        }
    }

    /// Emptiness as the `required` validator sees it. Unlike truthiness,
    /// `Int(0)` and `Number(0)` count as present.
    pub(crate) fn is_blank(&self) -> bool {
        match self {
            Value::Missing | Value::Null | Value::Bool(false) => true,
            Value::Text(text) => text.is_empty(),
            _ => false,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Missing
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

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Number(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_follows_seeding_rules() {
        assert!(!Value::Missing.is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::text("").is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Int(-3).is_truthy());
        assert!(Value::Number(Decimal::ONE).is_truthy());
        assert!(Value::text("x").is_truthy());
    }

    #[test]
    fn blankness_admits_zero() {
        assert!(Value::Missing.is_blank());
        assert!(Value::Null.is_blank());
        assert!(Value::Bool(false).is_blank());
        assert!(Value::text("").is_blank());
        assert!(!Value::Int(0).is_blank());
        assert!(!Value::Number(Decimal::ZERO).is_blank());
        assert!(!Value::text("0").is_blank());
    }
}
