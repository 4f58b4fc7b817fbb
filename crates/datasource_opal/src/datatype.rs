//! Mapping of opal value types onto column types.

use std::fmt;

/// The closed set of column types an opal variable can surface as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpalColumnType {
    Text,
    BigInt,
    Double,
    Boolean,
    Date,
    Timestamp,
}

impl fmt::Display for OpalColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OpalColumnType::Text => "text",
            OpalColumnType::BigInt => "bigint",
            OpalColumnType::Double => "double",
            OpalColumnType::Boolean => "boolean",
            OpalColumnType::Date => "date",
            OpalColumnType::Timestamp => "timestamp",
        };
        f.write_str(s)
    }
}

/// Map an opal value type tag and repeatable flag onto a column type.
///
/// Repeatable variables always surface as text since their values are
/// serialized into a list form. Unrecognized tags also map to text so that
/// new value types on the server never fail metadata calls.
pub fn column_type(value_type: &str, repeatable: bool) -> OpalColumnType {
    if repeatable {
        return OpalColumnType::Text;
    }
    match value_type {
        "text" => OpalColumnType::Text,
        "integer" | "binary" => OpalColumnType::BigInt,
        "decimal" => OpalColumnType::Double,
        "boolean" => OpalColumnType::Boolean,
        "date" => OpalColumnType::Date,
        "datetime" => OpalColumnType::Timestamp,
        _ => OpalColumnType::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_types() {
        assert_eq!(column_type("text", false), OpalColumnType::Text);
        assert_eq!(column_type("integer", false), OpalColumnType::BigInt);
        assert_eq!(column_type("binary", false), OpalColumnType::BigInt);
        assert_eq!(column_type("decimal", false), OpalColumnType::Double);
        assert_eq!(column_type("boolean", false), OpalColumnType::Boolean);
        assert_eq!(column_type("date", false), OpalColumnType::Date);
        assert_eq!(column_type("datetime", false), OpalColumnType::Timestamp);
    }

    #[test]
    fn unrecognized_type_falls_back_to_text() {
        assert_eq!(column_type("bogus", false), OpalColumnType::Text);
        assert_eq!(column_type("", false), OpalColumnType::Text);
        assert_eq!(column_type("point", false), OpalColumnType::Text);
    }

    #[test]
    fn repeatable_is_always_text() {
        for value_type in [
            "text", "integer", "decimal", "boolean", "date", "datetime", "binary", "bogus",
        ] {
            assert_eq!(column_type(value_type, true), OpalColumnType::Text);
        }
    }
}
