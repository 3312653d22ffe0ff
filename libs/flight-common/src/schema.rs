//! Schema construction helpers.
//!
//! Every column in a chainflight table is nullable and carries a
//! human-readable `description` entry in its field metadata, which Flight
//! clients surface as column documentation. Unsigned 256-bit chain values
//! are stored as `DECIMAL(38, 0)`.

use std::collections::HashMap;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema};

use crate::error::ColumnError;

/// Maximum number of base-10 digits representable in the decimal columns.
///
/// Matches the DECIMAL(38, 0) type used by downstream warehouse tables.
pub const DECIMAL128_PRECISION: u8 = 38;

const DESCRIPTION_KEY: &str = "description";

/// The Arrow type backing decimal columns.
pub fn decimal128_type() -> DataType {
    DataType::Decimal128(DECIMAL128_PRECISION, 0)
}

/// Builds schemas whose fields are uniformly nullable and described.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaFactory;

impl SchemaFactory {
    pub fn new() -> Self {
        Self
    }

    pub fn new_schema(&self, fields: Vec<Field>) -> Schema {
        Schema::new(fields)
    }

    pub fn new_field(&self, name: &str, data_type: DataType, description: &str) -> Field {
        Field::new(name, data_type, true).with_metadata(HashMap::from([(
            DESCRIPTION_KEY.to_string(),
            description.to_string(),
        )]))
    }

    pub fn new_struct(&self, fields: Vec<Field>) -> DataType {
        DataType::Struct(fields.into())
    }

    pub fn new_list(&self, value_type: DataType) -> DataType {
        DataType::List(Arc::new(Field::new("item", value_type, true)))
    }
}

/// Converts a base-10 integer string into the `i128` representation used
/// by `DECIMAL(38, 0)` columns.
///
/// The empty string converts to zero. Values with more than
/// [`DECIMAL128_PRECISION`] digits (sign excluded, leading zeros included)
/// are rejected, which also keeps every accepted value within 127 bits of
/// magnitude.
pub fn decimal128_from_string(v: &str) -> Result<i128, ColumnError> {
    let v = if v.is_empty() { "0" } else { v };

    let digits = v
        .strip_prefix('-')
        .or_else(|| v.strip_prefix('+'))
        .unwrap_or(v);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ColumnError::InvalidDecimal(v.to_string()));
    }

    if digits.len() > DECIMAL128_PRECISION as usize {
        return Err(ColumnError::DecimalOutOfRange(v.to_string()));
    }

    v.parse::<i128>()
        .map_err(|_| ColumnError::DecimalOutOfRange(v.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(decimal128_from_string("").unwrap(), 0);
    }

    #[test]
    fn parses_signed_integers() {
        assert_eq!(decimal128_from_string("0").unwrap(), 0);
        assert_eq!(decimal128_from_string("123456789").unwrap(), 123_456_789);
        assert_eq!(decimal128_from_string("-42").unwrap(), -42);
        assert_eq!(decimal128_from_string("+7").unwrap(), 7);
    }

    #[test]
    fn accepts_max_precision() {
        let max = "9".repeat(38);
        assert_eq!(
            decimal128_from_string(&max).unwrap().to_string(),
            max,
        );
        let min = format!("-{}", "9".repeat(38));
        assert_eq!(decimal128_from_string(&min).unwrap().to_string(), min);
    }

    #[test]
    fn rejects_excess_digits() {
        let too_long = "1".repeat(39);
        assert!(matches!(
            decimal128_from_string(&too_long),
            Err(ColumnError::DecimalOutOfRange(_))
        ));
        // Leading zeros count as digits.
        let padded = format!("0{}", "1".repeat(38));
        assert!(decimal128_from_string(&padded).is_err());
    }

    #[test]
    fn rejects_non_numeric() {
        for v in ["abc", "12x", "0x10", "1.5", "-", "--1"] {
            assert!(
                matches!(decimal128_from_string(v), Err(ColumnError::InvalidDecimal(_))),
                "expected parse failure for {v:?}",
            );
        }
    }

    #[test]
    fn round_trips_to_string() {
        for v in ["1", "-1", "18446744073709551616", &"9".repeat(38)] {
            assert_eq!(decimal128_from_string(v).unwrap().to_string(), *v);
        }
    }

    #[test]
    fn fields_are_nullable_and_described() {
        let f = SchemaFactory::new();
        let field = f.new_field("hash", DataType::Utf8, "Hash of the block");
        assert!(field.is_nullable());
        assert_eq!(
            field.metadata().get("description").map(String::as_str),
            Some("Hash of the block"),
        );
    }
}
