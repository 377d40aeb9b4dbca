//! Row representation, schema, and the on-heap row codec.
//!
//! A row is stored as its primary key (8-byte big-endian i64, always
//! column 0) followed by each remaining column: INT columns as 8 bytes
//! big-endian, VARCHAR columns as a 2-byte big-endian length prefix and
//! the UTF-8 bytes. Decoding requires the table schema.

use bytes::{BufMut, Bytes, BytesMut};
use loam_common::{LoamError, Result};
use loam_sql::{ColumnDef, FieldType, Literal};

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Text(String),
}

impl Value {
    /// Builds a value from an AST literal.
    pub fn from_literal(literal: &Literal) -> Value {
        match literal {
            Literal::Int(n) => Value::Int(*n),
            Literal::Text(s) => Value::Text(s.clone()),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

/// One row of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub values: Vec<Value>,
}

impl Row {
    /// Creates a row from values.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Returns the primary key: the INT value in column 0.
    pub fn key(&self) -> Result<i64> {
        match self.values.first() {
            Some(Value::Int(key)) => Ok(*key),
            _ => Err(LoamError::Execution(
                "row has no integer primary key in column 0".to_string(),
            )),
        }
    }

    /// Serializes the row for heap storage according to the schema.
    pub fn encode(&self, schema: &Schema) -> Result<Bytes> {
        if self.values.len() != schema.columns().len() {
            return Err(LoamError::Execution(format!(
                "expected {} values, got {}",
                schema.columns().len(),
                self.values.len()
            )));
        }

        let mut buf = BytesMut::new();
        buf.put_i64(self.key()?);

        for (value, column) in self.values.iter().zip(schema.columns()).skip(1) {
            match (value, column.field_type) {
                (Value::Int(n), FieldType::Int) => buf.put_i64(*n),
                (Value::Text(s), FieldType::Varchar) => {
                    if s.len() > u16::MAX as usize {
                        return Err(LoamError::Execution(format!(
                            "value for column '{}' exceeds {} bytes",
                            column.name,
                            u16::MAX
                        )));
                    }
                    buf.put_u16(s.len() as u16);
                    buf.put_slice(s.as_bytes());
                }
                (value, _) => {
                    return Err(LoamError::Execution(format!(
                        "type mismatch for column '{}': {value}",
                        column.name
                    )));
                }
            }
        }

        Ok(buf.freeze())
    }

    /// Deserializes a row from heap bytes according to the schema.
    pub fn decode(data: &[u8], schema: &Schema) -> Result<Row> {
        let malformed = || LoamError::Execution("malformed row".to_string());

        let mut pos = 0usize;
        let mut values = Vec::with_capacity(schema.columns().len());

        let key_bytes = data.get(0..8).ok_or_else(malformed)?;
        values.push(Value::Int(i64::from_be_bytes(
            key_bytes.try_into().unwrap(),
        )));
        pos += 8;

        for column in &schema.columns()[1..] {
            match column.field_type {
                FieldType::Int => {
                    let bytes = data.get(pos..pos + 8).ok_or_else(malformed)?;
                    values.push(Value::Int(i64::from_be_bytes(bytes.try_into().unwrap())));
                    pos += 8;
                }
                FieldType::Varchar => {
                    let len_bytes = data.get(pos..pos + 2).ok_or_else(malformed)?;
                    let len = u16::from_be_bytes(len_bytes.try_into().unwrap()) as usize;
                    pos += 2;
                    let bytes = data.get(pos..pos + len).ok_or_else(malformed)?;
                    let text = std::str::from_utf8(bytes).map_err(|_| malformed())?;
                    values.push(Value::Text(text.to_string()));
                    pos += len;
                }
            }
        }

        if pos != data.len() {
            return Err(malformed());
        }
        Ok(Row::new(values))
    }
}

/// Ordered column definitions for the single table.
///
/// Column 0 is always the INT primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<ColumnDef>,
}

impl Schema {
    /// Validates and wraps a column list.
    pub fn new(columns: Vec<ColumnDef>) -> Result<Self> {
        match columns.first() {
            None => Err(LoamError::Execution(
                "table needs at least one column".to_string(),
            )),
            Some(first) if first.field_type != FieldType::Int => Err(LoamError::Execution(
                "the first column must be the INT primary key".to_string(),
            )),
            Some(_) => Ok(Self { columns }),
        }
    }

    /// Returns the column definitions in order.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Resolves a possibly qualified column name to its index.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let bare = name.rsplit('.').next().unwrap_or(name);
        self.columns.iter().position(|c| c.name == bare)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_schema() -> Schema {
        Schema::new(vec![
            ColumnDef {
                name: "id".to_string(),
                field_type: FieldType::Int,
            },
            ColumnDef {
                name: "name".to_string(),
                field_type: FieldType::Varchar,
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_schema_rejects_non_int_key() {
        let result = Schema::new(vec![ColumnDef {
            name: "name".to_string(),
            field_type: FieldType::Varchar,
        }]);
        assert!(result.is_err());
    }

    #[test]
    fn test_schema_rejects_empty() {
        assert!(Schema::new(vec![]).is_err());
    }

    #[test]
    fn test_column_index_with_qualifier() {
        let schema = users_schema();
        assert_eq!(schema.column_index("id"), Some(0));
        assert_eq!(schema.column_index("users.name"), Some(1));
        assert_eq!(schema.column_index("missing"), None);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let schema = users_schema();
        let row = Row::new(vec![Value::Int(42), Value::Text("alice".to_string())]);

        let bytes = row.encode(&schema).unwrap();
        // key (8) + len prefix (2) + "alice" (5)
        assert_eq!(bytes.len(), 15);
        assert_eq!(&bytes[..8], &42i64.to_be_bytes());

        let decoded = Row::decode(&bytes, &schema).unwrap();
        assert_eq!(decoded, row);
    }

    #[test]
    fn test_encode_int_column() {
        let schema = Schema::new(vec![
            ColumnDef {
                name: "id".to_string(),
                field_type: FieldType::Int,
            },
            ColumnDef {
                name: "score".to_string(),
                field_type: FieldType::Int,
            },
        ])
        .unwrap();

        let row = Row::new(vec![Value::Int(1), Value::Int(-77)]);
        let bytes = row.encode(&schema).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(Row::decode(&bytes, &schema).unwrap(), row);
    }

    #[test]
    fn test_encode_type_mismatch() {
        let schema = users_schema();
        let row = Row::new(vec![Value::Int(1), Value::Int(2)]);
        assert!(row.encode(&schema).is_err());
    }

    #[test]
    fn test_encode_arity_mismatch() {
        let schema = users_schema();
        let row = Row::new(vec![Value::Int(1)]);
        assert!(row.encode(&schema).is_err());
    }

    #[test]
    fn test_key_requires_int() {
        let row = Row::new(vec![Value::Text("oops".to_string())]);
        assert!(row.key().is_err());
    }

    #[test]
    fn test_decode_truncated() {
        let schema = users_schema();
        assert!(Row::decode(&[0, 1, 2], &schema).is_err());

        // A valid key but a length prefix pointing past the end.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1i64.to_be_bytes());
        bytes.extend_from_slice(&10u16.to_be_bytes());
        bytes.extend_from_slice(b"abc");
        assert!(Row::decode(&bytes, &schema).is_err());
    }

    #[test]
    fn test_decode_trailing_garbage() {
        let schema = users_schema();
        let row = Row::new(vec![Value::Int(5), Value::Text("x".to_string())]);
        let mut bytes = row.encode(&schema).unwrap().to_vec();
        bytes.push(0xFF);
        assert!(Row::decode(&bytes, &schema).is_err());
    }
}
