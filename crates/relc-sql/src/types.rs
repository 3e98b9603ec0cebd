//! SQL value types carried by plan schemas and casts

use serde::{Deserialize, Serialize};

/// Valid bit widths for integer types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IntBitWidth {
    /// 8-bit (TINYINT)
    I8,
    /// 16-bit (SMALLINT)
    I16,
    /// 32-bit (INTEGER)
    I32,
    /// 64-bit (BIGINT)
    I64,
}

/// Valid bit widths for floating-point types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FloatBitWidth {
    /// 32-bit (FLOAT / REAL)
    F32,
    /// 64-bit (DOUBLE)
    F64,
}

/// SQL data types
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    /// Boolean (BOOL, BOOLEAN)
    Boolean,
    /// Integer types: TINYINT(8), SMALLINT(16), INT(32), BIGINT(64)
    Integer { bits: IntBitWidth },
    /// Floating-point: FLOAT(32), DOUBLE(64)
    Float { bits: FloatBitWidth },
    /// Exact numeric with optional precision and scale
    Decimal {
        precision: Option<u16>,
        scale: Option<u16>,
    },
    /// Character/string types
    String,
    /// DATE
    Date,
    /// TIME
    Time,
    /// TIMESTAMP / DATETIME
    Timestamp,
    /// INTERVAL
    Interval,
    /// BINARY / BLOB
    Binary,
    /// Type could not be determined; carries a reason
    Unknown(String),
}

impl SqlType {
    /// Shorthand for a 64-bit integer
    pub fn int64() -> Self {
        SqlType::Integer {
            bits: IntBitWidth::I64,
        }
    }

    /// Shorthand for a 64-bit float
    pub fn float64() -> Self {
        SqlType::Float {
            bits: FloatBitWidth::F64,
        }
    }

    /// ANSI spelling of the type
    pub fn display_name(&self) -> String {
        match self {
            SqlType::Boolean => "BOOLEAN".into(),
            SqlType::Integer {
                bits: IntBitWidth::I8,
            } => "TINYINT".into(),
            SqlType::Integer {
                bits: IntBitWidth::I16,
            } => "SMALLINT".into(),
            SqlType::Integer {
                bits: IntBitWidth::I32,
            } => "INTEGER".into(),
            SqlType::Integer {
                bits: IntBitWidth::I64,
            } => "BIGINT".into(),
            SqlType::Float {
                bits: FloatBitWidth::F32,
            } => "FLOAT".into(),
            SqlType::Float {
                bits: FloatBitWidth::F64,
            } => "DOUBLE".into(),
            SqlType::Decimal {
                precision: Some(p),
                scale: Some(s),
            } => format!("DECIMAL({p},{s})"),
            SqlType::Decimal {
                precision: Some(p), ..
            } => format!("DECIMAL({p})"),
            SqlType::Decimal { .. } => "DECIMAL".into(),
            SqlType::String => "VARCHAR".into(),
            SqlType::Date => "DATE".into(),
            SqlType::Time => "TIME".into(),
            SqlType::Timestamp => "TIMESTAMP".into(),
            SqlType::Interval => "INTERVAL".into(),
            SqlType::Binary => "BINARY".into(),
            SqlType::Unknown(reason) => format!("UNKNOWN({reason})"),
        }
    }
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(SqlType::String.to_string(), "VARCHAR");
        assert_eq!(
            SqlType::Decimal {
                precision: Some(10),
                scale: Some(3)
            }
            .to_string(),
            "DECIMAL(10,3)"
        );
    }
}
