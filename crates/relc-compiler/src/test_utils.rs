//! Shared test utilities for relc-compiler
//!
//! Small fixed tables used across unit and integration tests.

use crate::ir::plan::Plan;
use crate::ir::schema::RelSchema;
use relc_sql::{IntBitWidth, SqlType};

/// Shorthand for a 32-bit integer type
pub fn int32() -> SqlType {
    SqlType::Integer {
        bits: IntBitWidth::I32,
    }
}

/// Build a physical table from `(name, type)` pairs
pub fn table(name: &str, columns: &[(&str, SqlType)]) -> Plan {
    let schema = RelSchema::from_pairs(columns.iter().map(|(n, t)| (*n, t.clone()))).unwrap();
    Plan::table(name, schema).unwrap()
}

/// `star1(c int64, f float64, foo_id string, bar_id string)`
pub fn star1() -> Plan {
    table(
        "star1",
        &[
            ("c", SqlType::int64()),
            ("f", SqlType::float64()),
            ("foo_id", SqlType::String),
            ("bar_id", SqlType::String),
        ],
    )
}

/// `star2(foo_id string, value1 float64, value3 float64)`
pub fn star2() -> Plan {
    table(
        "star2",
        &[
            ("foo_id", SqlType::String),
            ("value1", SqlType::float64()),
            ("value3", SqlType::float64()),
        ],
    )
}

/// `star3(bar_id string, value2 float64)`
pub fn star3() -> Plan {
    table(
        "star3",
        &[("bar_id", SqlType::String), ("value2", SqlType::float64())],
    )
}

/// `foo_t(key1 string, key2 string, value1 float64)`
pub fn foo_t() -> Plan {
    table(
        "foo_t",
        &[
            ("key1", SqlType::String),
            ("key2", SqlType::String),
            ("value1", SqlType::float64()),
        ],
    )
}

/// `bar_t(key1 string, key2 string, value2 float64)`
pub fn bar_t() -> Plan {
    table(
        "bar_t",
        &[
            ("key1", SqlType::String),
            ("key2", SqlType::String),
            ("value2", SqlType::float64()),
        ],
    )
}

/// `foo(job string, dept_id string, year int32, y float64)`
pub fn foo() -> Plan {
    table(
        "foo",
        &[
            ("job", SqlType::String),
            ("dept_id", SqlType::String),
            ("year", int32()),
            ("y", SqlType::float64()),
        ],
    )
}

/// `bar(x float64, job string)`
pub fn bar() -> Plan {
    table(
        "bar",
        &[("x", SqlType::float64()), ("job", SqlType::String)],
    )
}

/// `alltypes(a int8, b int16, c int32, d int64, e float32, f float64, g string,
/// h boolean, i timestamp, j date)`
pub fn alltypes() -> Plan {
    table(
        "alltypes",
        &[
            (
                "a",
                SqlType::Integer {
                    bits: IntBitWidth::I8,
                },
            ),
            (
                "b",
                SqlType::Integer {
                    bits: IntBitWidth::I16,
                },
            ),
            ("c", int32()),
            ("d", SqlType::int64()),
            (
                "e",
                SqlType::Float {
                    bits: relc_sql::FloatBitWidth::F32,
                },
            ),
            ("f", SqlType::float64()),
            ("g", SqlType::String),
            ("h", SqlType::Boolean),
            ("i", SqlType::Timestamp),
            ("j", SqlType::Date),
        ],
    )
}
