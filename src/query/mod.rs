//! # Query - Predicate filtering over records
//!
//! A query is a list of [`FindCondition`]s combined with a [`Condition`]:
//!
//! - `AND` (the default, also for an empty string): every predicate must match;
//!   an empty list selects every record
//! - `OR`: any predicate may match; an empty list selects nothing
//!
//! Each predicate names a field (see [`resolve`] for the lookup rules), an
//! operator and a target [`Value`]. A record whose field does not resolve
//! never matches that predicate.
//!
//! There are no indexes; every query is a scan of the underlying map.

mod compare;
mod fields;

pub use compare::compare;
pub use fields::{
    assign_fields, fields_map_for, resolve, resolve_mut, FieldMap, FieldMut, FieldRef, FieldSlot,
    FieldValue, Fields,
};

use crate::codec::Value;
use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Op {
    /// `equal`, `eq`, `=`, or the empty string.
    #[default]
    Equal,
    /// `<>`, `!=`, `notequal`, `nt`, `not`, `nq`, `neq`.
    NotEqual,
    /// `gt`, `more`, `>`.
    Greater,
    /// `lt`, `less`, `<`.
    Less,
    /// `like`, `contains`: substring test on text.
    Like,
    /// `in`: membership in a list target.
    In,
}

impl Op {
    /// Canonical name of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Equal => "equal",
            Op::NotEqual => "notequal",
            Op::Greater => "gt",
            Op::Less => "lt",
            Op::Like => "like",
            Op::In => "in",
        }
    }
}

impl FromStr for Op {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let op = match s.to_ascii_lowercase().as_str() {
            "" | "equal" | "eq" | "=" => Op::Equal,
            "<>" | "!=" | "notequal" | "nt" | "not" | "nq" | "neq" => Op::NotEqual,
            "gt" | "more" | ">" => Op::Greater,
            "lt" | "less" | "<" => Op::Less,
            "like" | "contains" => Op::Like,
            "in" => Op::In,
            _ => return Err(Error::InvalidOperator(s.to_string())),
        };
        Ok(op)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Op {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Op {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// How the predicates of a query combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Condition {
    /// All predicates must match.
    #[default]
    And,
    /// At least one predicate must match.
    Or,
}

impl FromStr for Condition {
    type Err = Error;

    /// Parses `""`, `"AND"` or `"OR"`, ignoring case.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "" | "AND" => Ok(Condition::And),
            "OR" => Ok(Condition::Or),
            _ => Err(Error::InvalidCondition(s.to_string())),
        }
    }
}

/// A single predicate: `field <op> value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindCondition {
    /// Field name or dotted path.
    #[serde(alias = "Field")]
    pub field: String,
    /// Target value.
    #[serde(alias = "Value", default)]
    pub value: Value,
    /// Operator; equality when omitted.
    #[serde(alias = "Op", default)]
    pub op: Op,
}

impl FindCondition {
    /// Creates a predicate.
    pub fn new(field: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        Self { field: field.into(), value: value.into(), op }
    }

    /// Creates an equality predicate.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Op::Equal, value)
    }

    /// Evaluates the predicate against one record.
    ///
    /// Members with their own ordering ([`FieldValue::compare_to`]) decide
    /// the predicate when neither side is null.
    pub fn matches(&self, record: &dyn Fields) -> bool {
        let Some(field) = resolve(record, &self.field) else {
            return false;
        };
        if let FieldRef::Value(member) = &field {
            if !member.view().is_null() && !self.value.is_null() {
                if let Some(hit) = compare::compare_ordered(*member, &self.value, self.op) {
                    return hit;
                }
            }
        }
        field.view().is_some_and(|v| compare(v, self.value.view(), self.op))
    }
}

/// Evaluates a whole query against one record.
pub fn matches(record: &dyn Fields, condition: Condition, predicates: &[FindCondition]) -> bool {
    match condition {
        Condition::And => predicates.iter().all(|p| p.matches(record)),
        Condition::Or => predicates.iter().any(|p| p.matches(record)),
    }
}

/// Parses a JSON array of predicates, e.g.
/// `[{"field": "age", "op": "gt", "value": 42}]`.
pub fn parse_conditions(json: &str) -> Result<Vec<FindCondition>> {
    Ok(serde_json::from_str(json)?)
}
