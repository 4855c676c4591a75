//! Predicate evaluation between a field value and a target.

use super::fields::FieldValue;
use super::Op;
use crate::codec::{Value, ValueRef};
use std::cmp::Ordering;

/// Normalised operand: text and bytes compare alike, integers share one width.
#[derive(Debug, Clone, Copy)]
enum Operand<'a> {
    Null,
    Bool(bool),
    Int(i128),
    Float(f64),
    Text(&'a [u8]),
    List(&'a [Value]),
}

/// Coarse kind used by `in` to decide between exact and converting matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Null,
    Bool,
    Signed,
    Unsigned,
    Float,
    Text,
    List,
}

fn class(v: ValueRef<'_>) -> Class {
    match v {
        ValueRef::Null => Class::Null,
        ValueRef::Bool(_) => Class::Bool,
        ValueRef::Int(_) => Class::Signed,
        ValueRef::Uint(_) => Class::Unsigned,
        ValueRef::Float(_) => Class::Float,
        ValueRef::Str(_) | ValueRef::Bytes(_) => Class::Text,
        ValueRef::List(_) => Class::List,
    }
}

fn operand(v: ValueRef<'_>) -> Operand<'_> {
    match v {
        ValueRef::Null => Operand::Null,
        ValueRef::Bool(b) => Operand::Bool(b),
        ValueRef::Int(i) => Operand::Int(i.into()),
        ValueRef::Uint(u) => Operand::Int(u.into()),
        ValueRef::Float(f) => Operand::Float(f),
        ValueRef::Str(s) => Operand::Text(s.as_bytes()),
        ValueRef::Bytes(b) => Operand::Text(b),
        ValueRef::List(l) => Operand::List(l),
    }
}

/// Orders two numbers. An integer field is widened against a float target; a
/// float field is truncated against an integer target.
fn numeric_cmp(a: Operand<'_>, b: Operand<'_>) -> Option<Ordering> {
    match (a, b) {
        (Operand::Int(x), Operand::Int(y)) => Some(x.cmp(&y)),
        (Operand::Int(x), Operand::Float(y)) => (x as f64).partial_cmp(&y),
        (Operand::Float(x), Operand::Int(y)) => Some((x.trunc() as i128).cmp(&y)),
        (Operand::Float(x), Operand::Float(y)) => x.partial_cmp(&y),
        _ => None,
    }
}

fn deep_equal(a: Operand<'_>, b: Operand<'_>) -> bool {
    match (a, b) {
        (Operand::Null, Operand::Null) => true,
        (Operand::Bool(x), Operand::Bool(y)) => x == y,
        (Operand::Text(x), Operand::Text(y)) => x == y,
        (Operand::List(x), Operand::List(y)) => x == y,
        _ => false,
    }
}

fn equal(a: Operand<'_>, b: Operand<'_>) -> bool {
    match numeric_cmp(a, b) {
        Some(ordering) => ordering == Ordering::Equal,
        None => deep_equal(a, b),
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

/// Converts `elem` to the class of the field, as a typed cast would.
fn convert(elem: ValueRef<'_>, to: Class) -> Option<Operand<'_>> {
    if class(elem) == to {
        return Some(operand(elem));
    }
    let converted = match (to, elem) {
        (Class::Signed, ValueRef::Uint(u)) => Operand::Int((u as i64).into()),
        (Class::Signed, ValueRef::Float(f)) => Operand::Int((f as i64).into()),
        (Class::Unsigned, ValueRef::Int(i)) => Operand::Int((i as u64).into()),
        (Class::Unsigned, ValueRef::Float(f)) => Operand::Int((f as u64).into()),
        (Class::Float, ValueRef::Int(i)) => Operand::Float(i as f64),
        (Class::Float, ValueRef::Uint(u)) => Operand::Float(u as f64),
        (Class::Text, ValueRef::Str(_) | ValueRef::Bytes(_)) => operand(elem),
        (Class::Bool, ValueRef::Bool(_)) => operand(elem),
        _ => return None,
    };
    Some(converted)
}

/// Membership test. When the first element has the field's kind every element
/// is compared exactly; otherwise each element is converted to the field's
/// kind first and skipped if it cannot be.
fn in_list(field: ValueRef<'_>, list: &[Value]) -> bool {
    let Some(first) = list.first() else {
        return false;
    };
    let field_class = class(field);
    let lhs = operand(field);
    if class(first.view()) == field_class {
        return list.iter().any(|v| class(v.view()) == field_class && equal(lhs, operand(v.view())));
    }
    list.iter()
        .filter_map(|v| convert(v.view(), field_class))
        .any(|rhs| equal(lhs, rhs))
}

/// Evaluates `field <op> target`.
///
/// A null target stands for the zero value of a text or integer field. When
/// either side is still null only `equal`/`in` (true if both are null) and
/// `not equal` (true if both sides agree on being present) can match.
/// Operator and operand combinations without a defined meaning do not match.
pub fn compare(field: ValueRef<'_>, target: ValueRef<'_>, op: Op) -> bool {
    let target = match (field, target) {
        (ValueRef::Str(_), ValueRef::Null) => ValueRef::Str(""),
        (ValueRef::Int(_) | ValueRef::Uint(_), ValueRef::Null) => ValueRef::Int(0),
        _ => target,
    };

    if field.is_null() || target.is_null() {
        return match op {
            Op::Equal | Op::In => field.is_null() && target.is_null(),
            Op::NotEqual => field.is_null() == target.is_null(),
            _ => false,
        };
    }

    let (a, b) = (operand(field), operand(target));
    match op {
        Op::Equal => equal(a, b),
        Op::NotEqual => !equal(a, b),
        Op::Greater => match (a, b) {
            (Operand::Text(x), Operand::Text(y)) => x > y,
            (Operand::Bool(x), Operand::Bool(y)) => x && !y,
            _ => numeric_cmp(a, b) == Some(Ordering::Greater),
        },
        Op::Less => match (a, b) {
            (Operand::Text(x), Operand::Text(y)) => x < y,
            (Operand::Bool(x), Operand::Bool(y)) => !x && y,
            _ => numeric_cmp(a, b) == Some(Ordering::Less),
        },
        Op::Like => match (a, b) {
            (Operand::Text(x), Operand::Text(y)) => contains(x, y),
            _ => false,
        },
        Op::In => match target {
            ValueRef::List(list) => in_list(field, list),
            _ => false,
        },
    }
}

/// Evaluates `field <op> target` through the member's own ordering.
///
/// Returns `None` when the member does not order against the target (or
/// against any element of an `in` list) and for `like`, which is always
/// decided on the member's view.
pub(crate) fn compare_ordered(field: &dyn FieldValue, target: &Value, op: Op) -> Option<bool> {
    match op {
        Op::Equal => field.compare_to(target).map(Ordering::is_eq),
        Op::NotEqual => field.compare_to(target).map(Ordering::is_ne),
        Op::Greater => field.compare_to(target).map(Ordering::is_gt),
        Op::Less => field.compare_to(target).map(Ordering::is_lt),
        Op::In => {
            let Value::List(list) = target else {
                return None;
            };
            let mut ordered = false;
            for elem in list {
                match field.compare_to(elem) {
                    Some(Ordering::Equal) => return Some(true),
                    Some(_) => ordered = true,
                    None => {}
                }
            }
            ordered.then_some(false)
        }
        Op::Like => None,
    }
}
