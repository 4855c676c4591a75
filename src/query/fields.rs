//! Field access by name.
//!
//! Record types expose their members through [`Fields`], usually generated by
//! the [`fields!`](crate::fields) and [`record!`](crate::record) macros. The
//! resolver looks names up case-insensitively and understands dotted paths
//! (`"address.city"`) as well as bare names of nested members (`"city"`).

use crate::codec::{Kind, Value, ValueRef};
use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Field name to value, as accepted by update operations.
pub type FieldMap = BTreeMap<String, Value>;

/// Structured access to the members of a record.
pub trait Fields {
    /// Declared member names, in declaration order.
    fn field_names(&self) -> &'static [&'static str];

    /// Returns the member with exactly this declared name.
    fn field(&self, name: &str) -> Option<FieldRef<'_>>;

    /// Returns the member with exactly this declared name for assignment.
    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>>;
}

/// A scalar member that can be read as a [`ValueRef`] and assigned from a [`Value`].
pub trait FieldValue {
    /// The declared kind of the member.
    fn kind(&self) -> Kind;

    /// Borrowed view of the current value.
    fn view(&self) -> ValueRef<'_>;

    /// Converts `value` to the member type and stores it.
    ///
    /// Returns false when the value is not convertible.
    fn assign(&mut self, value: &Value) -> bool;

    /// Orders this member against a predicate target.
    ///
    /// Types with their own notion of order (versions, case-folded names)
    /// override this; `None` falls back to comparing [`view`](Self::view).
    fn compare_to(&self, _target: &Value) -> Option<Ordering> {
        None
    }
}

/// A resolved member.
pub enum FieldRef<'a> {
    /// A scalar member.
    Value(&'a dyn FieldValue),
    /// A nested record; `None` when an optional nested record is absent.
    Nested(Option<&'a dyn Fields>),
}

/// A resolved member, borrowed for assignment.
pub enum FieldMut<'a> {
    /// A scalar member.
    Value(&'a mut dyn FieldValue),
    /// A nested record; `None` when an optional nested record is absent.
    Nested(Option<&'a mut dyn Fields>),
}

impl FieldRef<'_> {
    /// The value used by predicates. Absent nested records read as null.
    pub fn view(&self) -> Option<ValueRef<'_>> {
        match self {
            FieldRef::Value(v) => Some(v.view()),
            FieldRef::Nested(None) => Some(ValueRef::Null),
            FieldRef::Nested(Some(_)) => None,
        }
    }
}

/// How a member type presents itself to the resolver.
///
/// Implemented for every scalar type, for `Option` and `Box` of any slot
/// type, and by the [`fields!`](crate::fields) macro for nested records.
pub trait FieldSlot {
    /// Resolves this member.
    fn slot(&self) -> FieldRef<'_>;

    /// Resolves this member for assignment.
    fn slot_mut(&mut self) -> FieldMut<'_>;

    /// Resolves an optional member of this type.
    fn option_slot(slot: &Option<Self>) -> FieldRef<'_>
    where
        Self: Sized;

    /// Resolves an optional member of this type for assignment.
    fn option_slot_mut(slot: &mut Option<Self>) -> FieldMut<'_>
    where
        Self: Sized;
}

impl<T: FieldSlot> FieldSlot for Option<T> {
    fn slot(&self) -> FieldRef<'_> {
        T::option_slot(self)
    }

    fn slot_mut(&mut self) -> FieldMut<'_> {
        T::option_slot_mut(self)
    }

    fn option_slot(slot: &Option<Self>) -> FieldRef<'_> {
        match slot {
            Some(inner) => inner.slot(),
            None => FieldRef::Nested(None),
        }
    }

    fn option_slot_mut(slot: &mut Option<Self>) -> FieldMut<'_> {
        match slot {
            Some(inner) => inner.slot_mut(),
            None => FieldMut::Nested(None),
        }
    }
}

impl<T: FieldSlot> FieldSlot for Box<T> {
    fn slot(&self) -> FieldRef<'_> {
        (**self).slot()
    }

    fn slot_mut(&mut self) -> FieldMut<'_> {
        (**self).slot_mut()
    }

    fn option_slot(slot: &Option<Self>) -> FieldRef<'_> {
        match slot {
            Some(inner) => inner.slot(),
            None => FieldRef::Nested(None),
        }
    }

    // An absent box cannot be filled in place.
    fn option_slot_mut(slot: &mut Option<Self>) -> FieldMut<'_> {
        match slot {
            Some(inner) => inner.slot_mut(),
            None => FieldMut::Nested(None),
        }
    }
}

macro_rules! numeric_field {
    ($($ty:ty => $kind:ident, $variant:ident;)*) => {$(
        impl FieldValue for $ty {
            fn kind(&self) -> Kind {
                Kind::$kind
            }

            fn view(&self) -> ValueRef<'_> {
                ValueRef::$variant((*self).into())
            }

            fn assign(&mut self, value: &Value) -> bool {
                *self = match *value {
                    Value::Int(i) => i as $ty,
                    Value::Uint(u) => u as $ty,
                    Value::Float(f) => f as $ty,
                    _ => return false,
                };
                true
            }
        }
    )*};
}

numeric_field! {
    i8 => I8, Int;
    i16 => I16, Int;
    i32 => I32, Int;
    i64 => I64, Int;
    u8 => U8, Uint;
    u16 => U16, Uint;
    u32 => U32, Uint;
    u64 => U64, Uint;
    f32 => F32, Float;
    f64 => F64, Float;
}

impl FieldValue for bool {
    fn kind(&self) -> Kind {
        Kind::Bool
    }

    fn view(&self) -> ValueRef<'_> {
        ValueRef::Bool(*self)
    }

    fn assign(&mut self, value: &Value) -> bool {
        match value {
            Value::Bool(b) => {
                *self = *b;
                true
            }
            _ => false,
        }
    }
}

impl FieldValue for String {
    fn kind(&self) -> Kind {
        Kind::Str
    }

    fn view(&self) -> ValueRef<'_> {
        ValueRef::Str(self)
    }

    fn assign(&mut self, value: &Value) -> bool {
        match value {
            Value::Str(s) => self.clone_from(s),
            Value::Bytes(b) => match std::str::from_utf8(b) {
                Ok(s) => *self = s.to_owned(),
                Err(_) => return false,
            },
            _ => return false,
        }
        true
    }
}

impl FieldValue for Vec<u8> {
    fn kind(&self) -> Kind {
        Kind::Bytes
    }

    fn view(&self) -> ValueRef<'_> {
        ValueRef::Bytes(self)
    }

    fn assign(&mut self, value: &Value) -> bool {
        match value {
            Value::Bytes(b) => self.clone_from(b),
            Value::Str(s) => *self = s.as_bytes().to_vec(),
            _ => return false,
        }
        true
    }
}

macro_rules! scalar_slot {
    ($($ty:ty),*) => {$(
        impl FieldValue for Option<$ty> {
            fn kind(&self) -> Kind {
                <$ty as Default>::default().kind()
            }

            fn view(&self) -> ValueRef<'_> {
                self.as_ref().map_or(ValueRef::Null, FieldValue::view)
            }

            fn assign(&mut self, value: &Value) -> bool {
                if value.is_null() {
                    *self = None;
                    return true;
                }
                let mut inner = self.clone().unwrap_or_default();
                if !inner.assign(value) {
                    return false;
                }
                *self = Some(inner);
                true
            }
        }

        impl FieldSlot for $ty {
            fn slot(&self) -> FieldRef<'_> {
                FieldRef::Value(self)
            }

            fn slot_mut(&mut self) -> FieldMut<'_> {
                FieldMut::Value(self)
            }

            fn option_slot(slot: &Option<Self>) -> FieldRef<'_> {
                FieldRef::Value(slot)
            }

            fn option_slot_mut(slot: &mut Option<Self>) -> FieldMut<'_> {
                FieldMut::Value(slot)
            }
        }
    )*};
}

scalar_slot!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, bool, String, Vec<u8>);

/// Finds the declared-name path to `name` inside `fields`.
///
/// A direct member wins; otherwise nested records are searched depth-first in
/// declaration order.
fn locate(fields: &dyn Fields, name: &str, path: &mut Vec<&'static str>) -> bool {
    let names = fields.field_names();
    if let Some(declared) = names.iter().find(|n| n.eq_ignore_ascii_case(name)) {
        path.push(*declared);
        return true;
    }
    for declared in names {
        if let Some(FieldRef::Nested(Some(inner))) = fields.field(declared) {
            path.push(*declared);
            if locate(inner, name, path) {
                return true;
            }
            path.pop();
        }
    }
    false
}

/// Resolves a possibly dotted name into a path of declared member names.
fn resolve_path(fields: &dyn Fields, name: &str) -> Option<Vec<&'static str>> {
    let mut path = Vec::new();
    let mut current = fields;
    let mut segments = name.split('.').peekable();
    while let Some(segment) = segments.next() {
        let start = path.len();
        if !locate(current, segment, &mut path) {
            return None;
        }
        if segments.peek().is_some() {
            current = walk(current, &path[start..])
                .and_then(|f| match f {
                    FieldRef::Nested(Some(inner)) => Some(inner),
                    _ => None,
                })?;
        }
    }
    Some(path)
}

fn walk<'a>(fields: &'a dyn Fields, path: &[&str]) -> Option<FieldRef<'a>> {
    let (last, init) = path.split_last()?;
    let mut current = fields;
    for name in init {
        match current.field(name)? {
            FieldRef::Nested(Some(inner)) => current = inner,
            _ => return None,
        }
    }
    current.field(last)
}

fn walk_mut<'a>(fields: &'a mut dyn Fields, path: &[&str]) -> Option<FieldMut<'a>> {
    let (last, init) = path.split_last()?;
    let mut current = fields;
    for name in init {
        match current.field_mut(name)? {
            FieldMut::Nested(Some(inner)) => current = inner,
            _ => return None,
        }
    }
    current.field_mut(last)
}

/// Resolves `name` (for example `"age"`, `"Address.City"` or `"city"`) in `record`.
///
/// Returns `None` if any segment cannot be found.
pub fn resolve<'a>(record: &'a dyn Fields, name: &str) -> Option<FieldRef<'a>> {
    let path = resolve_path(record, name)?;
    walk(record, &path)
}

/// Like [`resolve`], but borrows the member for assignment.
pub fn resolve_mut<'a>(record: &'a mut dyn Fields, name: &str) -> Option<FieldMut<'a>> {
    let path = resolve_path(record, name)?;
    walk_mut(record, &path)
}

/// Assigns every entry of `fields` to `record`.
///
/// Returns `Ok(false)` as soon as a name does not resolve to a scalar member;
/// entries before it stay assigned. A value that cannot be converted to the
/// member type is a caller error.
pub fn assign_fields(record: &mut dyn Fields, fields: &FieldMap) -> Result<bool> {
    for (name, value) in fields {
        let Some(FieldMut::Value(slot)) = resolve_mut(record, name) else {
            return Ok(false);
        };
        if !slot.assign(value) {
            return Err(Error::TypeMismatch {
                field: name.clone(),
                expected: slot.kind(),
                found: value.kind(),
            });
        }
    }
    Ok(true)
}

/// Collects the current values of `names` from `record`.
///
/// Keys are the requested names, or the full dotted path of declared names
/// when `use_dot` is set (so `"city"` found under `address` becomes
/// `"address.city"`). Names that do not resolve to a scalar are skipped.
pub fn fields_map_for(record: &dyn Fields, names: &[&str], use_dot: bool) -> FieldMap {
    let mut values = FieldMap::new();
    for &name in names {
        let Some(path) = resolve_path(record, name) else {
            continue;
        };
        if let Some(FieldRef::Value(v)) = walk(record, &path) {
            let key = if use_dot {
                path.join(".")
            } else {
                name.rsplit('.').next().unwrap_or(name).to_string()
            };
            values.insert(key, v.view().to_value());
        }
    }
    values
}
