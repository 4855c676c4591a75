//! Declarative code generation for record types.

/// Implements [`Fields`](crate::query::Fields), [`FieldSlot`](crate::query::FieldSlot)
/// and [`Codec`](crate::codec::Codec) for a struct.
///
/// Every member of the struct must be listed, in declaration order; the list
/// is also the on-disk member order. Members may be scalars, `Option`/`Box`
/// of scalars, or other types declared with `fields!` (which become nested
/// records for dotted lookups).
///
/// ```rust
/// #[derive(Debug, Clone, Default)]
/// pub struct Address {
///     pub city: String,
///     pub zip: u32,
/// }
///
/// compactmap::fields!(Address { city, zip });
/// ```
#[macro_export]
macro_rules! fields {
    ($name:ident { $($member:ident),* $(,)? }) => {
        impl $crate::query::Fields for $name {
            fn field_names(&self) -> &'static [&'static str] {
                &[$(stringify!($member)),*]
            }

            fn field(&self, name: &str) -> Option<$crate::query::FieldRef<'_>> {
                $(
                    if name == stringify!($member) {
                        return Some($crate::query::FieldSlot::slot(&self.$member));
                    }
                )*
                None
            }

            fn field_mut(&mut self, name: &str) -> Option<$crate::query::FieldMut<'_>> {
                $(
                    if name == stringify!($member) {
                        return Some($crate::query::FieldSlot::slot_mut(&mut self.$member));
                    }
                )*
                None
            }
        }

        impl $crate::query::FieldSlot for $name {
            fn slot(&self) -> $crate::query::FieldRef<'_> {
                $crate::query::FieldRef::Nested(Some(self as &dyn $crate::query::Fields))
            }

            fn slot_mut(&mut self) -> $crate::query::FieldMut<'_> {
                $crate::query::FieldMut::Nested(Some(self as &mut dyn $crate::query::Fields))
            }

            fn option_slot(slot: &Option<Self>) -> $crate::query::FieldRef<'_> {
                $crate::query::FieldRef::Nested(
                    slot.as_ref().map(|v| v as &dyn $crate::query::Fields),
                )
            }

            fn option_slot_mut(slot: &mut Option<Self>) -> $crate::query::FieldMut<'_> {
                $crate::query::FieldMut::Nested(
                    slot.as_mut().map(|v| v as &mut dyn $crate::query::Fields),
                )
            }
        }

        impl $crate::codec::Codec for $name {
            fn encode_to(&self, out: &mut Vec<u8>) -> $crate::Result<()> {
                $($crate::codec::Codec::encode_to(&self.$member, out)?;)*
                Ok(())
            }

            fn decode_from(input: &mut &[u8]) -> $crate::Result<Self> {
                Ok(Self {
                    $($member: $crate::codec::Codec::decode_from(input)?,)*
                })
            }
        }
    };
}

/// Like [`fields!`], and also implements [`Record`](crate::Record) using the
/// struct's `id: i64` member as the record identifier.
///
/// ```rust
/// #[derive(Debug, Clone, Default)]
/// pub struct User {
///     pub id: i64,
///     pub name: String,
///     pub age: i32,
/// }
///
/// compactmap::record!(User { id, name, age });
/// ```
#[macro_export]
macro_rules! record {
    ($name:ident { $($member:ident),* $(,)? }) => {
        $crate::fields!($name { $($member),* });

        impl $crate::Record for $name {
            fn id(&self) -> i64 {
                self.id
            }

            fn set_id(&mut self, id: i64) {
                self.id = id;
            }
        }
    };
}
