//! Compile-time reflection: Rust types describe themselves as `TypeDesc`s.
//!
//! Leaf and container impls live here. Record types opt in with
//! `#[derive(Reflect)]` or with [`reflect_record!`](crate::reflect_record); both
//! implement `Reflect` and `ReflectRecord` and key the record by its `TypeId`.
use std::any::TypeId;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet, LinkedList, VecDeque};
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::descriptor::{FieldDef, RecordRef, RecordSource, TypeDesc, TypeKey};

pub trait Reflect {
    fn type_desc() -> TypeDesc;
}

pub trait ReflectRecord: Reflect + 'static {
    /// Bare declared name.
    const NAME: &'static str;
    fn fields() -> Vec<FieldDef>;
}

/// Descriptor for a reflected record type.
pub fn record_desc<T: ReflectRecord>() -> TypeDesc {
    TypeDesc::Record(RecordRef::new(StaticRecord::<T>(PhantomData)))
}

struct StaticRecord<T>(PhantomData<fn() -> T>);

impl<T: ReflectRecord> RecordSource for StaticRecord<T> {
    fn key(&self) -> TypeKey { TypeKey::Rust(TypeId::of::<T>()) }
    fn name(&self) -> &str { T::NAME }
    fn fields(&self) -> Vec<FieldDef> { T::fields() }
}

/// Implements `Reflect` + `ReflectRecord` for a plain (non-generic) struct.
///
/// Fields are listed in declaration order; each may carry options that map onto
/// the `FieldDef` builder (`rename`, `ts_type`, `optional`):
///
/// ```
/// use ts_surface::reflect_record;
///
/// struct Account { id: u64, created_at: i64, parent: Option<Box<Account>> }
///
/// reflect_record!(Account {
///     id: u64,
///     created_at: i64 => { rename = "createdAt", ts_type = "date" },
///     parent: Option<Box<Account>>,
/// });
/// ```
#[macro_export]
macro_rules! reflect_record {
    ($ty:ident {
        $( $field:ident : $fty:ty $( => { $( $opt:ident = $val:expr ),* $(,)? } )? ),* $(,)?
    }) => {
        impl $crate::reflect::Reflect for $ty {
            fn type_desc() -> $crate::descriptor::TypeDesc {
                $crate::reflect::record_desc::<$ty>()
            }
        }

        impl $crate::reflect::ReflectRecord for $ty {
            const NAME: &'static str = stringify!($ty);

            fn fields() -> ::std::vec::Vec<$crate::descriptor::FieldDef> {
                ::std::vec![
                    $(
                        $crate::descriptor::FieldDef::new(
                            stringify!($field),
                            <$fty as $crate::reflect::Reflect>::type_desc(),
                        ) $( $( .$opt($val) )* )?
                    ),*
                ]
            }
        }
    };
}

// ------------------------------- Leaves ----------------------------------- //

macro_rules! reflect_ints {
    ($signed:literal => $($ty:ty),*) => {
        $(impl Reflect for $ty {
            fn type_desc() -> TypeDesc { TypeDesc::Int { bits: <$ty>::BITS, signed: $signed } }
        })*
    };
}

reflect_ints!(true => i8, i16, i32, i64, i128, isize);
reflect_ints!(false => u8, u16, u32, u64, u128, usize);

impl Reflect for f32 { fn type_desc() -> TypeDesc { TypeDesc::Float { bits: 32 } } }
impl Reflect for f64 { fn type_desc() -> TypeDesc { TypeDesc::Float { bits: 64 } } }
impl Reflect for bool { fn type_desc() -> TypeDesc { TypeDesc::Bool } }
impl Reflect for char { fn type_desc() -> TypeDesc { TypeDesc::Char } }
impl Reflect for str { fn type_desc() -> TypeDesc { TypeDesc::Str } }
impl Reflect for String { fn type_desc() -> TypeDesc { TypeDesc::Str } }
impl Reflect for () { fn type_desc() -> TypeDesc { TypeDesc::Unsupported("()".into()) } }

impl Reflect for serde_json::Value { fn type_desc() -> TypeDesc { TypeDesc::Any } }
impl Reflect for serde_json::Map<String, serde_json::Value> {
    fn type_desc() -> TypeDesc { TypeDesc::map(TypeDesc::Str, TypeDesc::Any) }
}

impl<Tz: chrono::TimeZone> Reflect for chrono::DateTime<Tz> {
    fn type_desc() -> TypeDesc { TypeDesc::Date }
}
impl Reflect for chrono::NaiveDateTime { fn type_desc() -> TypeDesc { TypeDesc::Date } }
impl Reflect for chrono::NaiveDate { fn type_desc() -> TypeDesc { TypeDesc::Date } }
impl Reflect for std::time::SystemTime { fn type_desc() -> TypeDesc { TypeDesc::Date } }
impl Reflect for std::time::Duration {
    fn type_desc() -> TypeDesc { TypeDesc::Named("std::time::Duration".into()) }
}

// ----------------------------- Indirection -------------------------------- //

impl<T: Reflect> Reflect for Option<T> {
    fn type_desc() -> TypeDesc { TypeDesc::nullable(T::type_desc()) }
}

macro_rules! reflect_indirect {
    ($($wrapper:ident),*) => {
        $(impl<T: Reflect + ?Sized> Reflect for $wrapper<T> {
            fn type_desc() -> TypeDesc { TypeDesc::indirect(T::type_desc()) }
        })*
    };
}

reflect_indirect!(Box, Rc, Arc);

impl<T: Reflect + ?Sized> Reflect for &T {
    fn type_desc() -> TypeDesc { TypeDesc::indirect(T::type_desc()) }
}
impl<T: Reflect> Reflect for Cell<T> {
    fn type_desc() -> TypeDesc { TypeDesc::indirect(T::type_desc()) }
}
impl<T: Reflect + ?Sized> Reflect for RefCell<T> {
    fn type_desc() -> TypeDesc { TypeDesc::indirect(T::type_desc()) }
}

// ----------------------------- Collections -------------------------------- //

macro_rules! reflect_seqs {
    ($($coll:ident),*) => {
        $(impl<T: Reflect> Reflect for $coll<T> {
            fn type_desc() -> TypeDesc { TypeDesc::seq(T::type_desc()) }
        })*
    };
}

reflect_seqs!(Vec, VecDeque, LinkedList, BTreeSet, BinaryHeap);

impl<T: Reflect, S> Reflect for HashSet<T, S> {
    fn type_desc() -> TypeDesc { TypeDesc::seq(T::type_desc()) }
}
impl<T: Reflect, S> Reflect for IndexSet<T, S> {
    fn type_desc() -> TypeDesc { TypeDesc::seq(T::type_desc()) }
}
impl<T: Reflect> Reflect for [T] {
    fn type_desc() -> TypeDesc { TypeDesc::seq(T::type_desc()) }
}
impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn type_desc() -> TypeDesc {
        TypeDesc::Array { elem: Box::new(T::type_desc()), len: N }
    }
}

impl<K: Reflect, V: Reflect, S> Reflect for HashMap<K, V, S> {
    fn type_desc() -> TypeDesc { TypeDesc::map(K::type_desc(), V::type_desc()) }
}
impl<K: Reflect, V: Reflect> Reflect for BTreeMap<K, V> {
    fn type_desc() -> TypeDesc { TypeDesc::map(K::type_desc(), V::type_desc()) }
}
impl<K: Reflect, V: Reflect, S> Reflect for IndexMap<K, V, S> {
    fn type_desc() -> TypeDesc { TypeDesc::map(K::type_desc(), V::type_desc()) }
}

macro_rules! reflect_tuples {
    ($(($($name:ident),+)),*) => {
        $(impl<$($name: Reflect),+> Reflect for ($($name,)+) {
            fn type_desc() -> TypeDesc {
                let parts: Vec<String> = vec![$($name::type_desc().display_name()),+];
                TypeDesc::Unsupported(format!("({})", parts.join(", ")))
            }
        })*
    };
}

reflect_tuples!((A), (A, B), (A, B, C), (A, B, C, D));

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    struct Tree {
        label: String,
        children: Vec<Tree>,
        parent: Option<Box<Tree>>,
    }

    crate::reflect_record!(Tree {
        label: String => { rename = "name" },
        children: Vec<Tree>,
        parent: Option<Box<Tree>> => { optional = true },
    });

    #[test]
    fn integer_widths_and_signedness() {
        assert!(matches!(i8::type_desc(), TypeDesc::Int { bits: 8, signed: true }));
        assert!(matches!(u64::type_desc(), TypeDesc::Int { bits: 64, signed: false }));
        assert!(matches!(f32::type_desc(), TypeDesc::Float { bits: 32 }));
    }

    #[test]
    fn containers_nest() {
        let ty = <Option<Vec<HashMap<String, Box<u16>>>>>::type_desc();
        assert_eq!(ty.display_name(), "Option<Vec<Map<String, u16>>>");
        assert!(matches!(<[u8; 3]>::type_desc(), TypeDesc::Array { len: 3, .. }));
        assert!(matches!(<&str>::type_desc(), TypeDesc::Indirect(_)));
        assert!(matches!(chrono::DateTime::<chrono::Utc>::type_desc(), TypeDesc::Date));
        assert!(matches!(serde_json::Value::type_desc(), TypeDesc::Any));
    }

    #[test]
    fn tuples_and_unit_are_unsupported() {
        match <(u8, String)>::type_desc() {
            TypeDesc::Unsupported(kind) => assert_eq!(kind, "(u8, String)"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(<()>::type_desc(), TypeDesc::Unsupported(_)));
    }

    #[test]
    fn macro_records_are_keyed_by_type_id() {
        let record = Tree::type_desc();
        let record = record.as_record().expect("record");
        assert_eq!(record.name(), "Tree");
        assert_eq!(record.key(), TypeKey::Rust(TypeId::of::<Tree>()));

        let fields = record.fields();
        let names: Vec<&str> = fields.iter().map(|f| f.output_name()).collect();
        assert_eq!(names, ["name", "children", "parent"]);
        assert_eq!(fields[0].name, "label");
        assert_eq!(fields[2].optional, Some(true));
        assert!(fields[1].ts_type.is_none());
    }
}
