//! Type graph builder.
//!
//! Walks record descriptors depth-first, classifies every declared field into a
//! destination shape and collects one `Record` per source type identity.
//!
//! - A record is registered in the dedup index *before* its fields are walked, so
//!   self-references and mutual references resolve to the in-progress record.
//! - Roots keep their bare name; nested records are prefixed with the name of the
//!   record that first reached them (`User` + `Address` → `UserAddress`).
//! - Fields that cannot be classified are reported and dropped, never fatal.
//!
//! Registration takes `&mut self`: one builder per generation run, one thread at
//! a time. Parallel discovery means independent builders.
use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::descriptor::{FieldDef, RecordRef, TypeDesc, TypeKey};
use crate::error::GraphError;
use crate::primitive::{map_primitive, TsPrimitive};
use crate::reflect::Reflect;

/// Override implied by date-like kinds.
pub const DATE_OVERRIDE: &str = "date";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Stable handle into the builder's record arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(usize);

#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub name: String,
    pub fields: Vec<Field>,
    #[serde(skip)]
    pub key: TypeKey,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub optional: bool,
    #[serde(flatten)]
    pub shape: Shape,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "camelCase")]
pub enum Shape {
    Primitive { kind: TsPrimitive },
    Map { key: TsPrimitive, value: TypeRef },
    Array { value: TypeRef },
    Object { value: String },
    Opaque,
    /// Declared override, carried verbatim.
    #[serde(rename_all = "camelCase")]
    Custom { ts_type: String },
}

/// Value type of a collection or object field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypeRef {
    Primitive(TsPrimitive),
    Record(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub record: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DiagnosticKind {
    /// The field's type has no destination shape; the field was dropped.
    Unclassifiable { ty: String },
    /// A second type identity was given a name that is already taken.
    NameCollision { name: String },
}

#[derive(Debug, Default)]
pub struct TypeGraph {
    /// Arena, in discovery order.
    slots: Vec<Record>,
    index: IndexMap<TypeKey, RecordId>,
    names: HashMap<String, RecordId>,
    /// Output order: a record lands here once its field list is final.
    order: Vec<RecordId>,
    diagnostics: Vec<Diagnostic>,
}

// ————————————————————————————————————————————————————————————————————————————
// FRONT API
// ————————————————————————————————————————————————————————————————————————————

impl TypeGraph {
    pub fn new() -> Self { Self::default() }

    /// Register a reflected Rust type as a root.
    pub fn add<T: Reflect + ?Sized>(&mut self) -> Result<&Record, GraphError> {
        self.add_root(&T::type_desc())
    }

    /// Register one root type and everything reachable from it.
    ///
    /// Idempotent per type identity. Fails only when `ty` is not a record
    /// (behind any amount of indirection); earlier records stay untouched.
    pub fn add_root(&mut self, ty: &TypeDesc) -> Result<&Record, GraphError> {
        let Some(source) = ty.as_record() else {
            return Err(GraphError::UnsupportedRoot { ty: ty.display_name() });
        };
        let id = self.resolve(source, None);
        Ok(&self.slots[id.0])
    }

    /// Completed records, in output order.
    pub fn records(&self) -> impl Iterator<Item = &Record> + '_ {
        self.order.iter().map(|id| &self.slots[id.0])
    }

    pub fn record(&self, id: RecordId) -> Option<&Record> { self.slots.get(id.0) }

    /// Handle of the record built for `ty`, if it has been reached.
    pub fn id_of(&self, ty: &TypeDesc) -> Option<RecordId> {
        let source = ty.as_record()?;
        self.index.get(&source.key()).copied()
    }

    pub fn find(&self, name: &str) -> Option<&Record> {
        self.names.get(name).map(|id| &self.slots[id.0])
    }

    pub fn len(&self) -> usize { self.order.len() }
    pub fn is_empty(&self) -> bool { self.order.is_empty() }
    pub fn diagnostics(&self) -> &[Diagnostic] { &self.diagnostics }
}

// ————————————————————————————————————————————————————————————————————————————
// RESOLUTION
// ————————————————————————————————————————————————————————————————————————————

impl TypeGraph {
    fn resolve(&mut self, source: &RecordRef, parent: Option<&str>) -> RecordId {
        let key = source.key();
        if let Some(&id) = self.index.get(&key) {
            return id;
        }

        let name = match parent {
            Some(parent) => format!("{parent}{}", source.name()),
            None => source.name().to_string(),
        };
        let id = RecordId(self.slots.len());
        self.slots.push(Record { name: name.clone(), fields: Vec::new(), key: key.clone() });
        self.index.insert(key, id);
        self.claim_name(&name, id);
        tracing::debug!(record = %name, "discovered record");

        let defs = source.fields();
        let mut fields = Vec::with_capacity(defs.len());
        for def in &defs {
            match self.classify(&name, def) {
                Ok(field) => fields.push(field),
                Err(ty) => self.report(Diagnostic {
                    record: name.clone(),
                    field: Some(def.name.clone()),
                    kind: DiagnosticKind::Unclassifiable { ty },
                }),
            }
        }

        tracing::debug!(record = %name, fields = fields.len(), "finalized record");
        self.slots[id.0].fields = fields;
        self.order.push(id);
        id
    }

    /// `Err` carries the display name of the kind that had no destination shape.
    fn classify(&mut self, owner: &str, def: &FieldDef) -> Result<Field, String> {
        let (ty, nullable) = strip_field(&def.ty);
        let shape = match &def.ts_type {
            Some(ts_type) => Shape::Custom { ts_type: ts_type.clone() },
            None => self.shape_of(owner, ty)?,
        };
        Ok(Field {
            name: def.output_name().to_string(),
            optional: def.optional.unwrap_or(nullable),
            shape,
        })
    }

    fn shape_of(&mut self, owner: &str, ty: &TypeDesc) -> Result<Shape, String> {
        let shape = match ty {
            TypeDesc::Date => Shape::Custom { ts_type: DATE_OVERRIDE.into() },
            TypeDesc::Map { key, value } => Shape::Map {
                key: map_primitive(key).ok_or_else(|| key.display_name())?,
                value: self.element(owner, value)?,
            },
            TypeDesc::Seq(elem) | TypeDesc::Array { elem, .. } => Shape::Array {
                value: self.element(owner, elem)?,
            },
            TypeDesc::Record(source) => Shape::Object { value: self.nested(source, owner) },
            TypeDesc::Any => Shape::Opaque,
            other => Shape::Primitive {
                kind: map_primitive(other).ok_or_else(|| other.display_name())?,
            },
        };
        Ok(shape)
    }

    /// Collection element: a record when one sits behind the indirection,
    /// otherwise whatever the primitive table makes of it.
    fn element(&mut self, owner: &str, elem: &TypeDesc) -> Result<TypeRef, String> {
        match elem.as_record() {
            Some(source) => Ok(TypeRef::Record(self.nested(source, owner))),
            None => map_primitive(elem)
                .map(TypeRef::Primitive)
                .ok_or_else(|| elem.display_name()),
        }
    }

    fn nested(&mut self, source: &RecordRef, owner: &str) -> String {
        let id = self.resolve(source, Some(owner));
        self.slots[id.0].name.clone()
    }

    fn claim_name(&mut self, name: &str, id: RecordId) {
        if self.names.contains_key(name) {
            self.report(Diagnostic {
                record: name.to_string(),
                field: None,
                kind: DiagnosticKind::NameCollision { name: name.to_string() },
            });
        } else {
            self.names.insert(name.to_string(), id);
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        tracing::warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }
}

/// Strip all nullable/indirect layers; optional iff any layer was nullable.
fn strip_field(ty: &TypeDesc) -> (&TypeDesc, bool) {
    let mut ty = ty;
    let mut nullable = false;
    loop {
        match ty {
            TypeDesc::Nullable(inner) => {
                nullable = true;
                ty = inner;
            }
            TypeDesc::Indirect(inner) => ty = inner,
            _ => return (ty, nullable),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ACCESSORS
// ————————————————————————————————————————————————————————————————————————————

impl Record {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl Field {
    pub fn primitive_kind(&self) -> Option<&TsPrimitive> {
        match &self.shape {
            Shape::Primitive { kind } => Some(kind),
            _ => None,
        }
    }

    pub fn key_type(&self) -> Option<&TsPrimitive> {
        match &self.shape {
            Shape::Map { key, .. } => Some(key),
            _ => None,
        }
    }

    pub fn value_type(&self) -> Option<&str> {
        match &self.shape {
            Shape::Map { value, .. } | Shape::Array { value } => Some(value.name()),
            Shape::Object { value } => Some(value),
            _ => None,
        }
    }
}

impl TypeRef {
    pub fn name(&self) -> &str {
        match self {
            TypeRef::Primitive(primitive) => primitive.as_str(),
            TypeRef::Record(name) => name,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.field) {
            (DiagnosticKind::Unclassifiable { ty }, Some(field)) => {
                write!(f, "{}.{field}: unhandled kind `{ty}`, field skipped", self.record)
            }
            (DiagnosticKind::Unclassifiable { ty }, None) => {
                write!(f, "{}: unhandled kind `{ty}`", self.record)
            }
            (DiagnosticKind::NameCollision { name }, _) => {
                write!(f, "record name `{name}` is used by more than one type")
            }
        }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect_record;

    #[allow(dead_code)]
    struct Event {
        id: u32,
        at: chrono::NaiveDateTime,
        stamp: i64,
        callback: fn(),
        labels: Vec<(u8, u8)>,
        extra: serde_json::Value,
    }

    struct Callback;

    impl Reflect for Callback {
        fn type_desc() -> TypeDesc { TypeDesc::Unsupported("fn()".into()) }
    }

    reflect_record!(Event {
        id: u32,
        at: chrono::NaiveDateTime,
        stamp: i64 => { ts_type = "Date" },
        callback: Callback,
        labels: Vec<(u8, u8)>,
        extra: serde_json::Value,
    });

    #[test]
    fn unclassifiable_fields_are_dropped_and_reported() {
        let mut graph = TypeGraph::new();
        let record = graph.add::<Event>().unwrap();
        let names: Vec<&str> = record.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["id", "at", "stamp", "extra"]);

        let diags = graph.diagnostics();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].field.as_deref(), Some("callback"));
        assert_eq!(diags[0].kind, DiagnosticKind::Unclassifiable { ty: "fn()".into() });
        assert_eq!(diags[1].field.as_deref(), Some("labels"));
        assert_eq!(diags[1].kind, DiagnosticKind::Unclassifiable { ty: "(u8, u8)".into() });
    }

    #[test]
    fn overrides_win_and_dates_imply_one() {
        let mut graph = TypeGraph::new();
        let record = graph.add::<Event>().unwrap();
        assert_eq!(record.field("stamp").unwrap().shape, Shape::Custom { ts_type: "Date".into() });
        assert_eq!(
            record.field("at").unwrap().shape,
            Shape::Custom { ts_type: DATE_OVERRIDE.into() }
        );
        assert_eq!(record.field("extra").unwrap().shape, Shape::Opaque);
    }

    #[test]
    fn non_record_roots_are_rejected() {
        let mut graph = TypeGraph::new();
        let err = graph.add::<Vec<u8>>().unwrap_err();
        assert!(matches!(err, GraphError::UnsupportedRoot { ref ty } if ty == "Vec<u8>"));
        assert!(graph.is_empty());
        assert!(graph.add::<Option<Box<Event>>>().is_ok());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn field_json_view_is_flat() {
        let mut graph = TypeGraph::new();
        graph.add::<Event>().unwrap();
        let json = serde_json::to_value(graph.records().collect::<Vec<_>>()).unwrap();
        assert_eq!(
            json[0]["fields"][0],
            serde_json::json!({ "name": "id", "optional": false, "shape": "primitive", "kind": "number" })
        );
        assert_eq!(json[0]["fields"][2]["tsType"], "Date");
    }
}
