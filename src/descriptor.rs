//! Type descriptors: the input side of the type graph.
//!
//! A `TypeDesc` describes one *declared* type, never a value. Records are reached
//! through a `RecordRef`, whose field list is only produced when somebody asks for
//! it, so a self-referential record is still a finite descriptor.
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub enum TypeDesc {
    Bool,
    Int { bits: u32, signed: bool },
    Float { bits: u32 },
    Char,
    Str,
    /// Timestamp-like kinds (chrono dates, `SystemTime`).
    Date,
    /// Open value: anything goes (`serde_json::Value`).
    Any,
    /// `Option<T>`: nullable, sets the field's optional flag.
    Nullable(Box<TypeDesc>),
    /// `Box<T>`, `Rc<T>`, `Arc<T>`, `&T`: transparent indirection.
    Indirect(Box<TypeDesc>),
    Map { key: Box<TypeDesc>, value: Box<TypeDesc> },
    Seq(Box<TypeDesc>),
    Array { elem: Box<TypeDesc>, len: usize },
    Record(RecordRef),
    /// Any other declared type, carried by its (possibly path-qualified) name.
    Named(String),
    /// Kinds with no destination equivalent (fn pointers, raw pointers, tuples).
    Unsupported(String),
}

/// Identity of a declared type; what the dedup index is keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKey {
    Rust(TypeId),
    Path(String),
}

/// Something that can describe one record type on demand.
pub trait RecordSource: Send + Sync {
    fn key(&self) -> TypeKey;
    /// Bare declared name, without any module path.
    fn name(&self) -> &str;
    /// Declared fields, in declaration order.
    fn fields(&self) -> Vec<FieldDef>;
}

/// Shared handle to a record description.
#[derive(Clone)]
pub struct RecordRef(Arc<dyn RecordSource>);

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeDesc,
    /// Destination field identifier, when it differs from `name`.
    pub rename: Option<String>,
    /// Destination type override; wins over structural inference.
    pub ts_type: Option<String>,
    /// Forces the optional flag either way.
    pub optional: Option<bool>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl TypeDesc {
    pub fn nullable(inner: TypeDesc) -> Self { TypeDesc::Nullable(Box::new(inner)) }
    pub fn indirect(inner: TypeDesc) -> Self { TypeDesc::Indirect(Box::new(inner)) }
    pub fn seq(elem: TypeDesc) -> Self { TypeDesc::Seq(Box::new(elem)) }
    pub fn map(key: TypeDesc, value: TypeDesc) -> Self {
        TypeDesc::Map { key: Box::new(key), value: Box::new(value) }
    }

    /// Peel every `Nullable`/`Indirect` layer.
    pub fn strip_indirection(&self) -> &TypeDesc {
        let mut ty = self;
        while let TypeDesc::Nullable(inner) | TypeDesc::Indirect(inner) = ty {
            ty = inner;
        }
        ty
    }

    /// The record behind any number of indirection layers, if any.
    pub fn as_record(&self) -> Option<&RecordRef> {
        match self.strip_indirection() {
            TypeDesc::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Rust-flavoured declared name, used for passthrough and for diagnostics.
    pub fn display_name(&self) -> String {
        match self {
            TypeDesc::Bool => "bool".into(),
            TypeDesc::Int { bits, signed } => {
                format!("{}{bits}", if *signed { 'i' } else { 'u' })
            }
            TypeDesc::Float { bits } => format!("f{bits}"),
            TypeDesc::Char => "char".into(),
            TypeDesc::Str => "String".into(),
            TypeDesc::Date => "Date".into(),
            TypeDesc::Any => "any".into(),
            TypeDesc::Nullable(inner) => format!("Option<{}>", inner.display_name()),
            TypeDesc::Indirect(inner) => inner.display_name(),
            TypeDesc::Map { key, value } => {
                format!("Map<{}, {}>", key.display_name(), value.display_name())
            }
            TypeDesc::Seq(elem) => format!("Vec<{}>", elem.display_name()),
            TypeDesc::Array { elem, len } => format!("[{}; {len}]", elem.display_name()),
            TypeDesc::Record(record) => record.name().to_string(),
            TypeDesc::Named(path) => path.clone(),
            TypeDesc::Unsupported(kind) => kind.clone(),
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKey::Rust(id) => write!(f, "{id:?}"),
            TypeKey::Path(path) => f.write_str(path),
        }
    }
}

impl RecordRef {
    pub fn new(source: impl RecordSource + 'static) -> Self {
        Self(Arc::new(source))
    }
    pub fn key(&self) -> TypeKey { self.0.key() }
    pub fn name(&self) -> &str { self.0.name() }
    pub fn fields(&self) -> Vec<FieldDef> { self.0.fields() }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordRef").field(&self.name()).finish()
    }
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: TypeDesc) -> Self {
        Self { name: name.into(), ty, rename: None, ts_type: None, optional: None }
    }
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.rename = Some(name.into());
        self
    }
    pub fn ts_type(mut self, ty: impl Into<String>) -> Self {
        self.ts_type = Some(ty.into());
        self
    }
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = Some(optional);
        self
    }

    /// Identifier the field gets in generated output.
    pub fn output_name(&self) -> &str {
        self.rename.as_deref().unwrap_or(&self.name)
    }
}

// ------------------------------- Tests ------------------------------------ //
