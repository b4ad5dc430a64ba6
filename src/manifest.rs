//! Type manifests: record graphs declared in JSON instead of reflected.
//!
//! ```json
//! { "records": {
//!     "app::User": { "fields": [
//!         { "name": "name", "type": "String" },
//!         { "name": "address", "type": "Option<Address>" },
//!         { "name": "created_at", "type": "i64", "rename": "createdAt", "tsType": "date" }
//!     ] },
//!     "app::Address": { "fields": [ { "name": "city", "type": "String" } ] }
//! } }
//! ```
//!
//! Field types are Rust type expressions, parsed with `syn`. A path names a
//! manifest record when it matches a record key exactly, or relative to the
//! referencing record's module; anything unknown is passed through by name.
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use quote::ToTokens;
use serde::Deserialize;

use crate::descriptor::{FieldDef, RecordRef, RecordSource, TypeDesc, TypeKey};
use crate::error::ManifestError;
use crate::path_de::from_str_with_path;
use crate::primitive::bare_name;

// ————————————————————————————————————————————————————————————————————————————
// FILE FORMAT
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestFile {
    pub records: IndexMap<String, RecordDecl>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordDecl {
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub rename: Option<String>,
    #[serde(default)]
    pub ts_type: Option<String>,
    #[serde(default)]
    pub optional: Option<bool>,
}

// ————————————————————————————————————————————————————————————————————————————
// TYPE EXPRESSIONS
// ————————————————————————————————————————————————————————————————————————————

/// Parse a field's `type` string as a Rust type.
///
/// Any well-formed Rust type is accepted here; kinds with no destination shape
/// (trait objects, fn pointers, tuples, ...) are rejected later, per field, by the
/// graph builder.
pub fn parse_type(src: &str) -> syn::Result<syn::Type> {
    syn::parse_str::<syn::Type>(src)
}

/// Compact source text of a type: `Vec<(u8, u8)>`, `fn(u8) -> bool`.
pub fn type_text(ty: &syn::Type) -> String {
    let raw = ty.to_token_stream().to_string();
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    let mut prev = None;
    while let Some(c) = chars.next() {
        if c == ' ' {
            let glue_left = prev.is_some_and(|p| matches!(p, '<' | '(' | '[' | '&' | '*' | ':'));
            let glue_right = chars
                .peek()
                .is_some_and(|n| matches!(n, '<' | '>' | '(' | ')' | ']' | ',' | ';' | ':'));
            if glue_left || glue_right {
                continue;
            }
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

// ————————————————————————————————————————————————————————————————————————————
// MANIFEST
// ————————————————————————————————————————————————————————————————————————————

/// Parsed, validated manifest contents (one or more files).
#[derive(Debug, Default)]
pub struct Manifest {
    records: IndexMap<String, ParsedRecord>,
}

#[derive(Debug)]
struct ParsedRecord {
    module: String,
    name: String,
    /// Declared fields; every `ty` is known to parse.
    fields: Vec<FieldDecl>,
}

impl Manifest {
    /// Decode and validate one manifest document; `origin` names it in errors.
    pub fn parse(src: &str, origin: &str) -> Result<Self, ManifestError> {
        let file: ManifestFile = from_str_with_path(src).map_err(|err| ManifestError::Decode {
            origin: origin.to_string(),
            message: err.to_string(),
        })?;

        let mut records = IndexMap::with_capacity(file.records.len());
        for (key, decl) in file.records {
            for field in &decl.fields {
                parse_type(&field.ty).map_err(|err| ManifestError::TypeSyntax {
                    origin: origin.to_string(),
                    record: key.clone(),
                    field: field.name.clone(),
                    expr: field.ty.clone(),
                    message: err.to_string(),
                })?;
            }
            let (module, name) = match key.rfind("::") {
                Some(ix) => (key[..ix].to_string(), key[ix + 2..].to_string()),
                None => (String::new(), key.clone()),
            };
            records.insert(key, ParsedRecord { module, name, fields: decl.fields });
        }
        Ok(Self { records })
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let src = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&src, &path.to_string_lossy())
    }

    /// Append another manifest's records; record keys must stay unique.
    /// On a duplicate key nothing is merged.
    pub fn merge(&mut self, other: Manifest) -> Result<(), ManifestError> {
        if let Some(key) = other.records.keys().find(|key| self.records.contains_key(*key)) {
            return Err(ManifestError::DuplicateRecord(key.clone()));
        }
        self.records.extend(other.records);
        Ok(())
    }

    pub fn record_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.records.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize { self.records.len() }
    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    pub fn into_catalog(self) -> Catalog { Catalog(Arc::new(self)) }

    fn resolve_key(&self, path: &str, module: &str) -> Option<&str> {
        if let Some((key, _)) = self.records.get_key_value(path) {
            return Some(key);
        }
        if module.is_empty() {
            return None;
        }
        let relative = format!("{module}::{path}");
        self.records.get_key_value(&relative).map(|(key, _)| key.as_str())
    }
}

/// Shared, read-only view of a manifest that hands out type descriptors.
#[derive(Debug, Clone)]
pub struct Catalog(Arc<Manifest>);

struct ManifestRecord {
    catalog: Catalog,
    key: String,
    name: String,
}

impl Catalog {
    /// Descriptor for a record, by full key or by an unambiguous bare name.
    pub fn type_desc(&self, name: &str) -> Result<TypeDesc, ManifestError> {
        if self.0.records.contains_key(name) {
            return Ok(self.record_desc(name));
        }
        let candidates: Vec<&str> = self
            .0
            .records
            .iter()
            .filter(|(_, record)| record.name == name)
            .map(|(key, _)| key.as_str())
            .collect();
        match candidates.as_slice() {
            [] => Err(ManifestError::UnknownRecord(name.to_string())),
            [key] => Ok(self.record_desc(key)),
            _ => Err(ManifestError::AmbiguousRecord {
                name: name.to_string(),
                candidates: candidates.iter().map(|c| c.to_string()).collect(),
            }),
        }
    }

    /// Every record, in manifest order.
    pub fn roots(&self) -> Vec<TypeDesc> {
        self.0.records.keys().map(|key| self.record_desc(key)).collect()
    }

    pub fn manifest(&self) -> &Manifest { &self.0 }

    fn record_desc(&self, key: &str) -> TypeDesc {
        let name = self.0.records.get(key).map_or(key, |r| r.name.as_str());
        TypeDesc::Record(RecordRef::new(ManifestRecord {
            catalog: self.clone(),
            key: key.to_string(),
            name: name.to_string(),
        }))
    }

    fn lower(&self, ty: &syn::Type, module: &str) -> TypeDesc {
        match ty {
            syn::Type::Paren(inner) => self.lower(&inner.elem, module),
            syn::Type::Group(inner) => self.lower(&inner.elem, module),
            syn::Type::Reference(inner) => TypeDesc::indirect(self.lower(&inner.elem, module)),
            syn::Type::Slice(inner) => TypeDesc::seq(self.lower(&inner.elem, module)),
            syn::Type::Array(array) => {
                let elem = self.lower(&array.elem, module);
                match array_len(&array.len) {
                    Some(len) => TypeDesc::Array { elem: Box::new(elem), len },
                    None => TypeDesc::seq(elem),
                }
            }
            syn::Type::Path(path) if path.qself.is_none() => self.lower_path(ty, &path.path, module),
            _ => TypeDesc::Unsupported(type_text(ty)),
        }
    }

    fn lower_path(&self, ty: &syn::Type, path: &syn::Path, module: &str) -> TypeDesc {
        let joined = path
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .collect::<Vec<_>>()
            .join("::");
        let Some(last) = path.segments.last() else {
            return TypeDesc::Unsupported(type_text(ty));
        };
        let args: Vec<&syn::Type> = match &last.arguments {
            syn::PathArguments::None => Vec::new(),
            syn::PathArguments::AngleBracketed(generics) => generics
                .args
                .iter()
                .filter_map(|arg| match arg {
                    syn::GenericArgument::Type(ty) => Some(ty),
                    _ => None,
                })
                .collect(),
            syn::PathArguments::Parenthesized(_) => return TypeDesc::Unsupported(type_text(ty)),
        };

        if matches!(last.arguments, syn::PathArguments::None) {
            if let Some(key) = self.0.resolve_key(&joined, module) {
                return self.record_desc(key);
            }
        }
        let lower = |ix: usize| self.lower(args[ix], module);
        match (bare_name(&joined), args.len()) {
            ("Option", 1) => TypeDesc::nullable(lower(0)),
            ("Box" | "Rc" | "Arc" | "Cow" | "Cell" | "RefCell", 1) => TypeDesc::indirect(lower(0)),
            ("Vec" | "VecDeque" | "LinkedList" | "HashSet" | "BTreeSet" | "IndexSet" | "BinaryHeap", 1) => {
                TypeDesc::seq(lower(0))
            }
            ("HashMap" | "BTreeMap" | "IndexMap", 2) => TypeDesc::map(lower(0), lower(1)),
            ("bool", 0) => TypeDesc::Bool,
            ("char", 0) => TypeDesc::Char,
            ("String" | "str", 0) => TypeDesc::Str,
            ("f32", 0) => TypeDesc::Float { bits: 32 },
            ("f64", 0) => TypeDesc::Float { bits: 64 },
            ("any", 0) => TypeDesc::Any,
            ("Value", 0) if joined == "serde_json::Value" => TypeDesc::Any,
            ("Map", 0) if joined == "serde_json::Map" => TypeDesc::map(TypeDesc::Str, TypeDesc::Any),
            ("DateTime" | "NaiveDateTime" | "NaiveDate" | "SystemTime", _) => TypeDesc::Date,
            (name, 0) => match int_kind(name) {
                Some((bits, signed)) => TypeDesc::Int { bits, signed },
                None => TypeDesc::Named(joined.clone()),
            },
            _ => TypeDesc::Named(type_text(ty)),
        }
    }
}

/// Literal array length; `None` for const parameters and expressions.
fn array_len(len: &syn::Expr) -> Option<usize> {
    match len {
        syn::Expr::Lit(syn::ExprLit { lit: syn::Lit::Int(int), .. }) => int.base10_parse().ok(),
        _ => None,
    }
}

fn int_kind(name: &str) -> Option<(u32, bool)> {
    let (signed, width) = match name.split_at_checked(1)? {
        ("i", width) => (true, width),
        ("u", width) => (false, width),
        _ => return None,
    };
    let bits = match width {
        "8" => 8,
        "16" => 16,
        "32" => 32,
        "64" => 64,
        "128" => 128,
        "size" => usize::BITS,
        _ => return None,
    };
    Some((bits, signed))
}

impl RecordSource for ManifestRecord {
    fn key(&self) -> TypeKey { TypeKey::Path(self.key.clone()) }
    fn name(&self) -> &str { &self.name }

    fn fields(&self) -> Vec<FieldDef> {
        let Some(record) = self.catalog.0.records.get(&self.key) else {
            return Vec::new();
        };
        record
            .fields
            .iter()
            .map(|decl| FieldDef {
                name: decl.name.clone(),
                ty: match parse_type(&decl.ty) {
                    Ok(ty) => self.catalog.lower(&ty, &record.module),
                    Err(_) => TypeDesc::Unsupported(decl.ty.clone()),
                },
                rename: decl.rename.clone(),
                ts_type: decl.ts_type.clone(),
                optional: decl.optional,
            })
            .collect()
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog(doc: serde_json::Value) -> Catalog {
        Manifest::parse(&doc.to_string(), "test.json").unwrap().into_catalog()
    }

    fn field_types(types: &[&str]) -> Vec<TypeDesc> {
        let fields: Vec<_> = types
            .iter()
            .enumerate()
            .map(|(ix, ty)| json!({ "name": format!("f{ix}"), "type": ty }))
            .collect();
        let catalog = catalog(json!({ "records": { "app::Kinds": { "fields": fields } } }));
        let root = catalog.type_desc("Kinds").unwrap();
        root.as_record().unwrap().fields().into_iter().map(|f| f.ty).collect()
    }

    #[test]
    fn type_text_is_compact() {
        for src in [
            "Option<HashMap<String, Vec<Box<app::User>>>>",
            "&'a mut str",
            "[u8; 4]",
            "(u8, bool)",
            "fn(u8) -> bool",
            "*const u8",
            "Box<dyn std::any::Any>",
            "impl Iterator<Item = u8>",
            "<T as Trait>::Out",
        ] {
            assert_eq!(type_text(&parse_type(src).unwrap()), src);
        }
    }

    #[test]
    fn unsupported_syntax_lowers_per_field() {
        let types = field_types(&[
            "String",
            "::std::string::String",
            "Box<dyn std::any::Any>",
            "<T as Trait>::Out",
            "impl Iterator<Item = u8>",
            "Vec<[u8; N]>",
            "*mut u8",
            "(u8, u8)",
            "Fn(u8) -> bool",
        ]);
        assert!(matches!(types[0], TypeDesc::Str));
        assert!(matches!(types[1], TypeDesc::Str));
        assert!(matches!(&types[2], TypeDesc::Indirect(inner)
            if matches!(&**inner, TypeDesc::Unsupported(s) if s == "dyn std::any::Any")));
        assert!(matches!(&types[3], TypeDesc::Unsupported(s) if s == "<T as Trait>::Out"));
        assert!(matches!(&types[4], TypeDesc::Unsupported(s) if s == "impl Iterator<Item = u8>"));
        assert_eq!(types[5].display_name(), "Vec<Vec<u8>>");
        assert!(matches!(&types[6], TypeDesc::Unsupported(s) if s == "*mut u8"));
        assert!(matches!(&types[7], TypeDesc::Unsupported(s) if s == "(u8, u8)"));
        assert!(matches!(&types[8], TypeDesc::Unsupported(_)));
    }

    #[test]
    fn arrays_keep_literal_lengths() {
        let types = field_types(&["[u8; 1_024]", "[i32]", "&[bool]"]);
        assert!(matches!(&types[0], TypeDesc::Array { len: 1024, .. }));
        assert_eq!(types[1].display_name(), "Vec<i32>");
        assert_eq!(types[2].display_name(), "Vec<bool>");
    }

    #[test]
    fn manifest_type_errors_name_the_field() {
        let doc = json!({ "records": { "app::User": { "fields": [
            { "name": "ok", "type": "String" },
            { "name": "tags", "type": "Vec<String" }
        ] } } });
        let err = Manifest::parse(&doc.to_string(), "bad.json").unwrap_err();
        match err {
            ManifestError::TypeSyntax { origin, record, field, expr, .. } => {
                assert_eq!(origin, "bad.json");
                assert_eq!(record, "app::User");
                assert_eq!(field, "tags");
                assert_eq!(expr, "Vec<String");
            }
            other => panic!("unexpected {other:?}"),
        }
        let doc = json!({ "records": { "User": { "fields": [ { "name": "x", "type": "u8 u16" } ] } } });
        assert!(matches!(Manifest::parse(&doc.to_string(), "bad.json"), Err(ManifestError::TypeSyntax { .. })));
    }

    #[test]
    fn decode_errors_carry_the_json_path() {
        let doc = json!({ "records": { "User": { "fields": [ { "name": "x" } ] } } });
        let err = Manifest::parse(&doc.to_string(), "bad.json").unwrap_err();
        let ManifestError::Decode { message, .. } = err else { panic!("expected decode error") };
        assert!(message.contains("records.User.fields[0]"), "{message}");
    }

    #[test]
    fn paths_resolve_relative_to_the_owning_module() {
        let catalog = catalog(json!({ "records": {
            "billing::Invoice": { "fields": [
                { "name": "to", "type": "Address" },
                { "name": "from", "type": "shipping::Address" },
                { "name": "span", "type": "chrono::Duration" }
            ] },
            "billing::Address": { "fields": [] },
            "shipping::Address": { "fields": [] }
        } }));
        let root = catalog.type_desc("Invoice").unwrap();
        let fields = root.as_record().unwrap().fields();
        let to = fields[0].ty.as_record().unwrap();
        let from = fields[1].ty.as_record().unwrap();
        assert_eq!(to.key(), TypeKey::Path("billing::Address".into()));
        assert_eq!(from.key(), TypeKey::Path("shipping::Address".into()));
        assert!(matches!(&fields[2].ty, TypeDesc::Named(p) if p == "chrono::Duration"));
    }

    #[test]
    fn builtin_paths_lower_to_kinds() {
        let catalog = catalog(json!({ "records": { "Kinds": { "fields": [
            { "name": "a", "type": "u16" },
            { "name": "b", "type": "isize" },
            { "name": "c", "type": "Option<Box<f32>>" },
            { "name": "d", "type": "BTreeMap<String, serde_json::Value>" },
            { "name": "e", "type": "chrono::DateTime<chrono::Utc>" },
            { "name": "f", "type": "fn()" },
            { "name": "g", "type": "Result<u8, String>" }
        ] } } }));
        let fields = catalog.type_desc("Kinds").unwrap().as_record().unwrap().fields();
        assert!(matches!(fields[0].ty, TypeDesc::Int { bits: 16, signed: false }));
        assert!(matches!(fields[1].ty, TypeDesc::Int { signed: true, .. }));
        assert_eq!(fields[2].ty.display_name(), "Option<f32>");
        assert_eq!(fields[3].ty.display_name(), "Map<String, any>");
        assert!(matches!(fields[4].ty, TypeDesc::Date));
        assert!(matches!(&fields[5].ty, TypeDesc::Unsupported(s) if s == "fn()"));
        assert!(matches!(&fields[6].ty, TypeDesc::Named(s) if s == "Result<u8, String>"));
    }

    #[test]
    fn roots_by_bare_name_must_be_unambiguous() {
        let catalog = catalog(json!({ "records": {
            "a::Item": { "fields": [] },
            "b::Item": { "fields": [] }
        } }));
        assert!(matches!(catalog.type_desc("Item"), Err(ManifestError::AmbiguousRecord { .. })));
        assert!(matches!(catalog.type_desc("Nope"), Err(ManifestError::UnknownRecord(_))));
        assert!(catalog.type_desc("b::Item").is_ok());
        assert_eq!(catalog.roots().len(), 2);
    }

    #[test]
    fn merge_rejects_duplicate_keys() {
        let doc = json!({ "records": { "User": { "fields": [] } } }).to_string();
        let mut first = Manifest::parse(&doc, "a.json").unwrap();
        let second = Manifest::parse(&doc, "b.json").unwrap();
        assert!(matches!(first.merge(second), Err(ManifestError::DuplicateRecord(key)) if key == "User"));
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn failed_merge_leaves_the_target_untouched() {
        let mut first = Manifest::parse(&json!({ "records": {
            "app::User": { "fields": [] }
        } }).to_string(), "a.json").unwrap();
        let second = Manifest::parse(&json!({ "records": {
            "app::Order": { "fields": [] },
            "app::User": { "fields": [] }
        } }).to_string(), "b.json").unwrap();
        assert!(matches!(first.merge(second), Err(ManifestError::DuplicateRecord(key)) if key == "app::User"));
        assert_eq!(first.record_keys().collect::<Vec<_>>(), ["app::User"]);
    }
}
