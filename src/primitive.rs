//! Primitive mapping table: source kind → destination primitive name.
use std::fmt;

use serde::{Serialize, Serializer};

use crate::descriptor::TypeDesc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TsPrimitive {
    Number,
    String,
    Boolean,
    /// Best-effort passthrough of a namespace-stripped declared name.
    Literal(String),
}

impl TsPrimitive {
    pub fn as_str(&self) -> &str {
        match self {
            TsPrimitive::Number => "number",
            TsPrimitive::String => "string",
            TsPrimitive::Boolean => "boolean",
            TsPrimitive::Literal(name) => name,
        }
    }
}

impl fmt::Display for TsPrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TsPrimitive {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Map one source kind through the table.
///
/// - every integer and float width → `number`
/// - `String`, `str`, `char` → `string`
/// - `bool` → `boolean`
/// - anything else → its bare declared name
///
/// `None` only for kinds that have no usable name at all.
pub fn map_primitive(ty: &TypeDesc) -> Option<TsPrimitive> {
    match ty {
        TypeDesc::Int { .. } | TypeDesc::Float { .. } => Some(TsPrimitive::Number),
        TypeDesc::Str | TypeDesc::Char => Some(TsPrimitive::String),
        TypeDesc::Bool => Some(TsPrimitive::Boolean),
        TypeDesc::Nullable(inner) | TypeDesc::Indirect(inner) => map_primitive(inner),
        TypeDesc::Unsupported(_) => None,
        other => {
            let name = other.display_name();
            let bare = bare_name(&name);
            if bare.is_empty() { None } else { Some(TsPrimitive::Literal(bare.to_string())) }
        }
    }
}

/// Drop the module path of a declared name: `chrono::Duration` → `Duration`.
/// Generic arguments are left alone.
pub fn bare_name(path: &str) -> &str {
    let head = path.find('<').unwrap_or(path.len());
    match path[..head].rfind("::") {
        Some(ix) => &path[ix + 2..],
        None => path,
    }
}

// ------------------------------- Tests ------------------------------------ //
