//! Rendering options. Affect output text only, never graph construction.
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::path_de::from_str_with_path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct RenderOptions {
    pub indent_unit: String,
    /// Class fields get initializers.
    pub assign_field_defaults: bool,
    /// `export interface` only: no classes, constructors or helpers.
    pub interface_only_mode: bool,
    /// Optional fields are declared with `?`.
    pub mark_fields_optional: bool,
    pub emit_constructor_helper: bool,
    pub emit_to_plain_object_helper: bool,
    /// `date` fields become `Date` and are parsed on construction; otherwise `string`.
    pub treat_date_like_fields_specially: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            indent_unit: "\t".into(),
            assign_field_defaults: true,
            interface_only_mode: false,
            mark_fields_optional: false,
            emit_constructor_helper: true,
            emit_to_plain_object_helper: true,
            treat_date_like_fields_specially: true,
        }
    }
}

impl RenderOptions {
    pub fn from_json_str(src: &str, origin: &str) -> Result<Self, ConfigError> {
        from_str_with_path(src).map_err(|err| ConfigError::Decode {
            origin: origin.to_string(),
            message: err.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let src = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&src, &path.to_string_lossy())
    }

    /// `indent_unit` repeated `depth` times.
    pub fn indent(&self, depth: usize) -> String {
        self.indent_unit.repeat(depth)
    }
}
