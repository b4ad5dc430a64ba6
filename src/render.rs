//! TypeScript rendering of a resolved `TypeGraph`.
//!
//! Output is the fixed helper prelude followed by one declaration per record, in
//! the graph's output order. Everything here is text; the graph is never touched.
use std::fmt::{self, Write as _};
use std::io;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::RenderOptions;
use crate::graph::{Field, Record, Shape, TypeGraph, TypeRef, DATE_OVERRIDE};
use crate::primitive::TsPrimitive;

/// Helpers shared by every generated class; emitted once, ahead of all records.
pub const PRELUDE: &str = r#"/* ts-surface helpers */
const UNIX_SECONDS_LIMIT = 9999999999;

function getDate(v: Date | number | string): Date {
	if (v instanceof Date) return v;
	if (typeof v === 'number') return new Date(v > UNIX_SECONDS_LIMIT ? v : v * 1000);
	return new Date(v);
}

function getNumber(v: number | string): number {
	return typeof v === 'number' ? v : parseFloat(v || '0');
}

function toPlainValue(v: any): any {
	if (v == null || typeof v !== 'object') return v;
	if (v instanceof Date) return v.toISOString();
	if (Array.isArray(v)) return v.map(toPlainValue);
	if (typeof v.toObject === 'function') return v.toObject();
	return toPlainObject(v);
}

function toPlainObject(o: any): any {
	const out: any = {};
	for (const k of Object.keys(o)) out[k] = toPlainValue(o[k]);
	return out;
}
/* end ts-surface helpers */

"#;

static IDENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier pattern is valid")
});

// ————————————————————————————————————————————————————————————————————————————
// FRONT API
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    opts: RenderOptions,
}

/// A graph bound to a renderer; `Display` writes the full output.
pub struct Rendered<'a> {
    renderer: &'a Renderer,
    graph: &'a TypeGraph,
}

impl Renderer {
    pub fn new(opts: RenderOptions) -> Self { Self { opts } }

    pub fn options(&self) -> &RenderOptions { &self.opts }

    pub fn display<'a>(&'a self, graph: &'a TypeGraph) -> Rendered<'a> {
        Rendered { renderer: self, graph }
    }

    pub fn render(&self, graph: &TypeGraph) -> String {
        self.display(graph).to_string()
    }

    pub fn render_to<W: io::Write>(&self, graph: &TypeGraph, mut out: W) -> io::Result<()> {
        write!(out, "{}", self.display(graph))
    }

    /// One record's declaration, without the trailing separator.
    pub fn write_record(&self, out: &mut impl fmt::Write, record: &Record) -> fmt::Result {
        if self.opts.interface_only_mode {
            self.write_interface(out, record)
        } else {
            self.write_class(out, record)
        }
    }
}

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(PRELUDE)?;
        for record in self.graph.records() {
            self.renderer.write_record(f, record)?;
            f.write_char('\n')?;
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DECLARATIONS
// ————————————————————————————————————————————————————————————————————————————

impl Renderer {
    fn write_interface(&self, out: &mut impl fmt::Write, record: &Record) -> fmt::Result {
        let i1 = self.opts.indent(1);
        writeln!(out, "export interface {} {{", record.name)?;
        for field in &record.fields {
            writeln!(
                out,
                "{i1}{}{}: {};",
                prop_key(&field.name),
                self.optional_mark(field),
                self.decl_type(field)
            )?;
        }
        writeln!(out, "}}")
    }

    fn write_class(&self, out: &mut impl fmt::Write, record: &Record) -> fmt::Result {
        let (i1, i2) = (self.opts.indent(1), self.opts.indent(2));
        let ctor = self.opts.emit_constructor_helper;

        writeln!(out, "export class {} {{", record.name)?;
        for field in &record.fields {
            let key = prop_key(&field.name);
            let mark = self.optional_mark(field);
            let ty = self.decl_type(field);
            if self.opts.assign_field_defaults {
                writeln!(out, "{i1}{key}{mark}: {ty} = {};", self.default_value(field))?;
            } else if ctor || !mark.is_empty() {
                writeln!(out, "{i1}{key}{mark}: {ty};")?;
            } else {
                writeln!(out, "{i1}{key}!: {ty};")?;
            }
        }

        let mut separate = !record.fields.is_empty();
        if ctor {
            if separate { writeln!(out)?; }
            separate = true;
            self.write_constructor(out, record)?;
        }
        if self.opts.emit_to_plain_object_helper {
            if separate { writeln!(out)?; }
            writeln!(out, "{i1}toObject(): any {{")?;
            writeln!(out, "{i2}return toPlainObject(this);")?;
            writeln!(out, "{i1}}}")?;
        }
        writeln!(out, "}}")
    }

    fn write_constructor(&self, out: &mut impl fmt::Write, record: &Record) -> fmt::Result {
        let (i1, i2) = (self.opts.indent(1), self.opts.indent(2));
        if record.fields.is_empty() {
            return writeln!(out, "{i1}constructor(_data?: any) {{}}");
        }
        writeln!(out, "{i1}constructor(data?: any) {{")?;
        writeln!(out, "{i2}const d: any = (data && typeof data === 'object') ? toPlainObject(data) : {{}};")?;
        for field in &record.fields {
            let src = member("d", &field.name);
            let read = self.read_value(field, &src);
            let read = if field.optional { format!("({src} == null ? null : {read})") } else { read };
            writeln!(
                out,
                "{i2}{} = ({} in d) ? {read} : {};",
                member("this", &field.name),
                quote(&field.name),
                self.default_value(field)
            )?;
        }
        writeln!(out, "{i1}}}")
    }
}

// ————————————————————————————————————————————————————————————————————————————
// FIELD TEXT
// ————————————————————————————————————————————————————————————————————————————

impl Renderer {
    fn dates(&self) -> bool { self.opts.treat_date_like_fields_specially }

    fn ts_type(&self, field: &Field) -> String {
        match &field.shape {
            Shape::Primitive { kind } => kind.to_string(),
            Shape::Map { key, value } => format!("{{ [key: {key}]: {} }}", value.name()),
            Shape::Array { value } => format!("{}[]", value.name()),
            Shape::Object { value } => value.clone(),
            Shape::Opaque => "any".into(),
            Shape::Custom { ts_type } if ts_type == DATE_OVERRIDE => {
                String::from(if self.dates() { "Date" } else { "string" })
            }
            Shape::Custom { ts_type } => ts_type.clone(),
        }
    }

    fn decl_type(&self, field: &Field) -> String {
        let ty = self.ts_type(field);
        if field.optional { format!("{ty} | null") } else { ty }
    }

    fn optional_mark(&self, field: &Field) -> &'static str {
        if self.opts.mark_fields_optional && field.optional { "?" } else { "" }
    }

    fn default_value(&self, field: &Field) -> String {
        if field.optional {
            return "null".into();
        }
        match &field.shape {
            Shape::Primitive { kind } => primitive_default(kind.as_str()).into(),
            Shape::Map { .. } => "{}".into(),
            Shape::Array { .. } => "[]".into(),
            Shape::Object { value } => format!("new {value}()"),
            Shape::Opaque => "null".into(),
            Shape::Custom { ts_type } if ts_type == DATE_OVERRIDE => {
                String::from(if self.dates() { "new Date()" } else { "''" })
            }
            Shape::Custom { ts_type } => primitive_default(ts_type).into(),
        }
    }

    /// Expression converting raw input `src` into the field's type.
    fn read_value(&self, field: &Field, src: &str) -> String {
        match &field.shape {
            Shape::Primitive { kind: TsPrimitive::Number } => format!("getNumber({src})"),
            Shape::Object { value } => format!("new {value}({src})"),
            Shape::Array { value: TypeRef::Record(name) } => {
                format!("({src} || []).map((v: any) => new {name}(v))")
            }
            Shape::Map { value: TypeRef::Record(name), .. } => format!(
                "Object.fromEntries(Object.entries({src} || {{}}).map(([k, v]: [string, any]) => [k, new {name}(v)]))"
            ),
            Shape::Custom { ts_type } if ts_type == DATE_OVERRIDE && self.dates() => {
                format!("getDate({src})")
            }
            Shape::Opaque => src.to_string(),
            _ => format!("{src} as {}", self.ts_type(field)),
        }
    }
}

fn primitive_default(ty: &str) -> &'static str {
    match ty {
        "number" => "0",
        "string" => "''",
        "boolean" => "false",
        _ => "null as any",
    }
}

fn quote(name: &str) -> String {
    format!("'{}'", name.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn prop_key(name: &str) -> String {
    if IDENT.is_match(name) { name.to_string() } else { quote(name) }
}

fn member(object: &str, name: &str) -> String {
    if IDENT.is_match(name) { format!("{object}.{name}") } else { format!("{object}[{}]", quote(name)) }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect_record;
    use std::collections::HashMap;

    #[allow(dead_code)]
    struct Point { x: f64, y: f64, label: Option<String> }

    #[allow(dead_code)]
    struct Polygon {
        id: u32,
        points: Vec<Point>,
        tags: HashMap<String, bool>,
        content_type: String,
        at: chrono::NaiveDate,
    }

    reflect_record!(Point { x: f64, y: f64, label: Option<String> });
    reflect_record!(Polygon {
        id: u32,
        points: Vec<Point>,
        tags: HashMap<String, bool>,
        content_type: String => { rename = "content-type" },
        at: chrono::NaiveDate,
    });

    #[allow(dead_code)]
    struct Leaf { id: u32 }

    #[allow(dead_code)]
    struct Holder { leaves: HashMap<String, Leaf> }

    reflect_record!(Leaf { id: u32 });
    reflect_record!(Holder { leaves: HashMap<String, Leaf> });

    fn graph() -> TypeGraph {
        let mut graph = TypeGraph::new();
        graph.add::<Polygon>().unwrap();
        graph
    }

    #[test]
    fn interface_mode_is_exact() {
        let opts = RenderOptions { interface_only_mode: true, mark_fields_optional: true, ..Default::default() };
        let out = Renderer::new(opts).render(&graph());
        let expected = [
            "export interface PolygonPoint {",
            "\tx: number;",
            "\ty: number;",
            "\tlabel?: string | null;",
            "}",
            "",
            "export interface Polygon {",
            "\tid: number;",
            "\tpoints: PolygonPoint[];",
            "\ttags: { [key: string]: boolean };",
            "\t'content-type': string;",
            "\tat: Date;",
            "}",
            "",
            "",
        ]
        .join("\n");
        assert_eq!(out, format!("{PRELUDE}{expected}"));
    }

    #[test]
    fn class_mode_builds_nested_instances() {
        let out = Renderer::default().render(&graph());
        for line in [
            "export class PolygonPoint {",
            "\tx: number = 0;",
            "\tlabel: string | null = null;",
            "\t\tthis.x = ('x' in d) ? getNumber(d.x) : 0;",
            "\t\tthis.label = ('label' in d) ? (d.label == null ? null : d.label as string) : null;",
            "\tpoints: PolygonPoint[] = [];",
            "\t\tthis.points = ('points' in d) ? (d.points || []).map((v: any) => new PolygonPoint(v)) : [];",
            "\t\tthis['content-type'] = ('content-type' in d) ? d['content-type'] as string : '';",
            "\tat: Date = new Date();",
            "\t\tthis.at = ('at' in d) ? getDate(d.at) : new Date();",
            "\ttoObject(): any {",
            "\t\treturn toPlainObject(this);",
        ] {
            assert!(out.lines().any(|l| l == line), "missing line {line:?} in\n{out}");
        }
    }

    #[test]
    fn dates_fall_back_to_strings() {
        let opts = RenderOptions { treat_date_like_fields_specially: false, ..Default::default() };
        let out = Renderer::new(opts).render(&graph());
        assert!(out.contains("\tat: string = '';\n"));
        assert!(out.contains("this.at = ('at' in d) ? d.at as string : '';"));
    }

    #[test]
    fn bare_classes_without_helpers() {
        let opts = RenderOptions {
            indent_unit: "  ".into(),
            assign_field_defaults: false,
            emit_constructor_helper: false,
            emit_to_plain_object_helper: false,
            ..Default::default()
        };
        let mut out = String::new();
        let graph = graph();
        let point = graph.find("PolygonPoint").unwrap();
        Renderer::new(opts).write_record(&mut out, point).unwrap();
        assert_eq!(out, "export class PolygonPoint {\n  x!: number;\n  y!: number;\n  label!: string | null;\n}\n");
    }

    #[test]
    fn render_to_writes_the_same_text() {
        let graph = graph();
        let renderer = Renderer::default();
        let mut buf = Vec::new();
        renderer.render_to(&graph, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), renderer.render(&graph));
    }

    #[test]
    fn map_of_records_builds_each_value() {
        let mut graph = TypeGraph::new();
        graph.add::<Holder>().unwrap();
        let out = Renderer::default().render(&graph);
        for line in [
            "export class HolderLeaf {",
            "\tleaves: { [key: string]: HolderLeaf } = {};",
            "\t\tthis.leaves = ('leaves' in d) ? Object.fromEntries(Object.entries(d.leaves || {}).map(([k, v]: [string, any]) => [k, new HolderLeaf(v)])) : {};",
        ] {
            assert!(out.lines().any(|l| l == line), "missing line {line:?} in\n{out}");
        }
    }

    #[test]
    fn identifiers_are_quoted_only_when_needed() {
        assert_eq!(prop_key("plain_1"), "plain_1");
        assert_eq!(prop_key("$ref"), "$ref");
        assert_eq!(prop_key("1st"), "'1st'");
        assert_eq!(member("d", "it's"), r"d['it\'s']");
    }
}
