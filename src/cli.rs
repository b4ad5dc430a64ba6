//! Minimal CLI: manifests → (records | typescript)
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use ts_surface::{Catalog, Manifest, RenderOptions, Renderer, TypeGraph};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate TypeScript declarations from a graph of record types declared in JSON manifests
#[derive(Parser, Debug)]
#[command(name = "ts-surface", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// resolve the record graph and emit TypeScript
    Render(RenderOut),
    /// resolve the record graph and print it as JSON (debug view)
    Records(RecordsOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more type manifests. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// Record to start traversal from, by full path or unambiguous bare name
    /// (repeatable; every manifest record when omitted)
    #[arg(long)]
    root: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct StyleSettings {
    /// JSON options file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// indentation unit (default: tab)
    #[arg(long)]
    indent: Option<String>,

    /// emit `export interface` declarations only
    #[arg(long, default_value_t = false)]
    interface_only: bool,

    /// do not assign default values to class fields
    #[arg(long, default_value_t = false)]
    no_defaults: bool,

    /// declare optional fields with `?`
    #[arg(long, default_value_t = false)]
    mark_optional: bool,

    /// do not emit constructors
    #[arg(long, default_value_t = false)]
    no_constructor: bool,

    /// do not emit `toObject()` methods
    #[arg(long, default_value_t = false)]
    no_to_object: bool,

    /// render date-like fields as plain strings
    #[arg(long, default_value_t = false)]
    no_date: bool,
}

#[derive(clap::Parser, Debug)]
struct RenderOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    style: StyleSettings,

    /// output .ts file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct RecordsOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_catalog(&self) -> Result<Catalog> {
        let paths = resolve_file_path_patterns(&self.input)?;
        let manifests = paths
            .par_iter()
            .map(|path| Manifest::load(path))
            .collect::<Result<Vec<_>, _>>()?;

        let mut merged = Manifest::default();
        for (path, manifest) in paths.iter().zip(manifests) {
            tracing::info!(path = %path.display(), records = manifest.len(), "loaded manifest");
            merged.merge(manifest).with_context(|| format!("merging {}", path.display()))?;
        }
        Ok(merged.into_catalog())
    }

    fn build_graph(&self) -> Result<TypeGraph> {
        let catalog = self.load_catalog()?;
        let roots = if self.root.is_empty() {
            catalog.roots()
        } else {
            self.root
                .iter()
                .map(|name| catalog.type_desc(name))
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut graph = TypeGraph::new();
        for root in &roots {
            graph
                .add_root(root)
                .with_context(|| format!("registering root `{}`", root.display_name()))?;
        }
        Ok(graph)
    }
}

impl StyleSettings {
    fn resolve(&self) -> Result<RenderOptions> {
        let mut opts = match &self.config {
            Some(path) => RenderOptions::load(path)?,
            None => RenderOptions::default(),
        };
        if let Some(indent) = &self.indent {
            opts.indent_unit = indent.clone();
        }
        opts.interface_only_mode |= self.interface_only;
        opts.mark_fields_optional |= self.mark_optional;
        opts.assign_field_defaults &= !self.no_defaults;
        opts.emit_constructor_helper &= !self.no_constructor;
        opts.emit_to_plain_object_helper &= !self.no_to_object;
        opts.treat_date_like_fields_specially &= !self.no_date;
        Ok(opts)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Render(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }

                let opts = target.style.resolve()?;
                let graph = target.input_settings.build_graph()?;
                let ts_src = Renderer::new(opts).render(&graph);
                write_output(target.out.as_deref(), &ts_src)?;
                report(&graph);
            }
            Command::Records(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }

                let graph = target.input_settings.build_graph()?;
                let view = serde_json::json!({
                    "records": graph.records().collect::<Vec<_>>(),
                    "diagnostics": graph.diagnostics(),
                });
                let json_src = serde_json::to_string_pretty(&view)?;
                write_output(target.out.as_deref(), &json_src)?;
                report(&graph);
            }
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_output(out: Option<&Path>, src: &str) -> Result<()> {
    let Some(out) = out else {
        println!("{src}");
        return Ok(());
    };
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(out, src).with_context(|| format!("writing {}", out.display()))?;
    tracing::info!(path = %out.display(), "wrote output");
    Ok(())
}

fn report(graph: &TypeGraph) {
    let diagnostics = graph.diagnostics().len();
    let summary = format!("{} records, {diagnostics} diagnostics", graph.len());
    if diagnostics == 0 {
        eprintln!("{} {summary}", "done:".green().bold());
    } else {
        eprintln!("{} {summary}", "done:".yellow().bold());
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("bad glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
