//! Keep a TypeScript type surface in sync with Rust-side records.
//!
//! Pipeline:
//! 1. describe types, either reflected (`Reflect`, `reflect_record!`) or declared
//!    in a JSON manifest (`manifest::Catalog`);
//! 2. register roots with a `TypeGraph`, which discovers, names and classifies
//!    every reachable record;
//! 3. turn the graph into TypeScript with a `Renderer`.
//!
//! ```
//! use ts_surface::{reflect_record, Renderer, RenderOptions, TypeGraph};
//!
//! struct Address { city: String }
//! struct User { name: String, home: Option<Address> }
//!
//! reflect_record!(Address { city: String });
//! reflect_record!(User { name: String, home: Option<Address> });
//!
//! let mut graph = TypeGraph::new();
//! graph.add::<User>().unwrap();
//! let ts = Renderer::new(RenderOptions::default()).render(&graph);
//! assert!(ts.contains("export class UserAddress {"));
//! assert!(ts.contains("home: UserAddress | null = null;"));
//! ```
//!
//! `#[derive(Reflect)]` does the same without repeating the field list:
//!
//! ```
//! use ts_surface::{Reflect, TypeGraph};
//!
//! #[derive(Reflect)]
//! struct Ticket {
//!     #[ts(rename = "ticketId")]
//!     id: u32,
//!     #[ts(skip)]
//!     scratch: Vec<u8>,
//! }
//!
//! let mut graph = TypeGraph::new();
//! let ticket = graph.add::<Ticket>().unwrap();
//! assert_eq!(ticket.fields.len(), 1);
//! assert_eq!(ticket.fields[0].name, "ticketId");
//! ```
extern crate self as ts_surface;

pub mod config;
pub mod descriptor;
pub mod error;
pub mod graph;
pub mod manifest;
pub mod path_de;
pub mod primitive;
pub mod reflect;
pub mod render;

pub use config::RenderOptions;
pub use descriptor::{FieldDef, RecordRef, RecordSource, TypeDesc, TypeKey};
pub use error::{ConfigError, GraphError, ManifestError};
pub use graph::{Diagnostic, DiagnosticKind, Field, Record, RecordId, Shape, TypeGraph, TypeRef};
pub use manifest::{Catalog, Manifest};
pub use primitive::TsPrimitive;
pub use reflect::{Reflect, ReflectRecord};
pub use ts_surface_derive::Reflect;
pub use render::Renderer;
