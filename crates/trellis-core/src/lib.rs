//! Trellis Core - Notation parsing and data model
//!
//! This crate holds the value types shared by the whole workspace
//! (nodes, edges, graph snapshots, parsed note sets) and the parser
//! that turns N4L notation text into them.
//!
//! # Example
//!
//! ```no_run
//! use trellis_core::NotationParser;
//!
//! let parser = NotationParser::new();
//! let parsed = parser.parse(":: Suspects ::\nVictor (âge) 67 ans\n");
//! let graph = parser.parse_to_graph(&parsed.notes);
//! assert_eq!(graph.edges.len(), 1);
//! ```

mod model;
mod parser;
mod prose;

pub use model::{Edge, EdgeKind, GraphData, Node, ParsedNotes, Position};
pub use parser::NotationParser;
pub use prose::{build_path_story, extract_first_subject, extract_sentences};
