//! vpscan - variability analysis of Java codebases.
//!
//! vpscan builds a property graph of the types and members of a source
//! tree, then detects variation points (places where a design offers
//! alternatives: inheritance hierarchies, overloads, compositions), their
//! variants, design patterns and hotspots.
//!
//! # Architecture
//!
//! - `source`: tree-sitter Java front-end producing declaration events
//! - `visitors`: the five ordered passes populating the graph
//! - `graph`: property graph façade with retry, and its in-memory store
//! - `detect`: variant, hotspot and statistics detectors, and the runner
//! - `report`: visualization graph and statistics documents
//! - `config`: YAML configuration

pub mod cli;
pub mod config;
pub mod detect;
pub mod graph;
pub mod model;
pub mod report;
pub mod source;
pub mod visitors;

pub use config::Config;
pub use detect::{RunSummary, Runner, Statistics};
pub use graph::{Graph, MemoryStore, RetryPolicy};
pub use report::VisualizationGraph;
