//! Core synthesis logic — types, parsing, the resource graph, assembly.

pub mod arn;
pub mod graph;
pub mod parser;
pub mod stack;
pub mod synth;
pub mod types;
