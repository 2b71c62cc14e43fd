//! The static-analysis core (§1-5): AST traversal, package
//! resolution, the type-aware call graph, base-case fact analyzers,
//! inductive fact propagation, and the range-loop checker.
//!
//! Everything under this module operates on a single parsed package and is
//! discarded once that package's analysis completes (§3
//! "Lifecycle").

pub mod acceptlist;
pub mod analyzers;
pub mod ast;
pub mod callgraph;
pub mod facts;
pub mod pipeline;
pub mod propagate;
pub mod rangecheck;
pub mod resolve;
