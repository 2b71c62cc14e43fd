//! Collaborators surrounding the analysis core: repository sampling,
//! persistence, GitHub API access, issue filing, and reaction tracking.
//!
//! None of these modules are consulted by `analysis`; the core takes plain
//! source text in and hands plain diagnostics back.

pub mod fetch;
pub mod github;
pub mod reporter;
pub mod store;
pub mod trackbot;
