pub mod abort;
pub mod assembly;
pub mod component_graph;
pub mod config;
pub mod diagnostics;
pub mod encapsulation;
pub mod entry_groups;
pub mod graph_builder;
pub mod orchestrator;
pub mod source_provider;
pub mod stats;
pub mod tag_scanner;
pub mod types;
