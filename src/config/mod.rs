//! Config layer: JSON schema + validated in-memory structures.
//!
//! Kept apart from running and parsing; nothing here touches the modules'
//! directories beyond resolving their paths.

pub mod pipeline;

pub use pipeline::{
    HarnessSpec, ModuleSpec, Overrides, PipelineConfig, ValidatedConfig, load_validated,
};
