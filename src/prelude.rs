//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the chatweave crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use chatweave::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let json = std::fs::read_to_string("path/to/flow.json")?;
//! let flow = Flow::from_json(&json)?;
//!
//! let output = Exporter::new(&flow).export()?;
//! println!("{}", output.program);
//! # Ok(())
//! # }
//! ```

// Graph model
pub use crate::model::{Agent, AgentVariant, Chat, Flow, FlowDraft, LlmModel, Skill};

// Export
pub use crate::export::{
    ExportOutput, ExportPosition, Exporter, ExporterBuilder, ImportPosition, Placement,
    SectionGenerator, SectionOutput, export_json, export_json_to,
};

// Error types
pub use crate::error::{ExportError, ValidationError, ValidationErrors};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
