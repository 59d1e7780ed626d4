//! # Chatweave - Multi-Agent Flow Compiler
//!
//! **Chatweave** compiles a declarative multi-agent flow (agents, the chats
//! between them, their LLM configurations and their tools) into a single,
//! runnable Python program that drives the flow through the ag2 runtime.
//!
//! ## Core Workflow
//!
//! 1.  **Load**: Deserialize a flow description into a [`model::FlowDraft`], or
//!     go straight to [`model::Flow::from_json`].
//! 2.  **Validate**: [`model::Flow::build`] checks every structural rule,
//!     every reference between entities and every embedded Python function,
//!     and reports all problems at once.
//! 3.  **Resolve**: the [`resolver`] turns the chat graph into an execution
//!     order and finds the entry agent of swarm flows.
//! 4.  **Export**: the [`export::Exporter`] runs one section generator per
//!     entity family and assembles their output into the final program.
//!
//! Nothing is written to disk until every step has succeeded, so a flow that
//! fails validation never leaves a partial program behind.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatweave::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let json = std::fs::read_to_string("flows/research.json")?;
//!
//!     // Parse and validate the flow
//!     let flow = Flow::from_json(&json)?;
//!     println!("{} agents, {} chats", flow.agents().len(), flow.chats().len());
//!
//!     // Configure the exporter
//!     let output = Exporter::builder(&flow)
//!         .with_types_as_comments(false)
//!         .with_cache_seed(Some(42))
//!         .build()
//!         .export()?;
//!
//!     // Write `<flow>.py` and its API-key side file
//!     let path = output.write_to("out")?;
//!     println!("Wrote {}", path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Embedded functions
//!
//! Flows carry Python snippets for custom termination checks, message
//! builders, speaker selection and similar hooks. Each hook has a fixed
//! contract (function name and argument names). The [`snippet`] module checks
//! the contract, extracts the body and re-renders the function under a
//! flow-unique name:
//!
//! ```rust
//! use chatweave::snippet::{render_function, Signature};
//!
//! let code = render_function(
//!     Signature {
//!         name: "is_termination_message_writer",
//!         args: &["message"],
//!         arg_types: &["Dict[str, Any]"],
//!         return_type: "bool",
//!     },
//!     "    return True",
//!     false,
//! );
//! assert!(code.starts_with("def is_termination_message_writer("));
//! ```

pub mod error;
pub mod export;
pub mod model;
pub mod prelude;
pub mod resolver;
pub mod snippet;

#[cfg(feature = "python-bindings")]
mod python;
