//! Python snippet handling: structural parsing, contract validation, body
//! extraction, signature rendering and import aggregation.

pub mod extract;
pub mod imports;
pub mod lexer;
pub mod literal;
pub mod parser;
pub mod render;
pub mod stdlib;

pub use extract::{ExtractedFunction, extract_function, validate_and_extract};
pub use imports::{ImportAggregator, ImportSet, classify_and_merge, sort_imports};
pub use parser::{FunctionDef, ImportStmt, ParsedModule, parse_module};
pub use render::{MAX_VAR_NAME_LENGTH, Signature, render_function, truncate_identifier};
pub use stdlib::is_standard_library;
