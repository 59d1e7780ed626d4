use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The kind of entity a broken reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Agent,
    Chat,
    Model,
    Skill,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Agent => "agent",
            EntityKind::Chat => "chat",
            EntityKind::Model => "model",
            EntityKind::Skill => "skill",
        };
        f.write_str(name)
    }
}

/// A graph invariant of the flow was violated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralValidationError {
    #[error("Duplicate {kind} id '{id}'")]
    DuplicateId { kind: EntityKind, id: String },

    #[error("Agent '{agent_id}' ({agent_name}) does not connect to any other node")]
    DisconnectedAgent { agent_id: String, agent_name: String },

    #[error("The ordered flow is empty: no chat has a non-negative order")]
    EmptyOrder,

    #[error("The flow contains swarm agents but no initial swarm agent can be derived")]
    NoInitialSwarmAgent,

    #[error("Skill '{skill_id}' has a name that is not a valid identifier: '{name}'")]
    InvalidSkillName { skill_id: String, name: String },

    #[error("Skill '{skill_id}' does not define '{expected}'")]
    SkillDefinitionMissing { skill_id: String, expected: String },

    #[error("Chat '{chat_id}' uses the RAG message generator, but its sender is not a RAG user")]
    GeneratorWithoutRagSender { chat_id: String },

    #[error("Chat '{chat_id}' is the swarm entry point and needs a plain text message")]
    SwarmEntryMessage { chat_id: String },

    #[error("Invalid value '{value}' for field '{field}' of {kind} '{id}'")]
    InvalidField {
        kind: EntityKind,
        id: String,
        field: String,
        value: String,
    },
}

/// An id was referenced that does not exist in the flow.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} '{missing_id}' not found, which is referenced by '{referenced_by}'")]
pub struct ReferentialIntegrityError {
    pub kind: EntityKind,
    pub missing_id: String,
    pub referenced_by: String,
}

impl ReferentialIntegrityError {
    pub fn new(kind: EntityKind, missing_id: &str, referenced_by: &str) -> Self {
        Self {
            kind,
            missing_id: missing_id.to_string(),
            referenced_by: referenced_by.to_string(),
        }
    }
}

/// An embedded snippet could not be parsed.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("SyntaxError: {message} (line {line}), in\n{snippet}")]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
    pub snippet: String,
}

/// An embedded function does not match the expected contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignatureError {
    #[error("No method with name `{function}` and arguments `{expected_args:?}` found")]
    MissingFunction {
        function: String,
        expected_args: Vec<String>,
    },

    #[error("Invalid number of arguments, in function {function}, expected: {expected}, got: {found}")]
    ArgumentCount {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid argument name: {found} in function {function} (expected: {expected})")]
    ArgumentName {
        function: String,
        expected: String,
        found: String,
    },

    #[error("No body found for function {function}")]
    EmptyBody { function: String },
}

/// Any single validation failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error(transparent)]
    Structural(#[from] StructuralValidationError),

    #[error(transparent)]
    Referential(#[from] ReferentialIntegrityError),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Signature(#[from] SignatureError),
}

/// All validation failures collected while building a flow.
#[derive(Error, Debug, Clone, PartialEq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub(crate) fn from_vec(errors: Vec<ValidationError>) -> Result<(), Self> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self { errors })
        }
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn first(&self) -> &ValidationError {
        // never constructed empty
        &self.errors[0]
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Flow validation failed with {} error(s):", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

/// Errors surfaced by the export entry points.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to parse flow JSON: {0}")]
    Json(String),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("Flow resolution failed: {0}")]
    Resolution(#[from] ValidationError),

    #[error("Could not write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
