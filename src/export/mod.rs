//! Turns a validated [`Flow`] into a runnable Python program.
//!
//! The [`Exporter`] runs one [`SectionGenerator`] per entity family in a
//! fixed order (models, skills, agents, chats), then hands every output to
//! the [`assembler::Assembler`].
//!
//! # Example
//!
//! ```ignore
//! use chatweave::export::Exporter;
//! use chatweave::model::Flow;
//!
//! let flow = Flow::from_json(&json)?;
//! let output = Exporter::builder(&flow)
//!     .with_types_as_comments(true)
//!     .build()
//!     .export()?;
//! output.write_to("out")?;
//! ```

pub mod agents;
pub mod assembler;
pub mod chats;
pub mod models;
pub mod naming;
pub mod position;
pub mod section;
pub mod skills;

pub use assembler::{Assembled, Assembler};
pub use naming::{NameRegistry, sanitize_identifier};
pub use position::{ExportPosition, ImportPosition, Placement};
pub use section::{ExportContext, SectionGenerator, SectionOutput};

use crate::error::ExportError;
use crate::model::Flow;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Settings shared by every section generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    /// Write parameter types as `# type:` comments instead of annotations.
    pub types_as_comments: bool,
    /// `None` drops the `"cache_seed"` key from every `llm_config`.
    pub cache_seed: Option<u32>,
    /// Name of the program file, without the `.py` extension.
    pub file_stem: String,
    /// Embed the API-key accessor in the program instead of writing
    /// `<stem>_api_keys.py` next to it.
    pub skip_aux_files: bool,
}

pub struct Exporter<'a> {
    flow: &'a Flow,
    settings: ExportSettings,
    sections: Vec<Box<dyn SectionGenerator>>,
}

pub struct ExporterBuilder<'a> {
    flow: &'a Flow,
    types_as_comments: bool,
    cache_seed: Option<u32>,
    file_stem: Option<String>,
    skip_aux_files: bool,
    extra_sections: Vec<Box<dyn SectionGenerator>>,
}

impl<'a> ExporterBuilder<'a> {
    pub fn new(flow: &'a Flow) -> Self {
        Self {
            flow,
            types_as_comments: false,
            cache_seed: flow.cache_seed,
            file_stem: None,
            skip_aux_files: false,
            extra_sections: Vec::new(),
        }
    }

    pub fn with_types_as_comments(mut self, enabled: bool) -> Self {
        self.types_as_comments = enabled;
        self
    }

    pub fn with_cache_seed(mut self, cache_seed: Option<u32>) -> Self {
        self.cache_seed = cache_seed;
        self
    }

    pub fn with_file_stem(mut self, stem: impl Into<String>) -> Self {
        self.file_stem = Some(stem.into());
        self
    }

    pub fn with_skip_aux_files(mut self, skip: bool) -> Self {
        self.skip_aux_files = skip;
        self
    }

    /// Adds a generator that runs after the built-in ones.
    pub fn with_section(mut self, section: Box<dyn SectionGenerator>) -> Self {
        self.extra_sections.push(section);
        self
    }

    pub fn build(self) -> Exporter<'a> {
        let file_stem = self
            .file_stem
            .map(|stem| sanitize_identifier(&stem, "flow"))
            .unwrap_or_else(|| sanitize_identifier(&self.flow.name, "flow"));
        let mut sections: Vec<Box<dyn SectionGenerator>> = vec![
            Box::new(models::ModelsSection),
            Box::new(skills::SkillsSection),
            Box::new(agents::AgentsSection),
            Box::new(chats::ChatsSection),
        ];
        sections.extend(self.extra_sections);
        Exporter {
            flow: self.flow,
            settings: ExportSettings {
                types_as_comments: self.types_as_comments,
                cache_seed: self.cache_seed,
                file_stem,
                skip_aux_files: self.skip_aux_files,
            },
            sections,
        }
    }
}

impl<'a> Exporter<'a> {
    pub fn builder(flow: &'a Flow) -> ExporterBuilder<'a> {
        ExporterBuilder::new(flow)
    }

    /// An exporter with default settings.
    pub fn new(flow: &'a Flow) -> Self {
        ExporterBuilder::new(flow).build()
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Generates the program. Nothing is written to disk.
    pub fn export(&self) -> Result<ExportOutput, ExportError> {
        let names = NameRegistry::new(self.flow);
        let ctx = ExportContext {
            flow: self.flow,
            names: &names,
            settings: &self.settings,
        };
        let mut assembler = Assembler::new();
        for section in &self.sections {
            let phase = section.phase();
            debug!(?phase, "Running section generator");
            assembler.add(phase, section.export(&ctx)?);
        }
        let assembled = assembler.finish(self.flow);
        info!(
            flow = %self.flow.name,
            file = %self.settings.file_stem,
            "Exported flow"
        );
        Ok(ExportOutput {
            file_name: format!("{}.py", self.settings.file_stem),
            program: assembled.program,
            aux_files: assembled.aux_files,
        })
    }
}

/// A generated program and its side files, held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutput {
    pub file_name: String,
    pub program: String,
    /// (file name, content) pairs written next to the program.
    pub aux_files: Vec<(String, String)>,
}

impl ExportOutput {
    /// Writes the program and its side files into `dir`, creating it if
    /// needed. Returns the program's path.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ExportError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| ExportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        for (name, content) in &self.aux_files {
            write_atomic(&dir.join(name), content)?;
        }
        let program_path = dir.join(&self.file_name);
        write_atomic(&program_path, &self.program)?;
        info!(path = %program_path.display(), "Wrote program");
        Ok(program_path)
    }
}

/// Writes through a temporary sibling that is renamed into place.
fn write_atomic(path: &Path, content: &str) -> Result<(), ExportError> {
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp = path.with_file_name(temp_name);
    let io_error = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&temp, content).map_err(io_error)?;
    fs::rename(&temp, path).map_err(|source| {
        let _ = fs::remove_file(&temp);
        io_error(source)
    })?;
    debug!(path = %path.display(), bytes = content.len(), "Wrote file");
    Ok(())
}

/// Parses, validates and exports a flow description with default settings.
pub fn export_json(json: &str) -> Result<ExportOutput, ExportError> {
    let flow = Flow::from_json(json)?;
    Exporter::new(&flow).export()
}

/// Like [`export_json`], then writes the result into `dir`. Nothing is
/// written if any step before the write fails.
pub fn export_json_to(dir: impl AsRef<Path>, json: &str) -> Result<PathBuf, ExportError> {
    export_json(json)?.write_to(dir)
}
