use super::position::{ExportPosition, ImportPosition, Placement};
use super::section::{ExportContext, SectionGenerator, SectionOutput};
use crate::error::ValidationError;
use crate::model::LlmModel;
use crate::snippet::literal::string_literal;
use tracing::debug;

/// `<model>_llm_config` dictionaries plus the API-key side file.
pub struct ModelsSection;

impl ModelsSection {
    fn llm_config(model: &LlmModel, name: &str, accessor: &str) -> String {
        let mut entries: Vec<String> = vec![format!("\"model\": {}", string_literal(&model.model))];
        if !model.api_type.is_openai_compatible() {
            entries.push(format!(
                "\"api_type\": {}",
                string_literal(model.api_type.as_str())
            ));
        }
        if let Some(base_url) = &model.base_url {
            entries.push(format!("\"base_url\": {}", string_literal(base_url)));
        }
        entries.push(format!(
            "\"api_key\": {}({})",
            accessor,
            string_literal(name)
        ));
        if let Some(api_version) = &model.api_version {
            entries.push(format!("\"api_version\": {}", string_literal(api_version)));
        }
        if let Some(temperature) = model.temperature {
            entries.push(format!("\"temperature\": {}", float_literal(temperature)));
        }
        if let Some(top_p) = model.top_p {
            entries.push(format!("\"top_p\": {}", float_literal(top_p)));
        }
        if let Some(max_tokens) = model.max_tokens {
            entries.push(format!("\"max_tokens\": {}", max_tokens));
        }
        if let Some(price) = &model.price {
            entries.push(format!(
                "\"price\": [{}, {}]",
                float_literal(price.prompt_price_per_1k),
                float_literal(price.completion_token_price_per_1k)
            ));
        }
        format!(
            "{}_llm_config = {{\n    {}\n}}",
            name,
            entries.join(",\n    ")
        )
    }

    /// The `__MODELS__` table and the accessor that reads it.
    fn api_keys_code(ctx: &ExportContext<'_>, accessor: &str) -> Result<String, ValidationError> {
        let mut out = String::from("__MODELS__ = {\n");
        for model in ctx.flow.models() {
            let name = ctx.names.model(&model.id)?;
            let fallback = match &model.api_key {
                Some(key) => string_literal(key),
                None => "None".to_string(),
            };
            out.push_str(&format!(
                "    {}: ({}, {}),\n",
                string_literal(name),
                string_literal(&model.api_key_env),
                fallback
            ));
        }
        out.push_str("}\n\n\n");
        out.push_str(&format!(
            "def {}(model_name: str) -> str:\n    \"\"\"Get a model's API key from the environment.\"\"\"\n    env_key, fallback = __MODELS__.get(model_name, (\"OPENAI_API_KEY\", None))\n    return os.environ.get(env_key, fallback or \"\")\n",
            accessor
        ));
        Ok(out)
    }

    fn api_keys_file(ctx: &ExportContext<'_>, accessor: &str) -> Result<String, ValidationError> {
        Ok(format!(
            "\"\"\"API keys for the models of {}.\"\"\"\n\nimport os\n\n{}",
            ctx.names.flow_name(),
            Self::api_keys_code(ctx, accessor)?
        ))
    }
}

/// Python float text; integral values keep a `.0`.
fn float_literal(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

pub fn api_key_accessor(flow_name: &str) -> String {
    format!("get_{}_model_api_key", flow_name)
}

impl SectionGenerator for ModelsSection {
    fn phase(&self) -> ExportPosition {
        ExportPosition::Models
    }

    fn export(&self, ctx: &ExportContext<'_>) -> Result<SectionOutput, ValidationError> {
        let mut output = SectionOutput::default();
        if ctx.flow.models().is_empty() {
            return Ok(output);
        }
        let accessor = api_key_accessor(ctx.names.flow_name());
        let mut configs = Vec::with_capacity(ctx.flow.models().len());
        for model in ctx.flow.models() {
            let name = ctx.names.model(&model.id)?;
            configs.push(Self::llm_config(model, name, &accessor));
        }
        output.content = configs.join("\n\n");
        if ctx.settings.skip_aux_files {
            // no side module, so the program carries the accessor itself
            output.add_import("import os", ImportPosition::Builtin);
            output.add_fragment(
                Self::api_keys_code(ctx, &accessor)?,
                Placement::Before(ExportPosition::Models),
            );
        } else {
            let module = format!("{}_api_keys", ctx.settings.file_stem);
            output.add_import(
                format!("from {} import {}", module, accessor),
                ImportPosition::Local,
            );
            output
                .aux_files
                .push((format!("{}.py", module), Self::api_keys_file(ctx, &accessor)?));
        }
        debug!(models = configs.len(), "Exported model configs");
        Ok(output)
    }
}
