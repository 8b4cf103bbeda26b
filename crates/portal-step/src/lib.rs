#![allow(missing_docs)]

pub mod config;
pub mod fetch;
pub mod step;

use serde_json::{Value, json};
use thiserror::Error;

use portal_spec::{
    Context, SchemaError, TemplateRenderer, bind_schema, resolve_visibility, validate,
};

pub use config::{ConfigError, PortalConfig};
pub use fetch::{
    ContextFetcher, ContextSource, FetchError, GITHUB_RAW_MEDIA_TYPE, GithubFetcher,
    generate_context,
};
pub use step::{GeneratedStep, StepError, Wizard};

#[derive(Debug, Error)]
enum HostError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to parse submitted data: {0}")]
    DataParse(#[source] serde_json::Error),
    #[error("submitted data must be a JSON object")]
    DataShape,
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

const STEP_SLUG: &str = "generated";

fn load_renderer(config_json: &str) -> Result<TemplateRenderer, HostError> {
    Ok(PortalConfig::from_json(config_json)?.renderer())
}

/// Unparsable or non-object contexts start the wizard from scratch.
fn parse_context(ctx_json: &str) -> Context {
    match serde_json::from_str(ctx_json) {
        Ok(Value::Object(map)) => map,
        _ => Context::new(),
    }
}

fn parse_data(data_json: &str) -> Result<Context, HostError> {
    match serde_json::from_str(data_json).map_err(HostError::DataParse)? {
        Value::Object(map) => Ok(map),
        _ => Err(HostError::DataShape),
    }
}

fn respond(result: Result<Value, HostError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

/// The fieldset document as rendered against an empty context.
pub fn describe(source_context: &str) -> String {
    let schema = TemplateRenderer::default().render(source_context, &Context::new());
    respond(serde_json::to_value(schema).map_err(HostError::JsonEncode))
}

pub fn discover(source_context: &str) -> String {
    let step = GeneratedStep::new(STEP_SLUG, source_context, &[], &TemplateRenderer::default());
    respond(Ok(json!({ "contributes": step.discover_contributed_fields() })))
}

pub fn render_step(source_context: &str, ctx_json: &str, config_json: &str) -> String {
    respond(load_renderer(config_json).and_then(|renderer| {
        let ctx = parse_context(ctx_json);
        let schema = renderer.render(source_context, &ctx);
        let visibility = resolve_visibility(&schema, &ctx);
        let bound = bind_schema(&schema, &ctx)?;
        Ok(json!({
            "step": serde_json::to_value(bound).map_err(HostError::JsonEncode)?,
            "visibility": visibility,
        }))
    }))
}

pub fn contribute_step(
    source_context: &str,
    data_json: &str,
    ctx_json: &str,
    config_json: &str,
) -> String {
    respond(load_renderer(config_json).and_then(|renderer| {
        let data = parse_data(data_json)?;
        let step = GeneratedStep::new(STEP_SLUG, source_context, &[], &renderer);
        let updated = step.contribute(&data, parse_context(ctx_json), &renderer);
        Ok(Value::Object(updated))
    }))
}

pub fn check(source_context: &str) -> String {
    let schema = TemplateRenderer::default().render(source_context, &Context::new());
    respond(serde_json::to_value(validate(&schema)).map_err(HostError::JsonEncode))
}
