//! Wizard step integration: discovery, rendering and context contribution.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use portal_spec::{BoundStep, Context, FieldKind, SchemaError, TemplateRenderer, bind_schema};

#[derive(Debug, Error)]
pub enum StepError {
    #[error("wizard has no step '{0}'")]
    UnknownStep(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// One wizard step driven by a templated source context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedStep {
    slug: String,
    source_context: String,
    contributes: Vec<String>,
}

impl GeneratedStep {
    /// Renders the source context once with an empty context and records
    /// every field name it can produce, regardless of visibility.
    pub fn new(
        slug: impl Into<String>,
        source_context: impl Into<String>,
        base_contributes: &[&str],
        renderer: &TemplateRenderer,
    ) -> Self {
        let slug = slug.into();
        let source_context = source_context.into();
        let mut contributes: Vec<String> = Vec::new();
        let discovered = renderer
            .render(&source_context, &Context::new())
            .into_iter()
            .flat_map(|fieldset| fieldset.fields.into_iter().map(|field| field.name));
        for name in base_contributes
            .iter()
            .map(|name| name.to_string())
            .chain(discovered)
        {
            if !contributes.contains(&name) {
                contributes.push(name);
            }
        }
        debug!(step = %slug, fields = contributes.len(), "discovered contributed fields");
        Self {
            slug,
            source_context,
            contributes,
        }
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn source_context(&self) -> &str {
        &self.source_context
    }

    pub fn discover_contributed_fields(&self) -> &[String] {
        &self.contributes
    }

    pub fn render(&self, ctx: &Context, renderer: &TemplateRenderer) -> Result<BoundStep, SchemaError> {
        let schema = renderer.render(&self.source_context, ctx);
        bind_schema(&schema, ctx)
    }

    /// Copies the submitted answers into `ctx`, then records one boolean flag
    /// per option of every CHOICE field, hidden ones included, so a choice
    /// that disappears also clears the flags it set earlier.
    pub fn contribute(&self, data: &Context, mut ctx: Context, renderer: &TemplateRenderer) -> Context {
        for key in &self.contributes {
            let value = data.get(key).cloned().unwrap_or(Value::Null);
            ctx.insert(key.clone(), value);
        }

        let schema = renderer.render(&self.source_context, &ctx);
        let mut flags = Vec::new();
        for fieldset in &schema {
            for field in fieldset
                .fields
                .iter()
                .filter(|field| FieldKind::parse(&field.kind) == Some(FieldKind::Choice))
            {
                let selected = data.get(&field.name);
                for choice in &field.choices {
                    flags.push((choice.value.clone(), is_selected(selected, &choice.value)));
                }
            }
        }
        for (flag, value) in flags {
            ctx.insert(flag, Value::Bool(value));
        }
        ctx
    }
}

fn is_selected(selected: Option<&Value>, option: &str) -> bool {
    match selected {
        Some(Value::String(value)) => value == option,
        Some(Value::Array(values)) => values.iter().any(|value| value.as_str() == Some(option)),
        _ => false,
    }
}

/// Ordered steps sharing one answer context until the wizard finalizes.
#[derive(Debug, Default)]
pub struct Wizard {
    renderer: TemplateRenderer,
    steps: Vec<GeneratedStep>,
    context: Context,
}

impl Wizard {
    pub fn new(renderer: TemplateRenderer) -> Self {
        Self {
            renderer,
            steps: Vec::new(),
            context: Context::new(),
        }
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn add_step(
        &mut self,
        slug: impl Into<String>,
        source_context: impl Into<String>,
        base_contributes: &[&str],
    ) -> &GeneratedStep {
        let step = GeneratedStep::new(slug, source_context, base_contributes, &self.renderer);
        self.steps.push(step);
        &self.steps[self.steps.len() - 1]
    }

    pub fn steps(&self) -> &[GeneratedStep] {
        &self.steps
    }

    pub fn step(&self, slug: &str) -> Option<&GeneratedStep> {
        self.steps.iter().find(|step| step.slug() == slug)
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn render_step(&self, slug: &str) -> Result<BoundStep, StepError> {
        let step = self
            .step(slug)
            .ok_or_else(|| StepError::UnknownStep(slug.to_string()))?;
        Ok(step.render(&self.context, &self.renderer)?)
    }

    pub fn submit(&mut self, slug: &str, data: &Context) -> Result<(), StepError> {
        let step = self
            .steps
            .iter()
            .find(|step| step.slug() == slug)
            .ok_or_else(|| StepError::UnknownStep(slug.to_string()))?;
        let context = std::mem::take(&mut self.context);
        self.context = step.contribute(data, context, &self.renderer);
        Ok(())
    }

    pub fn finalize(self) -> Context {
        self.context
    }
}
