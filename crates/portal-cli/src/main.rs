use clap::{Parser, Subcommand};
use portal_spec::{
    Context, FieldsetSchema, TemplateRenderer, ValidationResult, extensions, to_source_context,
    validate,
};
use portal_step::{
    ContextSource, GithubFetcher, PortalConfig, contribute_step, generate_context, render_step,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const DEFAULT_PASSWORD_LENGTH: usize = 16;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Cookiecutter deployment wizard CLI",
    long_about = "Fetches cookiecutter contexts and renders, validates and submits the wizard steps generated from them"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a cookiecutter context from GitHub and print it as a step source context.
    Fetch {
        /// Contents API URL of the cookiecutter.json file.
        #[arg(long, value_name = "URL")]
        url: String,
        /// Name of the generated fieldset.
        #[arg(long, default_value = "general")]
        name: String,
        /// Label of the generated fieldset.
        #[arg(long, default_value = "General")]
        label: String,
        /// Write the YAML document here instead of stdout.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Render a step against an answer context and print the bound fields.
    Render {
        /// YAML source context of the step.
        #[arg(long, value_name = "SOURCE")]
        source: PathBuf,
        /// JSON file with the answers collected so far.
        #[arg(long, value_name = "CONTEXT")]
        context: Option<PathBuf>,
    },
    /// Submit step data and print the updated answer context.
    Contribute {
        /// YAML source context of the step.
        #[arg(long, value_name = "SOURCE")]
        source: PathBuf,
        /// JSON file with the submitted step data.
        #[arg(long, value_name = "DATA")]
        data: PathBuf,
        /// JSON file with the answers collected so far.
        #[arg(long, value_name = "CONTEXT")]
        context: Option<PathBuf>,
    },
    /// Validate the fieldset document of a step source context.
    Check {
        /// YAML source context of the step.
        #[arg(long, value_name = "SOURCE")]
        source: PathBuf,
    },
    /// Print the JSON Schema of the fieldset document.
    Schema,
    /// Generate a random password.
    Password {
        #[arg(long, default_value_t = DEFAULT_PASSWORD_LENGTH)]
        length: usize,
    },
    /// Generate an RSA key pair (private PEM, then OpenSSH public key).
    Keypair,
}

fn main() -> CliResult<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = PortalConfig::from_env()?;
    match cli.command {
        Command::Fetch {
            url,
            name,
            label,
            out,
        } => run_fetch(&config, url, &name, &label, out),
        Command::Render { source, context } => run_render(&config, &source, context.as_deref()),
        Command::Contribute {
            source,
            data,
            context,
        } => run_contribute(&config, &source, &data, context.as_deref()),
        Command::Check { source } => run_check(&source),
        Command::Schema => run_schema(),
        Command::Password { length } => {
            println!("{}", extensions::generate_password(length));
            Ok(())
        }
        Command::Keypair => run_keypair(&config),
    }
}

fn run_fetch(
    config: &PortalConfig,
    url: String,
    name: &str,
    label: &str,
    out: Option<PathBuf>,
) -> CliResult<()> {
    let fetcher = GithubFetcher::new(config)?;
    let schema = generate_context(&ContextSource::Github { url }, name, label, &fetcher)?;
    let document = to_source_context(&schema)?;
    match out {
        Some(path) => {
            fs::write(&path, document)?;
            info!(path = %path.display(), fieldsets = schema.len(), "wrote source context");
        }
        None => print!("{document}"),
    }
    Ok(())
}

fn run_render(config: &PortalConfig, source: &Path, context: Option<&Path>) -> CliResult<()> {
    let source_context = fs::read_to_string(source)?;
    let ctx_json = read_optional(context)?;
    let payload = render_step(&source_context, &ctx_json, &serde_json::to_string(config)?);
    emit(&payload)
}

fn run_contribute(
    config: &PortalConfig,
    source: &Path,
    data: &Path,
    context: Option<&Path>,
) -> CliResult<()> {
    let source_context = fs::read_to_string(source)?;
    let data_json = fs::read_to_string(data)?;
    let ctx_json = read_optional(context)?;
    let payload = contribute_step(
        &source_context,
        &data_json,
        &ctx_json,
        &serde_json::to_string(config)?,
    );
    emit(&payload)
}

fn run_check(source: &Path) -> CliResult<()> {
    let source_context = fs::read_to_string(source)?;
    let schema = TemplateRenderer::default().render(&source_context, &Context::new());
    if schema.is_empty() {
        return Err("source context does not contain any fieldsets".into());
    }

    let result = validate(&schema);
    println!(
        "Validation result: {}",
        if result.valid { "valid" } else { "invalid" }
    );
    describe_validation(&result);

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(result: &ValidationResult) {
    for issue in &result.issues {
        let location = match (&issue.fieldset, &issue.field) {
            (Some(fieldset), Some(field)) => format!("{fieldset}.{field}"),
            (Some(fieldset), None) => fieldset.clone(),
            (None, Some(field)) => field.clone(),
            (None, None) => "<document>".to_string(),
        };
        println!("  {} - {} ({})", location, issue.message, issue.code);
    }
}

fn run_schema() -> CliResult<()> {
    let schema = schemars::schema_for!(Vec<FieldsetSchema>);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn run_keypair(config: &PortalConfig) -> CliResult<()> {
    let pair = extensions::generate_ssh_keypair(config.ssh_key_comment.as_deref())?;
    print!("{}", pair.private_key);
    println!("{}", pair.public_key);
    Ok(())
}

fn read_optional(path: Option<&Path>) -> CliResult<String> {
    Ok(match path {
        Some(path) => fs::read_to_string(path)?,
        None => "{}".to_string(),
    })
}

/// Prints a host API payload, turning its `{"error": ...}` form into a failure.
fn emit(payload: &str) -> CliResult<()> {
    let value: Value = serde_json::from_str(payload)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Err(error.into());
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
