//! qspec-inspect
//!
//! Compiles a raw declarative query description against a model registry and
//! prints the resulting query descriptor, for debugging what a request will
//! actually ask the data-access layer to do.

use anyhow::Context as _;
use clap::Parser;
use qspec_ast::QuerySpec;
use qspec_compile::{ContextCell, Diagnostics, JsonFilterTranslator, QueryContext};
use qspec_ir::{BaseDescriptor, QueryDescriptor};
use qspec_registry::StaticRegistry;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

mod config;
mod logging;

use config::Config;

static CONTEXT: ContextCell = ContextCell::new();

#[derive(Debug, Parser)]
#[command(name = "qspec-inspect", version, about = "Print the query descriptor compiled from a raw query description")]
struct Cli {
    /// Raw query JSON file, or `-` for stdin
    #[arg(default_value = "-")]
    input: String,

    /// Configuration file (YAML)
    #[arg(short, long, env = "QSPEC_CONFIG")]
    config: Option<PathBuf>,

    /// Relation definitions file; overrides the configured path
    #[arg(short, long)]
    registry: Option<PathBuf>,

    /// Base descriptor JSON file to merge onto
    #[arg(short, long)]
    base: Option<PathBuf>,

    /// Compile for a single-row fetch
    #[arg(long)]
    single: bool,

    /// Include the descriptor fingerprint
    #[arg(long)]
    fingerprint: bool,

    /// Include dropped and degraded input
    #[arg(long)]
    diagnostics: bool,

    /// Print compact JSON
    #[arg(long)]
    compact: bool,
}

#[derive(Debug, Serialize)]
struct Report {
    descriptor: QueryDescriptor,

    #[serde(skip_serializing_if = "Option::is_none")]
    fingerprint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostics: Option<Diagnostics>,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::from_env(),
    };
    config.apply_logging_env();
    logging::init()?;

    let registry = load_registry(&cli, &config)?;
    let ctx = CONTEXT.init(QueryContext::new(registry, JsonFilterTranslator))?;

    let raw = read_input(&cli.input)?;
    let spec = QuerySpec::from_json_str(&raw).context("query input is not valid JSON")?;
    let base = cli.base.as_deref().map(read_base).transpose()?;

    let (descriptor, diagnostics) =
        ctx.compiler()
            .assemble_with_diagnostics(&spec, base.as_ref(), cli.single)?;

    if !diagnostics.is_empty() {
        warn!(count = diagnostics.len(), "Some query input was dropped or degraded");
    }
    info!(
        fingerprint = %descriptor.fingerprint(),
        paginated = descriptor.is_paginated(),
        "Compiled query descriptor"
    );

    let show_fingerprint = cli.fingerprint || config.output.fingerprint;
    let show_diagnostics = cli.diagnostics || config.output.diagnostics;
    let pretty = config.output.pretty && !cli.compact;

    let output = if show_fingerprint || show_diagnostics {
        let report = Report {
            fingerprint: show_fingerprint.then(|| descriptor.fingerprint()),
            diagnostics: show_diagnostics.then_some(diagnostics),
            descriptor,
        };
        render(&report, pretty)?
    } else {
        render(&descriptor, pretty)?
    };
    println!("{output}");

    Ok(())
}

fn load_registry(cli: &Cli, config: &Config) -> anyhow::Result<StaticRegistry> {
    let path = cli
        .registry
        .clone()
        .or_else(|| config.registry.path.as_ref().map(PathBuf::from));

    match path {
        Some(path) => StaticRegistry::load(&path)
            .with_context(|| format!("loading registry {}", path.display())),
        None => {
            warn!("No registry configured, every relation reference will be unresolved");
            Ok(StaticRegistry::default())
        }
    }
}

fn read_input(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("reading query from stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("reading query {input}"))
    }
}

fn read_base(path: &Path) -> anyhow::Result<BaseDescriptor> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading base descriptor {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parsing base descriptor {}", path.display()))
}

fn render<T: Serialize>(value: &T, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "qspec-inspect",
            "--single",
            "--registry",
            "models.yaml",
            "query.json",
        ]);

        assert!(cli.single);
        assert_eq!(cli.input, "query.json");
        assert_eq!(cli.registry, Some(PathBuf::from("models.yaml")));
    }

    #[test]
    fn test_read_base() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"limit": 3, "paranoid": false}}"#).unwrap();

        let base = read_base(file.path()).unwrap();
        assert_eq!(base.limit, Some(3));
        assert_eq!(base.options.get("paranoid"), Some(&serde_json::json!(false)));
    }

    #[test]
    fn test_report_shape() {
        let ctx = QueryContext::new(StaticRegistry::default(), JsonFilterTranslator);
        let spec = QuerySpec::from_value(&serde_json::json!({ "expands": [{ "name": "ghost" }] }));
        let (descriptor, diagnostics) = ctx
            .compiler()
            .assemble_with_diagnostics(&spec, None, false)
            .unwrap();

        let report = Report {
            fingerprint: Some(descriptor.fingerprint()),
            diagnostics: Some(diagnostics),
            descriptor,
        };
        let json: serde_json::Value = serde_json::from_str(&render(&report, false).unwrap()).unwrap();

        assert_eq!(json["descriptor"]["limit"], serde_json::json!(20));
        assert_eq!(json["diagnostics"]["entries"][0]["kind"], "unresolved_expand");
        assert!(json["fingerprint"].is_string());
    }
}
