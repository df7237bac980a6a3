use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use faculty_llm::{
    app::{
        ExecuteModuleCommand, InMemoryModuleCatalog, InMemoryUsageLog, ModuleCatalog,
        ModuleExecutionService, UsageLog, UsageReport,
    },
    domain::{INPUT_PLACEHOLDER, LlmError, NewLlmModule},
    infra::llm::ProviderRegistry,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

const LOG_FILTER_ENV: &str = "FACULTY_LLM_LOG";
const DEFAULT_LOG_FILTER: &str = "info";
const CLI_USER_ID: &str = "cli";
const CLI_MODULE_NAME: &str = "Ad-hoc prompt";
const LIVE_BACKEND_HINT: &str =
    "Set FACULTY_LLM_BACKEND=live with provider API keys to call the real APIs.";

/// Run a prompt template through an LLM provider and print the result with
/// its usage report.
#[derive(Parser, Debug, PartialEq, Eq)]
#[command(name = "faculty-llm")]
#[command(version, about, long_about = None)]
#[command(after_help = LIVE_BACKEND_HINT)]
struct Cli {
    /// Provider identifier: openai or anthropic (case-insensitive)
    provider: String,

    /// Model name passed through to the provider
    model: String,

    /// Text substituted into the template's {input} placeholder
    input: String,

    /// Prompt template
    #[arg(long, default_value = INPUT_PLACEHOLDER)]
    template: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, category = ?error.category(), "execution failed");
            eprintln!("{}", error.user_message());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), LlmError> {
    let registry = ProviderRegistry::from_env()?;
    let catalog = Arc::new(InMemoryModuleCatalog::new());
    let usage_log = Arc::new(InMemoryUsageLog::new());

    let module = catalog.create_module(NewLlmModule {
        name: CLI_MODULE_NAME.to_string(),
        description: None,
        prompt_template: cli.template,
        model: cli.model,
    })?;

    let service = ModuleExecutionService::new(
        registry,
        Arc::clone(&catalog) as Arc<dyn ModuleCatalog>,
        Arc::clone(&usage_log) as Arc<dyn UsageLog>,
    );
    let outcome = service.execute(ExecuteModuleCommand {
        user_id: CLI_USER_ID.to_string(),
        module_id: module.id,
        user_input: cli.input,
        provider: Some(cli.provider),
    })?;

    let report = UsageReport::build(&usage_log.records()?, &catalog.list_modules()?, Utc::now());
    let rendered = serde_json::to_string_pretty(&json!({
        "outcome": outcome,
        "usage": report,
    }))
    .map_err(|err| LlmError::internal(format!("failed to render output: {err}")))?;

    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use clap::error::ErrorKind;

    use super::Cli;

    #[test]
    fn cli_defaults_template_to_placeholder() {
        let cli = Cli::try_parse_from([
            "faculty-llm",
            "openai",
            "gpt-3.5-turbo",
            "Summarize this text",
        ])
        .expect("arguments should parse");

        assert_eq!(
            cli,
            Cli {
                provider: "openai".to_string(),
                model: "gpt-3.5-turbo".to_string(),
                input: "Summarize this text".to_string(),
                template: "{input}".to_string(),
            }
        );
    }

    #[test]
    fn cli_accepts_template_before_positionals() {
        let cli = Cli::try_parse_from([
            "faculty-llm",
            "--template",
            "Explain: {input}",
            "anthropic",
            "claude-3-5-sonnet",
            "tail recursion",
        ])
        .expect("arguments should parse");

        assert_eq!(cli.template, "Explain: {input}");
        assert_eq!(cli.provider, "anthropic");
        assert_eq!(cli.input, "tail recursion");
    }

    #[test]
    fn cli_rejects_missing_positionals_and_unknown_flags() {
        let missing = Cli::try_parse_from(["faculty-llm", "openai", "gpt-3.5-turbo"])
            .expect_err("missing input should fail");
        assert_eq!(missing.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(missing.exit_code(), 2);

        let unknown = Cli::try_parse_from(["faculty-llm", "openai", "m", "x", "--verbose"])
            .expect_err("unknown flag should fail");
        assert_eq!(unknown.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn cli_help_exits_successfully() {
        let help = Cli::try_parse_from(["faculty-llm", "--help"])
            .expect_err("help should short-circuit parsing");

        assert_eq!(help.kind(), ErrorKind::DisplayHelp);
        assert_eq!(help.exit_code(), 0);
    }
}
