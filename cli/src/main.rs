mod config;

use clap::Parser;
use config::ReasonerConfig;
use kif_bus::{Event, EventKind, QueryParameters, QueryType, RetractionType};
use kif_orchestrator::Orchestrator;
use reedline::{DefaultPrompt, Reedline, Signal};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// A forward/backward chaining KIF reasoner: feed it assertions, rules and
/// queries over stdin, one S-expression per line.
#[derive(Parser, Debug)]
#[command(name = "kif", version, about)]
struct Cli {
    /// Path to a TOML config file; falls back to built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read input lines from this file instead of an interactive prompt.
    #[arg(long)]
    script: Option<PathBuf>,
}

fn init_logging(cfg: &ReasonerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn register_output_listeners(orch: &Orchestrator) {
    orch.bus.on(
        EventKind::QueryResult,
        Arc::new(move |event| {
            if let Event::QueryResult { answer } = event {
                println!("; answer[{}]: {:?}", answer.query_id, answer.status);
                for binding in &answer.bindings {
                    let rendered: Vec<String> =
                        binding.iter().map(|(k, v)| format!("{k} = {}", v.to_kif())).collect();
                    println!(";   {}", rendered.join(", "));
                }
                if let Some(err) = &answer.error {
                    println!(";   error: {err}");
                }
            }
        }),
    );
    orch.bus.on(
        EventKind::ContradictionDetected,
        Arc::new(move |event| {
            if let Event::ContradictionDetected { ids, kb_id } = event {
                warn!(a = %ids.0, b = %ids.1, kb_id, "contradiction detected");
            }
        }),
    );
}

/// Dispatches one line of input. Lines starting with `:` are REPL commands;
/// everything else is parsed as KIF and submitted as an `ExternalInput`.
fn handle_line(orch: &Orchestrator, line: &str) {
    let line = line.trim();
    if line.is_empty() || line.starts_with(';') {
        return;
    }
    if let Some(rest) = line.strip_prefix(":retract ") {
        orch.submit_retraction(rest.trim().to_string(), RetractionType::ById, "cli", None);
        return;
    }
    if let Some(rest) = line.strip_prefix(":retract-note ") {
        orch.submit_retraction(rest.trim().to_string(), RetractionType::ByNote, "cli", None);
        return;
    }
    if let Some(rest) = line.strip_prefix(":retract-rule ") {
        orch.submit_retraction(rest.trim().to_string(), RetractionType::ByRuleForm, "cli", None);
        return;
    }
    if let Some(rest) = line.strip_prefix(":ask ") {
        submit_query(orch, rest.trim(), QueryType::AskTrueFalse);
        return;
    }
    if let Some(rest) = line.strip_prefix(":bindings ") {
        submit_query(orch, rest.trim(), QueryType::AskBindings);
        return;
    }
    if let Some(rest) = line.strip_prefix(":achieve ") {
        submit_query(orch, rest.trim(), QueryType::AchieveGoal);
        return;
    }

    match kif_term::parse_one(line) {
        Ok(term) => {
            orch.submit_input(term, "cli", None);
        }
        Err(e) => error!(error = %e, line, "could not parse input"),
    }
}

fn submit_query(orch: &Orchestrator, pattern: &str, kind: QueryType) {
    match kif_term::parse_one(pattern) {
        Ok(term) => {
            let id = orch.submit_query(kind, term, None, QueryParameters::default());
            info!(query_id = %id, "query submitted");
        }
        Err(e) => error!(error = %e, pattern, "could not parse query pattern"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => ReasonerConfig::load(path)?,
        None => ReasonerConfig::default(),
    };
    init_logging(&cfg);

    let orch = Orchestrator::new(cfg.kb_capacity);
    register_output_listeners(&orch);

    if let Some(script) = &cli.script {
        let text = std::fs::read_to_string(script)?;
        for line in text.lines() {
            handle_line(&orch, line);
        }
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        return Ok(());
    }

    println!("kif reasoner -- one KIF form per line, ':quit' to exit.");
    let mut line_editor = Reedline::create();
    let prompt = DefaultPrompt::default();
    loop {
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(buffer)) => {
                let input = buffer.trim();
                if input == ":quit" || input == ":q" {
                    break;
                }
                handle_line(&orch, input);
            }
            Ok(Signal::CtrlD) | Ok(Signal::CtrlC) => break,
            Err(e) => {
                error!(error = %e, "reedline error");
                break;
            }
        }
    }
    orch.bus.shutdown();
    Ok(())
}
