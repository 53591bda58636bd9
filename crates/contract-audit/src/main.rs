//! contract-audit CLI
//!
//! Checks a report against its contract with an LLM auditor and writes the
//! discrepancy protocol as DOCX.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use contract_audit_core::config::{ApiConfig, HistoryConfig};
use contract_audit_core::{
    default_config_path, export_report, extract_marked_text, load_config, load_history,
    preview_prompt, run_configured, AuditModel, ChatCompletionClient, Config, HistoryOutcome,
    UploadedFile, API_KEY_ENV, EXPORT_FILE_NAME,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Auditor models selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModelChoice {
    /// deepseek-chat: fast
    Chat,
    /// deepseek-reasoner: slower, shows its reasoning
    Reasoner,
}

impl From<ModelChoice> for AuditModel {
    fn from(choice: ModelChoice) -> Self {
        match choice {
            ModelChoice::Chat => Self::Chat,
            ModelChoice::Reasoner => Self::Reasoner,
        }
    }
}

#[derive(Parser)]
#[command(name = "contract-audit")]
#[command(version)]
#[command(about = "Check a report against its contract and write a discrepancy protocol")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an audit and export the protocol as DOCX
    Audit {
        /// Contract file (PDF or DOCX)
        #[arg(short, long)]
        contract: PathBuf,

        /// Report file (PDF or DOCX)
        #[arg(short, long)]
        report: PathBuf,

        /// Auditor model (default: from config, else chat)
        #[arg(short, long, value_enum)]
        model: Option<ModelChoice>,

        /// Where to write the protocol
        #[arg(short, long, default_value = EXPORT_FILE_NAME)]
        output: PathBuf,

        /// Rejection history file (default: bad_history.txt)
        #[arg(long)]
        history: Option<PathBuf>,

        /// Request timeout in seconds (default: 300)
        #[arg(long)]
        timeout: Option<u64>,

        /// Config file (default: platform config dir)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Don't print the model's reasoning trace
        #[arg(long)]
        no_reasoning: bool,
    },

    /// Print the marked-up text of one document
    Extract {
        /// PDF or DOCX file
        file: PathBuf,
    },

    /// Print the prompt an audit would send, without sending it
    Prompt {
        /// Contract file (PDF or DOCX)
        #[arg(short, long)]
        contract: PathBuf,

        /// Report file (PDF or DOCX)
        #[arg(short, long)]
        report: PathBuf,

        /// Rejection history file (default: from config, else bad_history.txt)
        #[arg(long)]
        history: Option<PathBuf>,

        /// Config file (default: platform config dir)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    // stdout carries command output, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "contract_audit=info"
                    .parse()
                    .expect("directive is compile-time constant"),
            ),
        )
        .init();

    install_panic_hook();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Command::Audit {
            contract,
            report,
            model,
            output,
            history,
            timeout,
            config,
            no_reasoning,
        } => {
            let overrides = Overrides {
                model: model.map(AuditModel::from),
                history,
                timeout,
            };
            cmd_audit(
                &contract,
                &report,
                &output,
                config.as_deref(),
                &overrides,
                !no_reasoning,
            )
        }
        Command::Extract { file } => cmd_extract(&file),
        Command::Prompt {
            contract,
            report,
            history,
            config,
        } => cmd_prompt(&contract, &report, history, config.as_deref()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

/// Crates whose panics the core library catches and reports as an
/// unreadable PDF.
const PDF_PARSER_CRATES: &[&str] = &[
    "pdf-extract-",
    "lopdf-",
    "cff-parser-",
    "type1-encoding-parser-",
    "adobe-cmap-parser-",
];

fn is_pdf_parser_source(file: &str) -> bool {
    PDF_PARSER_CRATES.iter().any(|name| file.contains(name))
}

/// Keep caught PDF parser panics off stderr; the run reports them as an
/// `Error:` line instead. Every other panic goes to the default hook.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if info
            .location()
            .is_some_and(|location| is_pdf_parser_source(location.file()))
        {
            tracing::debug!("PDF parser panicked: {info}");
        } else {
            default_hook(info);
        }
    }));
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Default)]
struct Overrides {
    model: Option<AuditModel>,
    history: Option<PathBuf>,
    timeout: Option<u64>,
}

impl Overrides {
    fn apply(&self, config: &mut Config) {
        if self.model.is_some() || self.timeout.is_some() {
            let api = config.api.get_or_insert_with(ApiConfig::default);
            if let Some(model) = self.model {
                api.model = Some(model.model_id().to_string());
            }
            if let Some(secs) = self.timeout {
                api.timeout_secs = Some(secs);
            }
        }
        if let Some(path) = &self.history {
            config
                .history
                .get_or_insert_with(HistoryConfig::default)
                .path = Some(path.clone());
        }
    }
}

fn read_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    load_config(&path).with_context(|| format!("loading {}", path.display()))
}

fn cmd_audit(
    contract: &Path,
    report: &Path,
    output: &Path,
    config_path: Option<&Path>,
    overrides: &Overrides,
    show_reasoning: bool,
) -> Result<()> {
    let mut config = read_config(config_path)?;
    overrides.apply(&mut config);

    let env_key = std::env::var(API_KEY_ENV).ok();
    let audit = run_configured(&config, env_key, contract, report, |settings| {
        eprintln!(
            "{} {} vs {} with {}",
            "Auditing".cyan().bold(),
            report.display(),
            contract.display(),
            settings.model.to_string().bold()
        );
        ChatCompletionClient::new(
            settings.api_key.clone(),
            settings.base_url.clone(),
            settings.timeout,
        )
    })?;

    let result = audit.result;

    if show_reasoning {
        if let Some(reasoning) = &result.reasoning {
            println!("{}", "Reasoning".yellow().bold());
            println!("{}", reasoning.dimmed());
            println!();
        }
    }

    if result.is_reasoning_only() {
        eprintln!(
            "{} {} finished reasoning but wrote no protocol. Nothing exported; try again or use --model chat.",
            "Warning:".yellow().bold(),
            audit.settings.model
        );
        return Ok(());
    }

    println!("{}", result.answer);

    let artifact = export_report(&result.answer)?;
    std::fs::write(output, &artifact.bytes)
        .with_context(|| format!("writing {}", output.display()))?;

    tracing::info!(
        "Wrote {} ({} bytes) to {}",
        artifact.file_name,
        artifact.bytes.len(),
        output.display()
    );
    eprintln!(
        "{} Protocol written to {}",
        "Done.".green().bold(),
        output.display()
    );
    Ok(())
}

fn cmd_extract(file: &Path) -> Result<()> {
    let upload = UploadedFile::read(file)?;
    let document = extract_marked_text(&upload)?;

    print!("{}", document.text);
    eprintln!(
        "{} {} {} markers, {} chars",
        "Extracted".green().bold(),
        document.segments,
        document.kind.marker_label(),
        document.char_count()
    );
    Ok(())
}

fn cmd_prompt(
    contract: &Path,
    report: &Path,
    history: Option<PathBuf>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = read_config(config_path)?;
    Overrides {
        history,
        ..Default::default()
    }
    .apply(&mut config);

    let contract = UploadedFile::read(contract)?;
    let report = UploadedFile::read(report)?;
    let history: HistoryOutcome = load_history(&config.history_path());

    let prompt = preview_prompt(&contract, &report, &history)?;

    println!("{}", "SYSTEM".bold());
    println!("{}", prompt.system_instruction);
    println!();
    println!("{}", "USER".bold());
    println!("{}", prompt.user_content);
    Ok(())
}
