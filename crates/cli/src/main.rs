mod report;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use upkeep_codegen::{emit_artifacts, Artifact};
use upkeep_core::classify::{classify, Classification};
use upkeep_core::policy::Policy;
use upkeep_core::source::{parse_source, FileSystemProvider, ParsedFile, ParsedSource};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Upkeep tracking hook generator for brace-delimited game script.
#[derive(Parser)]
#[command(
    name = "upkeep",
    version,
    about = "Upkeep tracking hook generator for game script"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log per-entity decisions (overrides RUST_LOG)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Source selection shared by the classifying subcommands.
#[derive(clap::Args)]
struct SourceArgs {
    /// Template files or directories
    #[arg(long, required = true, num_args = 1..)]
    templates: Vec<PathBuf>,
    /// Subject files or directories
    #[arg(long, required = true, num_args = 1..)]
    subjects: Vec<PathBuf>,
    /// Policy TOML file (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify sources and write every generated artifact
    Generate {
        #[command(flatten)]
        sources: SourceArgs,
        /// Directory the artifacts are written to
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Classify sources and print the run summary
    Classify {
        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Parse a script file and print its document as JSON
    Parse {
        /// Path to the script file
        file: PathBuf,
    },

    /// Print the raw text of a top-level declaration
    Locate {
        /// Path to the script file
        file: PathBuf,
        /// Declaration name
        name: String,
    },

    /// Print the effective policy as TOML
    Policy {
        /// Policy TOML file to load instead of the defaults
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Generate { sources, out } => {
            cmd_generate(&sources, &out, cli.output, cli.quiet);
        }
        Commands::Classify { sources } => {
            cmd_classify(&sources, cli.output, cli.quiet);
        }
        Commands::Parse { file } => {
            cmd_parse(&file, cli.output, cli.quiet);
        }
        Commands::Locate { file, name } => {
            cmd_locate(&file, &name, cli.output, cli.quiet);
        }
        Commands::Policy { config } => {
            cmd_policy(config.as_deref(), cli.output, cli.quiet);
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_policy(config: Option<&Path>, output: OutputFormat, quiet: bool) -> Policy {
    let Some(path) = config else {
        return Policy::default();
    };
    match Policy::load(path) {
        Ok(policy) => policy,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    }
}

fn load_sources(
    paths: &[PathBuf],
    policy: &Policy,
    output: OutputFormat,
    quiet: bool,
) -> ParsedSource {
    match parse_source(paths, &FileSystemProvider, &policy.sources) {
        Ok(parsed) => parsed,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    }
}

fn classify_sources(
    args: &SourceArgs,
    output: OutputFormat,
    quiet: bool,
) -> (Policy, ParsedSource, Classification) {
    let policy = load_policy(args.config.as_deref(), output, quiet);
    let templates = load_sources(&args.templates, &policy, output, quiet);
    let subjects = load_sources(&args.subjects, &policy, output, quiet);
    let classification = classify(&templates, &subjects, &policy);
    (policy, subjects, classification)
}

fn cmd_generate(args: &SourceArgs, out: &Path, output: OutputFormat, quiet: bool) {
    let (policy, subjects, classification) = classify_sources(args, output, quiet);

    let artifacts = match emit_artifacts(&classification, &subjects, &policy) {
        Ok(a) => a,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };

    if let Err(e) = std::fs::create_dir_all(out) {
        let msg = format!("error creating '{}': {}", out.display(), e);
        report_error(&msg, output, quiet);
        process::exit(1);
    }
    let mut written = Vec::new();
    for artifact in &artifacts {
        match write_artifact(out, artifact) {
            Ok(path) => written.push(path),
            Err(msg) => {
                report_error(&msg, output, quiet);
                process::exit(1);
            }
        }
    }

    let summary = classification.summary();
    match output {
        OutputFormat::Json => {
            let files: Vec<String> = written.iter().map(|p| p.display().to_string()).collect();
            let value = serde_json::json!({
                "summary": summary,
                "files": files,
            });
            let pretty = serde_json::to_string_pretty(&value)
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
        OutputFormat::Text => {
            if !quiet {
                for path in &written {
                    println!("Wrote {}", path.display());
                }
                println!();
                println!("{}", report::summary_text(&summary));
            }
        }
    }
}

fn write_artifact(out: &Path, artifact: &Artifact) -> Result<PathBuf, String> {
    let path = out.join(&artifact.file_name);
    std::fs::write(&path, artifact.bytes())
        .map_err(|e| format!("error writing '{}': {}", path.display(), e))?;
    tracing::info!(file = %path.display(), kind = artifact.kind.id(), "wrote artifact");
    Ok(path)
}

fn cmd_classify(args: &SourceArgs, output: OutputFormat, quiet: bool) {
    let (_, _, classification) = classify_sources(args, output, quiet);
    let summary = classification.summary();
    match output {
        OutputFormat::Json => {
            let pretty = serde_json::to_string_pretty(&summary)
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
        OutputFormat::Text => {
            if !quiet {
                println!("{}", report::summary_text(&summary));
            }
        }
    }
}

fn read_script(file: &Path, output: OutputFormat, quiet: bool) -> ParsedFile {
    match std::fs::read_to_string(file) {
        Ok(text) => ParsedFile::parse(file.display().to_string(), &text),
        Err(e) => {
            let msg = format!("error reading file '{}': {}", file.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn cmd_parse(file: &Path, output: OutputFormat, quiet: bool) {
    let parsed = read_script(file, output, quiet);
    if output == OutputFormat::Text && !quiet {
        for anomaly in &parsed.anomalies {
            eprintln!("anomaly: {:?}", anomaly);
        }
    }
    let value = serde_json::json!({
        "document": parsed.document,
        "anomalies": parsed.anomalies,
    });
    let pretty = serde_json::to_string_pretty(&value)
        .unwrap_or_else(|e| format!("serialization error: {}", e));
    println!("{}", pretty);
}

fn cmd_locate(file: &Path, name: &str, output: OutputFormat, quiet: bool) {
    let parsed = read_script(file, output, quiet);
    let span = match upkeep_core::locate_block(&parsed.text, name) {
        Ok(span) => span,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };
    match output {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "name": name,
                "start": span.start,
                "end": span.end,
                "text": span.slice(&parsed.text),
            });
            let pretty = serde_json::to_string_pretty(&value)
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
        OutputFormat::Text => println!("{}", span.slice(&parsed.text)),
    }
}

fn cmd_policy(config: Option<&Path>, output: OutputFormat, quiet: bool) {
    let policy = load_policy(config, output, quiet);
    let rendered = match output {
        OutputFormat::Json => serde_json::to_string_pretty(&policy).map_err(|e| e.to_string()),
        OutputFormat::Text => toml::to_string_pretty(&policy).map_err(|e| e.to_string()),
    };
    match rendered {
        Ok(text) => println!("{}", text),
        Err(e) => {
            report_error(&format!("serialization error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{{\"error\": \"{}\"}}", msg.replace('"', "\\\""));
        }
    }
}
