use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use valsuite_core::adapters::providers::{build_generator, GenerationSettings, ProviderKind};
use valsuite_core::config::SuiteConfig;
use valsuite_core::determinism::run_id::now_rfc3339_utc;
use valsuite_core::export::workbook::{
    write_bundle, write_deliverables, write_workbook, WorkbookExport,
};
use valsuite_core::ingest::pdf::{extract_pdf_text, urs_from_text, UrsDocument};
use valsuite_core::session::cycle::run_generation;
use valsuite_core::session::state::AppState;
use valsuite_core::suite::script::generate_validation_script;
use valsuite_core::suite::workflow::{
    generate_suite_artifacts, SectionOutcome, SuiteArtifacts, SuiteRequest,
};

const WORKBOOK_NAME: &str = "validation_suite.xlsx";
const BUNDLE_NAME: &str = "validation_suite_bundle.zip";
const AUDIT_LOG_NAME: &str = "audit_log.ndjson";
const COMPLETION_NAME: &str = "completion.txt";

#[derive(Parser, Debug)]
#[command(name = "valsuite", version, about = "FRS / OQ / RTM validation suite generator")]
struct Cli {
    /// TOML configuration; defaults apply when omitted.
    #[arg(long, global = true, env = "VALSUITE_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate the suite from a URS document with the configured provider.
    Generate {
        /// URS as PDF, or plain text.
        #[arg(long)]
        urs: PathBuf,
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "out")]
        out: PathBuf,
    },
    /// Re-parse a saved completion without calling a provider.
    Parse {
        #[arg(long)]
        completion: PathBuf,
        #[arg(long, default_value = "out")]
        out: PathBuf,
    },
    /// Two-stage validation script for a single requirement.
    Script {
        #[arg(long)]
        requirement: String,
        /// Provider for the formatting stage; the configured provider when unset.
        #[arg(long, value_parser = parse_provider)]
        formatter: Option<ProviderKind>,
    },
}

fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();
    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn parse_provider(s: &str) -> std::result::Result<ProviderKind, String> {
    serde_json::from_value(serde_json::Value::String(s.to_ascii_lowercase()))
        .map_err(|_| format!("unknown provider '{s}' (groq, gemini, openai, ollama)"))
}

fn run(cli: Cli) -> Result<()> {
    let cfg = SuiteConfig::load_or_default(cli.config.as_deref())?;
    match cli.command {
        Commands::Generate { urs, user, out } => generate(&cfg, &urs, &user, &out),
        Commands::Parse { completion, out } => parse(&cfg, &completion, &out),
        Commands::Script {
            requirement,
            formatter,
        } => script(&cfg, &requirement, formatter),
    }
}

fn generate(cfg: &SuiteConfig, urs_path: &Path, user: &str, out: &Path) -> Result<()> {
    let state = AppState::new().login(user, &now_rfc3339_utc())?;
    let doc = read_urs(urs_path)?;
    let state = state.record_ingest(&doc, &now_rfc3339_utc())?;

    let generator = build_generator(&cfg.generation)?;
    let outcome = run_generation(&state, generator.as_ref(), &doc, cfg)?;
    let mut state = outcome.state;
    std::fs::create_dir_all(out)?;

    match outcome.result {
        Ok(artifacts) => {
            if let Some(completion) = &state.last_analysis {
                std::fs::write(out.join(COMPLETION_NAME), completion)?;
            }
            let workbook = export(&artifacts, out)?;
            if let Some(w) = workbook {
                state = state.record_export(
                    &w.path.display().to_string(),
                    &w.sha256,
                    &w.sheets,
                    &now_rfc3339_utc(),
                )?;
            }
            state.audit.write_ndjson(out.join(AUDIT_LOG_NAME))?;
            print_summary(&artifacts);
            Ok(())
        }
        Err(err) => {
            state.audit.write_ndjson(out.join(AUDIT_LOG_NAME))?;
            bail!("generation failed: {err}")
        }
    }
}

fn parse(cfg: &SuiteConfig, completion_path: &Path, out: &Path) -> Result<()> {
    let completion = std::fs::read_to_string(completion_path)
        .with_context(|| format!("reading {}", completion_path.display()))?;
    let artifacts = generate_suite_artifacts(&SuiteRequest {
        project_name: cfg.project_name.clone(),
        completion,
        normalize: cfg.normalize.clone(),
        test_id_column: cfg.coverage.test_id_column.clone(),
    })?;
    export(&artifacts, out)?;
    print_summary(&artifacts);
    Ok(())
}

fn script(cfg: &SuiteConfig, requirement: &str, formatter: Option<ProviderKind>) -> Result<()> {
    let brainstorm = build_generator(&cfg.generation)?;
    let formatter = match formatter {
        Some(kind) => build_generator(&GenerationSettings::for_provider(kind))?,
        None => build_generator(&cfg.generation)?,
    };
    let script = generate_validation_script(brainstorm.as_ref(), formatter.as_ref(), requirement)?;
    println!("{}", script.script_markdown);
    if let Err(reason) = &script.table {
        warn!(%reason, "formatted script has no table");
    }
    Ok(())
}

fn read_urs(path: &Path) -> Result<UrsDocument> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "urs".to_string());
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let is_pdf = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    let doc = if is_pdf {
        extract_pdf_text(&name, &bytes)?
    } else {
        let text = String::from_utf8(bytes).context("URS text is not UTF-8")?;
        urs_from_text(&name, &text)?
    };
    info!(source = %doc.source_name, pages = doc.page_count, "URS ingested");
    Ok(doc)
}

/// Deliverables, the hashed bundle, and the workbook when any section produced a table.
fn export(artifacts: &SuiteArtifacts, out: &Path) -> Result<Option<WorkbookExport>> {
    let written = write_deliverables(artifacts, out)?;
    info!(files = written.len(), out = %out.display(), "deliverables written");
    let bundle_sha = write_bundle(artifacts, &out.join(BUNDLE_NAME))?;
    println!("bundle_sha256={}", bundle_sha);
    if artifacts.sheets().is_empty() {
        warn!("no tables found; workbook skipped");
        return Ok(None);
    }
    Ok(Some(write_workbook(artifacts, &out.join(WORKBOOK_NAME))?))
}

fn print_summary(artifacts: &SuiteArtifacts) {
    println!("generation_id={}", artifacts.generation_id);
    for section in &artifacts.sections {
        let status = match &section.outcome {
            SectionOutcome::Table { table, .. } => format!("{} rows", table.row_count()),
            SectionOutcome::TableAbsent { reason, .. } => format!("no table ({reason})"),
            SectionOutcome::SectionAbsent => "absent".to_string(),
        };
        println!("{:<4} {}", section.kind.sheet_name(), status);
    }
    match artifacts.coverage.and_then(|c| c.percentage.map(|p| (p, c.gap_count))) {
        Some((pct, gaps)) => println!("coverage={}% gaps={}", pct, gaps),
        None => println!("coverage=n/a"),
    }
}
