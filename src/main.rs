mod classify;
mod continuity;
mod enrich;
mod extract;
mod kb;
mod names;
mod output;
mod pdf;
mod reconcile;
mod registry;
mod roster;
mod types;

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use classify::LineKind;
use enrich::{EnrichConfig, ProfileEnricher};
use output::OutputFormat;
use types::{Layout, MergedRow, RecordRow, RosterEntry};

#[derive(Parser)]
#[command(name = "panelextract", about = "Extract and reconcile review panel lists from call PDFs")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Override pdfium library path
    #[arg(long, env = "PDFIUM_LIB_PATH", global = true)]
    pdfium_path: Option<String>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Extract panel chairs and members from one document
    Extract {
        /// PDF file, or a .txt dump of its text
        file: PathBuf,

        #[arg(long, value_enum, default_value = "auto")]
        layout: LayoutArg,

        /// Call year to stamp on records when the document doesn't state one
        #[arg(long)]
        year: Option<i32>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show the classification of every line (debug)
    Lines {
        file: PathBuf,
    },

    /// Merge documents with the roster into one long-form table
    Reconcile {
        /// Roster CSV export (Name, review_panel, year, funding_scheme)
        #[arg(long)]
        roster: PathBuf,

        /// One document per call year
        #[arg(required = true)]
        documents: Vec<PathBuf>,

        #[arg(long, value_enum, default_value = "auto")]
        layout: LayoutArg,

        /// Call year for documents that don't state one
        #[arg(long)]
        year: Option<i32>,

        /// Look up topics and affiliation for every merged name
        #[arg(long)]
        enrich: bool,

        #[command(flatten)]
        enrich_args: EnrichArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Look up topics and affiliation for a list of names
    Enrich {
        names: Vec<String>,

        /// File with one name per line
        #[arg(long)]
        names_file: Option<PathBuf>,

        #[command(flatten)]
        enrich_args: EnrichArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LayoutArg {
    Auto,
    /// "PE1 Mathematics" headers followed by "Prof." chairs
    Chairs,
    /// "Mathematics (PE1)" headers with "(Panel Chair)" entries
    Members,
}

impl LayoutArg {
    fn layout(self) -> Option<Layout> {
        match self {
            LayoutArg::Auto => None,
            LayoutArg::Chairs => Some(Layout::ChairList),
            LayoutArg::Members => Some(Layout::MemberList),
        }
    }
}

#[derive(Args)]
struct OutputArgs {
    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Write to a file instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl OutputArgs {
    fn emit<T: serde::Serialize>(&self, rows: &[T]) -> Result<()> {
        output::emit(rows, self.format, self.pretty, self.output.as_deref())
    }
}

#[derive(Args)]
struct EnrichArgs {
    /// Concurrent lookups
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Per-request timeout
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Contact address sent to OpenAlex
    #[arg(long, env = "OPENALEX_MAILTO")]
    mailto: Option<String>,

    /// Skip the profile-page fallback
    #[arg(long)]
    no_scrape: bool,
}

impl EnrichArgs {
    fn config(&self) -> EnrichConfig {
        EnrichConfig {
            workers: self.workers.max(1),
            timeout: Duration::from_secs(self.timeout_secs),
            mailto: self.mailto.clone(),
            scrape: !self.no_scrape,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let pdfium_path = cli.pdfium_path.as_deref();

    match &cli.command {
        Command::Extract { file, layout, year, output } => {
            let rows = extract_rows(pdfium_path, file, layout.layout(), *year)?;
            output.emit(&rows)
        }
        Command::Lines { file } => {
            let lines = pdf::read_document_lines(pdfium_path, file)?;
            print_line_kinds(&lines);
            Ok(())
        }
        Command::Reconcile { roster, documents, layout, year, enrich, enrich_args, output } => {
            let mut rows = reconcile_documents(pdfium_path, roster, documents, layout.layout(), *year)?;
            if *enrich {
                enrich_rows(&mut rows, &enrich_args.config());
            }
            output.emit(&rows)
        }
        Command::Enrich { names, names_file, enrich_args, output } => {
            let names = collect_names(names, names_file.as_deref())?;
            let profiles = ProfileEnricher::from_config(&enrich_args.config()).enrich_all(&names);
            output.emit(&profiles)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn extract_rows(
    pdfium_path: Option<&str>,
    file: &Path,
    layout: Option<Layout>,
    year: Option<i32>,
) -> Result<Vec<RecordRow>> {
    let lines = pdf::read_document_lines(pdfium_path, file)?;
    let extraction = extract::extract(&lines, layout);
    Ok(extraction
        .records
        .iter()
        .map(|r| {
            let mut row = RecordRow::from(r);
            row.year = row.year.or(year);
            row
        })
        .collect())
}

fn reconcile_documents(
    pdfium_path: Option<&str>,
    roster_path: &Path,
    documents: &[PathBuf],
    layout: Option<Layout>,
    year: Option<i32>,
) -> Result<Vec<MergedRow>> {
    let roster = roster::load_roster(roster_path)?;
    let texts = documents
        .iter()
        .map(|doc| Ok((doc.display().to_string(), pdf::read_document_lines(pdfium_path, doc)?)))
        .collect::<Result<Vec<_>>>()?;
    merge_documents(&texts, &roster, layout, year)
}

/// Reconcile each document's lines against the roster, then mark continuity
/// across all of them.
fn merge_documents(
    documents: &[(String, Vec<String>)],
    roster: &[RosterEntry],
    layout: Option<Layout>,
    year: Option<i32>,
) -> Result<Vec<MergedRow>> {
    let mut rows = Vec::new();
    for (doc, lines) in documents {
        let extraction = extract::extract(lines, layout);
        let Some(call_year) = extraction.metadata.call_year.or(year) else {
            bail!("No call year found in {doc}; pass --year");
        };
        let merged = reconcile::reconcile(&extraction.records, roster, call_year)
            .with_context(|| format!("Failed to reconcile {doc}"))?;
        info!(document = doc.as_str(), year = call_year, rows = merged.len(), "document merged");
        rows.extend(merged);
    }

    rows.sort();
    rows.dedup();
    continuity::mark_continuous_members(&mut rows, continuity::DEFAULT_RUN_LEN);
    Ok(rows)
}

fn enrich_rows(rows: &mut [MergedRow], config: &EnrichConfig) {
    let names: Vec<String> = rows
        .iter()
        .map(|r| r.name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let profiles = ProfileEnricher::from_config(config).enrich_all(&names);
    let by_name: HashMap<&str, &types::EnrichedProfile> =
        profiles.iter().map(|p| (p.name.as_str(), p)).collect();

    for row in rows.iter_mut() {
        if let Some(profile) = by_name.get(row.name.as_str()) {
            row.topics = profile.topics.clone();
            row.affiliation = profile.affiliation.clone();
        }
    }
}

fn collect_names(args: &[String], file: Option<&Path>) -> Result<Vec<String>> {
    let mut names: Vec<String> = args.iter().map(|n| n.trim().to_string()).collect();
    if let Some(path) = file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read names file: {}", path.display()))?;
        names.extend(pdf::split_lines(&text));
    }
    names.retain(|n| !n.is_empty());
    if names.is_empty() {
        bail!("No names given; pass names as arguments or --names-file");
    }
    Ok(names)
}

fn print_line_kinds(lines: &[String]) {
    let trimmed: Vec<&str> = lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()).collect();
    println!("layout: {:?}", extract::detect_layout(&trimmed));
    for (idx, line) in trimmed.iter().enumerate() {
        let kind = classify::classify_line(line);
        let preview: String = line.chars().take(80).collect();
        println!("{idx:>4} [{:<18}] | {preview}", kind_label(&kind));
    }
}

fn kind_label(kind: &LineKind) -> String {
    match kind {
        LineKind::DomainHeader(d) => format!("domain {}", d.as_str()),
        LineKind::PanelHeader(headings) => {
            let codes: Vec<&str> = headings.iter().map(|h| h.code.as_str()).collect();
            format!("panel {}", codes.join(","))
        }
        LineKind::Metadata(_) => "metadata".to_string(),
        LineKind::Noise => "noise".to_string(),
        LineKind::Chair(_, marker) => format!("chair {marker:?}").to_lowercase(),
        LineKind::Member(_) => "member".to_string(),
    }
}
