use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use trackmatch::cancel::{CancellationToken, Completion};
use trackmatch::importer;
use trackmatch::matcher::{match_all, match_all_with};
use trackmatch::models::{
    CatalogEntry, MatchDecision, MatchStatus, MatchingOptions, Provenance, SourceRow, Strategy, Tier,
};
use trackmatch::progress::{create_progress_bar, format_duration, log_progress, set_log_only};
use trackmatch::resolve::Resolver;
use trackmatch::safety::validate_output_path;
use trackmatch::scoring::{weighted_score, ScoreWeights};
use trackmatch::search::{CatalogSearch, SearchQuery, SnapshotSearch};
use trackmatch::session::{build_session, ImportSession, SessionEnvelope};
use trackmatch::snapshot::{SnapshotPaginator, DEFAULT_PAGE_SIZE};
use trackmatch::sqlite::SqliteCatalog;

#[derive(Parser)]
#[command(name = "trackmatch")]
#[command(about = "Match a tabular track list against local and broader music catalogs")]
struct Args {
    /// Track list (comma, semicolon or tab separated, with a header row)
    input: PathBuf,

    /// Local catalog: JSON array of entries or SQLite database with a `tracks` table
    catalog: PathBuf,

    /// Broader catalog, searched only for rows the local catalog cannot place
    #[arg(long)]
    broader: Option<PathBuf>,

    /// Write the session envelope to this JSON file
    #[arg(long, short)]
    output: Option<PathBuf>,

    #[arg(long, default_value = "0.75")]
    min_score: f64,

    /// Candidates kept per row
    #[arg(long, default_value = "5")]
    limit: usize,

    /// Comma-separated strategies, tried in order
    #[arg(long, value_delimiter = ',', default_value = "exact,normalized-exact,fuzzy")]
    strategies: Vec<Strategy>,

    /// Score with weighted title/artist/album/duration similarity
    #[arg(long, conflicts_with = "broader")]
    weighted: bool,

    #[arg(long, default_value = "0")]
    workers: usize,

    /// Hide progress bars and log progress lines instead
    #[arg(long)]
    log_only: bool,

    #[arg(long, short)]
    verbose: bool,
}

/// Entries between log lines in log-only mode
const LOG_INTERVAL: u64 = 1_000;

fn is_sqlite(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("sqlite" | "sqlite3" | "db")
    )
}

/// Load a full catalog snapshot, paging through SQLite or reading a JSON array.
fn load_catalog(path: &Path, tier: Tier, cancel: &CancellationToken) -> Result<Vec<CatalogEntry>> {
    if is_sqlite(path) {
        let catalog = SqliteCatalog::open(path, tier)
            .with_context(|| format!("Failed to open catalog database {:?}", path))?;
        let total = catalog.count().context("Failed to count catalog tracks")? as u64;
        let pb = create_progress_bar(total, &format!("Loading {:?} catalog", tier));

        let completion = SnapshotPaginator::new(DEFAULT_PAGE_SIZE)
            .fetch_all(&catalog, cancel, |n| {
                pb.set_position(n as u64);
                log_progress("catalog", n as u64, total, LOG_INTERVAL);
            })
            .with_context(|| format!("Failed to read catalog {:?}", path))?;
        pb.finish_and_clear();

        return match completion {
            Completion::Finished(entries) => Ok(entries),
            Completion::Cancelled => bail!("Catalog load cancelled"),
        };
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {:?}", path))?;
    let mut entries: Vec<CatalogEntry> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse catalog {:?}", path))?;
    for entry in &mut entries {
        if entry.provenance.is_empty() {
            entry.provenance = Provenance::for_tier(tier, entry.id.clone());
        }
    }
    Ok(entries)
}

/// One tier for two-tier resolution. SQLite catalogs are queried in place;
/// JSON catalogs are loaded and searched in memory.
enum TierSearch {
    Snapshot(SnapshotSearch),
    Sqlite(SqliteCatalog),
}

impl TierSearch {
    fn open(path: &Path, tier: Tier, cancel: &CancellationToken) -> Result<Self> {
        if is_sqlite(path) {
            let catalog = SqliteCatalog::open(path, tier)
                .with_context(|| format!("Failed to open catalog database {:?}", path))?;
            info!(tier = ?tier, tracks = catalog.count()?, "searching catalog database in place");
            return Ok(TierSearch::Sqlite(catalog));
        }
        let entries = load_catalog(path, tier, cancel)?;
        info!(tier = ?tier, entries = entries.len(), "loaded catalog");
        Ok(TierSearch::Snapshot(SnapshotSearch::new(entries, tier)))
    }
}

impl CatalogSearch for TierSearch {
    type Error = rusqlite::Error;

    fn search(
        &self,
        query: &SearchQuery<'_>,
        limit: usize,
    ) -> Result<Vec<CatalogEntry>, rusqlite::Error> {
        match self {
            TierSearch::Snapshot(snapshot) => match snapshot.search(query, limit) {
                Ok(entries) => Ok(entries),
                Err(never) => match never {},
            },
            TierSearch::Sqlite(catalog) => catalog.search(query, limit),
        }
    }
}

fn resolve_tiered(
    rows: &[SourceRow],
    local: TierSearch,
    broader: TierSearch,
    options: &MatchingOptions,
    cancel: &CancellationToken,
) -> Result<Vec<MatchDecision>> {
    let resolver = Resolver::new(local, broader);
    let total = rows.len() as u64;
    let pb = create_progress_bar(total, "Resolving rows");

    let completion = resolver
        .resolve_all(rows, options, cancel, |n| {
            pb.set_position(n as u64);
            log_progress("resolve", n as u64, total, LOG_INTERVAL);
        })
        .context("Catalog search failed")?;
    pb.finish_and_clear();

    match completion {
        Completion::Finished(decisions) => Ok(decisions),
        Completion::Cancelled => bail!("Resolution cancelled"),
    }
}

fn print_summary(session: &ImportSession, elapsed: std::time::Duration) {
    let summary = &session.summary;

    println!("\n{:=<60}", "");
    println!("Import complete!");
    println!("  Rows: {}", summary.total);
    println!("  Auto-matched: {}", summary.auto_matched);
    println!("  Unmatched: {}", summary.unmatched);
    println!("  Match rate: {:.1}%", summary.match_rate());
    println!("  Elapsed: {}", format_duration(elapsed));
    println!("{:=<60}", "");

    let unmatched: Vec<(&SourceRow, &MatchDecision)> = session
        .rows
        .iter()
        .zip(&session.decisions)
        .filter(|(_, d)| d.status() == MatchStatus::Unmatched)
        .collect();
    if unmatched.is_empty() {
        return;
    }

    println!("\nUnmatched rows:");
    for (row, decision) in unmatched {
        match decision.candidates.first() {
            Some(best) => println!(
                "  line {}: {} - {} ({}; best: {} - {} @ {:.2})",
                row.line,
                row.artist,
                row.title,
                decision.rationale,
                best.entry.artist,
                best.entry.title,
                best.score
            ),
            None => println!(
                "  line {}: {} - {} ({})",
                row.line, row.artist, row.title, decision.rationale
            ),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "trackmatch=debug,info"
    } else {
        "trackmatch=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    set_log_only(args.log_only);

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let options = MatchingOptions {
        strategies: args.strategies.clone(),
        minimum_score: args.min_score,
        candidate_limit: args.limit,
    };
    options.validate()?;

    if let Some(output) = &args.output {
        let mut sources = vec![args.input.as_path(), args.catalog.as_path()];
        if let Some(broader) = &args.broader {
            sources.push(broader.as_path());
        }
        validate_output_path(output, &sources)?;
    }

    let start = Instant::now();
    let cancel = CancellationToken::new();

    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read input {:?}", args.input))?;
    let rows = importer::parse(&raw)
        .with_context(|| format!("Failed to import {:?}", args.input))?;
    info!(rows = rows.len(), "imported track list");
    if rows.is_empty() {
        warn!("input has a header but no usable rows");
    }

    let decisions = match &args.broader {
        Some(path) => {
            let local = TierSearch::open(&args.catalog, Tier::Local, &cancel)?;
            let broader = TierSearch::open(path, Tier::Broader, &cancel)?;
            resolve_tiered(&rows, local, broader, &options, &cancel)?
        }
        None => {
            let local = load_catalog(&args.catalog, Tier::Local, &cancel)?;
            info!(entries = local.len(), "loaded local catalog");
            if args.weighted {
                let weights = ScoreWeights::default();
                match_all_with(&rows, &local, &options, |row, entry| {
                    weighted_score(row, entry, &weights)
                })
            } else {
                match_all(&rows, &local, &options)
            }
        }
    };

    let session = build_session(rows, decisions, options);
    print_summary(&session, start.elapsed());

    if let Some(output) = &args.output {
        let json = SessionEnvelope::new(session).to_json()?;
        std::fs::write(output, json)
            .with_context(|| format!("Failed to write session {:?}", output))?;
        println!("Session written to {:?}", output);
    }

    Ok(())
}
