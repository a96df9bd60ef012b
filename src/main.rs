use std::borrow::Cow;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use concrete_map::config::Settings;
use concrete_map::db;
use concrete_map::geocode::{ArcGisGeocoder, CachingGeocoder};
use concrete_map::parser::extract_records;
use concrete_map::pipeline;
use concrete_map::render::{ColourTable, GeoJsonRenderer, LeafletHtmlRenderer, MapRenderer};
use concrete_map::resolve::SegmentResolver;
use concrete_map::source::{DocumentSource, HttpPdfSource, PdfFileSource, TextFileSource};

#[derive(Parser)]
#[command(name = "concrete_map", about = "Map the NYC DOT concrete repair schedule")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download, extract, geocode and render the latest schedule
    Run {
        #[command(flatten)]
        input: InputArgs,
        /// Output HTML map (default from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write the features as GeoJSON
        #[arg(long)]
        geojson: Option<PathBuf>,
        /// Records geocoded at once
        #[arg(short, long)]
        concurrency: Option<usize>,
        /// Ignore and don't update the geocode cache
        #[arg(long)]
        no_cache: bool,
    },
    /// Print the records extracted from the schedule, without geocoding
    Extract {
        #[command(flatten)]
        input: InputArgs,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Recent runs
    History {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Cache and run statistics
    Stats,
}

#[derive(clap::Args)]
struct InputArgs {
    /// Use a local PDF instead of downloading
    #[arg(long, conflicts_with = "text")]
    pdf: Option<PathBuf>,
    /// Use pre-extracted text (pages separated by form feeds)
    #[arg(long)]
    text: Option<PathBuf>,
}

impl InputArgs {
    fn source(&self, settings: &Settings) -> Result<Box<dyn DocumentSource>> {
        let source: Box<dyn DocumentSource> = match (&self.pdf, &self.text) {
            (Some(path), _) => Box::new(PdfFileSource::new(path)),
            (None, Some(path)) => Box::new(TextFileSource::new(path)),
            (None, None) => Box::new(HttpPdfSource::new(
                settings.pdf_url.clone(),
                settings.pdf_file.clone(),
                settings.download_timeout(),
            )?),
        };
        Ok(source)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load().context("Failed to load settings")?;

    let result = match cli.command {
        Commands::Run {
            input,
            output,
            geojson,
            concurrency,
            no_cache,
        } => {
            if let Some(path) = output {
                settings.output_html = path;
            }
            if geojson.is_some() {
                settings.output_geojson = geojson;
            }
            if let Some(n) = concurrency {
                settings.concurrency = n;
            }
            if no_cache {
                settings.use_cache = false;
            }
            let source = input.source(&settings)?;
            run_refresh(&settings, source.as_ref()).await
        }
        Commands::Extract { input, limit } => {
            let source = input.source(&settings)?;
            let doc = source.fetch().await?;
            let (records, stats) = extract_records(&doc);
            if records.is_empty() {
                println!("No concrete rows found.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<13} | {:<24} | {:<20} | {:<20}",
                "#", "Borough", "On Street", "From Street", "To Street"
            );
            println!("{}", "-".repeat(92));
            for (i, r) in records.iter().take(limit).enumerate() {
                println!(
                    "{:>3} | {:<13} | {:<24} | {:<20} | {:<20}",
                    i + 1,
                    r.borough.name(),
                    fit(&r.on_street, 24),
                    fit(&r.from_street, 20),
                    fit(&r.to_street, 20)
                );
            }
            println!(
                "\n{} records from {} lines ({} rejected, {} before any borough, {} other work types)",
                records.len(),
                stats.lines,
                stats.rejected,
                stats.before_borough,
                stats.not_concrete
            );
            Ok(())
        }
        Commands::History { limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let runs = db::fetch_runs(&conn, limit)?;
            if runs.is_empty() {
                println!("No runs recorded yet.");
                return Ok(());
            }

            println!(
                "{:<25} | {:<6} | {:>7} | {:>5} | {:>5} | {:>7} | {:>8}",
                "Finished", "Status", "Records", "Lines", "Point", "Dropped", "Rejected"
            );
            println!("{}", "-".repeat(84));
            for r in &runs {
                println!(
                    "{:<25} | {:<6} | {:>7} | {:>5} | {:>5} | {:>7} | {:>8}",
                    fit(&r.finished_at, 25),
                    r.status,
                    r.records,
                    r.resolved,
                    r.point_only,
                    r.dropped,
                    r.rejected
                );
                if let Some(err) = &r.error {
                    println!("    error: {}", err);
                }
            }
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Cached addresses: {}", s.cached_addresses);
            println!("Runs:             {}", s.runs);
            println!("Failed runs:      {}", s.failed_runs);
            println!("Last good run:    {}", s.last_ok.as_deref().unwrap_or("-"));
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", elapsed_label(elapsed));
    }

    result
}

async fn run_refresh(settings: &Settings, source: &dyn DocumentSource) -> Result<()> {
    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;

    let seed = if settings.use_cache {
        db::load_geocode_cache(&conn)?
    } else {
        HashMap::new()
    };
    info!("Loaded {} cached addresses", seed.len());

    let arcgis = ArcGisGeocoder::new(settings.geocoder_url.clone(), settings.geocode_timeout())
        .context("Failed to build geocoder client")?;
    let geocoder = Arc::new(CachingGeocoder::new(arcgis, seed));
    let resolver = SegmentResolver::new(Arc::clone(&geocoder))
        .with_retry(settings.retry_policy())
        .with_concurrency(settings.concurrency)
        .with_deadline(settings.run_deadline())
        .with_progress(true);

    let html = LeafletHtmlRenderer::new(settings.output_html.clone());
    let geojson = settings.output_geojson.clone().map(GeoJsonRenderer::new);
    let mut renderers: Vec<&dyn MapRenderer> = vec![&html];
    if let Some(r) = &geojson {
        renderers.push(r);
    }

    let started_at = chrono::Utc::now().to_rfc3339();
    let outcome = pipeline::refresh(source, &resolver, &renderers, &ColourTable::default()).await;

    // Successful lookups stay valid even when the run itself fails.
    if settings.use_cache {
        let fresh = geocoder.take_fresh();
        let saved = db::save_geocode_cache(&conn, &fresh)?;
        info!("Cached {} new addresses ({} cache hits)", saved, geocoder.hits());
    }

    let mut row = db::RunRow {
        started_at,
        finished_at: chrono::Utc::now().to_rfc3339(),
        records: 0,
        resolved: 0,
        point_only: 0,
        dropped: 0,
        rejected: 0,
        status: "ok".into(),
        error: None,
    };
    match &outcome {
        Ok(report) => {
            row.records = report.resolve.records;
            row.resolved = report.resolve.lines;
            row.point_only = report.resolve.points + report.resolve.end_unresolved;
            row.dropped = report.resolve.dropped;
            row.rejected = report.extract.rejected;
        }
        Err(e) => {
            row.status = "failed".into();
            row.error = Some(e.to_string());
        }
    }
    db::insert_run(&conn, &row)?;

    let report = outcome.context("Refresh failed, map not updated")?;
    println!(
        "Mapped {} segments ({} lines, {} point-only, {} unresolved) ➜ {}",
        report.segments.len(),
        report.resolve.lines,
        report.resolve.points + report.resolve.end_unresolved,
        report.resolve.dropped,
        settings.output_html.display()
    );
    Ok(())
}

/// Fit `s` into a table column of `width` characters, marking the cut.
fn fit(s: &str, width: usize) -> Cow<'_, str> {
    if s.chars().nth(width).is_none() {
        return Cow::Borrowed(s);
    }
    let cut = s
        .char_indices()
        .nth(width.saturating_sub(1))
        .map_or(0, |(i, _)| i);
    Cow::Owned(format!("{}…", &s[..cut]))
}

fn elapsed_label(d: Duration) -> String {
    let secs = d.as_secs();
    match (secs / 3600, secs % 3600 / 60, secs % 60) {
        (0, 0, _) => format!("{:.1}s", d.as_secs_f64()),
        (0, m, s) => format!("{}m {:02}s", m, s),
        (h, m, s) => format!("{}h {:02}m {:02}s", h, m, s),
    }
}
