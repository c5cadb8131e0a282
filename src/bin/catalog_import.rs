//! catalog-import: bulk import and regex bulk edit against the catalog admin API.
//!
//! Usage:
//!   catalog-import import <file> [--kind video|game] [--dry-run] [--retry]
//!   catalog-import urls <file> [--kind video|game] [--dry-run]
//!   catalog-import regex --field F --pattern P --ids a,b,c [--replacement R] [--flags g] [--kind game] [--apply]

use anyhow::{bail, Context};
use async_trait::async_trait;
use catalog_ingest::aggregate::retry_failed;
use catalog_ingest::batch::{ChunkScheduler, JobReport};
use catalog_ingest::config::IngestConfig;
use catalog_ingest::gateway::{BatchGateway, HttpGateway, MemoryGateway};
use catalog_ingest::progress::{ProgressEvent, ProgressSink};
use catalog_ingest::regex_edit::RegexBulkEditor;
use catalog_ingest::source::{parse_file, parse_url_list, rows_to_batch};
use catalog_ingest::types::{ContentKind, ItemResult, ParsedBatch};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let rest = &args[2..];
    let failed = match args[1].as_str() {
        "import" => cmd_import(rest).await?,
        "urls" => cmd_urls(rest).await?,
        "regex" => cmd_regex(rest).await?,
        "version" | "--version" | "-V" => {
            println!("catalog-import {}", env!("CARGO_PKG_VERSION"));
            0
        }
        "help" | "--help" | "-h" => {
            print_usage();
            0
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if failed > 0 {
        std::process::exit(2);
    }
    Ok(())
}

fn print_usage() {
    println!(
        r#"catalog-import: bulk catalog import and regex bulk edit

USAGE:
    catalog-import <COMMAND> [OPTIONS]

COMMANDS:
    import <file>               Import a JSON or labeled-text source file
    urls <file>                 Import one URL per line, titles derived from URLs
    regex                       Preview (and with --apply, apply) a regex field rewrite
    version                     Show version information
    help                        Show this help message

OPTIONS:
    --kind <video|game>         Record kind (default: video; regex default: game)
    --dry-run                   Run against an in-memory gateway instead of the API
    --retry                     Retry failed items once after the import
    --field <name>              regex: field to rewrite (e.g. coverUrl)
    --pattern <re>              regex: pattern
    --replacement <text>        regex: replacement, may use $1, $&, $<name>
    --flags <flags>             regex: flags (default: g)
    --ids <a,b,c>               regex: selected record ids
    --apply                     regex: apply after showing the preview

ENVIRONMENT:
    CATALOG_BASE_URL            Admin API root
    CATALOG_API_TOKEN           Bearer token
    CATALOG_CHUNK_SIZE          Items per flat-import unit (default 100)
    CATALOG_GROUP_CONCURRENCY   Workers for grouped imports (default 3)
    RUST_LOG                    Log filter (default info)"#
    );
}

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

fn positional(args: &[String]) -> Option<&str> {
    args.first().filter(|a| !a.starts_with("--")).map(String::as_str)
}

fn kind_arg(args: &[String], default: ContentKind) -> anyhow::Result<ContentKind> {
    match flag_value(args, "--kind") {
        Some(k) => k.parse::<ContentKind>().map_err(anyhow::Error::msg),
        None => Ok(default),
    }
}

fn gateway(config: &IngestConfig, dry_run: bool) -> anyhow::Result<Arc<dyn BatchGateway>> {
    if dry_run {
        return Ok(Arc::new(MemoryGateway::new()));
    }
    let gw = HttpGateway::new(config).context("set CATALOG_BASE_URL or pass --dry-run")?;
    Ok(Arc::new(gw))
}

/// Prints one line per resolved unit.
struct ConsoleProgressSink;

#[async_trait]
impl ProgressSink for ConsoleProgressSink {
    async fn report(&self, event: ProgressEvent) -> catalog_ingest::Result<()> {
        if let ProgressEvent::UnitCompleted {
            progress, results, ..
        } = event
        {
            let failed = results.iter().filter(|r| r.is_failure()).count();
            eprintln!(
                "[{}/{}] {} ok, {} failed",
                progress.current,
                progress.total,
                results.len() - failed,
                failed
            );
        }
        Ok(())
    }
}

fn print_failures<'a>(failed: impl Iterator<Item = &'a ItemResult>) {
    for r in failed {
        println!("  FAILED  {}: {}", r.title, r.error.as_deref().unwrap_or("unknown error"));
    }
}

fn print_report(report: &JobReport) {
    let s = report.summary;
    println!(
        "job {}: {} created, {} merged, {} updated, {} failed ({} ms){}",
        report.job_id,
        s.created,
        s.merged,
        s.updated,
        s.failed,
        report.duration.as_millis(),
        if report.cancelled { " [cancelled]" } else { "" }
    );
    print_failures(report.failed());
}

async fn run_batch(batch: ParsedBatch, args: &[String]) -> anyhow::Result<usize> {
    let config = IngestConfig::from_env();
    let scheduler = ChunkScheduler::new(gateway(&config, has_flag(args, "--dry-run"))?, &config)
        .with_sink(Arc::new(ConsoleProgressSink));

    println!(
        "{} items in {} group(s){}",
        batch.total_items,
        batch.groups.len(),
        if batch.is_grouped() { ", grouped" } else { "" }
    );
    let report = scheduler.run(&batch).await;
    print_report(&report);

    if has_flag(args, "--retry") && report.summary.fail() > 0 {
        let retried = retry_failed(&scheduler, &batch, &report.results).await;
        println!(
            "retry of {} item(s): {} succeeded, {} still failing",
            retried.resubmitted,
            retried.summary.success(),
            retried.summary.fail()
        );
        print_failures(retried.failed());
        return Ok(retried.summary.fail());
    }
    Ok(report.summary.fail())
}

async fn cmd_import(args: &[String]) -> anyhow::Result<usize> {
    let Some(path) = positional(args) else {
        bail!("import requires a source file");
    };
    let kind = kind_arg(args, ContentKind::Video)?;
    let batch = parse_file(path, kind).with_context(|| format!("cannot import {path}"))?;
    run_batch(batch, args).await
}

async fn cmd_urls(args: &[String]) -> anyhow::Result<usize> {
    let Some(path) = positional(args) else {
        bail!("urls requires a file with one URL per line");
    };
    let kind = kind_arg(args, ContentKind::Video)?;
    let text = std::fs::read_to_string(path).with_context(|| format!("cannot read {path}"))?;
    let batch = rows_to_batch(parse_url_list(&text), kind);
    if batch.is_empty() {
        bail!("{path} contains no URLs");
    }
    run_batch(batch, args).await
}

async fn cmd_regex(args: &[String]) -> anyhow::Result<usize> {
    let config = IngestConfig::from_env();
    let kind = kind_arg(args, ContentKind::Game)?;
    let field = flag_value(args, "--field").context("--field is required")?;
    let pattern = flag_value(args, "--pattern").context("--pattern is required")?;
    let selection: Vec<String> = flag_value(args, "--ids")
        .context("--ids is required")?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    let gw = gateway(&config, false)?;
    let mut editor = RegexBulkEditor::new(kind, field).with_size_limit(config.regex_size_limit);
    editor.set_pattern(pattern)?;
    editor.set_replacement(flag_value(args, "--replacement").unwrap_or(""))?;
    if let Some(flags) = flag_value(args, "--flags") {
        editor.set_flags(flags)?;
    }

    let preview = editor.preview(gw.as_ref(), &selection).await?;
    for entry in &preview.previews {
        println!("{} {}\n  - {}\n  + {}", entry.id, entry.title, entry.before, entry.after);
    }
    println!(
        "{} of {} selected record(s) match",
        preview.stats.total_matched, preview.stats.total_selected
    );

    if has_flag(args, "--apply") {
        if preview.stats.total_matched == 0 {
            println!("nothing to apply");
            return Ok(0);
        }
        let applied = editor.apply(gw.as_ref(), &selection).await?;
        println!("updated {} record(s)", applied.count);
    }
    Ok(0)
}
