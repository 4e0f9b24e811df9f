//! Ashlander CLI - Command-line tool for Morrowind ESM/ESP files.
//!
//! This is the main entry point for the Ashlander command-line application.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use regex::RegexBuilder;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use ashlander::esm::{write_to, DispatchTable, RecordKind};
use ashlander::prelude::*;

/// Ashlander - Morrowind data file tool
#[derive(Parser)]
#[command(name = "ashlander")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// More log output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the file header, masters and record counts
    Info {
        /// ESM/ESP file
        file: PathBuf,

        /// Load only the records script compilation needs
        #[arg(long)]
        scripts_only: bool,
    },

    /// List NPCs and creatures with their AI packages
    Actors {
        /// ESM/ESP file
        file: PathBuf,

        /// Only actors whose ID or name matches this pattern (regex)
        #[arg(short, long)]
        filter: Option<String>,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load and re-save a file, then compare the bytes
    Roundtrip {
        /// ESM/ESP file
        file: PathBuf,

        /// Also write the re-saved file here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load several files in order and save the merged result
    Merge {
        /// Files to merge, later ones override earlier ones
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file
        #[arg(short, long, env = "ASHLANDER_OUTPUT")]
        output: PathBuf,

        /// Load only the records script compilation needs
        #[arg(long)]
        scripts_only: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Info { file, scripts_only } => {
            cmd_info(&file, scripts_only)?;
        }
        Commands::Actors { file, filter, json } => {
            cmd_actors(&file, filter.as_deref(), json)?;
        }
        Commands::Roundtrip { file, output } => {
            cmd_roundtrip(&file, output.as_deref())?;
        }
        Commands::Merge {
            files,
            output,
            scripts_only,
        } => {
            cmd_merge(&files, &output, scripts_only)?;
        }
    }

    Ok(())
}

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn router_for(scripts_only: bool) -> Box<dyn Router> {
    if scripts_only {
        Box::new(ScriptRouter::new())
    } else {
        Box::new(FullRouter::new())
    }
}

fn load(path: &Path, registry: &mut Registry, router: &mut dyn Router) -> Result<LoadReport> {
    let report = load_file_with(path, registry, router)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    for failure in &report.failures {
        warn!(
            "{}: {} record at {:#x} skipped: {}",
            path.display(),
            failure.tag,
            failure.offset,
            failure.error
        );
    }
    Ok(report)
}

fn cmd_info(file: &Path, scripts_only: bool) -> Result<()> {
    let start = Instant::now();
    let mut registry = Registry::new();
    let report = load(file, &mut registry, router_for(scripts_only).as_mut())?;

    println!("File: {}", file.display());
    if let Some(header) = &registry.header {
        println!("Version: {}", header.version);
        println!(
            "Type: {}",
            if header.is_master() { "master" } else { "plugin" }
        );
        if !header.author.is_empty() {
            println!("Author: {}", header.author);
        }
        if !header.description.is_empty() {
            println!("Description: {}", header.description);
        }
        println!("Declared records: {}", header.record_count);
        for master in &header.masters {
            println!("Master: {} ({} bytes)", master.name, master.size);
        }
    }

    println!("\nRecords:");
    for (tag, count) in registry.store_counts() {
        let kind = match DispatchTable::kind(tag) {
            Some(RecordKind::Npc | RecordKind::Creature) => "typed",
            _ => "raw",
        };
        println!("  {}  {:>7}  ({})", tag, count, kind);
    }
    println!(
        "\nTotal: {} loaded, {} skipped, {} failed in {:?}",
        registry.total_records(),
        report.skipped,
        report.failures.len(),
        start.elapsed()
    );

    Ok(())
}

fn cmd_actors(file: &Path, filter: Option<&str>, json: bool) -> Result<()> {
    let pattern = filter
        .map(|f| RegexBuilder::new(f).case_insensitive(true).build())
        .transpose()
        .context("Invalid filter pattern")?;
    let wanted = |id: &str, name: &str| {
        pattern
            .as_ref()
            .map_or(true, |re| re.is_match(id) || re.is_match(name))
    };

    let mut registry = Registry::new();
    load(file, &mut registry, &mut ScriptRouter::new())?;

    let npcs: Vec<&NpcRecord> = registry
        .npcs
        .iter()
        .filter(|npc| wanted(&npc.record_id, npc.name.as_deref().unwrap_or_default()))
        .collect();
    let creatures: Vec<&CreatureRecord> = registry
        .creatures
        .iter()
        .filter(|crea| wanted(&crea.record_id, &crea.name))
        .collect();

    if json {
        let mut value = serde_json::Map::new();
        value.insert("npcs".into(), serde_json::to_value(&npcs)?);
        value.insert("creatures".into(), serde_json::to_value(&creatures)?);
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for npc in &npcs {
        println!(
            "NPC_ {} \"{}\" level {} {} {}",
            npc.record_id,
            npc.name.as_deref().unwrap_or_default(),
            npc.stats.level(),
            npc.race,
            npc.class
        );
        print_actor(&npc.actor);
    }
    for crea in &creatures {
        println!(
            "CREA {} \"{}\" level {}",
            crea.record_id, crea.name, crea.stats.level
        );
        print_actor(&crea.actor);
    }
    println!("\nTotal: {} NPCs, {} creatures", npcs.len(), creatures.len());

    Ok(())
}

fn print_actor(actor: &ActorCore) {
    if !actor.items.is_empty() || !actor.spells.is_empty() {
        println!(
            "  {} items, {} spells",
            actor.items.len(),
            actor.spells.len()
        );
    }
    if let Some(ai) = &actor.ai_data {
        println!(
            "  AI: hello {} fight {} flee {} alarm {} services {:#x}",
            ai.hello, ai.fight, ai.flee, ai.alarm, ai.flags
        );
    }
    for package in &actor.ai_packages {
        match package {
            AiPackage::Escort(p) | AiPackage::Follow(p) if p.cell_name.is_some() => {
                let cell = p.cell_name.as_deref().unwrap_or_default();
                println!("  {} {} in {}", package.kind(), p.target_id, cell)
            }
            AiPackage::Escort(p) | AiPackage::Follow(p) => {
                println!("  {} {}", package.kind(), p.target_id)
            }
            AiPackage::Activate(p) => println!("  {} {}", package.kind(), p.target_id),
            AiPackage::Travel(p) => println!(
                "  {} to ({:.0}, {:.0}, {:.0})",
                package.kind(),
                p.position[0],
                p.position[1],
                p.position[2]
            ),
            AiPackage::Wander(p) => println!(
                "  {} distance {} duration {}",
                package.kind(),
                p.distance,
                p.duration
            ),
        }
    }
    for destination in &actor.destinations {
        let cell = match destination.cell_name.as_deref() {
            Some(cell) if !cell.is_empty() => cell,
            _ => "(exterior)",
        };
        println!("  travel to {}", cell);
    }
}

fn cmd_roundtrip(file: &Path, output: Option<&Path>) -> Result<()> {
    let original = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let mut registry = Registry::new();
    let report = Loader::default()
        .load(&original, &mut registry, &mut FullRouter::new())
        .with_context(|| format!("Failed to parse {}", file.display()))?;
    if !report.failures.is_empty() {
        warn!("{} records failed to parse and will be missing", report.failures.len());
    }

    let mut rewritten = Vec::with_capacity(original.len());
    write_to(&mut rewritten, &registry).context("Failed to serialize records")?;

    if let Some(output) = output {
        fs::write(output, &rewritten)
            .with_context(|| format!("Failed to write {}", output.display()))?;
    }

    match first_difference(&original, &rewritten) {
        None => {
            println!("Identical: {} bytes, {} records", original.len(), report.records);
            Ok(())
        }
        Some(offset) => {
            println!(
                "Different: original {} bytes, rewritten {} bytes",
                original.len(),
                rewritten.len()
            );
            bail!("first difference at offset {:#x}", offset)
        }
    }
}

fn first_difference(a: &[u8], b: &[u8]) -> Option<usize> {
    a.iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then_some(a.len().min(b.len())))
}

fn cmd_merge(files: &[PathBuf], output: &Path, scripts_only: bool) -> Result<()> {
    let start = Instant::now();
    let mut registry = Registry::new();
    let mut router = router_for(scripts_only);

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    for file in files {
        pb.set_message(file.display().to_string());
        let report = load(file, &mut registry, router.as_mut())?;
        pb.println(format!(
            "{}: {} inserted, {} unchanged, {} updated, {} skipped, {} failed",
            file.display(),
            report.inserted,
            report.unchanged,
            report.updated,
            report.skipped,
            report.failures.len()
        ));
        pb.inc(1);
    }
    pb.finish_with_message("Done");

    save_file(output, &registry)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "Merged {} records into {} in {:?}",
        registry.total_records(),
        output.display(),
        start.elapsed()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_difference() {
        assert_eq!(first_difference(b"abc", b"abc"), None);
        assert_eq!(first_difference(b"abc", b"abd"), Some(2));
        assert_eq!(first_difference(b"abc", b"ab"), Some(2));
        assert_eq!(first_difference(b"", b"x"), Some(0));
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::parse_from(["ashlander", "-v", "merge", "a.esm", "b.esp", "-o", "out.esp"]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Merge { files, output, .. } => {
                assert_eq!(files.len(), 2);
                assert_eq!(output, PathBuf::from("out.esp"));
            }
            _ => panic!("expected merge"),
        }
    }
}
