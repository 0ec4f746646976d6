use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use capmerge::capture::FormatRegistry;
use capmerge::merge::{DedupMode, MergeConfig, MergeEvent, MergeOutcome, MergeProcessor};
use capmerge::utils::{self, format_bytes};

#[derive(Parser)]
#[command(name = "capmerge")]
#[command(about = "🧵 capmerge - Merge capture files chronologically or end to end")]
#[command(version)]
struct Args {
    #[arg(help = "Input capture files", required_unless_present = "list_formats")]
    inputs: Vec<PathBuf>,

    #[arg(short = 'w', long, help = "Output capture file", required_unless_present = "list_formats")]
    output: Option<PathBuf>,

    #[arg(short, long, help = "Concatenate inputs instead of merging by timestamp")]
    append: bool,

    #[arg(short, long, help = "Truncate records to this many bytes (0 = unlimited)")]
    snaplen: Option<u32>,

    #[arg(short = 'F', long, help = "Output file format")]
    format: Option<String>,

    #[arg(short = 'I', long, value_enum, help = "How to merge interface descriptors")]
    idb_merge: Option<DedupMode>,

    #[arg(short, long, help = "Configuration file (created with defaults if missing)")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Verbose output")]
    verbose: bool,

    #[arg(long, help = "List the available output formats and exit")]
    list_formats: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let registry = FormatRegistry::with_builtin_formats();

    if args.list_formats {
        println!("Available output formats:");
        for name in registry.names() {
            println!("  {}", name);
        }
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) if path.exists() => MergeConfig::from_file(path)?,
        Some(path) => {
            println!("📄 Config file not found, creating default: {}", path.display());
            let default_config = MergeConfig::default();
            default_config.to_file(path)?;
            default_config
        }
        None => MergeConfig::default(),
    };

    if args.append {
        config.do_append = true;
    }
    if let Some(snaplen) = args.snaplen {
        config.snaplen = snaplen;
    }
    if let Some(format) = args.format {
        config.output_format = format;
    }
    if let Some(mode) = args.idb_merge {
        config.dedup_mode = mode;
    }
    if args.verbose {
        config.verbose = true;
    }
    config.validate()?;

    utils::setup_logging(if config.verbose { "verbose" } else { "normal" })?;

    let output = args
        .output
        .ok_or_else(|| anyhow::anyhow!("An output file must be given with -w"))?;
    let inputs = args.inputs;

    println!("🧵 capmerge");
    println!("🔍 Inputs: {} files", inputs.len());
    println!("📝 Output: {} ({})", output.display(), config.output_format);
    if config.do_append {
        println!("📎 Mode: append");
    } else {
        println!("🕒 Mode: chronological");
    }

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_clone = shutdown_flag.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n🛑 Shutdown signal received. Stopping merge...");
            shutdown_flag_clone.store(true, std::sync::atomic::Ordering::Relaxed);
        }
    });

    let verbose = config.verbose;
    let start_time = Instant::now();

    let mut processor = MergeProcessor::new(config, registry)?
        .with_shutdown_signal(shutdown_flag)
        .with_progress(move |event, files| {
            if verbose {
                match event {
                    MergeEvent::InputsOpened => {
                        let total: u64 = files.iter().map(|f| f.size()).sum();
                        println!("📂 Opened {} input files ({})", files.len(), format_bytes(total));
                    }
                    MergeEvent::FrameTypeSelected(encapsulation) => {
                        println!("🔗 Output encapsulation: {}", encapsulation);
                    }
                    MergeEvent::ReadyToMerge => println!("🚀 Merging..."),
                    MergeEvent::RecordScheduled(_) | MergeEvent::Done(_) => {}
                }
            }
            false
        });

    let outcome = tokio::task::spawn_blocking(move || processor.process(&inputs, &output)).await??;
    let total_time = start_time.elapsed();

    match &outcome {
        MergeOutcome::Completed(_) => println!("\n🎉 Merge completed successfully! 🎉"),
        MergeOutcome::Aborted(_) => println!("\n🛑 Merge aborted; the output holds the records written so far"),
    }

    let stats = outcome.stats();
    println!("=======================================");
    println!("📁 Input files: {} ({})", stats.input_files, format_bytes(stats.input_bytes));
    println!("📊 Records written: {}", stats.records_written);
    println!("🧩 Interfaces: {}", stats.merged_interfaces);
    println!("🔗 Encapsulation: {}", stats.output_encapsulation);
    println!("⏱️ Total time: {:.2}s", total_time.as_secs_f64());

    let throughput = stats.records_written as f64 / total_time.as_secs_f64().max(f64::EPSILON);
    println!("🔄 Throughput: {:.0} records/sec", throughput);

    Ok(())
}
