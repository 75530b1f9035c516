//! splitrandr - virtual RandR output configuration tool
//!
//! Entry point for the command-line binary.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use splitrandr::config::{Config, LoggingConfig};
use splitrandr::multimon::TopologyAugmenter;
use splitrandr::splits::{parse_blocks, RecordBlock, SplitStore, SplitTree};
use splitrandr::topology::{DisplaySource, SnapshotSource};
use splitrandr::utils::format_user_error;

/// Command-line arguments for splitrandr
#[derive(Parser, Debug)]
#[command(name = "splitrandr")]
#[command(version, about = "Split physical monitors into virtual RandR outputs", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, env = "SPLITRANDR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Split configuration store (overrides the config file)
    #[arg(short, long, env = "SPLITRANDR_STORE")]
    pub store: Option<PathBuf>,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Write logs to file (in addition to stderr)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the stored configuration as editable blocks
    DumpConfig,

    /// Merge blocks read from stdin into the store (SPLITS="N" removes)
    SetConfig,

    /// Remove every stored configuration
    ClearConfig,

    /// Print a block for every output that can be configured
    ShowAvailable {
        /// Topology snapshot (JSON)
        #[arg(short, long)]
        topology: PathBuf,
    },

    /// Print the topology as consumers would see it
    Augment {
        /// Topology snapshot (JSON)
        #[arg(short, long)]
        topology: PathBuf,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let loaded = Config::load(&config_path);
    let config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => Config::default_config(),
    }
    .with_overrides(
        args.store.clone(),
        args.log_format.clone(),
        args.log_file.clone(),
    );
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format_user_error(&e));
            return Err(e);
        }
    };

    init_logging(&config.logging, args.verbose)?;

    match loaded {
        Ok(_) => debug!("Configuration loaded from {}", config_path.display()),
        Err(e) if args.config.is_some() => {
            warn!("Failed to load config: {:#}, using defaults", e)
        }
        Err(e) => debug!("No usable config ({:#}), using defaults", e),
    }
    debug!("Config: {:?}", config);

    if let Err(e) = run(&args.command, &config) {
        eprintln!("{}", format_user_error(&e));
        return Err(e);
    }

    Ok(())
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("splitrandr")
        .join("config.toml")
}

fn run(command: &Command, config: &Config) -> Result<()> {
    match command {
        Command::DumpConfig => dump_config(config),
        Command::SetConfig => set_config(config),
        Command::ClearConfig => clear_config(config),
        Command::ShowAvailable { topology } => show_available(config, topology),
        Command::Augment { topology, json } => augment(config, topology, *json),
    }
}

fn load_store(config: &Config) -> Result<SplitStore> {
    SplitStore::load(&config.store.path).context(format!(
        "Failed to load split configuration: {}",
        config.store.path.display()
    ))
}

fn save_store(config: &Config, store: &SplitStore) -> Result<()> {
    store.save(&config.store.path).context(format!(
        "Failed to save split configuration: {}",
        config.store.path.display()
    ))?;
    info!(
        "Saved {} configurations to {}",
        store.len(),
        config.store.path.display()
    );
    Ok(())
}

fn load_snapshot(path: &Path) -> Result<SnapshotSource> {
    SnapshotSource::load(path).context(format!(
        "Failed to load topology snapshot: {}",
        path.display()
    ))
}

fn dump_config(config: &Config) -> Result<()> {
    let store = load_store(config)?;

    let mut first = true;
    for record in store.records() {
        let block = match RecordBlock::from_configuration(record) {
            Ok(block) => block,
            Err(e) => {
                warn!("Skipping configuration for {}: {}", record.name, e);
                continue;
            }
        };
        if !first {
            println!();
        }
        print!("{}", block);
        first = false;
    }

    Ok(())
}

fn set_config(config: &Config) -> Result<()> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read configuration from stdin")?;
    let blocks = parse_blocks(&input).context("Invalid configuration input")?;

    let mut store = load_store(config)?;
    for block in blocks {
        if block.splits.is_leaf() {
            if store.remove(&block.edid, block.width, block.height).is_some() {
                info!(
                    "Removed configuration for {} at {}x{}",
                    block.name, block.width, block.height
                );
            }
            continue;
        }

        let replaced = store.upsert(block.to_configuration());
        info!(
            "{} configuration for {} at {}x{} ({} outputs)",
            if replaced.is_some() { "Updated" } else { "Added" },
            block.name,
            block.width,
            block.height,
            block.splits.leaf_count()
        );
    }

    save_store(config, &store)
}

fn clear_config(config: &Config) -> Result<()> {
    save_store(config, &SplitStore::new())
}

fn show_available(config: &Config, topology: &Path) -> Result<()> {
    let store = load_store(config)?;
    let source = load_snapshot(topology)?;
    let physical = source.topology()?;
    let augmenter = TopologyAugmenter::new(&store, config.synthesis.to_multimon_config());

    let mut first = true;
    for summary in augmenter.describe_outputs(&source, &physical)? {
        let (Some(edid), Some((width, height))) = (summary.edid, summary.size) else {
            debug!("Output {} cannot be configured", summary.name);
            continue;
        };

        let splits = store
            .find(&edid, width, height)
            .and_then(|record| record.tree().ok())
            .unwrap_or(SplitTree::Leaf);

        if !first {
            println!();
        }
        print!(
            "{}",
            RecordBlock {
                name: summary.name,
                edid,
                width,
                height,
                splits,
            }
        );
        first = false;
    }

    Ok(())
}

fn augment(config: &Config, topology: &Path, json: bool) -> Result<()> {
    let store = load_store(config)?;
    let source = load_snapshot(topology)?;
    let physical = source.topology()?;
    let augmenter = TopologyAugmenter::new(&store, config.synthesis.to_multimon_config());

    let augmented = augmenter.augment(&source, &physical)?;

    if json {
        let merged = serde_json::to_string_pretty(&augmented.to_topology())
            .context("Failed to serialize topology")?;
        println!("{}", merged);
        return Ok(());
    }

    for output in augmented.outputs() {
        match augmented.active_crtc(output) {
            Some(crtc) => println!(
                "{:<16} 0x{:08x}  {}x{}+{}+{}  {}",
                output.name,
                output.id,
                crtc.width,
                crtc.height,
                crtc.x,
                crtc.y,
                augmented
                    .refresh_rate(output)
                    .map(|rate| format!("{:.2}Hz", rate))
                    .unwrap_or_default()
            ),
            None => println!("{:<16} 0x{:08x}  (off)", output.name, output.id),
        }
    }
    println!(
        "{} outputs, {} controllers, {} modes",
        augmented.output_count(),
        augmented.crtc_count(),
        augmented.mode_count()
    );

    Ok(())
}

fn init_logging(logging: &LoggingConfig, verbose: u8) -> Result<()> {
    use std::fs::File;

    let log_level = match verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("splitrandr={},warn", log_level))
    });

    // If log file is specified, write to both stderr and file
    if let Some(log_file_path) = &logging.log_file {
        let file = File::create(log_file_path)
            .context(format!("Failed to create log file: {}", log_file_path.display()))?;
        match logging.format.as_str() {
            "json" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(std::io::stderr),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
            "pretty" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .pretty()
                            .with_writer(std::io::stderr),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_writer(std::io::stderr),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
        }
        info!("Logging to file: {}", log_file_path.display());
    } else {
        match logging.format.as_str() {
            "json" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(std::io::stderr),
                    )
                    .init();
            }
            "pretty" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .pretty()
                            .with_writer(std::io::stderr),
                    )
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_writer(std::io::stderr),
                    )
                    .init();
            }
        }
    }

    Ok(())
}
