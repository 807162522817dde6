use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use futures::{Stream, stream};
use log::{LevelFilter, error, info};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt};

use toolstream::prompt::validate_xml_structure;
use toolstream::{
    EventKind, ParserOptions, StreamCallbacks, StreamIssue, ToolEvent, ToolManifest, ToolSystem, ToolSystemConfig,
};

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;

/// Level from the config; `RUST_LOG`, when set, takes precedence
fn parse_log_level(level: Option<&str>) -> Result<Option<LevelFilter>> {
    level
        .map(|l| l.parse::<LevelFilter>().context(format!("Invalid log_level '{}'", l)))
        .transpose()
}

fn setup_logging(config: &Config) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("toolstream")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("toolstream.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none()
        && let Some(level) = parse_log_level(config.log_level.as_deref())?
    {
        builder.filter_level(level);
    }
    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Prompt { manifest } => handle_prompt_command(&config.manifest_path(manifest.as_ref())?, config),
        Commands::Process {
            manifest,
            input,
            chunk_size,
            strict,
            lowercase,
            normalize,
        } => {
            let options = ParserOptions {
                lowercase: *lowercase || config.parser.lowercase,
                normalize: *normalize || config.parser.normalize,
                strict_mode: *strict || config.parser.strict_mode,
            };
            let chunk_size = chunk_size.unwrap_or(config.stream.chunk_size);
            handle_process_command(
                &config.manifest_path(manifest.as_ref())?,
                input.as_deref(),
                chunk_size,
                options,
                config,
                cli.is_verbose(),
            )
            .await
        }
        Commands::Tools { manifest } => handle_tools_command(&config.manifest_path(manifest.as_ref())?, config),
        Commands::Check { input } => handle_check_command(input.as_deref()),
    }
}

/// Build a tool system from a manifest file
fn load_system(manifest: &Path, options: ParserOptions, config: &Config) -> Result<ToolSystem> {
    let manifest =
        ToolManifest::from_file(manifest).context(format!("Failed to load manifest {}", manifest.display()))?;
    let context = manifest.context();
    let tools = manifest.into_tools()?;

    let system_config = ToolSystemConfig::new(tools)
        .with_global_context(context)
        .with_parser_options(options)
        .with_prompt_template(config.prompt.clone());
    Ok(ToolSystem::new(system_config)?)
}

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => fs::read_to_string(path).context(format!("Failed to read {}", path.display())),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            Ok(buffer)
        }
    }
}

/// Stream a reader as UTF-8 chunks of roughly `size` bytes.
///
/// A multibyte character cut by a read is held back until the rest of it
/// arrives; invalid bytes are replaced. A read error ends the stream.
fn read_chunks<R>(reader: R, size: usize) -> impl Stream<Item = String>
where
    R: AsyncRead + Unpin,
{
    let size = size.max(1);
    stream::unfold((reader, Vec::new(), false), move |(mut reader, mut carry, done)| async move {
        if done {
            return None;
        }
        let mut buf = vec![0u8; size];
        loop {
            let n = match reader.read(&mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    eprintln!("{} {}", "Failed to read input:".red(), e);
                    0
                }
            };
            if n == 0 {
                if carry.is_empty() {
                    return None;
                }
                let rest = String::from_utf8_lossy(&carry).into_owned();
                return Some((rest, (reader, Vec::new(), true)));
            }
            carry.extend_from_slice(&buf[..n]);

            let valid = match std::str::from_utf8(&carry) {
                Ok(_) => carry.len(),
                Err(e) if e.error_len().is_none() => e.valid_up_to(),
                Err(_) => {
                    let chunk = String::from_utf8_lossy(&carry).into_owned();
                    return Some((chunk, (reader, Vec::new(), false)));
                }
            };
            if valid == 0 {
                continue;
            }
            let tail = carry.split_off(valid);
            let chunk = String::from_utf8_lossy(&carry).into_owned();
            return Some((chunk, (reader, tail, false)));
        }
    })
}

fn handle_prompt_command(manifest: &Path, config: &Config) -> Result<()> {
    info!("Generating prompt from {}", manifest.display());
    let system = load_system(manifest, config.parser, config)?;
    println!("{}", system.generate_system_prompt());
    Ok(())
}

async fn handle_process_command(
    manifest: &Path,
    input: Option<&Path>,
    chunk_size: usize,
    options: ParserOptions,
    config: &Config,
    verbose: bool,
) -> Result<()> {
    let mut system = load_system(manifest, options, config)?;
    let reader: Box<dyn AsyncRead + Unpin + Send> = match input {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .context(format!("Failed to open {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };
    info!("Processing input in chunks of {} bytes", chunk_size);

    system.on(EventKind::ToolResult, |event| {
        if let ToolEvent::ToolResult(result) = event {
            match serde_json::to_string(result) {
                Ok(line) => println!("{}", line.green()),
                Err(e) => eprintln!("{} {}", "Failed to serialize result:".red(), e),
            }
        }
    });

    let callbacks = StreamCallbacks::new()
        .on_chunk(|chunk| {
            if verbose {
                eprintln!("{} {:?}", "chunk:".dimmed(), chunk);
            }
        })
        .on_error(|issue| match issue {
            StreamIssue::Dispatch(e) => eprintln!("{} {}", "error:".red(), e),
            StreamIssue::Parse(w) => eprintln!("{} {}", "warning:".yellow(), w),
        });

    let summary = system
        .process_stream(read_chunks(reader, chunk_size), callbacks)
        .await;

    eprintln!(
        "{} {} chunks, {} blocks, {} results, {} errors, {} warnings",
        "Summary:".cyan(),
        summary.chunks,
        summary.blocks,
        summary.results,
        summary.errors,
        summary.warnings
    );
    if let Some(reason) = summary.terminated {
        eprintln!("{} {}", "Terminated:".yellow(), reason);
    }
    Ok(())
}

fn handle_tools_command(manifest: &Path, config: &Config) -> Result<()> {
    let system = load_system(manifest, config.parser, config)?;
    for tool in system.get_all_tools() {
        let state = if tool.enabled { "enabled".green() } else { "disabled".red() };
        println!(
            "{} <{}> [{}] v{} {} - {}",
            tool.id.bold(),
            tool.xml_tag,
            tool.category,
            tool.version,
            state,
            tool.description
        );
    }
    let stats = system.get_stats();
    println!(
        "{} {} total, {} enabled, {} disabled",
        "Stats:".cyan(),
        stats.total_tools,
        stats.enabled_tools,
        stats.disabled_tools
    );
    Ok(())
}

fn handle_check_command(input: Option<&Path>) -> Result<()> {
    let text = read_input(input)?;
    if validate_xml_structure(&text) {
        println!("{}", "Tags are balanced".green());
        Ok(())
    } else {
        println!("{}", "Tags are not balanced".red());
        Err(eyre::eyre!("Unbalanced tags in input"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging at the configured level
    setup_logging(&config).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
