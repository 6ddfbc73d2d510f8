use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tejx_ingest::RUNTIME_PATCHES;
use tejx_playground::{run_buffer, CompilerResult, CompilerService, Playground, PlaygroundConfig};
use tejx_runtime::StdlibMetadata;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Picked up from the working directory when `--config` is not given.
const DEFAULT_CONFIG: &str = "tejx.toml";

#[derive(Debug, Parser)]
#[command(name = "tejxc", version, about = "Compile and run TejX programs")]
struct Cli {
    /// Playground config file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compile a source file with the compiler artifact and run it
    Run {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Compiler artifact, overriding the config
        #[arg(long, value_name = "WASM")]
        compiler: Option<PathBuf>,
        /// Write the module that ran to this path
        #[arg(long, value_name = "WASM")]
        emit_wasm: Option<PathBuf>,
        /// Emit a JSON report
        #[arg(long)]
        json: bool,
        /// Reject compiler output in text form
        #[arg(long)]
        no_assembler: bool,
    },
    /// Run a compiler result buffer: a binary module, module text, or an error report
    Exec {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Stdlib metadata JSON advertised by the compiler
        #[arg(long, value_name = "JSON")]
        metadata: Option<PathBuf>,
        /// Write the module that ran to this path
        #[arg(long, value_name = "WASM")]
        emit_wasm: Option<PathBuf>,
        /// Emit a JSON report
        #[arg(long)]
        json: bool,
        /// Reject text buffers
        #[arg(long)]
        no_assembler: bool,
    },
    /// List the runtime imports module text may use without declaring
    Patches {
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct RunReport<'a> {
    tool: &'static str,
    version: &'static str,
    success: bool,
    output: &'a [String],
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();
    match execute(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

/// `RUST_LOG` overrides the default filter. Logs go to stderr so stdout
/// carries only program output.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tejx_runtime=warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Returns whether the program ran to completion.
fn execute(cli: Cli) -> anyhow::Result<bool> {
    let mut config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Run {
            file,
            compiler,
            emit_wasm,
            json,
            no_assembler,
        } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("unable to read source '{}'", file.display()))?;
            if let Some(compiler) = compiler {
                config.compiler_path = compiler;
            }
            if no_assembler {
                config.assembler = false;
            }
            if let Some(name) = file.file_name() {
                config.file_name = name.to_string_lossy().into_owned();
            }
            let service = CompilerService::new(config.compiler_path.clone());
            let mut playground = Playground::new(service, config);
            let result = playground.compile(&source);
            playground.compiler_mut().shutdown();
            emit_module(&result, emit_wasm.as_deref())?;
            Ok(report(&result, json))
        }
        Command::Exec {
            file,
            metadata,
            emit_wasm,
            json,
            no_assembler,
        } => {
            let buffer = std::fs::read(&file)
                .with_context(|| format!("unable to read buffer '{}'", file.display()))?;
            let metadata = metadata.as_deref().map(load_metadata).transpose()?;
            if no_assembler {
                config.assembler = false;
            }
            let result = run_buffer(&buffer, metadata.as_ref(), &config);
            emit_module(&result, emit_wasm.as_deref())?;
            Ok(report(&result, json))
        }
        Command::Patches { json } => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(RUNTIME_PATCHES)
                        .unwrap_or_else(|_| "[]".to_string())
                );
            } else {
                for patch in RUNTIME_PATCHES {
                    println!("{}", patch.import_decl());
                }
            }
            Ok(true)
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PlaygroundConfig> {
    if let Some(path) = path {
        return Ok(PlaygroundConfig::load(path)?);
    }
    let fallback = Path::new(DEFAULT_CONFIG);
    if fallback.is_file() {
        info!(path = DEFAULT_CONFIG, "using config from working directory");
        return Ok(PlaygroundConfig::load(fallback)?);
    }
    Ok(PlaygroundConfig::default())
}

fn load_metadata(path: &Path) -> anyhow::Result<StdlibMetadata> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("unable to read metadata '{}'", path.display()))?;
    StdlibMetadata::from_json(&text)
        .with_context(|| format!("invalid metadata '{}'", path.display()))
}

fn emit_module(result: &CompilerResult, path: Option<&Path>) -> anyhow::Result<()> {
    if let (Some(path), Some(binary)) = (path, result.binary.as_deref()) {
        std::fs::write(path, binary)
            .with_context(|| format!("unable to write module '{}'", path.display()))?;
        info!(path = %path.display(), bytes = binary.len(), "wrote module");
    }
    Ok(())
}

fn report(result: &CompilerResult, json: bool) -> bool {
    if json {
        let report = RunReport {
            tool: "tejxc",
            version: env!("CARGO_PKG_VERSION"),
            success: result.success,
            output: &result.output,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        for line in &result.output {
            println!("{line}");
        }
    }
    result.success
}
