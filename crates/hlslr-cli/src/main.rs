mod driver;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hlslr_core::{ReflectConfig, CONFIG_FILE_NAME};

use crate::driver::BuildOptions;

#[derive(Parser)]
#[command(
    name = "hlslr",
    version,
    about = "hlslr: C++ reflection headers from HLSL declarations",
    long_about = "hlslr parses the global declarations of HLSL shaders (structs, cbuffers,\nvariables, resource bindings and compute entry points) and emits a C++\nheader describing them, optionally embedding the compiled bytecode."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate reflection headers for shader files or directories
    Build {
        /// Shader files, or directories to scan recursively
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Write headers under this directory, mirroring the input layout
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Regenerate even when the header is up to date
        #[arg(long)]
        force: bool,

        /// Configuration file (default: ./hlslr.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Parse a shader and report errors
    Check {
        /// Path to the shader to check
        #[arg()]
        file: PathBuf,
    },

    /// Print the declaration tree of a shader as JSON
    Inspect {
        /// Path to the shader to inspect
        #[arg()]
        file: PathBuf,
    },

    /// Write a default hlslr.toml into the current directory
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries command output (JSON for `inspect`), so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Build {
            paths,
            out_dir,
            force,
            config,
        } => cmd_build(paths, BuildOptions { out_dir, force }, config),
        Commands::Check { file } => cmd_check(&file),
        Commands::Inspect { file } => cmd_inspect(&file),
        Commands::Init { force } => cmd_init(force),
    }
}

fn cmd_build(paths: Vec<PathBuf>, options: BuildOptions, config: Option<PathBuf>) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    let config = ReflectConfig::discover(config.as_deref(), &cwd)?;
    tracing::debug!(?config, "loaded configuration");

    let summary = driver::build(&paths, &options, &config)?;
    println!(
        "{} generated, {} up to date",
        summary.generated, summary.skipped
    );
    Ok(())
}

fn read_source(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("failed to read file: {}", file.display()))
}

fn cmd_check(file: &Path) -> Result<()> {
    let source = read_source(file)?;
    let (program, defines) = hlslr_lang::parse_source(&source, &file.display().to_string())?;

    let mut structs = 0;
    let mut variables = 0;
    let mut functions = 0;
    for decl in program.declarations.iter() {
        match decl {
            hlslr_lang::AnyDecl::Var(var) => match var.shape() {
                Ok(hlslr_lang::DeclShape::Struct(_)) => structs += 1,
                _ => variables += 1,
            },
            hlslr_lang::AnyDecl::Function(_) => functions += 1,
            hlslr_lang::AnyDecl::Attribute(_) => {}
        }
    }
    println!(
        "{}: ok ({} structs, {} variables, {} functions, {} defines)",
        file.display(),
        structs,
        variables,
        functions,
        defines.defines().count()
    );
    Ok(())
}

fn cmd_inspect(file: &Path) -> Result<()> {
    let source = read_source(file)?;
    let (program, _) = hlslr_lang::parse_source(&source, &file.display().to_string())?;
    let json = serde_json::to_string_pretty(&program).context("failed to serialize AST")?;
    println!("{json}");
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let path = PathBuf::from(CONFIG_FILE_NAME);
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    ReflectConfig::default().save_to_file(&path)?;
    println!("wrote {}", path.display());
    Ok(())
}
