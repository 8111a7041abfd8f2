//! gqlb CLI entry point

use clap::{Parser, Subcommand, ValueEnum};
use gqlb_builder::BuildMode;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "gqlb")]
#[command(about = "Static builder for GraphQL element definitions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project root (defaults to current directory)
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the artifact from entry files
    Build {
        /// Entry file or glob, relative to the root (repeatable)
        #[arg(short, long = "entry", required = true)]
        entries: Vec<String>,

        /// Artifact output path
        #[arg(short, long, default_value = ".gqlb/artifact.json")]
        out: PathBuf,

        #[arg(long, value_enum, default_value_t = ModeArg::Runtime)]
        mode: ModeArg,

        /// Output format for the summary and errors
        #[arg(long, value_enum, default_value_t = Format::Human)]
        format: Format,

        /// Dump intermediate modules to this directory
        #[arg(long)]
        debug_dir: Option<PathBuf>,

        /// Schema file whose hash keys the artifact
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Build cache directory
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Skip the persisted build cache
        #[arg(long)]
        no_cache: bool,
    },
    /// Load and validate an artifact, then print its summary
    Inspect {
        artifact: PathBuf,

        #[arg(long)]
        schema: Option<PathBuf>,
    },
    /// Clear the build cache
    Clear {
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Runtime,
    ZeroRuntime,
}

impl From<ModeArg> for BuildMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Runtime => BuildMode::Runtime,
            ModeArg::ZeroRuntime => BuildMode::ZeroRuntime,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Human,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // stderr carries only the error line unless logging is asked for.
    let filter = if cli.verbose {
        EnvFilter::new("gqlb=debug,gqlb_core=debug,gqlb_analyzer=debug,gqlb_builder=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("gqlb v{}", env!("CARGO_PKG_VERSION"));

    let (result, format) = match cli.command {
        Commands::Build {
            entries,
            out,
            mode,
            format,
            debug_dir,
            schema,
            cache_dir,
            no_cache,
        } => {
            let args = commands::BuildArgs {
                root: cli.root,
                entries,
                out,
                mode: mode.into(),
                debug_dir,
                schema,
                cache_dir,
                use_cache: !no_cache,
            };
            (commands::build(args, format).await, format)
        }
        Commands::Inspect { artifact, schema } => {
            (commands::inspect(&cli.root, &artifact, schema.as_deref()), Format::Human)
        }
        Commands::Clear { cache_dir } => (commands::clear(&cli.root, cache_dir), Format::Human),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            commands::report_error(&e, format);
            ExitCode::FAILURE
        }
    }
}
