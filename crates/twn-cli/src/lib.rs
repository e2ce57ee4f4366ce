mod cmd;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "twn", version, about = "tailwind-nested - nested variant classes for Tailwind")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the class string twn() returns for a base string and selectors
    Flatten {
        /// Base classes, kept as-is
        base: Option<String>,
        /// Selector object as JSON, e.g. '{"hover":{"&":"bg-red-200","span":"underline"}}'
        #[arg(short, long)]
        selectors: Option<String>,
        /// Visit selector keys alphabetically instead of in written order
        #[arg(long)]
        sort: bool,
    },
    /// List the classes extracted from twn() calls in the given files
    Extract {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Scan src/ and produce the @source inline directive for the Tailwind entry
    Build {
        /// Rewrite the entry stylesheet in place instead of printing the directive
        #[arg(long)]
        write: bool,
    },
    /// Watch src/ and serve the injected stylesheet
    Dev {
        #[arg(short, long, default_value_t = 5175)]
        port: u16,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub async fn run() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Flatten {
            base,
            selectors,
            sort,
        } => cmd::flatten::run(base.as_deref(), selectors.as_deref(), sort),
        Commands::Extract { files } => cmd::extract::run(&files),
        Commands::Build { write } => cmd::build::run(write),
        Commands::Dev { port } => cmd::dev::run(port).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
