//! markpress CLI
//!
//! - `export`: render a Markdown file and write `markdown-export.pdf`
//! - `preview`: print a text outline of the rendered preview
//! - `theme show|toggle`: inspect or flip the persisted theme

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use markpress::sink::DirectorySink;
use markpress::{Extensions, ExportOutcome, Workspace, WorkspaceConfig};

#[derive(Parser)]
#[command(name = "markpress", version, about)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log pipeline details
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a Markdown file as a single-page PDF.
    Export(ExportArgs),
    /// Print an outline of the rendered preview.
    Preview(SourceArgs),
    /// Persisted theme commands.
    #[command(subcommand)]
    Theme(ThemeCommand),
}

#[derive(Args)]
struct SourceArgs {
    /// Markdown file (.md)
    input: PathBuf,

    /// Disable tables, strikethrough and task lists
    #[arg(long)]
    no_gfm: bool,
}

#[derive(Args)]
struct ExportArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Directory the PDF is written to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Subcommand)]
enum ThemeCommand {
    /// Print the active theme.
    Show,
    /// Switch between light and dark and persist the choice.
    Toggle,
}

fn log_filter(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "warn,markpress=debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_filter(verbose, quiet)))
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<WorkspaceConfig> {
    match &cli.config {
        Some(path) => WorkspaceConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(WorkspaceConfig::default()),
    }
}

fn open_workspace(mut config: WorkspaceConfig, source: &SourceArgs) -> anyhow::Result<Workspace> {
    if source.no_gfm {
        config.extensions = Extensions::none();
    }
    let mut workspace = markpress::new_workspace(config)?;
    workspace.load_file(&source.input)?;
    Ok(workspace)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    match cli.command {
        Commands::Export(args) => {
            let workspace = open_workspace(config, &args.source)?;
            let sink = DirectorySink::new(&args.out_dir);
            match workspace.export(&sink).await? {
                ExportOutcome::Ignored => println!("Nothing to export: the document is empty."),
                ExportOutcome::Exported(report) => println!(
                    "{} ({}x{}, {:?})",
                    report.location, report.geometry.width, report.geometry.height, report.geometry.orientation
                ),
            }
        }
        Commands::Preview(args) => {
            let workspace = open_workspace(config, &args)?;
            println!("{}", workspace.preview());
        }
        Commands::Theme(cmd) => {
            let mut workspace = markpress::new_workspace(config)?;
            let mode = match cmd {
                ThemeCommand::Show => workspace.theme().mode(),
                ThemeCommand::Toggle => workspace.toggle_theme(),
            };
            println!("{}", mode);
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(err) = run(cli).await {
        log::error!("{:#}", err);
        match err.downcast_ref::<markpress::Error>() {
            Some(e) => eprintln!("{}", e.user_message()),
            None => eprintln!("Error: {:#}", err),
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_debug_is_scoped_to_this_crate() {
        let filter = log_filter(true, false);
        assert!(filter.starts_with("warn,"));
        assert!(filter.contains("markpress=debug"));
        assert_eq!(log_filter(false, true), "error");
        assert_eq!(log_filter(false, false), "warn");
    }
}
