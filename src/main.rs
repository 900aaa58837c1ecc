mod bridge;
mod commit;
mod commit_cmd;
mod config;
mod dialect;
mod edit;
mod edit_cmd;
mod error;
mod highlight;
mod parse;
mod process;
mod query;
mod search_cmd;
mod session;
mod write;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use error::SearchError;
use session::SearchOptions;

#[derive(Parser)]
#[command(
    name = "rge",
    version,
    about = "Search, edit, commit - batch line editing on top of ripgrep/ag/pt/ack",
    long_about = "rge runs an external search tool, shows the matches with highlighting, and \
lets you edit the matched lines in a plain-text buffer that commits back to the original files \
as a batch - including whole-line deletions."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(clap::Args)]
struct SearchArgs {
    /// Query; may start with tool flags, terminated by `--` (e.g. "-w -- foo bar")
    query: String,

    /// Files or directories to search (defaults to the current directory)
    targets: Vec<String>,

    /// Search tool to use (rg, ag, pt, ack, or a path); auto-detected otherwise
    #[arg(short, long)]
    tool: Option<String>,

    /// Invoke the tool in file:line:column style
    #[arg(long)]
    vimgrep: bool,

    /// Force case-insensitive matching
    #[arg(short = 'i', long)]
    ignore_case: bool,

    /// Force case-sensitive matching
    #[arg(short = 's', long, conflicts_with = "ignore_case")]
    case_sensitive: bool,
}

impl SearchArgs {
    fn options(&self) -> SearchOptions {
        SearchOptions {
            tool: self.tool.clone(),
            vimgrep: self.vimgrep,
            ignore_case: self.ignore_case,
            case_sensitive: self.case_sensitive,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Search and print highlighted matches
    Search {
        #[command(flatten)]
        args: SearchArgs,

        /// Maximum result lines to print (0 = all)
        #[arg(short, long, default_value = "0")]
        max_results: usize,

        /// Machine-readable JSON output
        #[arg(long)]
        json: bool,
    },

    /// Search and write the matches into an editable buffer file
    Edit {
        #[command(flatten)]
        args: SearchArgs,

        /// Buffer file to create
        #[arg(short, long, default_value = ".rge.edit")]
        out: PathBuf,
    },

    /// Apply an edited buffer back to the files; removes it on clean success
    Commit {
        /// Buffer file written by `rge edit`
        buffer: PathBuf,

        /// Validate and report without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Discard an edit buffer
    Abort {
        /// Buffer file written by `rge edit`
        buffer: PathBuf,

        /// Discard even if the buffer has pending edits
        #[arg(long)]
        force: bool,
    },

    /// Show or create the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the active configuration
    Show,
    /// Write a default config file
    Init,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("error: {:#}", err);
        let code = err
            .downcast_ref::<SearchError>()
            .map(|e| e.exit_code())
            .unwrap_or(2);
        std::process::exit(code);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Search {
            args,
            max_results,
            json,
        } => search_cmd::run(
            &args.query,
            &args.targets,
            &args.options(),
            max_results,
            json,
            cli.verbose,
        ),

        Commands::Edit { args, out } => {
            edit_cmd::run(&args.query, &args.targets, &args.options(), &out, cli.verbose)
        }

        Commands::Commit { buffer, dry_run } => commit_cmd::run(&buffer, dry_run, cli.verbose),

        Commands::Abort { buffer, force } => edit_cmd::run_abort(&buffer, force, cli.verbose),

        Commands::Config { command } => match command {
            ConfigCommands::Show => config::show_config(),
            ConfigCommands::Init => {
                let path = config::Config::create_default()?;
                println!("created {}", path.display());
                Ok(())
            }
        },
    }
}
