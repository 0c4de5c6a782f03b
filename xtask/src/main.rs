use clap::{Parser, Subcommand};
use xtask::{Result, commands};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation for sntpm crates and demos")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run tests for all workspace crates
    Test,
    /// Check workspace crates and demos
    Check,
    /// Run clippy on all code with strict linting
    Clippy,
    /// Check code formatting of workspace crates and demos
    Format {
        /// Check formatting without making changes
        #[arg(long, conflicts_with = "fix")]
        check: bool,
        /// Fix formatting issues
        #[arg(long, conflicts_with = "check")]
        fix: bool,
    },
    /// Build all demos
    Demos,
    /// Clean all build artifacts
    Clean,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Test => commands::test::run_tests(),
        Commands::Check => commands::check::check_all(),
        Commands::Clippy => commands::clippy::run_clippy(),
        Commands::Format { fix, .. } => {
            if fix {
                commands::format::fix_formatting()
            } else {
                commands::format::check_formatting()
            }
        }
        Commands::Demos => commands::demos::build_demos(),
        Commands::Clean => commands::clean::clean_all(),
    }
}
