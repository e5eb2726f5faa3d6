//! CLI argument definitions.

use clap::{Parser, Subcommand};
use uuid::Uuid;

/// LearnPath - school learning platform API
#[derive(Parser, Debug)]
#[command(name = "learnpath")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),

    /// Run database migrations
    Migrate(MigrateArgs),

    /// Recompute skill node difficulty from observed pass rates
    Calibrate(CalibrateArgs),
}

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "SERVER_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "3000", env = "SERVER_PORT")]
    pub port: u16,
}

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub action: MigrateAction,
}

#[derive(Subcommand, Debug)]
pub enum MigrateAction {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Drop every table and re-run all migrations
    Fresh {
        /// Confirm that all school data will be lost
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Parser, Debug)]
pub struct CalibrateArgs {
    /// Only this subject; every subject when omitted
    #[arg(short, long)]
    pub subject: Option<Uuid>,

    /// Report the changes without writing them
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_calibrate_with_subject() {
        let id = Uuid::new_v4();
        let cli = Cli::parse_from(["learnpath", "calibrate", "--subject", &id.to_string(), "--dry-run"]);

        match cli.command {
            Commands::Calibrate(args) => {
                assert_eq!(args.subject, Some(id));
                assert!(args.dry_run);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::parse_from(["learnpath", "migrate", "status", "--verbose"]);
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Migrate(MigrateArgs { action: MigrateAction::Status })
        ));
    }

    #[test]
    fn fresh_needs_explicit_confirmation() {
        let cli = Cli::parse_from(["learnpath", "migrate", "fresh"]);
        assert!(matches!(
            cli.command,
            Commands::Migrate(MigrateArgs { action: MigrateAction::Fresh { yes: false } })
        ));

        let cli = Cli::parse_from(["learnpath", "migrate", "fresh", "--yes"]);
        assert!(matches!(
            cli.command,
            Commands::Migrate(MigrateArgs { action: MigrateAction::Fresh { yes: true } })
        ));
    }
}
