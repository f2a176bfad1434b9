use crate::export::ExportFormat;
use crate::models::action::LabAction;
use crate::models::hour_log::LogId;
use clap::{Parser, Subcommand};

/// Command-line interface definition for rcluck
/// Member hour logging (lab sign-in and external hours) on SQLite
#[derive(Parser)]
#[command(
    name = "rcluck",
    version = env!("CARGO_PKG_VERSION"),
    about = "Clock members in and out of the lab and review externally reported hours",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and configuration
    Init,

    /// Manage the configuration file (view or edit)
    Config {
        #[arg(long = "print", help = "Print the current configuration file")]
        print_config: bool,

        #[arg(
            long = "edit",
            help = "Edit the configuration file (default editor: $EDITOR, or nano/notepad)"
        )]
        edit_config: bool,

        #[arg(
            long = "editor",
            help = "Specify the editor to use (vim, nano, or custom path)"
        )]
        editor: Option<String>,
    },

    /// Manage the member directory
    Member {
        #[command(subcommand)]
        action: MemberCommand,
    },

    /// Lab sign-in station: clock a member in, out, or void the open session
    Lab {
        /// Member e-mail
        email: String,

        #[arg(value_enum)]
        action: LabAction,
    },

    /// Externally reported hours
    External {
        #[command(subcommand)]
        action: ExternalCommand,
    },

    /// List pending sessions, oldest first
    Pending {
        #[arg(long = "external", help = "List pending external claims instead of lab sessions")]
        external: bool,

        #[arg(long = "json", help = "Print the list as JSON")]
        json: bool,
    },

    /// Show one hour log as JSON
    Show {
        /// Hour log id
        id: LogId,
    },

    /// Deliver or inspect queued session-change notifications
    Outbox {
        #[arg(long = "deliver", help = "Deliver every queued notification that is due")]
        deliver: bool,

        #[arg(long = "list", help = "List the most recent outbox entries")]
        list: bool,

        #[arg(
            long = "file",
            value_name = "FILE",
            help = "Deliver to this JSON-lines file instead of the configured feed"
        )]
        file: Option<String>,

        #[arg(long = "stdout", conflicts_with = "file", help = "Deliver to stdout")]
        stdout: bool,
    },

    /// Manage the database (migrations, integrity checks, etc.)
    Db {
        #[arg(long = "migrate", help = "Run pending database migrations")]
        migrate: bool,

        #[arg(long = "check", help = "Check database integrity")]
        check: bool,

        #[arg(long = "vacuum", help = "Optimize the database using VACUUM")]
        vacuum: bool,

        #[arg(long = "info", help = "Show database information")]
        info: bool,
    },

    /// Print the internal audit log
    Log {
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,
    },

    /// Create a backup copy of the database
    Backup {
        #[arg(long, value_name = "FILE")]
        file: String,

        #[arg(long)]
        compress: bool,

        #[arg(long, short = 'f', help = "Overwrite an existing backup without asking")]
        force: bool,
    },

    /// Export hour logs
    Export {
        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,

        #[arg(long, value_name = "FILE")]
        file: String,

        #[arg(
            long,
            value_name = "STATE",
            help = "Only export logs in this state (pending, complete, cancelled)"
        )]
        state: Option<String>,

        #[arg(long, short = 'f')]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum MemberCommand {
    /// Register a member, or update and reactivate an existing one
    Add {
        /// Member e-mail (identity)
        email: String,

        /// Full name
        #[arg(long = "name")]
        name: String,
    },

    /// List active members
    List {
        #[arg(long = "json", help = "Print the list as JSON")]
        json: bool,
    },

    /// Mark a member inactive
    Deactivate {
        email: String,
    },
}

#[derive(Subcommand)]
pub enum ExternalCommand {
    /// Submit hours worked off-site for approval
    Submit {
        /// Member e-mail
        email: String,

        #[arg(
            long = "hours",
            allow_hyphen_values = true,
            help = "Declared hours (must be greater than zero)"
        )]
        hours: f64,

        #[arg(long = "message", help = "What the hours were spent on")]
        message: String,
    },

    /// Approve or deny a submitted claim
    Respond {
        /// Hour log id
        id: LogId,

        /// `approve` completes the claim, anything else cancels it
        action: String,

        #[arg(long = "category", help = "Final type of an approved claim")]
        category: Option<String>,
    },

    /// Attach the reference of the message sent to approvers
    Ref {
        /// Hour log id
        id: LogId,

        reference: String,
    },
}
