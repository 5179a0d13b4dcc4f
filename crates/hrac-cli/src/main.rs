//! hrac command-line tool.
//!
//! Inspects and administers the access policy stored in an hrac snapshot.
//!
//! # Quick Start
//!
//! ```bash
//! # Define a role and grant it
//! hrac role add --id 1 --name HR_OFFICER --type HR_OFFICER --capability can_manage_leaves
//! hrac rule add --id 1 --role 1 --entity leaverequest --field employee.current_department \
//!     --condition EQUALS --value '{user.employee_profile.current_department_id}' --action CHANGE
//! hrac grant --user 7 --role 1
//!
//! # Ask questions
//! hrac permissions --user 7
//! hrac check --user officer.json --records leave.json --entity leaverequest --id 3 --action CHANGE
//! hrac filter --user officer.json --records leave.json --entity leaverequest --action CHANGE
//! ```

mod commands;
mod style;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

/// hrac - attribute-based access control for HR applications.
#[derive(Parser)]
#[command(name = "hrac")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where configuration and the policy snapshot come from.
#[derive(Args)]
struct StoreArgs {
    /// Project directory holding hrac.toml.
    #[arg(short = 'C', long, global = true, default_value = ".")]
    project: PathBuf,

    /// Read configuration from this file only, skipping hrac.toml,
    /// hrac.local.toml, the user file and HRAC_* variables.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Snapshot file, overriding `store.snapshot` from configuration.
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information.
    Version,

    /// List roles.
    Roles,

    /// Role administration.
    #[command(subcommand)]
    Role(RoleCommands),

    /// List attribute rules.
    Rules,

    /// Attribute rule administration.
    #[command(subcommand)]
    Rule(RuleCommands),

    /// Show a user's effective permissions.
    Permissions {
        /// User ID.
        #[arg(short, long)]
        user: u64,

        /// Print the mapping as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Decide whether a user may act on one record.
    Check {
        #[command(flatten)]
        target: TargetArgs,

        /// ID of the record to check.
        #[arg(long)]
        id: u64,
    },

    /// Narrow a set of records to those a user may act on.
    Filter {
        #[command(flatten)]
        target: TargetArgs,

        /// Also render the filter as SQL against this table.
        #[arg(long)]
        table: Option<String>,
    },

    /// Grant a role to a user.
    Grant {
        /// User ID.
        #[arg(short, long)]
        user: u64,

        /// Role ID.
        #[arg(short, long)]
        role: u64,

        /// Scope type (department, unit, zone, state).
        #[arg(long, requires = "scope_id")]
        scope_type: Option<String>,

        /// Scope ID.
        #[arg(long, requires = "scope_type")]
        scope_id: Option<u64>,

        /// ID of the granting user.
        #[arg(long)]
        by: Option<u64>,

        /// Mark as the user's primary role.
        #[arg(long)]
        primary: bool,
    },

    /// Revoke a role assignment.
    Revoke {
        /// Assignment ID.
        assignment: u64,
    },
}

/// The user, records and action of a row-level question.
#[derive(Args)]
struct TargetArgs {
    /// JSON file describing the acting user.
    #[arg(short, long)]
    user: PathBuf,

    /// JSON file holding an array of record objects.
    #[arg(long)]
    records: PathBuf,

    /// Entity type of the records.
    #[arg(short, long)]
    entity: String,

    /// Action (VIEW, CHANGE, ADD, DELETE).
    #[arg(short, long, default_value = "VIEW")]
    action: String,
}

#[derive(Subcommand)]
enum RoleCommands {
    /// Create or update a role.
    Add {
        /// Role ID.
        #[arg(long)]
        id: u64,

        /// Unique role name.
        #[arg(long)]
        name: String,

        /// Role type code (SYS_ADMIN, HOD, HR_OFFICER, ...).
        #[arg(long = "type")]
        role_type: String,

        /// Capability to hold (repeatable).
        #[arg(long = "capability")]
        capabilities: Vec<String>,

        /// Hierarchy level.
        #[arg(long, default_value = "0")]
        level: u32,

        /// Group to synchronise (defaults to the role name).
        #[arg(long)]
        group: Option<String>,
    },

    /// Delete a role with its rules and assignments.
    Delete {
        /// Role ID.
        id: u64,
    },
}

#[derive(Subcommand)]
enum RuleCommands {
    /// Attach an attribute rule to a role.
    Add {
        /// Rule ID.
        #[arg(long)]
        id: u64,

        /// Owning role ID.
        #[arg(long)]
        role: u64,

        /// Target entity type.
        #[arg(long)]
        entity: String,

        /// Dotted field path on the entity.
        #[arg(long)]
        field: String,

        /// Operator (EQUALS, NOT_EQUALS, IN, NOT_IN, GREATER_THAN, ...).
        #[arg(long)]
        condition: String,

        /// Literal value or `{user.…}` reference.
        #[arg(long)]
        value: String,

        /// Action the rule applies to.
        #[arg(long)]
        action: String,
    },

    /// Delete an attribute rule.
    Delete {
        /// Rule ID.
        id: u64,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.no_color {
        style::set_no_color(true);
    }

    let store = commands::StoreLocation {
        project: cli.store.project,
        config: cli.store.config,
        snapshot: cli.store.snapshot,
    };

    match cli.command {
        Commands::Version => {
            commands::version::run();
            Ok(())
        }
        Commands::Roles => commands::roles::list(&store),
        Commands::Role(cmd) => match cmd {
            RoleCommands::Add {
                id,
                name,
                role_type,
                capabilities,
                level,
                group,
            } => commands::roles::add(
                &store,
                &commands::roles::RoleSpec {
                    id,
                    name,
                    role_type,
                    capabilities,
                    level,
                    group,
                },
            ),
            RoleCommands::Delete { id } => commands::roles::delete(&store, id),
        },
        Commands::Rules => commands::rules::list(&store),
        Commands::Rule(cmd) => match cmd {
            RuleCommands::Add {
                id,
                role,
                entity,
                field,
                condition,
                value,
                action,
            } => commands::rules::add(
                &store,
                &commands::rules::RuleSpec {
                    id,
                    role,
                    entity,
                    field,
                    condition,
                    value,
                    action,
                },
            ),
            RuleCommands::Delete { id } => commands::rules::delete(&store, id),
        },
        Commands::Permissions { user, json } => commands::permissions::run(&store, user, json),
        Commands::Check { target, id } => commands::access::check(&store, &target.into(), id),
        Commands::Filter { target, table } => {
            commands::access::filter(&store, &target.into(), table.as_deref())
        }
        Commands::Grant {
            user,
            role,
            scope_type,
            scope_id,
            by,
            primary,
        } => commands::grants::grant(
            &store,
            &commands::grants::GrantSpec {
                user,
                role,
                scope_type,
                scope_id,
                by,
                primary,
            },
        ),
        Commands::Revoke { assignment } => commands::grants::revoke(&store, assignment),
    }
}

impl From<TargetArgs> for commands::access::Target {
    fn from(args: TargetArgs) -> Self {
        Self {
            user: args.user,
            records: args.records,
            entity: args.entity,
            action: args.action,
        }
    }
}
