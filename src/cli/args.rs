//! Command line argument parsing
//!
//! Subcommands map one-to-one onto orchestrator commands:
//! - `list`: List SQL containers
//! - `create`: Create a container (volume folder, then engine create)
//! - `start` / `stop`: Start or stop a container
//! - `delete`: Delete a container, optionally with its data folder
//! - `databases`: List a container's databases
//! - `create-database`: Create a database
//! - `connect`: Open an interactive `sqlcmd` session
//! - `password`: Generate or check an `sa` password
//! - `images`: Show the images offered for new containers
//! - `show-config` / `init-config`: Configuration discovery helpers

use crate::engine::IMAGE_CHOICES;
use crate::model::MASTER_DATABASE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "sqlc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Provision and manage local SQL Server containers")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List SQL containers
    List {
        /// Also fetch the databases of running containers
        #[arg(short = 'd', long = "databases")]
        databases: bool,
        /// Print JSON instead of a table
        #[arg(long = "json")]
        json: bool,
    },
    /// Create a new SQL Server container
    Create {
        /// Container name
        name: String,
        /// Host port to publish SQL Server on
        #[arg(short = 'p', long = "port")]
        port: String,
        /// Image to run
        #[arg(short = 'i', long = "image", default_value = IMAGE_CHOICES[0])]
        image: String,
        /// `sa` password (generated when omitted)
        #[arg(long = "password")]
        password: Option<String>,
    },
    /// Start a stopped container
    Start {
        /// Container id, short id or name
        container: String,
    },
    /// Stop a running container
    Stop {
        /// Container id, short id or name
        container: String,
    },
    /// Delete a container
    Delete {
        /// Container id, short id or name
        container: String,
        /// Also remove the host folder holding the database files
        #[arg(long = "with-data")]
        with_data: bool,
    },
    /// List the databases of a running container
    Databases {
        /// Container id, short id or name
        container: String,
    },
    /// Create a database in a running container
    CreateDatabase {
        /// Container id, short id or name
        container: String,
        /// Database name
        name: String,
    },
    /// Open an interactive sqlcmd session
    Connect {
        /// Container id, short id or name
        container: String,
        /// Database to connect to
        #[arg(short = 'd', long = "database", default_value = MASTER_DATABASE)]
        database: String,
    },
    /// Generate an sa password, or check one
    Password {
        /// Password to check instead of generating one
        #[arg(long = "check", value_name = "PASSWORD")]
        check: Option<String>,
    },
    /// Show the images offered for new containers
    Images,
    /// Show configuration discovery information
    ShowConfig,
    /// Write a default configuration file to ~/.sqlcontainers/config.toml
    InitConfig,
}
