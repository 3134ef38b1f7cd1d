//! CLI argument definitions.
//!
//! Uses clap derive macros for type-safe argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// CRUD API template - users, items and files behind JWT auth
#[derive(Parser, Debug)]
#[command(name = "crud-api")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),

    /// Run database migrations
    Migrate(MigrateArgs),

    /// Maintain stored refresh tokens
    Tokens(TokensArgs),

    /// Manage user accounts
    Users(UsersArgs),

    /// Encryption keys, encrypted files and random tokens
    Secrets(SecretsArgs),
}

/// Arguments for the serve command. Defaults come from configuration.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Host to bind to
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub action: MigrateAction,
}

/// Migration actions
#[derive(Subcommand, Debug)]
pub enum MigrateAction {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset and re-run all migrations
    Fresh,
}

#[derive(Args, Debug)]
pub struct TokensArgs {
    #[command(subcommand)]
    pub action: TokensAction,
}

#[derive(Subcommand, Debug)]
pub enum TokensAction {
    /// Delete expired tokens
    Purge,
}

#[derive(Args, Debug)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub action: UsersAction,
}

#[derive(Subcommand, Debug)]
pub enum UsersAction {
    /// Create an active administrator account
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Args, Debug)]
pub struct SecretsArgs {
    #[command(subcommand)]
    pub action: SecretsAction,
}

#[derive(Subcommand, Debug)]
pub enum SecretsAction {
    /// Print a fresh encryption key suitable for ENCRYPTION_KEY
    GenerateKey,
    /// Encrypt a file
    EncryptFile(CryptFileArgs),
    /// Decrypt a file produced by encrypt-file
    DecryptFile(CryptFileArgs),
    /// Print a random hex token
    GenerateToken {
        /// Token length in characters
        #[arg(short, long, default_value_t = 32)]
        length: usize,
    },
}

#[derive(Args, Debug)]
pub struct CryptFileArgs {
    /// File to read
    pub input: PathBuf,
    /// File to write
    pub output: PathBuf,
    /// Key to use instead of the configured one
    #[arg(short, long)]
    pub key: Option<String>,
}
