use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lode")]
#[command(version = "0.1.0")]
#[command(propagate_version = true)]
#[command(about = "A fast npm-protocol package manager", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install all dependencies from package.json
    #[command(alias = "i")]
    Install {
        /// Skip devDependencies
        #[arg(short = 'P', long = "production")]
        production: bool,
        /// Fail unless the lockfile exists and matches the manifest
        #[arg(long = "frozen")]
        frozen: bool,
        /// Never touch the network; fail on any cache miss
        #[arg(long = "offline")]
        offline: bool,
        /// Use cached metadata when fresh enough before asking the registry
        #[arg(long = "prefer-offline")]
        prefer_offline: bool,
        /// Registry base URL
        #[arg(long = "registry")]
        registry: Option<String>,
        /// Bearer token for the registry
        #[arg(long = "token")]
        token: Option<String>,
        /// Fail on unmet peer dependencies instead of warning
        #[arg(long = "strict-peer-dependencies")]
        strict_peer_dependencies: bool,
        /// Enable debug output
        #[arg(long)]
        debug: bool,
        /// Only print errors
        #[arg(short = 'q', long = "quiet")]
        quiet: bool,
    },
    /// Manage the metadata and tarball caches
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Inspect the global package store
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Remove all cached metadata and tarballs
    Clean,
}

#[derive(Subcommand)]
pub enum StoreAction {
    /// List every package in the store
    List,
}
