//! Cli things
//!

use std::path::PathBuf;

use clap::Parser;

pub fn db_path_default() -> String {
    shellexpand::tilde("~/.cache/documind.sqlite3").to_string()
}

pub fn storage_root_default() -> String {
    shellexpand::tilde("~/.cache/documind-uploads").to_string()
}

#[derive(Parser, Debug)]
pub struct CliOpts {
    #[clap(long, help = "Path to the database file", env = "DOCUMIND_DB_PATH")]
    pub db_path: Option<PathBuf>,

    #[clap(
        long,
        help = "Directory for uploaded document files",
        env = "DOCUMIND_STORAGE_ROOT"
    )]
    pub storage_root: Option<PathBuf>,

    #[clap(
        long,
        help = "Address to listen on",
        env = "DOCUMIND_ADDR",
        default_value = "127.0.0.1"
    )]
    pub addr: String,

    #[clap(
        long,
        help = "Port to listen on",
        env = "DOCUMIND_PORT",
        default_value_t = 8190
    )]
    pub port: u16,

    #[clap(long, help = "Enable debug logging")]
    pub debug: bool,
}
