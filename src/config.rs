//! CLI arguments and server configuration defaults.

use clap::Parser;
use shadow_rs::formatcp;

use crate::build;

const VERSION_INFO: &str = formatcp!(
    r#"{}\ncommit_hash: {}\nbuild_time: {}\nbuild_env: {},{}"#,
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME,
    build::RUST_VERSION,
    build::RUST_CHANNEL
);

pub const DEFAULT_STORAGE_DIR: &str = "storage";
pub const DEFAULT_PORT: u16 = 8000;
pub const SHUTDOWN_GRACE_SECS: u64 = 10;

/// CLI arguments and environment configuration for the server.
#[derive(Parser, Debug)]
#[command(name = "file-store", version = VERSION_INFO, about = "File Storage API server")]
pub struct Args {
    #[arg(
        short = 's',
        long,
        env = "FSA_STORAGE_DIR",
        default_value = DEFAULT_STORAGE_DIR,
        help = "Directory holding stored files"
    )]
    pub storage_dir: String,
    #[arg(
        short = 'b',
        long = "bind",
        env = "FSA_BIND",
        default_value = "0.0.0.0",
        help = "Bind address"
    )]
    pub host: String,
    #[arg(
        short = 'p',
        long,
        env = "FSA_PORT",
        default_value_t = DEFAULT_PORT,
        help = "HTTP port"
    )]
    pub port: u16,
    #[arg(long, env = "FSA_CORS_ORIGINS", help = "Comma separated CORS origins")]
    pub cors_origins: Option<String>,
    #[arg(
        long,
        env = "FSA_MAX_UPLOAD_SIZE",
        default_value_t = 0,
        help = "Max upload body size in bytes (0 to disable)"
    )]
    pub max_upload_size: usize,
}
