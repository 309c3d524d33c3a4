use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Serve a web front end for running exiftool jobs
#[derive(Debug, Clone, Parser)]
#[command(name = "exifrelay-server", version)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "EXIFRELAY_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "EXIFRELAY_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Directory holding uploaded targets and tee'd output files
    #[arg(long, env = "EXIFRELAY_UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// JSON file listing example commands
    #[arg(long, env = "EXIFRELAY_EXAMPLES_FILE", default_value = "exiftool_examples.txt")]
    pub examples_file: PathBuf,

    /// Name of the tool every job invokes
    #[arg(long, env = "EXIFRELAY_TOOL", default_value = "exiftool")]
    pub tool: String,

    /// Seconds a finished job stays queryable before it is forgotten
    #[arg(long, env = "EXIFRELAY_RETENTION_SECS", default_value_t = 600)]
    pub retention_secs: u64,

    /// Capacity of the job coordinator's message queue
    #[arg(long, default_value_t = 64)]
    pub message_capacity: usize,

    /// Largest accepted upload, in megabytes
    #[arg(long, env = "EXIFRELAY_MAX_UPLOAD_MB", default_value_t = 100)]
    pub max_upload_mb: usize,
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}
