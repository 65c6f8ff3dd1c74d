//! Command Line Interface (CLI) arguments.

use clap::Parser;

/// Diversity server command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "0.0.0.0", env = "DIVERSITY_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 8000, env = "DIVERSITY_PORT")]
    pub port: u16,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "DIVERSITY_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/diversity-server/certs/cert.pem",
        env = "DIVERSITY_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/diversity-server/certs/key.pem",
        env = "DIVERSITY_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for operations to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "DIVERSITY_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
    /// Path to the NetCDF dataset
    #[arg(
        long,
        default_value = "data/output_diversity.nc",
        env = "DIVERSITY_DATASET"
    )]
    pub dataset: String,
    /// Comma-separated list of the variables that may be requested
    #[arg(
        long,
        default_value = "mean_values,sd_values",
        value_delimiter = ',',
        env = "DIVERSITY_VARIABLES"
    )]
    pub variables: Vec<String>,
    /// Whether to use Rayon for execution of CPU-bound tasks.
    #[arg(long, default_value_t = false, env = "DIVERSITY_USE_RAYON")]
    pub use_rayon: bool,
    /// Maximum number of concurrent extraction tasks. Defaults to the number of CPUs minus one.
    #[arg(long, env = "DIVERSITY_THREAD_LIMIT")]
    pub thread_limit: Option<usize>,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
