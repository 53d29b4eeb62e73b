// Command line options layer on top of the config file: anything given
// on the command line overrides the same setting in the file, the way
// the teacher's own CLIs (see e.g. `ob-poc`'s `dsl_cli`) use `clap`'s
// derive API for option parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "graphd")]
#[command(author = "graphd core team")]
#[command(version)]
#[command(about = "Request-processing core of a versioned graph database server")]
pub struct Cli {
    /// Path to the config file.
    #[arg(long, short = 'c', default_value = "/etc/graphd/graphd.conf")]
    pub config: PathBuf,

    /// Override the config file's `port`.
    #[arg(long)]
    pub port: Option<u16>,

    /// Run as a write-through replica of the given master address,
    /// overriding any `replica` block in the config file.
    #[arg(long = "replica-of")]
    pub replica_of: Option<String>,

    /// Override the config file's `log-level`.
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    pub fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(of) = &self.replica_of {
            config.replica = Some(crate::config::ReplicaConfig { of: of.clone(), write_through: true });
        }
        config
    }
}
