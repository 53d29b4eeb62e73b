mod cli;
mod config;
mod exitcode;
mod opener;

pub use cli::Cli;
pub use config::{Config, Directive, ReplicaConfig, Value};
pub use exitcode::{EX_GRAPHD_DATABASE, EX_GRAPHD_REPLICA_MASTER, EX_OSERR, EX_USAGE};
pub use opener::{Opener, OpenerState};
