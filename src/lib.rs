pub mod cli;
pub mod cmis;
pub mod load_config;

pub use cli::{run, Cli, Commands};
