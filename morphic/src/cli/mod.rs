//! Command-line interface: `serve`, `history` and `cache`.

mod args;
mod commands;

pub use args::Cli;
pub use commands::execute;
