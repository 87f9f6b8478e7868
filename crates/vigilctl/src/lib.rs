//! vigilctl - command-line front end for Vigil progression.

pub mod cli;
pub mod commands;
pub mod session;

pub use cli::{Cli, Commands};
pub use commands::run;
pub use session::SessionFile;
