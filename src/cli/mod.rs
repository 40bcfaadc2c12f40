//! CLI argument parsing and command handling.

mod args;
pub mod imagery;
pub mod validators;

pub use args::{Cli, Command, ConfigAction, GlobalArgs, ImageryAction};
