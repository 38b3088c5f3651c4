//! The small per-command shape shared by every `ctlink` subcommand.

use crate::error::Result;

/// A subcommand's argument struct plus its execution.
pub trait Command {
    type Args;
    type Output;

    fn new(args: Self::Args) -> Self;
    fn execute(&self) -> Result<Self::Output>;
    fn name() -> &'static str;
}

/// Human-facing descriptions, kept separate from `Command` so help text
/// can be generated without constructing a command instance.
pub trait CommandDescription {
    fn description() -> &'static str;
}
