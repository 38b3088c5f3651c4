//! The `inspect` subcommand: reads back an emitted archive buffer and
//! prints its member list without re-running the linker.

use std::fs;
use std::path::PathBuf;

use crate::commands::traits::{Command, CommandDescription};
use crate::error::{CliError, Result};

#[derive(Debug, Clone, Default)]
pub struct InspectArgs {
    pub archive: PathBuf,
}

pub struct InspectCommand {
    args: InspectArgs,
}

impl InspectCommand {
    fn read_members(&self) -> Result<Vec<ctfc_archive::ParsedMember>> {
        let bytes = fs::read(&self.args.archive)
            .map_err(|e| CliError::FileOperation(format!("reading {}: {e}", self.args.archive.display())))?;
        Ok(ctfc_archive::read(&bytes)?)
    }
}

impl Command for InspectCommand {
    type Args = InspectArgs;
    type Output = Vec<ctfc_archive::ParsedMember>;

    fn new(args: Self::Args) -> Self {
        InspectCommand { args }
    }

    fn execute(&self) -> Result<Self::Output> {
        self.read_members()
    }

    fn name() -> &'static str {
        "inspect"
    }
}

impl CommandDescription for InspectCommand {
    fn description() -> &'static str {
        "Print the member list and per-member type/variable counts of an emitted archive."
    }
}

pub fn run_inspect(args: InspectArgs) -> Result<()> {
    let members = InspectCommand::new(args).execute()?;
    for member in &members {
        let oversized = if member.oversized { "\t(oversized)" } else { "" };
        println!("{}\ttypes={}\tvariables={}{}", member.name, member.type_count, member.variable_count, oversized);
    }
    Ok(())
}
