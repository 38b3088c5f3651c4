//! The `link` subcommand: reads a link request, drives the link
//! engine, and writes the emitted archive buffer.

use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use ctfc_link::{Linker, ShareMode};
use ctfc_util::StringInterner;

use crate::commands::traits::{Command, CommandDescription};
use crate::config::Config;
use crate::descriptor::{build_archive_source, LinkRequest};
use crate::error::{CliError, Result};

#[derive(Debug, Clone, Default)]
pub struct LinkArgs {
    pub request: PathBuf,
    pub output: Option<PathBuf>,
    pub share_mode: Option<String>,
    pub verbose: bool,
}

pub struct LinkCommand {
    args: LinkArgs,
    config: Config,
}

impl LinkCommand {
    pub fn with_config(args: LinkArgs, config: Config) -> Self {
        LinkCommand { args, config }
    }

    fn load_request(&self) -> Result<LinkRequest> {
        let content = fs::read_to_string(&self.args.request)
            .map_err(|e| CliError::FileOperation(format!("reading {}: {e}", self.args.request.display())))?;
        Ok(serde_json::from_str(&content)?)
    }

    fn resolve_share_mode(&self, request: &LinkRequest) -> Result<ShareMode> {
        let raw = self
            .args
            .share_mode
            .clone()
            .or_else(|| request.share_mode.clone())
            .unwrap_or_else(|| self.config.share_mode.clone());
        match raw.as_str() {
            "unconflicted" => Ok(ShareMode::Unconflicted),
            "duplicated" => Ok(ShareMode::Duplicated),
            other => Err(CliError::Validation(format!("unknown share mode: {other}"))),
        }
    }

    fn resolve_output_path(&self) -> PathBuf {
        self.args.output.clone().unwrap_or_else(|| PathBuf::from(&self.config.default_output))
    }
}

impl Command for LinkCommand {
    type Args = LinkArgs;
    type Output = PathBuf;

    fn new(args: Self::Args) -> Self {
        LinkCommand { args, config: Config::default() }
    }

    fn execute(&self) -> Result<PathBuf> {
        let start = Instant::now();
        let request = self.load_request()?;
        let mode = self.resolve_share_mode(&request)?;

        let interner = Rc::new(StringInterner::new());
        let mut linker = Linker::new(interner.clone());

        for archive_desc in &request.inputs {
            let source = build_archive_source(&interner, archive_desc)?;
            linker.add_input(archive_desc.name.clone(), Box::new(source))?;
        }

        linker.link(mode)?;

        if !request.external_strings.is_empty() {
            linker.add_strtab(request.external_strings.iter().cloned());
        }

        linker.shuffle_syms()?;

        let bytes = linker.write(self.config.compression_threshold)?;

        let output_path = self.resolve_output_path();
        fs::write(&output_path, &bytes)?;

        if self.args.verbose {
            tracing::info!(
                output = %output_path.display(),
                bytes = bytes.len(),
                per_cu_outputs = linker.outputs().len(),
                elapsed_ms = start.elapsed().as_millis(),
                "link complete"
            );
        }

        Ok(output_path)
    }

    fn name() -> &'static str {
        "link"
    }
}

impl CommandDescription for LinkCommand {
    fn description() -> &'static str {
        "Link one or more described input archives into a single shared/per-CU archive."
    }
}

pub fn run_link(args: LinkArgs, config: Config) -> Result<PathBuf> {
    LinkCommand::with_config(args, config).execute()
}
