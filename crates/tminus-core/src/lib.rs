//! Local countdowns to dated events, with a scroll-snap wheel picker for
//! editing targets.
//!
//! [`picker`] is the headless picker core; everything else is the host
//! around it: config, storage, date parsing, commands and text output.

pub mod cli;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod datetime;
pub mod event;
pub mod picker;
pub mod render;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

use crate::cli::{GlobalCli, Invocation, PreprocessedArgs};
use crate::config::Config;
use crate::datastore::DataStore;
use crate::render::Renderer;

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let pre = cli::preprocess_args(&raw_args)?;
    let cli = GlobalCli::parse_from(pre.cleaned_args.clone());
    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        verbose = cli.verbose,
        quiet = cli.quiet,
        "starting tminus"
    );

    let cfg = layered_config(&cli, pre)?;
    let mut store = open_store(&cfg, &cli)?;
    let mut renderer = Renderer::new(&cfg);
    let inv = Invocation::parse(&cfg, cli.rest)?;

    commands::dispatch(&mut store, &cfg, &mut renderer, inv)?;

    debug!("command finished");
    Ok(())
}

/// Defaults, then the rc file, then `rc.key=value` positionals, then
/// `--rc key=value` flags.
fn layered_config(cli: &GlobalCli, pre: PreprocessedArgs) -> anyhow::Result<Config> {
    let mut cfg = Config::load(cli.tminusrc.as_deref())?;
    debug!(overrides = ?pre.rc_overrides, "positional rc overrides");

    let flag_overrides = cli
        .rc_overrides
        .iter()
        .map(|kv| (kv.key.clone(), kv.value.clone()));
    cfg.apply_overrides(pre.rc_overrides.into_iter().chain(flag_overrides));
    Ok(cfg)
}

fn open_store(cfg: &Config, cli: &GlobalCli) -> anyhow::Result<DataStore> {
    let data_dir = config::resolve_data_dir(cfg, cli.data.as_deref())
        .context("failed to resolve data directory")?;
    DataStore::open(&data_dir)
        .with_context(|| format!("failed to open datastore at {}", data_dir.display()))
}
