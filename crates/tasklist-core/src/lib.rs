pub mod cli;
pub mod commands;
pub mod config;
pub mod counts;
pub mod datetime;
pub mod filter;
pub mod notify;
pub mod render;
pub mod services;
pub mod storage;
pub mod store;
pub mod task;

use std::ffi::OsString;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use counts::{
  Counts,
  StatusCounts
};
pub use filter::{
  CategoryFilter,
  FilterPatch,
  FilterState,
  StatusFilter
};
pub use store::{
  Outcome,
  TaskStore
};
pub use task::{
  Category,
  Task,
  TaskId,
  TaskPatch
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting todo CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let storage =
    storage::FileStorage::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open storage at {}",
        data_dir.display()
      )
    })?;

  let key = cfg.storage_key();
  storage
    .path_for(&key)
    .context("invalid storage.key setting")?;

  let notices =
    render::ConsoleNotifier::new(
      cli.quiet > 0
    );
  let mut store =
    TaskStore::open_with_key(
      storage, &key
    )
    .with_notifier(notices);

  let default_category =
    cfg.default_category()?;
  debug!(%default_category, "default category");

  let renderer =
    render::Renderer::new(&cfg)?;
  let command = cli.command.unwrap_or(
    cli::Command::List(
      cli::ListArgs::default()
    )
  );

  commands::dispatch(
    &mut store,
    &cfg,
    &renderer,
    &notices,
    command,
    Utc::now()
  )?;

  info!("done");
  Ok(())
}
