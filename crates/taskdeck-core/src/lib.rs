pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod filter;
pub mod render;
pub mod storage;
pub mod store;
pub mod task;
pub mod theme;
pub mod view;

use std::ffi::OsString;
use std::rc::Rc;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
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
    "starting taskdeck"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.taskdeckrc.as_deref()
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

  let backend =
    storage::FileStore::open(&data_dir)
      .with_context(|| {
        format!(
          "failed to open store at {}",
          data_dir.display()
        )
      })?;

  let filter = cli
    .filter
    .as_deref()
    .map(
      filter::FilterMode::parse_or_default
    )
    .unwrap_or_else(|| {
      cfg.default_filter()
    });

  let mut app = app::App::open(
    storage::Persistence::new(
      Rc::new(backend)
    ),
    filter,
    cfg.timezone()
  )?;

  let mut renderer =
    render::Renderer::new(
      &cfg,
      app.theme()
    );

  commands::dispatch(
    &mut app,
    &mut renderer,
    cli
      .command
      .unwrap_or(cli::Command::List)
  )?;

  info!("done");
  Ok(())
}
