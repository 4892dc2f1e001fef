use std::io::{self, BufRead, Write};

use anyhow::Context;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::app::{App, Event};
use crate::cli::{Command, ShellLine, parse_shell_line};
use crate::datetime::parse_date_input;
use crate::filter::FilterMode;
use crate::render::Renderer;

#[instrument(skip(app, renderer))]
pub fn dispatch(app: &mut App, renderer: &mut Renderer, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Shell => run_shell(app, renderer, io::stdin().lock(), io::stdout().lock()),
        other => {
            let mut out = io::stdout().lock();
            let view_needed = apply(app, renderer, &mut out, other)?;
            if view_needed {
                renderer.write_list(&mut out, &app.snapshot(Utc::now()))?;
            }
            Ok(())
        }
    }
}

/// Runs a single command. Returns whether the list should be redrawn
/// afterwards.
fn apply<W: Write>(
    app: &mut App,
    renderer: &mut Renderer,
    out: &mut W,
    command: Command,
) -> anyhow::Result<bool> {
    let now = Utc::now();

    match command {
        Command::Add {
            text,
            priority,
            date,
        } => {
            info!("command add");
            let date = date
                .as_deref()
                .map(|raw| parse_date_input(raw, app.today(now)))
                .transpose()?;
            let before = app.store().tasks().first().map(|t| t.id);
            app.handle(
                Event::SubmitTask {
                    text: text.join(" "),
                    priority,
                    date,
                },
                now,
            )?;

            match app.store().tasks().first() {
                Some(task) if Some(task.id) != before => renderer.write_created(&mut *out, task)?,
                _ => debug!("blank task text; nothing added"),
            }
            Ok(true)
        }
        Command::List => Ok(true),
        Command::Toggle { id } => {
            info!(%id, "command toggle");
            app.handle(Event::ToggleTask(id), now)?;
            Ok(true)
        }
        Command::Delete { id } => {
            info!(%id, "command delete");
            app.handle(Event::DeleteTask(id), now)?;
            Ok(true)
        }
        Command::ClearCompleted => {
            info!("command clear-completed");
            app.handle(Event::ClearCompleted, now)?;
            Ok(true)
        }
        Command::Theme => {
            info!("command theme");
            app.handle(Event::ToggleTheme, now)?;
            renderer.set_theme(app.theme());
            renderer.write_theme(&mut *out, app.theme())?;
            Ok(false)
        }
        Command::Shell => {
            warn!("nested shell ignored");
            Ok(false)
        }
    }
}

/// Event loop over `input`: one command per line, the filter selection
/// survives between lines, and the list is redrawn after every line.
/// A line that fails is reported on stderr and the loop moves on.
#[instrument(skip_all)]
pub fn run_shell<R: BufRead, W: Write>(
    app: &mut App,
    renderer: &mut Renderer,
    input: R,
    mut out: W,
) -> anyhow::Result<()> {
    renderer.write_list(&mut out, &app.snapshot(Utc::now()))?;

    for line in input.lines() {
        let line = line.context("failed reading stdin")?;
        let parsed = match parse_shell_line(&line) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => continue,
            Err(err) => {
                let mut err_out = io::stderr().lock();
                writeln!(err_out, "{err}")?;
                continue;
            }
        };

        let redraw = match parsed {
            ShellLine::Quit => break,
            ShellLine::Filter(raw) => {
                app.handle(
                    Event::SelectFilter(FilterMode::parse_or_default(&raw)),
                    Utc::now(),
                )?;
                true
            }
            ShellLine::Command(command) => match apply(app, renderer, &mut out, command) {
                Ok(redraw) => redraw,
                Err(err) => {
                    warn!(error = %err, "shell command failed");
                    let mut err_out = io::stderr().lock();
                    writeln!(err_out, "{err:#}")?;
                    continue;
                }
            },
        };

        if redraw {
            renderer.write_list(&mut out, &app.snapshot(Utc::now()))?;
        }
    }

    Ok(())
}
