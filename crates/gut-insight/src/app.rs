use std::io::Write;

use gut_common::analysis::Analyzer;
use gut_common::location::ResultsLocation;
use gut_common::query_input::QueryInput;
use gut_common::results::{RequestState, ResultView};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::render::{render_loading, render_location, render_state};

pub const HELP: &str = "\
Enter a food, ingredient, or gut health question (at least 10 characters).
  /followup <text>  ask a follow-up about the current query
  /retry            re-run the current request
  /location         show the current results location
  /help             show this help
  /quit             exit

Try these examples:
  kimchi
  aspartame related info
  fiber and gut bacteria";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Query(String),
    FollowUp(String),
    Retry,
    Location,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Query(line.to_string());
    };
    let (name, arg) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    match name {
        "followup" | "f" => Command::FollowUp(arg.trim().to_string()),
        "retry" | "r" => Command::Retry,
        "location" | "loc" => Command::Location,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    }
}

/// Run the interactive session on stdin/stdout until `/quit` or end of input.
pub async fn run_interactive<A: Analyzer>(
    view: &ResultView<A>,
    initial: Option<ResultsLocation>,
) -> anyhow::Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    run_session(view, initial, stdin, &mut std::io::stdout()).await
}

/// Each request's outcome is rendered before the next line is read, so
/// nothing is lost when input ends right after a query.
pub async fn run_session<A, R, W>(
    view: &ResultView<A>,
    initial: Option<ResultsLocation>,
    reader: R,
    out: &mut W,
) -> anyhow::Result<()>
where
    A: Analyzer,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    // Submissions are delegated to the result view, as on the results page.
    let (tx, mut submissions) = mpsc::unbounded_channel::<(String, bool)>();
    let mut input = QueryInput::new().on_submit(move |query, is_follow_up| {
        let _ = tx.send((query.to_string(), is_follow_up));
    });

    writeln!(out, "{HELP}")?;
    if initial.is_some() {
        show(out, &RequestState::Loading)?;
        let state = view.navigate(initial).await;
        show(out, &state)?;
    }

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Command::Empty => continue,
            Command::Quit => break,
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Location => writeln!(out, "{}", render_location(view.location().as_ref()))?,
            Command::Unknown(name) => writeln!(out, "unknown command /{name}; try /help")?,
            Command::Retry => {
                if view.location().is_none() {
                    writeln!(out, "Nothing to retry yet.")?;
                    continue;
                }
                show(out, &RequestState::Loading)?;
                let state = view.retry().await;
                show(out, &state)?;
            }
            Command::Query(text) => {
                ask(view, &mut input, &mut submissions, out, text, false).await?;
            }
            Command::FollowUp(text) => {
                ask(view, &mut input, &mut submissions, out, text, true).await?;
            }
        }
    }

    info!("session ended");
    Ok(())
}

async fn ask<A: Analyzer, W: Write>(
    view: &ResultView<A>,
    input: &mut QueryInput,
    submissions: &mut mpsc::UnboundedReceiver<(String, bool)>,
    out: &mut W,
    text: String,
    is_follow_up: bool,
) -> anyhow::Result<()> {
    input.set_text(text);
    input.set_follow_up(is_follow_up);
    if let Err(e) = input.submit(view.location().as_ref()) {
        writeln!(out, "{e}")?;
        return Ok(());
    }
    while let Ok((query, is_follow_up)) = submissions.try_recv() {
        show(out, &RequestState::Loading)?;
        let state = view.submit(&query, is_follow_up).await;
        show(out, &state)?;
    }
    Ok(())
}

fn show<W: Write>(out: &mut W, state: &RequestState) -> std::io::Result<()> {
    debug!(state = state_name(state), "results state changed");
    match render_state(state, true) {
        Some(text) => writeln!(out, "\n{text}\n"),
        None => Ok(()),
    }
}

fn state_name(state: &RequestState) -> &'static str {
    match state {
        RequestState::Idle => "idle",
        RequestState::Loading => "loading",
        RequestState::Success(_) => "success",
        RequestState::Error(_) => "error",
    }
}
