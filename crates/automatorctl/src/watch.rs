//! Interactive `watch` loop: periodic redraw plus one-letter commands on stdin.

use std::io::IsTerminal;
use std::sync::Arc;

use automator_client::{HttpTransport, Mirror, MirrorError, RefreshScheduler};
use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::render;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCommand {
    Refresh,
    TogglePolling,
    ToggleProcess(String),
    StartTask(String),
    Quit,
}

impl WatchCommand {
    /// `None` for blank or unrecognized input.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let cmd = words.next()?;
        let arg = words.next().map(str::to_owned);
        match (cmd, arg) {
            ("r", None) => Some(WatchCommand::Refresh),
            ("p", None) => Some(WatchCommand::TogglePolling),
            ("q", None) => Some(WatchCommand::Quit),
            ("t", Some(name)) => Some(WatchCommand::ToggleProcess(name)),
            ("s", Some(name)) => Some(WatchCommand::StartTask(name)),
            _ => None,
        }
    }
}

const HELP: &str = "commands: r (refresh)  p (pause/resume)  t <process>  s <task>  q (quit)";

type Scheduler = RefreshScheduler<HttpTransport>;

/// Mutations and refreshes started from stdin, each resolving to a line for
/// the operator when it failed.
type Pending<'a> = FuturesUnordered<BoxFuture<'a, Option<String>>>;

fn redraw(scheduler: &Scheduler) {
    let now = chrono::Utc::now();
    let store = scheduler.mirror().store();
    if std::io::stdout().is_terminal() {
        print!("\x1b[2J\x1b[H");
    }
    println!("{}", render::mode_line(scheduler.mode(), now));
    println!("{}", render::processes_table(&store.processes(), now));
    println!("{}", render::tasks_table(&store.tasks(), now));
    println!("{HELP}");
}

fn failure<R>(what: String, result: Result<R, MirrorError>) -> Option<String> {
    result.err().map(|e| format!("{what}: {:#}", crate::explain(e)))
}

// Overlays are applied here, synchronously, so the redraw that follows
// already shows them.
fn dispatch<'a>(
    scheduler: &'a Scheduler,
    mirror: &'a Mirror<HttpTransport>,
    command: WatchCommand,
    pending: &mut Pending<'a>,
) {
    match command {
        WatchCommand::Refresh => pending.push(
            scheduler
                .manual_refresh()
                .map(|summary| {
                    (!summary.all_ok()).then(|| format!("refresh failed for {:?}", summary.failed))
                })
                .boxed(),
        ),
        WatchCommand::TogglePolling => scheduler.toggle(),
        WatchCommand::ToggleProcess(name) => match mirror.store().process(&name) {
            Some(handle) => pending.push(
                mirror
                    .toggle_status(&handle)
                    .map(move |r| failure(format!("toggle {name}"), r))
                    .boxed(),
            ),
            None => println!("no process named {name:?}"),
        },
        WatchCommand::StartTask(name) => match mirror.store().task(&name) {
            Some(handle) => pending.push(
                mirror
                    .start_task_instance(&handle)
                    .map(move |r| failure(format!("start {name}"), r))
                    .boxed(),
            ),
            None => println!("no task named {name:?}"),
        },
        WatchCommand::Quit => {}
    }
}

/// Poll in `Auto` mode and redraw every `redraw_every` until `q`, end of
/// input or Ctrl-C.
pub async fn run(scheduler: Arc<Scheduler>, redraw_every: std::time::Duration) -> anyhow::Result<()> {
    let mirror = Arc::clone(scheduler.mirror());
    let mut pending: Pending<'_> = FuturesUnordered::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tick = tokio::time::interval(redraw_every);
    scheduler.start_fetching();

    loop {
        tokio::select! {
            _ = tick.tick() => redraw(&scheduler),
            Some(outcome) = pending.next(), if !pending.is_empty() => {
                redraw(&scheduler);
                if let Some(message) = outcome {
                    println!("{message}");
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match WatchCommand::parse(&line) {
                    Some(WatchCommand::Quit) => break,
                    Some(command) => {
                        dispatch(&scheduler, &mirror, command, &mut pending);
                        redraw(&scheduler);
                    }
                    None if line.trim().is_empty() => redraw(&scheduler),
                    None => println!("{HELP}"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    scheduler.shutdown();
    Ok(())
}
