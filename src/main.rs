mod cli;

use std::process::ExitCode;

use clap::Parser;
use crossbeam_channel::{bounded, never, select, Receiver};
use log::{debug, error, warn};
use rummage::{ChannelSink, RummageError, SearchEvent, Searcher};

use crate::cli::{format_results, format_summary, Cli};

const LOG_LEVEL: &str = "warn";

fn init_logger() {
    let env = env_logger::Env::default()
        .filter_or("RUMMAGE_LOG", LOG_LEVEL)
        .write_style_or("RUMMAGE_LOG_STYLE", "auto");

    env_logger::init_from_env(env);
}

fn main() -> ExitCode {
    init_logger();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("search failed: {e:?}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Ctrl-C arrives here instead of killing the process, so the search can be
/// cancelled and report it.
fn interrupts() -> Receiver<()> {
    let (tx, rx) = bounded(1);
    match ctrlc::set_handler(move || {
        let _ = tx.try_send(());
    }) {
        Ok(()) => rx,
        Err(e) => {
            warn!("Ctrl-C will not cancel the search: {e}");
            never()
        }
    }
}

enum Wake {
    Event(SearchEvent),
    Interrupt,
    Closed,
}

fn run(cli: &Cli) -> Result<ExitCode, RummageError> {
    let interrupted = interrupts();
    let (sink, events) = ChannelSink::new();
    let searcher = Searcher::new(cli.threads, sink)?.with_options(cli.search_options());
    let task = searcher.start_search(&cli.directory, &cli.pattern)?;
    debug!("submitted task {}", task.id());

    let mut outcome = Ok(ExitCode::SUCCESS);
    loop {
        let wake = select! {
            recv(events) -> event => event.map_or(Wake::Closed, Wake::Event),
            recv(interrupted) -> _ => Wake::Interrupt,
        };

        let event = match wake {
            Wake::Event(event) if event.task() == task.id() => event,
            Wake::Event(_) => continue,
            Wake::Interrupt => {
                debug!("interrupted, cancelling task {}", task.id());
                searcher.cancel();
                continue;
            }
            Wake::Closed => break,
        };

        match event {
            SearchEvent::Started(_) if cli.stream => println!("Search Results:"),
            SearchEvent::Started(_) => {}
            SearchEvent::Match(_, path) => println!("{}", path.display()),
            SearchEvent::Completed(_, results) => {
                if !cli.stream {
                    print!("{}", format_results(&results));
                } else if results.is_empty() {
                    println!("No matching files found.");
                }
                if cli.show_errors {
                    for err in &results.errors {
                        eprintln!("Skipped: {err}");
                    }
                }
                eprintln!("{}", format_summary(&results));
                break;
            }
            SearchEvent::Cancelled(_, reason) => {
                eprintln!("Search {reason}.");
                outcome = Ok(ExitCode::from(130));
                break;
            }
            SearchEvent::Failed(_, err) => {
                outcome = Err(err);
                break;
            }
        }
    }

    searcher.shutdown();
    outcome
}
