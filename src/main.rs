use anyhow::{Context, Result};
use auto_resume::controller::{AppController, CancelReason, Intent, Snapshot};
use auto_resume::global_hotkey::spawn_hotkey_listener;
use auto_resume::runtime::{EventLoop, Notice, UiEvent};
use auto_resume::{platform, AppState, Config, ProcessFinder, SystemClock};
use clap::Parser;
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::thread;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "arcc",
    version,
    about = "Types RESUME into a chosen window shortly after an upcoming hour boundary"
)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Hours past the next hour boundary to fire at (0-4)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=4))]
    offset: Option<u8>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Write the default configuration to PATH and exit
    #[arg(long, value_name = "PATH")]
    write_default_config: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Intent(Intent),
    Help,
    Status,
}

fn parse_command(line: &str) -> Option<Command> {
    let command = line.trim().to_ascii_lowercase();
    if let Ok(index) = command.parse::<usize>() {
        return Some(Command::Intent(Intent::SelectHour(index)));
    }
    let parsed = match command.as_str() {
        "t" | "target" => Command::Intent(Intent::BeginCapture),
        "c" | "cancel" => Command::Intent(Intent::CancelCapture(CancelReason::User)),
        "s" | "start" | "stop" => Command::Intent(Intent::ToggleCountdown),
        "q" | "quit" | "exit" => Command::Intent(Intent::Quit),
        "h" | "help" | "?" => Command::Help,
        "status" => Command::Status,
        _ => return None,
    };
    Some(parsed)
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("auto_resume=debug,arcc=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  {}        select the target window by clicking it", "t".cyan());
    println!("  {}        cancel window selection", "c".cyan());
    println!("  {}    fire at the next hour plus N hours", "0-4".cyan());
    println!("  {}        start or stop the countdown", "s".cyan());
    println!("  {}   print the current state as JSON", "status".cyan());
    println!("  {}        quit", "q".cyan());
}

/// Blocking stdin reader on its own thread; the process may exit while it
/// is parked in a read.
fn spawn_stdin_reader() -> UnboundedReceiver<String> {
    let (tx, rx) = unbounded_channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

#[derive(Default)]
struct TerminalView {
    last: Option<Snapshot>,
    countdown_open: bool,
}

impl TerminalView {
    fn render(&mut self, event: UiEvent, capturing: &watch::Sender<bool>) {
        match event {
            UiEvent::Snapshot(snapshot) => {
                capturing.send_if_modified(|current| {
                    let changed = *current != snapshot.capturing;
                    *current = snapshot.capturing;
                    changed
                });
                self.render_snapshot(snapshot);
            }
            UiEvent::Notice(notice) => {
                self.end_countdown_line();
                match notice {
                    Notice::TargetAcquired(target) => {
                        println!("{} {}", "✅ Target captured:".green(), target.label())
                    }
                    Notice::Fired(target) => println!(
                        "{} {}",
                        "🚀 RESUME sent to".green().bold(),
                        target.process_name
                    ),
                    Notice::Warning(message) => println!("{} {}", "⚠️ ".yellow(), message.yellow()),
                    Notice::Error(message) => println!("{} {}", "❌".red(), message.red()),
                }
            }
        }
    }

    fn render_snapshot(&mut self, snapshot: Snapshot) {
        let changed = self.last.as_ref().map_or(true, |last| {
            last.state != snapshot.state
                || last.capturing != snapshot.capturing
                || last.target != snapshot.target
                || last.hour_offset != snapshot.hour_offset
        });

        if changed {
            self.end_countdown_line();
            print_status(&snapshot);
        }

        if let (AppState::Waiting, Some(_)) = (snapshot.state, &snapshot.countdown) {
            print!("\r⏳ {}", snapshot.start_button_text.cyan());
            let _ = io::stdout().flush();
            self.countdown_open = true;
        } else {
            self.end_countdown_line();
        }
        self.last = Some(snapshot);
    }

    fn end_countdown_line(&mut self) {
        if self.countdown_open {
            println!();
            self.countdown_open = false;
        }
    }

    fn print_json(&mut self) {
        let Some(snapshot) = &self.last else { return };
        self.countdown_open = false;
        match serde_json::to_string_pretty(snapshot) {
            Ok(json) => println!("\n{json}"),
            Err(e) => warn!(error = %e, "could not serialize state"),
        }
    }
}

fn print_status(snapshot: &Snapshot) {
    let target = snapshot.target_button_text.replace('\n', " ");
    let hour = snapshot
        .hour_labels
        .get(snapshot.hour_offset.index())
        .map(String::as_str)
        .unwrap_or("?");
    let state = match snapshot.state {
        AppState::Idle => "idle".dimmed(),
        AppState::Ready => "ready".green(),
        AppState::Waiting => "waiting".cyan(),
    };
    println!(
        "🎯 {}  🕐 {} ({})  [{}]",
        target.bold(),
        hour,
        snapshot.hour_offset,
        state
    );
    if snapshot.state != AppState::Waiting {
        println!("   {}", snapshot.start_button_text.dimmed());
    }
}

async fn run_terminal(
    intents: UnboundedSender<Intent>,
    mut ui: UnboundedReceiver<UiEvent>,
    capturing: watch::Sender<bool>,
) {
    let mut lines = spawn_stdin_reader();
    let mut view = TerminalView::default();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = ui.recv() => match event {
                Some(event) => view.render(event, &capturing),
                None => break,
            },
            line = lines.recv(), if stdin_open => match line {
                Some(line) => match parse_command(&line) {
                    Some(Command::Intent(intent)) => {
                        let _ = intents.send(intent);
                    }
                    Some(Command::Help) => print_help(),
                    Some(Command::Status) => view.print_json(),
                    None if line.trim().is_empty() => {}
                    None => println!("{} '{}' (type h for help)", "Unknown command".yellow(), line.trim()),
                },
                None => stdin_open = false,
            },
        }
    }
    view.end_countdown_line();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.write_default_config {
        Config::default()
            .save_to_file(path)
            .with_context(|| format!("Failed to write default config to {path}"))?;
        println!("{} {}", "📝 Default configuration written to".green(), path);
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.validate()?;
    init_tracing(cli.verbose || config.verbose);

    let platform = platform::native().context("Cannot run on this platform")?;
    let (click_tx, click_rx) = unbounded_channel();
    let (intent_tx, intent_rx) = unbounded_channel();
    let (ui_tx, ui_rx) = unbounded_channel();
    let (capturing_tx, capturing_rx) = watch::channel(false);

    let mut controller = AppController::new(
        SystemClock,
        platform,
        Box::new(ProcessFinder::new()),
        &config,
        click_tx,
    )?;
    if let Some(offset) = cli.offset {
        controller.select_hour(usize::from(offset))?;
    }

    match spawn_hotkey_listener(&config, capturing_rx, intent_tx.clone()) {
        Ok(_) => info!("global hotkeys active"),
        Err(e) => warn!(error = %e, "global hotkeys unavailable"),
    }

    println!("{}", "⏰ Auto Resume".bold());
    print_help();

    // The terminal runs on a worker so it stays live during the settle delay
    // of a fire. The event loop is awaited here, on the main thread, because
    // sleep inhibition must be released by the thread that requested it.
    let terminal = tokio::spawn(run_terminal(intent_tx, ui_rx, capturing_tx));
    let event_loop = EventLoop::new(controller, intent_rx, click_rx, ui_tx, config.tick_interval);
    event_loop
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    let _ = terminal.await;
    println!("{}", "👋 Bye".dimmed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command(" T "),
            Some(Command::Intent(Intent::BeginCapture))
        );
        assert_eq!(
            parse_command("3"),
            Some(Command::Intent(Intent::SelectHour(3)))
        );
        assert_eq!(
            parse_command("stop"),
            Some(Command::Intent(Intent::ToggleCountdown))
        );
        assert_eq!(parse_command("?"), Some(Command::Help));
        assert_eq!(parse_command("resume"), None);
    }

    #[test]
    fn test_out_of_range_hour_is_left_to_the_controller() {
        assert_eq!(
            parse_command("9"),
            Some(Command::Intent(Intent::SelectHour(9)))
        );
    }

    #[test]
    fn test_cli_rejects_offset_out_of_range() {
        assert!(Cli::try_parse_from(["arcc", "--offset", "5"]).is_err());
        let cli = Cli::try_parse_from(["arcc", "-o", "4", "-v"]).unwrap();
        assert_eq!(cli.offset, Some(4));
        assert!(cli.verbose);
    }
}
