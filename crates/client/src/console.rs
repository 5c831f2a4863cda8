//! Line-oriented console front end for the queue.
//!
//! Reads commands such as `add part.gcode 3` or `up 2` from stdin and
//! forwards them through a [`QueueHandle`]. Stands in for a graphical
//! view: it only issues commands and prints the queue.

use printq_core::queue::QueueEntry;
use printq_core::types::EntryId;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::processor::{QueueHandle, QueueHandleError};
use crate::transport::StartMode;

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Add { file_name: String, copies: u32 },
    Placeholder,
    AddSelected,
    Up(EntryId),
    Down(EntryId),
    Remove(EntryId),
    Copies { id: EntryId, copies: u32 },
    Clear,
    Start(StartMode),
    Refresh,
    List,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  add <file> [copies]   append a file (name may contain spaces)
  placeholder           append an empty row for the next selected file
  selected              append the file selected on the server
  up <id> | down <id>   move a row
  rm <id>               remove a row
  copies <id> <n>       set the copy count of a row
  clear                 empty the queue
  start | continuous    start printing the queue
  refresh               reload the queue from the server
  list                  show the queue
  quit";

/// Parse one console line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    if verb == "add" {
        let rest = &line.trim_start()[verb.len()..];
        return parse_add(rest).map(Some);
    }
    let args: Vec<&str> = words.collect();

    let command = match (verb, args.as_slice()) {
        ("placeholder", []) => ConsoleCommand::Placeholder,
        ("selected", []) => ConsoleCommand::AddSelected,
        ("up", [id]) => ConsoleCommand::Up(parse_number(id)?),
        ("down", [id]) => ConsoleCommand::Down(parse_number(id)?),
        ("rm", [id]) => ConsoleCommand::Remove(parse_number(id)?),
        ("copies", [id, copies]) => ConsoleCommand::Copies {
            id: parse_number(id)?,
            copies: parse_number(copies)?,
        },
        ("clear", []) => ConsoleCommand::Clear,
        ("start", []) => ConsoleCommand::Start(StartMode::Sequential),
        ("continuous", []) => ConsoleCommand::Start(StartMode::Continuous),
        ("refresh", []) => ConsoleCommand::Refresh,
        ("list" | "ls", []) => ConsoleCommand::List,
        ("help" | "?", []) => ConsoleCommand::Help,
        ("quit" | "exit", []) => ConsoleCommand::Quit,
        _ => return Err(format!("unrecognized command '{}'", line.trim())),
    };
    Ok(Some(command))
}

/// `add` takes the rest of the line as the file name, so names may contain
/// spaces. A trailing whole number is the copy count.
fn parse_add(rest: &str) -> Result<ConsoleCommand, String> {
    let rest = rest.trim();
    if rest.is_empty() {
        return Err("add needs a file name".to_string());
    }

    let counted = rest.rsplit_once(char::is_whitespace).and_then(|(name, count)| {
        let copies = count.parse::<u32>().ok()?;
        Some((name.trim_end(), copies))
    });
    let (file_name, copies) = counted.unwrap_or((rest, 1));

    Ok(ConsoleCommand::Add {
        file_name: file_name.to_string(),
        copies,
    })
}

fn parse_number<N: std::str::FromStr>(word: &str) -> Result<N, String> {
    word.parse().map_err(|_| format!("'{word}' is not a number"))
}

/// Render entries as a numbered table.
pub fn format_entries(entries: &[QueueEntry]) -> String {
    if entries.is_empty() {
        return "(queue is empty)".to_string();
    }
    entries
        .iter()
        .map(|e| {
            let name = if e.is_placeholder() {
                "<waiting for selection>"
            } else {
                e.file_name.as_str()
            };
            format!("[{:>3}] {name} x{}", e.id, e.copies)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read commands from `input` until EOF or `quit`.
pub async fn run_console<R>(input: R, handle: QueueHandle)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read console input");
                break;
            }
        };

        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}; type 'help' for commands");
                continue;
            }
        };

        if command == ConsoleCommand::Quit {
            break;
        }

        match execute(&handle, command).await {
            Ok(output) => println!("{output}"),
            Err(QueueHandleError::Closed) => break,
            Err(e) => println!("error: {e}"),
        }
    }
}

/// Run one command and describe the outcome.
pub async fn execute(
    handle: &QueueHandle,
    command: ConsoleCommand,
) -> Result<String, QueueHandleError> {
    let outcome = match command {
        ConsoleCommand::Add { file_name, copies } => {
            let id = handle.add_entry(file_name, copies).await?;
            format!("added row {id}")
        }
        ConsoleCommand::Placeholder => {
            let id = handle.add_placeholder().await?;
            format!("added placeholder row {id}")
        }
        ConsoleCommand::AddSelected => {
            let id = handle.add_selected_file().await?;
            format!("added row {id}")
        }
        ConsoleCommand::Up(id) => moved(handle.move_up(id).await?),
        ConsoleCommand::Down(id) => moved(handle.move_down(id).await?),
        ConsoleCommand::Remove(id) => {
            if handle.remove(id).await? {
                format!("removed row {id}")
            } else {
                format!("no row {id}")
            }
        }
        ConsoleCommand::Copies { id, copies } => {
            handle.set_copies(id, copies).await?;
            format!("row {id} prints {copies} time(s)")
        }
        ConsoleCommand::Clear => {
            handle.clear().await?;
            "queue cleared".to_string()
        }
        ConsoleCommand::Start(mode) => {
            handle.start(mode).await?;
            "queue started".to_string()
        }
        ConsoleCommand::Refresh => {
            handle.refresh().await?;
            format_entries(&handle.snapshot().await?)
        }
        ConsoleCommand::List => format_entries(&handle.snapshot().await?),
        ConsoleCommand::Help => HELP.to_string(),
        ConsoleCommand::Quit => String::new(),
    };
    Ok(outcome)
}

fn moved(changed: bool) -> String {
    let text = if changed { "moved" } else { "unchanged" };
    text.to_string()
}
