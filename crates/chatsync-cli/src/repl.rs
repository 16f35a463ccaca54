use chatsync_sync::{SyncDriver, SyncError};
use chatsync_types::{AuthNotification, Delivery, Identity, Message, Notice, NoticeLevel, Thread};
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  /login <uid> [name]   sign in
  /logout               sign out and clear all cached chats
  /new [title]          create a chat and open it
  /chats                list chats
  /open <id>            open a chat
  /delete <id>          delete a chat
  /retry <id>           resend a failed message
  /show                 print the open chat
  /help                 this text
  /quit                 exit
Anything else is sent to the open chat.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { uid: String, name: Option<String> },
    Logout,
    New { title: Option<String> },
    Chats,
    Open(String),
    Delete(String),
    Retry(String),
    Show,
    Help,
    Quit,
    Send(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: /{0} (try /help)")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

impl Command {
    /// Parse one input line; blank lines give `Ok(None)`
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Command::Send(line.to_string())));
        };

        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };
        let optional = |args: &str| (!args.is_empty()).then(|| args.to_string());
        let required = |usage: &'static str| {
            if args.is_empty() {
                Err(CommandError::Usage(usage))
            } else {
                Ok(args.to_string())
            }
        };

        let command = match name {
            "login" => {
                let args = required("/login <uid> [name]")?;
                let (uid, name) = match args.split_once(char::is_whitespace) {
                    Some((uid, name)) => (uid.to_string(), optional(name.trim())),
                    None => (args, None),
                };
                Command::Login { uid, name }
            }
            "logout" => Command::Logout,
            "new" => Command::New { title: optional(args) },
            "chats" => Command::Chats,
            "open" => Command::Open(required("/open <id>")?),
            "delete" => Command::Delete(required("/delete <id>")?),
            "retry" => Command::Retry(required("/retry <id>")?),
            "show" => Command::Show,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

/// Run one command against the driver and print its direct output
pub async fn execute(driver: &SyncDriver, command: Command) -> Flow {
    let result = match command {
        Command::Login { uid, name } => {
            let mut identity = Identity::new(uid);
            if let Some(name) = name {
                identity = identity.with_display_name(name);
            }
            let label = identity.label().to_string();
            if driver.handle_session(AuthNotification::SignedIn(identity)).await {
                println!("Signed in as {}", label);
            }
            Ok(())
        }
        Command::Logout => {
            driver.handle_session(AuthNotification::SignedOut).await;
            Ok(())
        }
        Command::New { title } => driver.create_thread(title.as_deref()).await.map(|_| ()),
        Command::Chats => {
            let selected = driver.selected_thread().await.map(|thread| thread.id);
            print!("{}", render_threads(&driver.threads().await, selected.as_deref()));
            Ok(())
        }
        Command::Open(id) => driver.select_thread(Some(&id)).await.map(|_| ()),
        Command::Delete(id) => driver.delete_thread(&id).await,
        Command::Retry(id) => driver.retry_message(&id).await.map(|_| ()),
        Command::Show => {
            match driver.selected_thread().await {
                Some(thread) => {
                    println!("== {} ({})", thread.title, thread.id);
                    print!("{}", render_messages(&driver.messages().await));
                }
                None => println!("No chat open"),
            }
            Ok(())
        }
        Command::Help => {
            println!("{}", HELP);
            Ok(())
        }
        Command::Quit => return Flow::Quit,
        Command::Send(text) => driver.send_message(&text).await.map(|_| ()),
    };

    if let Err(err) = result {
        tracing::debug!(error = %err, "Command failed");
        if let Some(line) = describe_failure(&err) {
            println!("{}", line);
        }
    }
    Flow::Continue
}

/// Failures the driver has not already announced through a notice
pub fn describe_failure(err: &SyncError) -> Option<String> {
    match err {
        SyncError::Backend(_) | SyncError::NoThreadSelected => None,
        other => Some(format!("error: {}", other)),
    }
}

pub fn render_notice(notice: &Notice) -> String {
    let tag = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => "ok",
        NoticeLevel::Error => "error",
    };
    format!("[{}] {}", tag, notice.message)
}

pub fn render_threads(threads: &[Thread], selected: Option<&str>) -> String {
    if threads.is_empty() {
        return "No chats yet, create one with /new\n".to_string();
    }
    threads
        .iter()
        .map(|thread| {
            let marker = if Some(thread.id.as_str()) == selected { '*' } else { ' ' };
            format!(
                "{} {}  {}  {}\n",
                marker,
                thread.id,
                thread.title,
                thread.last_updated.format("%Y-%m-%d %H:%M")
            )
        })
        .collect()
}

pub fn render_message(message: &Message) -> String {
    let status = match message.delivery {
        Delivery::Pending => " (sending)".to_string(),
        Delivery::Failed => format!(" (failed, /retry {})", message.id),
        Delivery::Sent | Delivery::Synced => String::new(),
    };
    format!(
        "[{}] {}: {}{}",
        message.created_at.format("%H:%M:%S"),
        message.author,
        message.text,
        status
    )
}

pub fn render_messages(messages: &[Message]) -> String {
    if messages.is_empty() {
        return "(no messages)\n".to_string();
    }
    messages.iter().map(|message| render_message(message) + "\n").collect()
}
