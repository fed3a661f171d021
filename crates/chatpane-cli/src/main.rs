//! chatpane CLI: Two-pane messaging client for the terminal

use chatpane_engine::config::DATA_DIR;
use chatpane_engine::{
    ClientConfig, CompletionOutcome, Conversation, ConversationId, Direction, Fixture, FixtureError,
    MemoryTransport, MessageId, MessageStatus, Session,
};
use chatpane_tui::widgets::format_time;
use clap::{Parser, Subcommand};
use std::fmt::Display;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Two-pane messaging client with a terminal UI
#[derive(Parser)]
#[command(name = "chatpane")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: .chatpane/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed conversations from a JSON fixture instead of the demo data
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the TUI (default when no command specified)
    Tui,

    /// Print conversations, most recent first
    List {
        /// Only show conversations whose name contains this text
        #[arg(long)]
        query: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the messages of one conversation
    Thread {
        /// Conversation id
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send a message and wait for the result
    Send {
        /// Conversation id
        id: String,

        /// Message text
        text: String,
    },

    /// Write the default config file
    Init,
}

const LOG_FILE: &str = "chatpane.log";

fn main() {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| ClientConfig::default_path(Path::new(".")));

    if matches!(cli.command, Some(Commands::Init)) {
        cmd_init(&config_path);
        return;
    }

    let config = ClientConfig::load_or_default(&config_path)
        .unwrap_or_else(|e| fail(format!("Failed to load {}: {e}", config_path.display())));

    let tui_mode = matches!(cli.command, None | Some(Commands::Tui));
    let log_dir = config_path.parent().filter(|p| !p.as_os_str().is_empty());
    init_logging(&config, tui_mode.then(|| log_dir.unwrap_or(Path::new(DATA_DIR))));
    info!(config = %config_path.display(), fixture = ?cli.fixture, "chatpane starting");

    let transport = build_transport(cli.fixture.as_deref(), &config)
        .unwrap_or_else(|e| fail(format!("Failed to load fixture: {e}")));

    let rt = tokio::runtime::Runtime::new()
        .unwrap_or_else(|e| fail(format!("Failed to create tokio runtime: {e}")));

    let command = cli.command;
    rt.block_on(async move {
        let session = Session::new(Arc::new(transport), &config);
        match command {
            None | Some(Commands::Tui) => {
                if let Err(e) = chatpane_tui::run_tui(session, &config).await {
                    fail(e);
                }
            }
            Some(Commands::List { query, json }) => cmd_list(session, query.as_deref(), json).await,
            Some(Commands::Thread { id, json }) => cmd_thread(session, &id, json).await,
            Some(Commands::Send { id, text }) => cmd_send(session, &id, &text).await,
            Some(Commands::Init) => {}
        }
    });
}

fn fail(message: impl Display) -> ! {
    eprintln!("Error: {message}");
    std::process::exit(1);
}

/// Install the tracing subscriber.
///
/// With `log_dir` set (TUI mode) logs go to a file so they do not draw over
/// the screen. Otherwise they go to stderr.
fn init_logging(config: &ClientConfig, log_dir: Option<&Path>) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    let Some(dir) = log_dir else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return;
    };

    let path = dir.join(LOG_FILE);
    let file = std::fs::create_dir_all(dir)
        .and_then(|()| OpenOptions::new().create(true).append(true).open(&path));
    match file {
        Ok(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        // No log file means no logs; the TUI still runs.
        Err(e) => eprintln!("Warning: cannot open {}: {e}", path.display()),
    }
}

fn build_transport(
    fixture: Option<&Path>,
    config: &ClientConfig,
) -> Result<MemoryTransport, FixtureError> {
    let fixture = match fixture {
        Some(path) => Fixture::load(path)?,
        None => Fixture::demo()?,
    };
    let transport = MemoryTransport::new()
        .with_latency(config.demo_latency())
        .with_auto_reply(config.demo.auto_reply);
    fixture.seed(&transport);
    Ok(transport)
}

/// Apply completions until one satisfies `done`.
async fn await_outcome(
    session: &mut Session,
    done: impl Fn(&CompletionOutcome) -> bool,
) -> CompletionOutcome {
    loop {
        let Some(completion) = session.next_completion().await else {
            fail("session closed");
        };
        match session.handle_completion(completion) {
            Ok(outcome) if done(&outcome) => return outcome,
            Ok(_) => {}
            Err(e) => fail(e),
        }
    }
}

async fn load_conversations(session: &mut Session) {
    session.refresh_conversations();
    let outcome = await_outcome(session, |o| {
        matches!(
            o,
            CompletionOutcome::Conversations { .. } | CompletionOutcome::ConversationsFailed(_)
        )
    })
    .await;
    if let CompletionOutcome::ConversationsFailed(e) = outcome {
        fail(format!("Failed to load conversations: {e}"));
    }
}

async fn cmd_list(mut session: Session, query: Option<&str>, json: bool) {
    load_conversations(&mut session).await;
    if let Some(query) = query {
        session.set_query(query);
    }
    let conversations: Vec<&Conversation> = session.state().filtered_conversations().collect();

    if json {
        match serde_json::to_string_pretty(&conversations) {
            Ok(out) => println!("{out}"),
            Err(e) => fail(e),
        }
        return;
    }

    if conversations.is_empty() {
        println!("No conversations");
        return;
    }
    for conversation in &conversations {
        let unread = if conversation.unread_count > 0 {
            format!(" ({} unread)", conversation.unread_count)
        } else {
            String::new()
        };
        println!(
            "{}  {:<16} {}{unread}",
            format_time(conversation.last_activity_at),
            conversation.id.as_str(),
            conversation.display_name,
        );
        if !conversation.last_message_preview.is_empty() {
            println!("       {}", conversation.last_message_preview);
        }
    }
}

async fn cmd_thread(mut session: Session, id: &str, json: bool) {
    load_conversations(&mut session).await;
    let id = ConversationId::new(id);

    match session.select_conversation(&id) {
        Ok(Some(_)) => {
            let outcome = await_outcome(&mut session, |o| match o {
                CompletionOutcome::ThreadLoaded { conversation_id, .. }
                | CompletionOutcome::ThreadDiscarded { conversation_id }
                | CompletionOutcome::ThreadFailed { conversation_id, .. } => conversation_id == &id,
                _ => false,
            })
            .await;
            if let CompletionOutcome::ThreadFailed { error, .. } = outcome {
                fail(format!("Failed to load thread {id}: {error}"));
            }
        }
        Ok(None) => {}
        Err(e) => fail(e),
    }

    let thread = session.state().get_thread(&id).unwrap_or_else(|e| fail(e));

    if json {
        match serde_json::to_string_pretty(thread) {
            Ok(out) => println!("{out}"),
            Err(e) => fail(e),
        }
        return;
    }

    if let Some(conversation) = session.state().conversations.get(&id) {
        println!("{} ({id})\n", conversation.display_name);
    }
    for message in thread {
        let arrow = match message.direction {
            Direction::Incoming => "<",
            Direction::Outgoing => ">",
        };
        let status = if message.is_outgoing() {
            format!(" [{}]", message.status)
        } else {
            String::new()
        };
        println!("{} {arrow} {}{status}", format_time(message.created_at), message.text);
    }
}

async fn cmd_send(mut session: Session, id: &str, text: &str) {
    load_conversations(&mut session).await;
    let id = ConversationId::new(id);

    let pending = session.submit(&id, text).unwrap_or_else(|e| fail(e));
    let message_id: MessageId = pending.message_id;

    let outcome = await_outcome(&mut session, |o| {
        matches!(o, CompletionOutcome::Sent { message_id: m, .. } if m == &message_id)
    })
    .await;

    let CompletionOutcome::Sent { status, error, .. } = outcome else {
        return;
    };
    match (status, error) {
        (MessageStatus::Sent, _) => {
            let receipt = session
                .state()
                .messages
                .get_message(&id, &message_id)
                .and_then(|m| m.receipt.as_ref())
                .map(|r| format!(" (remote id {})", r.remote_id))
                .unwrap_or_default();
            println!("sent {message_id}{receipt}");
        }
        (_, Some(error)) => fail(format!("send failed: {error}")),
        (status, None) => fail(format!("send ended {status}")),
    }
}

fn cmd_init(config_path: &Path) {
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return;
    }
    match ClientConfig::default().save(config_path) {
        Ok(()) => println!("Wrote default config to {}", config_path.display()),
        Err(e) => fail(format!("Failed to write {}: {e}", config_path.display())),
    }
}
