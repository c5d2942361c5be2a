//! msgsearch - command-line client for the msgsearch daemon.

mod client;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use msgsearch_common::{MessageCategory, MessagePatch, NewMessage, Response, SearchResultRow};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

use client::IpcClient;

#[derive(Parser)]
#[command(name = "msgsearch", version, about = "Search and manage stored messages")]
struct Cli {
    /// Daemon socket (defaults to the XDG runtime directory)
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Category {
    Sms,
    Mms,
}

impl From<Category> for MessageCategory {
    fn from(category: Category) -> Self {
        match category {
            Category::Sms => MessageCategory::Sms,
            Category::Mms => MessageCategory::Mms,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Full-text search, newest first
    Search {
        /// Search terms; each matches as a word prefix
        #[arg(required = true)]
        terms: Vec<String>,
        /// Only search this thread
        #[arg(long)]
        thread: Option<i64>,
        /// Print rows as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Create a conversation thread
    NewThread {
        /// Recipient owning the conversation
        recipient: i64,
    },
    /// Store a message
    Add {
        #[arg(long, value_enum, default_value = "sms")]
        category: Category,
        #[arg(long)]
        thread: i64,
        /// Sender recipient id
        #[arg(long)]
        from: i64,
        /// Received timestamp in milliseconds (defaults to now)
        #[arg(long)]
        date: Option<i64>,
        /// Type/flags bitmask
        #[arg(long, default_value_t = 0)]
        flags: i64,
        body: String,
    },
    /// Change a stored message
    Edit {
        #[arg(long, value_enum)]
        category: Category,
        id: i64,
        #[arg(long, conflicts_with = "clear_body")]
        body: Option<String>,
        #[arg(long)]
        clear_body: bool,
        #[arg(long)]
        flags: Option<i64>,
        #[arg(long)]
        thread: Option<i64>,
    },
    /// Delete a stored message
    Rm {
        #[arg(long, value_enum)]
        category: Category,
        id: i64,
    },
    /// Check the search indexes against the message tables
    Verify,
    /// Show daemon status
    Status,
    /// Check that the daemon is running
    Ping,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("msgsearch=warn".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let socket = cli.socket.unwrap_or_else(msgsearch_common::socket_path);
    let mut client = IpcClient::connect(&socket)?;

    match cli.command {
        Command::Search {
            terms,
            thread,
            json,
        } => {
            let rows = client.search(terms.join(" "), thread)?;
            for row in &rows {
                if json {
                    println!("{}", serde_json::to_string(row)?);
                } else {
                    println!("{}", format_row(row));
                }
            }
            if !json {
                eprintln!("{} result(s)", rows.len());
            }
        }
        Command::NewThread { recipient } => {
            println!("{}", client.create_thread(recipient)?);
        }
        Command::Add {
            category,
            thread,
            from,
            date,
            flags,
            body,
        } => {
            let message = NewMessage {
                thread_id: thread,
                body: Some(body),
                date_received: date.unwrap_or_else(now_millis),
                recipient_id: from,
                type_flags: flags,
            };
            println!("{}", client.insert_message(category.into(), message)?);
        }
        Command::Edit {
            category,
            id,
            body,
            clear_body,
            flags,
            thread,
        } => {
            let patch = MessagePatch {
                body: if clear_body { Some(None) } else { body.map(Some) },
                type_flags: flags,
                thread_id: thread,
            };
            client.update_message(category.into(), id, patch)?;
        }
        Command::Rm { category, id } => {
            client.delete_message(category.into(), id)?;
        }
        Command::Verify => {
            client.verify_index()?;
            println!("Search indexes are consistent");
        }
        Command::Status => {
            if let Response::Status {
                version,
                sms_count,
                mms_count,
                database_size_bytes,
            } = client.status()?
            {
                println!("version:  {}", version);
                println!("sms:      {}", sms_count);
                println!("mms:      {}", mms_count);
                println!("database: {} bytes", database_size_bytes);
            }
        }
        Command::Ping => {
            client.ping()?;
            println!("pong");
        }
    }

    Ok(())
}

fn format_row(row: &SearchResultRow) -> String {
    format!(
        "[{} #{}] thread {} from {} at {}: {}",
        row.category(),
        row.message_id,
        row.thread_id,
        row.message_recipient,
        row.date_received,
        row.snippet
    )
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
