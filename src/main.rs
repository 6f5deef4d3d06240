//! # chatloom CLI
//!
//! Parses one or more chat export files, merges them, and prints the
//! reconstructed conversation as a summary or JSON document.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use std::process;
use std::time::Instant;

use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;

use chatloom::attachments::{Attachment, AttachmentIndex};
use chatloom::chat::{merge_chats, parse_chat, Chat, ChatKind};
use chatloom::cli::Args;
use chatloom::config::{LocalIdentity, ParseConfig};
use chatloom::timeline::build_timeline;
use chatloom::ChatloomError;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), ChatloomError> {
    let total_start = Instant::now();
    let args = <Args as ClapParser>::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = ParseConfig::new();
    if let Some(order) = args.date_order {
        config = config.with_date_order(order);
    }
    if let Some(ref me) = args.me {
        let mut identity = LocalIdentity::new(me.clone());
        for number in &args.phone {
            identity = identity.with_phone(number.clone());
        }
        config = config.with_local_identity(identity);
    }

    let attachments = match args.attachments {
        Some(ref dir) => index_directory(Path::new(dir))?,
        None => AttachmentIndex::new(),
    };
    if !attachments.is_empty() {
        println!("media files indexed: {}", attachments.len());
    }

    let mut chats = Vec::with_capacity(args.exports.len());
    for path in &args.exports {
        let raw = fs::read_to_string(path)?;
        let chat = parse_chat(path, &raw, &attachments, &config);
        if let Some(ref err) = chat.parse_error {
            eprintln!("warning: {path}: {err}");
        } else if args.stats {
            print_stats(path, &chat);
        }
        chats.push(chat);
    }

    let merged = merge_chats(chats, &config.local_identity);
    if merged.is_failed() {
        return Err(ChatloomError::parse(
            args.exports.join(", "),
            "no source could be parsed",
        ));
    }

    match args.output {
        Some(ref out) => {
            let file = File::create(out)?;
            serde_json::to_writer_pretty(BufWriter::new(file), &merged)?;
            println!("written: {out}");
        }
        None => print_summary(&merged, &config),
    }

    tracing::debug!(elapsed = ?total_start.elapsed(), "done");
    Ok(())
}

/// Indexes every regular file under `dir` (one level of subdirectories
/// included, matching how export archives lay out media folders).
fn index_directory(dir: &Path) -> Result<AttachmentIndex, ChatloomError> {
    let mut index = AttachmentIndex::new();
    collect_files(dir, &mut index, 0)?;
    Ok(index)
}

fn collect_files(dir: &Path, index: &mut AttachmentIndex, depth: u8) -> Result<(), ChatloomError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            if depth < 1 {
                collect_files(&path, index, depth + 1)?;
            }
            continue;
        }
        let metadata = entry.metadata()?;
        index.insert(Attachment {
            filename: path.to_string_lossy().into_owned(),
            mime_type: None,
            size_bytes: Some(metadata.len()),
            remote_id: None,
            preview: None,
        });
    }
    Ok(())
}

fn print_stats(path: &str, chat: &Chat) {
    let Some(stats) = chat.stats else { return };
    println!("{path}:");
    println!("  lines:     {}", stats.total_lines);
    println!("  messages:  {}", stats.message_count);
    println!("  system:    {}", stats.system_count);
    println!("  discarded: {}", stats.discarded_lines);
    println!("  dates:     {:?}", stats.date_order);
}

fn print_summary(chat: &Chat, config: &ParseConfig) {
    let kind = match chat.kind {
        ChatKind::OneToOne => "one-to-one",
        ChatKind::Group => "group",
    };
    println!("{} ({kind})", chat.name);
    for participant in &chat.participants {
        println!("  - {}", participant.name);
    }

    let reference = chrono::Utc::now().date_naive();
    let timeline = build_timeline(&chat.messages, config.grouping_window_minutes, reference);
    println!(
        "{} messages across {} days",
        chat.messages.len(),
        timeline.len()
    );
    if let (Some(first), Some(last)) = (chat.messages.first(), chat.messages.last()) {
        println!("from {} to {}", first.timestamp, last.timestamp);
    }
}
