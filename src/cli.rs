//! Command-line interface definition using clap.

use clap::Parser;

use crate::parsing::date_order::DateOrder;

/// Reconstruct a conversation timeline from exported chat history files.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatloom")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    chatloom chat.txt
    chatloom chat.txt backup.txt --me \"My Name\" --phone 5551234567
    chatloom export.txt --attachments media/ -o chat.json
    chatloom export.txt --date-order month-first --stats")]
pub struct Args {
    /// Export text files; several files merge as redundant backups of one
    /// conversation
    #[arg(required = true, value_name = "EXPORT")]
    pub exports: Vec<String>,

    /// Directory holding the exported media files
    #[arg(long, value_name = "DIR")]
    pub attachments: Option<String>,

    /// Display name the exports use for you
    #[arg(long, value_name = "NAME")]
    pub me: Option<String>,

    /// Phone number the exports may use for you (repeatable)
    #[arg(long, value_name = "NUMBER")]
    pub phone: Vec<String>,

    /// Write the merged chat as JSON instead of a summary
    #[arg(short, long, value_name = "OUT")]
    pub output: Option<String>,

    /// Force the date order instead of inferring it
    #[arg(long, value_enum, value_name = "ORDER")]
    pub date_order: Option<DateOrder>,

    /// Print per-source parsing statistics
    #[arg(long)]
    pub stats: bool,
}
