//! # Chatloom
//!
//! A Rust library for reconstructing conversation timelines from exported
//! chat history text files.
//!
//! ## Overview
//!
//! Chat exports are line-oriented text with locale-ambiguous timestamps,
//! multi-line message bodies, media references, and system notices mixed
//! together. Chatloom parses that text into structured messages, merges
//! redundant backups of the same conversation, and groups the result into a
//! display-ready timeline:
//!
//! - line normalization that strips invisible direction marks
//! - one-shot day-first/month-first date-order inference per source
//! - message assembly with media, edit, quote, and call detection
//! - cross-backup merging with content-addressed deduplication
//! - day and bubble grouping with relative day labels
//! - an optional byte-budgeted media cache with request coalescing
//!   (feature `cache`)
//!
//! ## Quick Start
//!
//! ```rust
//! use chatloom::attachments::AttachmentIndex;
//! use chatloom::chat::parse_chat;
//! use chatloom::config::{LocalIdentity, ParseConfig};
//!
//! let text = "15/01/2024, 10:30 - Alice: Hello!\n\
//!             15/01/2024, 10:31 - Me: Hi, how are you?";
//! let config = ParseConfig::new().with_local_identity(LocalIdentity::new("Me"));
//! let chat = parse_chat("WhatsApp Chat with Alice.txt", text, &AttachmentIndex::new(), &config);
//!
//! assert_eq!(chat.name, "Alice");
//! assert_eq!(chat.messages.len(), 2);
//! assert!(chat.messages[1].outgoing);
//! ```
//!
//! ## Merging Redundant Backups
//!
//! Users re-export the same conversation repeatedly. Parse each backup
//! separately, then fold them into one chat:
//!
//! ```rust
//! use chatloom::attachments::AttachmentIndex;
//! use chatloom::chat::{merge_chats, parse_chat};
//! use chatloom::config::ParseConfig;
//!
//! let config = ParseConfig::new();
//! let index = AttachmentIndex::new();
//! let a = parse_chat("a.txt", "15/01/2024, 10:30 - Alice: Hello!", &index, &config);
//! let b = parse_chat("b.txt", "15/01/2024, 10:30 - Alice: Hello!", &index, &config);
//!
//! let merged = merge_chats(vec![a, b], &config.local_identity);
//! assert_eq!(merged.messages.len(), 1);
//! ```
//!
//! ## Module Structure
//!
//! - [`parsing`] — the text-to-messages pipeline
//!   - [`parsing::normalize`] — invisible-character stripping
//!   - [`parsing::date_order`] — locale inference
//!   - [`parsing::line`] — per-line classification
//!   - [`parsing::assembler`] — multi-line message assembly
//! - [`chat`] — [`Chat`](chat::Chat), naming, classification, merging
//! - [`merge`] — cross-backup message deduplication
//! - [`timeline`] — day/bubble grouping and search
//! - [`participants`] — sender extraction and palette colors
//! - [`attachments`] — media filename resolution
//! - [`cache`] — bounded async media cache (feature `cache`)
//! - [`cli`] — clap argument types (feature `cli`)
//! - [`config`] — [`ParseConfig`](config::ParseConfig) and friends
//! - [`error`] — [`ChatloomError`], [`Result`]
//! - [`prelude`] — convenient re-exports

pub mod attachments;
#[cfg(feature = "cache")]
pub mod cache;
pub mod chat;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod merge;
pub mod message;
pub mod participants;
pub mod parsing;
pub mod timeline;

// Re-export the main types at the crate root for convenience
pub use error::{ChatloomError, Result};
pub use message::Message;

/// Convenient re-exports for common usage.
///
/// Import everything you need with a single line:
///
/// ```rust
/// use chatloom::prelude::*;
/// ```
pub mod prelude {
    pub use crate::Message;

    pub use crate::error::{ChatloomError, Result};

    pub use crate::attachments::AttachmentIndex;
    pub use crate::chat::{merge_chats, parse_chat, Chat, ChatKind};
    pub use crate::config::{LocalIdentity, ParseConfig};
    pub use crate::merge::merge_sources;
    pub use crate::message::{Attachment, CallInfo, CallKind, MessageKind, Quoted};
    pub use crate::participants::Participant;
    pub use crate::parsing::date_order::DateOrder;
    pub use crate::parsing::{parse_source, ParseStats, ParsedSource};
    pub use crate::timeline::{build_timeline, SearchIndex, TimelineGroup};

    #[cfg(feature = "cache")]
    pub use crate::cache::{MediaCache, MediaFetcher};
    #[cfg(feature = "cache")]
    pub use crate::config::CacheConfig;
}
