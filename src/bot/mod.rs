//! Bot engine: retry loop, per-account processing and the media selectors.

pub mod comments;
pub mod dedup;
pub mod likes;
pub mod processor;
pub mod runner;
pub mod stats;

#[cfg(test)]
pub(crate) mod fakes;

pub use comments::MediaCommentSelector;
pub use dedup::DedupChecker;
pub use likes::MediaLikeSelector;
pub use processor::{AccountProcessor, BotSettings};
pub use runner::{Bot, RetryPolicy};
pub use stats::RunStatistics;
