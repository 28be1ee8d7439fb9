//! Replay artifact storage
//!
//! Replays live as flat files in a single directory; the directory listing is
//! the only index.

mod collate;
mod store;

pub use collate::localized_standard_cmp;
pub use store::{ReplayStore, DEFAULT_NAME_FORMAT, DEFAULT_REPLAY_EXTENSION};
