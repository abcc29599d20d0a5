//! opsdash-file - Filesystem-backed token store.
//!
//! Keeps the session's token pair in a JSON document so it outlives the
//! process, for hosts (like the CLI) where every command is a new process.

mod store;

pub use store::FileTokenStore;
