//! Session management: the bearer token, where it is persisted, and how it arrives.

pub mod callback;
pub mod storage;
pub mod token_store;

pub use callback::wait_for_redirect;
pub use storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage};
pub use token_store::{InitOutcome, Session, TokenSource, TokenStore};
