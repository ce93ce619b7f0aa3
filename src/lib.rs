//! WebRTC signaling and room coordination server.
//!
//! Peers connect over a websocket, name a room by its emoji-sequence code,
//! receive a server-assigned identity and then exchange SDP offer/answer
//! envelopes with the other members of that room. The server is a pure
//! signaling plane: no media and no game data ever pass through it.

#![allow(clippy::module_name_repetitions)]
#![forbid(non_ascii_idents, unsafe_code)]

pub mod api;
pub mod catalog;
pub mod conf;
pub mod prelude;
pub mod proto;
pub mod signalling;
pub mod utils;

use slog::{o, Drain};
use slog_scope::GlobalLoggerGuard;

/// Initializes [`slog`] logger outputting logs with a [`slog_term`]'s
/// decorator.
///
/// # Panics
///
/// If [`slog_stdlog`] fails to [initialize](slog_stdlog::init).
pub fn init_logger() -> GlobalLoggerGuard {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_envlogger::new(drain).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let logger = slog::Logger::root(drain, o!());
    let scope_guard = slog_scope::set_global_logger(logger);
    slog_stdlog::init().unwrap();

    scope_guard
}
