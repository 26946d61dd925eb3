//! Console / Log Sink (C11) — structured stderr output, wired up the way the provider adapters
//! already assume a `log`/`env_logger` pair is initialized by the embedding process.
//!
//! Grounded directly in the `log::log_enabled!(...)` + `log::{error,warn,info,debug}!` idiom used
//! throughout `providers/common.rs` — this module doesn't introduce a new logging approach, it
//! just gives the embedding binary (or a test) one place to initialize the `env_logger::Builder`
//! those call sites assume is already configured.

use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize `env_logger` for human-readable stderr output, honoring `RUST_LOG` if set and
/// otherwise defaulting to `info`. Safe to call more than once (only the first call takes effect),
/// which lets both a binary's `main` and a test's setup call it unconditionally.
pub fn init() {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
        builder.format(|buf, record| {
            writeln!(buf, "[{} {}] {}", record.level(), record.target(), record.args())
        });
        let _ = builder.try_init();
    });
}

/// Emit a human-readable lifecycle line for an event firing — structured output of lifecycle
/// events, human-readable to stderr by default. Intended to be bound as an `on_events`/plugin
/// hook, not called directly by the agent loop.
pub fn log_event(agent_name: &str, event: crate::event::EventName) {
    if log::log_enabled!(log::Level::Info) {
        log::info!("log_sink: agent '{}' fired '{}'", agent_name, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();
    }
}
