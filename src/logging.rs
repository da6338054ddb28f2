//! Tracing setup and log forwarding.
//!
//! [`install_tracing`] installs a console layer filtered by `RUST_LOG`
//! (default `info`) and a forwarding layer that hands every event at or above
//! the level set with [`set_log_level`] to a host-registered channel as a JSON
//! line. Hosts embedding the renderer in another runtime use the forwarder to
//! surface engine logs in their own console.

use std::str::FromStr;
use std::sync::{Arc, Mutex, Once, OnceLock, PoisonError};

use async_channel::Sender;
use serde_json::{Map, Value};
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::INFO;

static TRACING_INSTALLED: Once = Once::new();
static OUTBOUND_SENDER: OnceLock<Mutex<Option<Sender<String>>>> = OnceLock::new();
static LOG_LEVEL: OnceLock<Arc<Mutex<LevelFilter>>> = OnceLock::new();

/// Registers the channel forwarded log lines are sent to.
pub fn register_sender(sender: Sender<String>) {
    let slot = OUTBOUND_SENDER.get_or_init(|| Mutex::new(None));
    *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(sender);
}

/// Stops forwarding.
pub fn clear_sender() {
    if let Some(slot) = OUTBOUND_SENDER.get() {
        slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

fn sender() -> Option<Sender<String>> {
    OUTBOUND_SENDER
        .get()
        .and_then(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
}

fn level_handle() -> Arc<Mutex<LevelFilter>> {
    LOG_LEVEL
        .get_or_init(|| Arc::new(Mutex::new(DEFAULT_LOG_LEVEL)))
        .clone()
}

/// Sets the forwarding level (`error`, `warn`, `info`, `debug`, `trace` or
/// `off`). Unknown names fall back to `info`.
pub fn set_log_level(level: &str) {
    let parsed = LevelFilter::from_str(level).unwrap_or(DEFAULT_LOG_LEVEL);
    *level_handle()
        .lock()
        .unwrap_or_else(PoisonError::into_inner) = parsed;
}

/// Current forwarding level.
#[must_use]
pub fn log_level() -> LevelFilter {
    *level_handle()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Installs the console and forwarding layers. Idempotent; does nothing if
/// another global subscriber is already set.
pub fn install_tracing() {
    TRACING_INSTALLED.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let console = fmt::layer().with_target(true).with_filter(filter);
        let result = tracing_subscriber::registry()
            .with(ForwardLayer::new())
            .with(console)
            .try_init();
        if result.is_err() {
            eprintln!("stencil tracing already initialized by the host");
        }
    });
}

struct ForwardLayer {
    level: Arc<Mutex<LevelFilter>>,
}

impl ForwardLayer {
    fn new() -> Self {
        Self {
            level: level_handle(),
        }
    }
}

impl<S> Layer<S> for ForwardLayer
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let Some(sender) = sender() else { return };

        let filter = *self.level.lock().unwrap_or_else(PoisonError::into_inner);
        if !level_allows(filter, *event.metadata().level()) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let line = log_to_json(
            &visitor.message.unwrap_or_default(),
            event.metadata().level(),
            event.metadata().target(),
        );
        let _ = sender.try_send(line);
    }
}

const fn level_allows(filter: LevelFilter, level: Level) -> bool {
    match filter {
        LevelFilter::OFF => false,
        LevelFilter::ERROR => matches!(level, Level::ERROR),
        LevelFilter::WARN => matches!(level, Level::ERROR | Level::WARN),
        LevelFilter::INFO => matches!(level, Level::ERROR | Level::WARN | Level::INFO),
        LevelFilter::DEBUG => matches!(
            level,
            Level::ERROR | Level::WARN | Level::INFO | Level::DEBUG
        ),
        LevelFilter::TRACE => true,
    }
}

fn log_to_json(message: &str, level: &Level, target: &str) -> String {
    let mut log = Map::new();
    log.insert("message".into(), Value::String(message.to_owned()));
    log.insert("level".into(), Value::String(level.as_str().to_owned()));
    log.insert("target".into(), Value::String(target.to_owned()));

    let mut event = Map::new();
    event.insert("type".into(), Value::String("log".into()));
    event.insert("log".into(), Value::Object(log));
    Value::Object(event).to_string()
}

#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_owned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_filter_inclusively() {
        assert!(level_allows(LevelFilter::WARN, Level::ERROR));
        assert!(level_allows(LevelFilter::WARN, Level::WARN));
        assert!(!level_allows(LevelFilter::WARN, Level::INFO));
        assert!(!level_allows(LevelFilter::OFF, Level::ERROR));
        assert!(level_allows(LevelFilter::TRACE, Level::TRACE));
    }

    #[test]
    fn log_lines_are_json() {
        let line = log_to_json("renderer resolved", &Level::DEBUG, "stencil::node");
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "log");
        assert_eq!(value["log"]["level"], "DEBUG");
        assert_eq!(value["log"]["target"], "stencil::node");
    }

    #[test]
    fn unknown_level_names_fall_back_to_info() {
        set_log_level("loud");
        assert_eq!(log_level(), LevelFilter::INFO);
        set_log_level("debug");
        assert_eq!(log_level(), LevelFilter::DEBUG);
        set_log_level("info");
    }
}
