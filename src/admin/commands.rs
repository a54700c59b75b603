//! Operator commands carried in `/proxy/` request paths.
//!
//! # Grammar
//! ```text
//! cache/enable | cache/disable | cache/flush
//! blocklist/enable | blocklist/disable | blocklist/flush
//! blocklist/add/<pattern> | blocklist/remove/<pattern>
//! ```
//!
//! Anything else is ignored. The client is acknowledged with 200 either
//! way, so the command surface never reports errors.

use crate::observability::metrics;
use crate::state::ProxyState;

/// A recognised operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CacheEnable,
    CacheDisable,
    CacheFlush,
    BlocklistEnable,
    BlocklistDisable,
    BlocklistAdd(String),
    BlocklistRemove(String),
    BlocklistFlush,
}

impl Command {
    /// Parse the part of the path after `/proxy/`. Segments past the ones
    /// the grammar names are ignored.
    pub fn parse(command_path: &str) -> Option<Self> {
        let mut segments = command_path.split('/');
        let subsystem = segments.next()?;
        let action = segments.next()?;

        let command = match (subsystem, action) {
            ("cache", "enable") => Command::CacheEnable,
            ("cache", "disable") => Command::CacheDisable,
            ("cache", "flush") => Command::CacheFlush,
            ("blocklist", "enable") => Command::BlocklistEnable,
            ("blocklist", "disable") => Command::BlocklistDisable,
            ("blocklist", "flush") => Command::BlocklistFlush,
            ("blocklist", "add") => Command::BlocklistAdd(pattern(segments.next())?),
            ("blocklist", "remove") => Command::BlocklistRemove(pattern(segments.next())?),
            _ => return None,
        };
        Some(command)
    }

    /// Metric label for this command.
    pub fn name(&self) -> &'static str {
        match self {
            Command::CacheEnable => "cache_enable",
            Command::CacheDisable => "cache_disable",
            Command::CacheFlush => "cache_flush",
            Command::BlocklistEnable => "blocklist_enable",
            Command::BlocklistDisable => "blocklist_disable",
            Command::BlocklistAdd(_) => "blocklist_add",
            Command::BlocklistRemove(_) => "blocklist_remove",
            Command::BlocklistFlush => "blocklist_flush",
        }
    }

    /// Apply the command to the shared state.
    pub fn apply(&self, state: &ProxyState) {
        match self {
            Command::CacheEnable => state.cache.enable(),
            Command::CacheDisable => state.cache.disable(),
            Command::CacheFlush => state.cache.flush(),
            Command::BlocklistEnable => state.blocklist.enable(),
            Command::BlocklistDisable => state.blocklist.disable(),
            Command::BlocklistAdd(pattern) => {
                if let Err(e) = state.blocklist.add(pattern) {
                    tracing::warn!(pattern = %pattern, error = %e, "Ignoring invalid blocklist pattern");
                }
            }
            Command::BlocklistRemove(pattern) => {
                state.blocklist.remove(pattern);
            }
            Command::BlocklistFlush => state.blocklist.flush(),
        }
    }
}

/// An empty segment is a valid pattern; a missing one is not.
fn pattern(segment: Option<&str>) -> Option<String> {
    segment.map(str::to_string)
}

/// Interpret and apply `command_path`. Returns the command if it was
/// recognised; unrecognised paths change nothing.
pub fn execute(command_path: &str, state: &ProxyState) -> Option<Command> {
    let Some(command) = Command::parse(command_path) else {
        tracing::debug!(command_path = %command_path, "Ignoring unrecognised command");
        return None;
    };

    command.apply(state);
    metrics::record_command(command.name());
    tracing::info!(command = ?command, "Command executed");
    Some(command)
}
