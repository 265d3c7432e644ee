//! Logging utilities with colored output and progress display.
//!
//! This module provides:
//! - `log!` macro for info-level output with colored prefixes
//! - `debug!` macro for debug-level output (`-vv`)
//! - `warn!` macro for warnings (always shown)
//! - `ProgressLine` for single-line progress display with multiple counters
//!
//! # Example
//!
//! ```ignore
//! // Simple logging
//! log!("filter"; "found {} features", count);
//!
//! // Progress line for map rendering
//! let progress = ProgressLine::new("map", &[("maps", 12)]);
//! progress.inc("maps");
//! progress.finish();
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stdout},
    sync::atomic::{AtomicU8, AtomicUsize, Ordering},
};

// ============================================================================
// Log Level
// ============================================================================

/// Verbosity levels selected by the repeatable `-v` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    /// No `-v`: warnings only
    Warn = 0,
    /// `-v`: progress and summaries
    Info = 1,
    /// `-vv` and above: per-note details
    Debug = 2,
}

impl Level {
    /// Map a `-v` occurrence count to a level.
    pub const fn from_verbosity(count: u8) -> Self {
        match count {
            0 => Self::Warn,
            1 => Self::Info,
            _ => Self::Debug,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Warn,
            1 => Self::Info,
            _ => Self::Debug,
        }
    }
}

/// Global log level (set once from the CLI)
static LEVEL: AtomicU8 = AtomicU8::new(Level::Warn as u8);

/// Set the log level globally
pub fn set_level(level: Level) {
    LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Current log level
pub fn level() -> Level {
    Level::from_u8(LEVEL.load(Ordering::SeqCst))
}

/// Check if messages at `level` are shown
#[inline]
pub fn enabled(level: Level) -> bool {
    self::level() >= level
}

/// Active progress bar count (for log coordination)
static BAR_COUNT: AtomicUsize = AtomicUsize::new(0);

// ============================================================================
// Log Macros
// ============================================================================

/// Log an info message with a colored module prefix (shown with `-v`)
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::enabled($crate::logger::Level::Info) {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

/// Log a debug message (shown with `-vv`)
///
/// # Usage
/// ```ignore
/// debug!("module"; "debug info: {}", value);
/// ```
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::enabled($crate::logger::Level::Debug) {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

/// Log a warning (always shown)
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {{
        $crate::logger::log("warning", &format!($($arg)*))
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
#[inline]
#[allow(clippy::cast_possible_truncation)] // Safe: bars count is always small
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);

    let mut stdout = stdout().lock();

    let bar_count = BAR_COUNT.load(Ordering::SeqCst);
    if bar_count > 0 {
        execute!(stdout, cursor::MoveUp(bar_count as u16)).ok();
        execute!(stdout, Clear(ClearType::FromCursorDown)).ok();
    }

    writeln!(stdout, "{prefix} {message}").ok();

    if bar_count > 0 {
        for _ in 0..bar_count {
            writeln!(stdout).ok();
        }
    }

    stdout.flush().ok();
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> String {
    let prefix = format!("[{module}]");
    match module_lower {
        "osm" | "query" => prefix.bright_blue().bold().to_string(),
        "deck" => prefix.bright_green().bold().to_string(),
        "error" | "warning" => prefix.bright_red().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Progress Line (single-line counters)
// ============================================================================

/// Single-line progress display with multiple counters
///
/// Displays: `[map] maps(42/69)`
///
/// Hidden below info level. Dropping without `finish()` clears the line.
pub struct ProgressLine {
    module: &'static str,
    counters: Vec<Counter>,
    lock: Mutex<()>,
    visible: bool,
}

struct Counter {
    name: &'static str,
    total: usize,
    current: AtomicUsize,
}

impl ProgressLine {
    /// Create a new progress display prefixed with `[module]`.
    ///
    /// Only includes counters with total > 0.
    pub fn new(module: &'static str, items: &[(&'static str, usize)]) -> Self {
        let counters: Vec<_> = items
            .iter()
            .filter(|(_, total)| *total > 0)
            .map(|(name, total)| Counter {
                name,
                total: *total,
                current: AtomicUsize::new(0),
            })
            .collect();

        let visible = enabled(Level::Info) && !counters.is_empty();
        if visible {
            BAR_COUNT.store(1, Ordering::SeqCst);
        }

        let progress = Self {
            module,
            counters,
            lock: Mutex::new(()),
            visible,
        };
        progress.display();
        progress
    }

    /// Increment the counter with the given name.
    #[inline]
    pub fn inc(&self, name: &str) {
        for counter in &self.counters {
            if counter.name == name {
                counter.current.fetch_add(1, Ordering::Relaxed);
                if self.lock.try_lock().is_some() {
                    self.display();
                }
                return;
            }
        }
    }

    /// Current value of a counter.
    #[cfg(test)]
    fn current(&self, name: &str) -> usize {
        self.counters
            .iter()
            .find(|c| c.name == name)
            .map_or(0, |c| c.current.load(Ordering::Relaxed))
    }

    fn prefix(&self) -> String {
        colorize_prefix(self.module, &self.module.to_ascii_lowercase())
    }

    fn line(&self) -> String {
        let parts: Vec<_> = self
            .counters
            .iter()
            .map(|c| {
                let current = c.current.load(Ordering::Relaxed);
                format!("{}({}/{})", c.name, current, c.total)
            })
            .collect();
        parts.join(" ")
    }

    /// Display the current progress line (overwrites the current line).
    fn display(&self) {
        if !self.visible {
            return;
        }
        let prefix = self.prefix();

        let mut stdout = stdout().lock();
        execute!(
            stdout,
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine)
        )
        .ok();
        write!(stdout, "{} {}", prefix, self.line()).ok();
        stdout.flush().ok();
    }

    /// Finish progress display, preserve line and move to next line.
    pub fn finish(mut self) {
        BAR_COUNT.store(0, Ordering::SeqCst);

        if self.visible {
            let _guard = self.lock.lock();
            let prefix = self.prefix();

            let mut stdout = stdout().lock();
            execute!(
                stdout,
                cursor::MoveToColumn(0),
                Clear(ClearType::CurrentLine)
            )
            .ok();
            writeln!(stdout, "{} {}", prefix, self.line()).ok();
            stdout.flush().ok();
        }

        // Drop must not clear the preserved line
        self.visible = false;
    }
}

impl Drop for ProgressLine {
    fn drop(&mut self) {
        if !self.visible {
            return;
        }
        BAR_COUNT.store(0, Ordering::SeqCst);

        let mut stdout = stdout().lock();
        execute!(
            stdout,
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine)
        )
        .ok();
        stdout.flush().ok();
    }
}

// ============================================================================
// Tests
// ============================================================================
