//! Kernel-style print macros
//!
//! Provides thread-safe, context-aware debug output similar to Linux kernel's printk.
//! Automatically includes execution-stream ID, unit ID, and optional timestamp.
//!
//! # Environment Variables
//!
//! - `ESCHED_FLUSH_EPRINT=1` - Flush stderr after each print (useful for debugging crashes)
//! - `ESCHED_LOG_LEVEL=<level>` - Set log level: 0=off, 1=error, 2=warn, 3=info, 4=debug, 5=trace
//! - `ESCHED_KPRINT_TIME=1` - Include nanosecond timestamp in output
//!
//! # Output Format
//!
//! Without timestamp: `[LEVEL] [e<es>:u<unit>] message`
//! With timestamp:    `[LEVEL] [<ns>] [e<es>:u<unit>] message`
//!
//! Examples:
//! - `[DEBUG] [e0:u5] Started processing`
//! - `[INFO]  [12345678] [e2:u--] ES idle`
//! - `[ERROR] [e--:u--] Not in runtime context`
//!
//! # Usage
//!
//! ```ignore
//! use esched_core::{kprintln, kdebug, kinfo, kwarn, kerror};
//!
//! // User just provides message - context is automatic
//! kdebug!("Processing item {}", item_id);
//! kinfo!("Pool drained");
//! kwarn!("Unexpected state: {:?}", state);
//! kerror!("Critical failure!");
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Instant;
use crate::env::env_get_bool;

/// Log levels (matches common conventions)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Off,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
    
    pub fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Off => "",
            LogLevel::Error => "[ERROR]",
            LogLevel::Warn => "[WARN] ",
            LogLevel::Info => "[INFO] ",
            LogLevel::Debug => "[DEBUG]",
            LogLevel::Trace => "[TRACE]",
        }
    }
}

// Global configuration (initialized once)
static FLUSH_ENABLED: AtomicBool = AtomicBool::new(false);
static TIME_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static INITIALIZED: AtomicBool = AtomicBool::new(false);

// Start time for relative timestamps
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize logging from environment variables
/// 
/// Called automatically on first log, but can be called explicitly for
/// deterministic initialization.
pub fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return; // Already initialized
    }
    
    // Initialize start time
    START_TIME.get_or_init(Instant::now);
    
    // Check ESCHED_FLUSH_EPRINT
    FLUSH_ENABLED.store(env_get_bool("ESCHED_FLUSH_EPRINT", false), Ordering::Relaxed);

    // Check ESCHED_KPRINT_TIME
    TIME_ENABLED.store(env_get_bool("ESCHED_KPRINT_TIME", false), Ordering::Relaxed);

    // Check ESCHED_LOG_LEVEL
    if let Ok(val) = std::env::var("ESCHED_LOG_LEVEL") {
        let level = match val.to_lowercase().as_str() {
            "off" | "0" => LogLevel::Off,
            "error" | "1" => LogLevel::Error,
            "warn" | "2" => LogLevel::Warn,
            "info" | "3" => LogLevel::Info,
            "debug" | "4" => LogLevel::Debug,
            "trace" | "5" => LogLevel::Trace,
            _ => LogLevel::Info,
        };
        LOG_LEVEL.store(level as u8, Ordering::Relaxed);
    }
}

/// Check if flush is enabled
#[inline]
pub fn flush_enabled() -> bool {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
    FLUSH_ENABLED.load(Ordering::Relaxed)
}

/// Check if timestamp is enabled
#[inline]
pub fn time_enabled() -> bool {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
    TIME_ENABLED.load(Ordering::Relaxed)
}

/// Get current log level
#[inline]
pub fn log_level() -> LogLevel {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Set log level programmatically
pub fn set_log_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Set flush mode programmatically  
pub fn set_flush_enabled(enabled: bool) {
    FLUSH_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Set time display programmatically
pub fn set_time_enabled(enabled: bool) {
    TIME_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Check if a log level is enabled
#[inline]
pub fn level_enabled(level: LogLevel) -> bool {
    level as u8 <= log_level() as u8
}

/// Get elapsed nanoseconds since start (safe for any stack)
#[inline]
pub fn elapsed_ns() -> u64 {
    let start = START_TIME.get_or_init(Instant::now);
    start.elapsed().as_nanos() as u64
}

// Thread-local for execution-stream / unit context (set by callers)
thread_local! {
    static ES_ID: std::cell::Cell<Option<u64>> = const { std::cell::Cell::new(None) };
    static UNIT_ID: std::cell::Cell<Option<u64>> = const { std::cell::Cell::new(None) };
}

/// Set current execution-stream ID for this thread
pub fn set_es_id(id: u64) {
    ES_ID.with(|e| e.set(Some(id)));
}

/// Clear execution-stream ID (called on thread exit)
pub fn clear_es_id() {
    ES_ID.with(|e| e.set(None));
}

/// Set current unit ID (called while dispatching a unit)
pub fn set_unit_id(id: u64) {
    UNIT_ID.with(|u| u.set(Some(id)));
}

/// Clear unit ID (called when no unit is being dispatched)
pub fn clear_unit_id() {
    UNIT_ID.with(|u| u.set(None));
}

/// Get current execution-stream ID
#[inline]
pub fn get_es_id() -> Option<u64> {
    ES_ID.with(|e| e.get())
}

/// Get current unit ID
#[inline]
pub fn get_unit_id() -> Option<u64> {
    UNIT_ID.with(|u| u.get())
}

/// Format context string [e<id>:u<id>]
fn format_context() -> String {
    let es = match get_es_id() {
        Some(id) => format!("e{}", id),
        None => "e--".to_string(),
    };
    let unit = match get_unit_id() {
        Some(id) => format!("u{}", id),
        None => "u--".to_string(),
    };
    format!("[{}:{}]", es, unit)
}

/// Internal: Write and optionally flush (no context)
#[doc(hidden)]
pub fn _kprint_impl(args: std::fmt::Arguments<'_>) {
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    let _ = handle.write_fmt(args);
    if flush_enabled() {
        let _ = handle.flush();
    }
}

/// Internal: Write with newline and optionally flush (no context)
#[doc(hidden)]
pub fn _kprintln_impl(args: std::fmt::Arguments<'_>) {
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    let _ = handle.write_fmt(args);
    let _ = handle.write_all(b"\n");
    if flush_enabled() {
        let _ = handle.flush();
    }
}

/// Internal: Leveled print with context
#[doc(hidden)]
pub fn _klog_impl(level: LogLevel, args: std::fmt::Arguments<'_>) {
    if !level_enabled(level) {
        return;
    }
    
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    
    // Level prefix
    let _ = write!(handle, "{} ", level.prefix());
    
    // Optional timestamp
    if time_enabled() {
        let _ = write!(handle, "[{}] ", elapsed_ns());
    }
    
    // Context [worker:gvthread]
    let _ = write!(handle, "{} ", format_context());
    
    // User message
    let _ = handle.write_fmt(args);
    let _ = handle.write_all(b"\n");
    
    if flush_enabled() {
        let _ = handle.flush();
    }
}

// ============================================================================
// Public Macros
// ============================================================================

/// Print to stderr (no newline, no context)
/// 
/// Like `eprint!` but with optional auto-flush and mutex protection.
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => {{
        $crate::kprint::_kprint_impl(format_args!($($arg)*));
    }};
}

/// Print to stderr with newline (no context)
/// 
/// Like `eprintln!` but with optional auto-flush and mutex protection.
#[macro_export]
macro_rules! kprintln {
    () => {{
        $crate::kprint::_kprintln_impl(format_args!(""));
    }};
    ($($arg:tt)*) => {{
        $crate::kprint::_kprintln_impl(format_args!($($arg)*));
    }};
}

/// Error level log with context
#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl(
            $crate::kprint::LogLevel::Error,
            format_args!($($arg)*)
        );
    }};
}

/// Warning level log with context
#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl(
            $crate::kprint::LogLevel::Warn,
            format_args!($($arg)*)
        );
    }};
}

/// Info level log with context
#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl(
            $crate::kprint::LogLevel::Info,
            format_args!($($arg)*)
        );
    }};
}

/// Debug level log with context
#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl(
            $crate::kprint::LogLevel::Debug,
            format_args!($($arg)*)
        );
    }};
}

/// Trace level log with context
#[macro_export]
macro_rules! ktrace {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl(
            $crate::kprint::LogLevel::Trace,
            format_args!($($arg)*)
        );
    }};
}

// ============================================================================
// Tests
// ============================================================================
