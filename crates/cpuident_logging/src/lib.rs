use core::{
    fmt::{self, Display, Arguments, Write as _},
    sync::atomic::{AtomicU8, self},
    time::Duration,
};
use std::{
    io::{self, Write as _},
    time::SystemTime,
};
use cpuident_common::KiB;
use cpuident_macros::EnumFromName;
use parking_lot::{Mutex, RwLock};

// `None` until the application installs a logger, logging is a no-op until then
static LOGGER : RwLock<Option<&'static Logger>> = parking_lot::const_rwlock(None);

/// Install the global logger used by the logging macros.
pub fn set_logger(logger: &'static Logger) {
    *LOGGER.write() = Some(logger);
}

/// Get the global logger, if one was set.
pub fn try_get_logger() -> Option<&'static Logger> {
    *LOGGER.read()
}

/// Logging level
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, EnumFromName)]
pub enum LogLevel {
    /// Severe error: the application cannot continue
    Severe,
    /// Error: the current operation failed
    Error,
    /// Warning: data was unexpected, but a fallback was used
    Warning,
    /// General info
    Info,
    /// Verbose info
    Verbose,
    /// Debug info (includes verbose info)
    Debug,
}

impl LogLevel {
    fn tag(self) -> &'static str {
        match self {
            LogLevel::Severe  => "[SEVERE ]",
            LogLevel::Error   => "[ERROR  ]",
            LogLevel::Warning => "[WARNING]",
            LogLevel::Info    => "[INFO   ]",
            LogLevel::Verbose => "[VERBOSE]",
            LogLevel::Debug   => "[DEBUG  ]",
        }
    }

    fn ansi_color(self) -> &'static str {
        match self {
            LogLevel::Severe  => "\x1B[1m\x1B[41m\x1B[30m",
            LogLevel::Error   => "\x1B[91m",
            LogLevel::Warning => "\x1B[93m",
            LogLevel::Info    => "\x1B[37m",
            LogLevel::Verbose => "\x1B[90m",
            LogLevel::Debug   => "\x1B[94m",
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Log category
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LogCategory {
    category     : &'static str,
    sub_category : Option<&'static str>
}

impl LogCategory {
    pub const fn new(name: &'static str) -> Self {
        Self { category: name, sub_category: None }
    }

    pub const fn new_with_sub(name: &'static str, sub_name: &'static str) -> Self {
        Self { category: name, sub_category: Some(sub_name) }
    }
}

impl Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sub_category {
            Some(sub) => write!(f, "{}({sub})", self.category),
            None => f.write_str(self.category),
        }
    }
}

/// Wall-clock time at which a message was logged, as the duration since the unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct TimeStamp(Duration);

impl TimeStamp {
    pub fn now() -> Self {
        Self(SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default())
    }

    pub const fn from_duration(since_epoch: Duration) -> Self {
        Self(since_epoch)
    }
}

/// Formats as `HH:MM:SS.mmm` (UTC)
impl Display for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.as_secs() % 86400;
        write!(f, "{:02}:{:02}:{:02}.{:03}", secs / 3600, (secs / 60) % 60, secs % 60, self.0.subsec_millis())
    }
}

/// Additional info about where the log occured
pub struct LogLocation {
    file : &'static str,
    line : u32,
    func : &'static str,
    time : TimeStamp,
}

impl LogLocation {
    /// Creates a new log location
    pub const fn new(file: &'static str, line: u32, func: &'static str, time: TimeStamp) -> Self {
        Self { file, line, func, time }
    }

    /// Get the file name where the log occured
    pub const fn file(&self) -> &str {
        self.file
    }

    /// Get the line where the log occurred
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// Get the function where the log occurred
    pub const fn function(&self) -> &str {
        self.func
    }

    /// Get the timestamp when the log occurred
    pub const fn timestamp(&self) -> TimeStamp {
        self.time
    }
}

struct LogLocationFormatter<'a> {
    loc   : &'a LogLocation,
    level : LogLevel
}

impl Display for LogLocationFormatter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            LogLevel::Severe |
            LogLevel::Error |
            LogLevel::Debug => write!(f, " ({}:{}: {})", self.loc.file(), self.loc.line(), self.loc.function()),
            LogLevel::Warning |
            LogLevel::Info |
            LogLevel::Verbose => Ok(()),
        }
    }
}

pub fn get_func_name<F>(_: F) -> &'static str {
    core::any::type_name::<F>()
}

#[macro_export]
macro_rules! log_location {
    () => {
        $crate::LogLocation::new(file!(), line!(), "", $crate::TimeStamp::now())
    };
    ($func: expr) => {
        $crate::LogLocation::new(file!(), line!(), $crate::get_func_name($func), $crate::TimeStamp::now())
    };
}

type BoxedWriter = Box<dyn io::Write + Send>;

struct LoggerState {
    writers:        [Option<BoxedWriter>; Self::MAX_WRITERS],
    cache:          String,
    always_flush:   bool,
    log_to_console: bool,
}

impl LoggerState {
    const MAX_WRITERS: usize = 8;
    const CACHE_FLUSH_LIMIT: usize = KiB(4);

    const fn new() -> Self {
        const NONE: Option<BoxedWriter> = None;
        Self {
            writers: [NONE; Self::MAX_WRITERS],
            cache: String::new(),
            always_flush: false,
            log_to_console: true,
        }
    }

    fn write_line(&mut self, level: LogLevel, prefix: Arguments, message: Arguments) {
        let start = self.cache.len();
        _ = self.cache.write_fmt(prefix);
        _ = self.cache.write_fmt(message);
        self.cache.push('\n');

        // The console gets the message right away, colored by level
        if self.log_to_console {
            let line = &self.cache[start..];
            let tag = level.tag();
            let colored = line.replacen(tag, &format!("{}{tag}\x1B[0m", level.ansi_color()), 1);
            _ = io::stderr().write_all(colored.as_bytes());
        }

        if self.always_flush || self.cache.len() > Self::CACHE_FLUSH_LIMIT {
            self.flush();
        }
    }

    fn has_writers(&self) -> bool {
        self.writers.iter().any(Option::is_some)
    }

    fn flush(&mut self) {
        if self.cache.is_empty() {
            return;
        }

        for writer in self.writers.iter_mut().flatten() {
            _ = writer.write_all(self.cache.as_bytes());
            _ = writer.flush();
        }
        self.cache.clear();
    }
}

/// Logger
/// 
/// Supports up to 8 writers, e.g. a log file or an in-memory buffer.
/// Messages are cached and only written out once 4 KiB of messages have been collected, or when explicitly flushed.
pub struct Logger {
    state: Mutex<LoggerState>,
    max_log_level: AtomicU8,
}

impl Logger {
    pub const fn new() -> Self {
        Self { 
            state: parking_lot::const_mutex(LoggerState::new()),
            max_log_level: AtomicU8::new(LogLevel::Info as u8),
        }
    }

    /// Set the maximum log level (severe == lowest, debug == highest)
    pub fn set_max_level(&self, level: LogLevel) {
        self.max_log_level.store(level as u8, atomic::Ordering::Relaxed)
    }

    /// Check if a message at the given level would be logged
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level as u8 <= self.max_log_level.load(atomic::Ordering::Relaxed)
    }

    /// Set whether the logger should flush after each write
    pub fn set_always_flush(&self, always_flush: bool) {
        self.state.lock().always_flush = always_flush;
    }

    /// Set whether the logger should log it's output to console
    pub fn set_log_to_console(&self, log_to_console: bool) {
        self.state.lock().log_to_console = log_to_console;
    }

    /// Add a writer. 
    /// 
    /// Returns `Ok(index)` if space was available. This index can be used to remove the writer later on.
    /// 
    /// Otherwise returns an `Err` with the provided writer
    pub fn add_writer(&self, writer: BoxedWriter) -> Result<usize, BoxedWriter> {
        let mut state = self.state.lock();

        let empty = state.writers.iter_mut().enumerate().find(|(_, slot)| slot.is_none());
        match empty {
            Some((id, slot)) => {
                *slot = Some(writer);
                Ok(id)
            },
            None => Err(writer),
        }
    }

    /// Remove a writer from the logger, pending messages are written to it first
    pub fn remove_writer(&self, index: usize) -> Option<BoxedWriter> {
        let mut state = self.state.lock();
        state.flush();
        state.writers.get_mut(index).and_then(Option::take)
    }

    /// Log a message
    pub fn log(&self, category: LogCategory, level: LogLevel, loc: LogLocation, text: &str) {
        self.log_fmt(category, level, loc, format_args!("{text}"));
    }

    /// Log a formatted message
    pub fn log_fmt(&self, category: LogCategory, level: LogLevel, loc: LogLocation, format: Arguments) {
        if !self.is_enabled(level) {
            return;
        }

        let loc_formatter = LogLocationFormatter { loc: &loc, level };
        let timestamp = loc.timestamp();
        let mut state = self.state.lock();
        if !state.log_to_console && !state.has_writers() {
            return;
        }
        state.write_line(level, format_args!("{timestamp} {level} [{category}]{loc_formatter}: "), format);
    }

    pub fn flush(&self) {
        self.state.lock().flush()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.flush();
    }
}

#[macro_export]
macro_rules! log {
    ($category:expr, $level:expr, $func:expr, $text:expr) => {
        if let Some(logger) = $crate::try_get_logger() {
            logger.log_fmt($category, $level, $crate::log_location!($func), format_args!($text));
        }
    };
    ($category:expr, $level:expr, $func:expr, $format:expr, $($arg:expr),*) => {
        if let Some(logger) = $crate::try_get_logger() {
            logger.log_fmt($category, $level, $crate::log_location!($func), format_args!($format, $($arg),*));
        }
    };
}

#[macro_export]
macro_rules! log_severe {
    ($category:expr, $func:expr, $text:expr) => {
        $crate::log!($category, $crate::LogLevel::Severe, $func, $text)
    };
    ($category:expr, $func:expr, $format:expr, $($arg:expr),*) => {
        $crate::log!($category, $crate::LogLevel::Severe, $func, $format, $($arg),*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($category:expr, $func:expr, $text:expr) => {
        $crate::log!($category, $crate::LogLevel::Error, $func, $text)
    };
    ($category:expr, $func:expr, $format:expr, $($arg:expr),*) => {
        $crate::log!($category, $crate::LogLevel::Error, $func, $format, $($arg),*)
    };
}

#[macro_export]
macro_rules! log_warning {
    ($category:expr, $text:expr) => {
        if let Some(logger) = $crate::try_get_logger() {
            logger.log_fmt($category, $crate::LogLevel::Warning, $crate::log_location!(), format_args!($text));
        }
    };
    ($category:expr, $format:expr, $($arg:expr),*) => {
        if let Some(logger) = $crate::try_get_logger() {
            logger.log_fmt($category, $crate::LogLevel::Warning, $crate::log_location!(), format_args!($format, $($arg),*));
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($category:expr, $text:expr) => {
        if let Some(logger) = $crate::try_get_logger() {
            logger.log_fmt($category, $crate::LogLevel::Info, $crate::log_location!(), format_args!($text));
        }
    };
    ($category:expr, $format:expr, $($arg:expr),*) => {
        if let Some(logger) = $crate::try_get_logger() {
            logger.log_fmt($category, $crate::LogLevel::Info, $crate::log_location!(), format_args!($format, $($arg),*));
        }
    };
}

#[macro_export]
macro_rules! log_verbose {
    ($category:expr, $text:expr) => {
        if let Some(logger) = $crate::try_get_logger() {
            logger.log_fmt($category, $crate::LogLevel::Verbose, $crate::log_location!(), format_args!($text));
        }
    };
    ($category:expr, $format:expr, $($arg:expr),*) => {
        if let Some(logger) = $crate::try_get_logger() {
            logger.log_fmt($category, $crate::LogLevel::Verbose, $crate::log_location!(), format_args!($format, $($arg),*));
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($category:expr, $func:expr, $text:expr) => {
        $crate::log!($category, $crate::LogLevel::Debug, $func, $text)
    };
    ($category:expr, $func:expr, $format:expr, $($arg:expr),*) => {
        $crate::log!($category, $crate::LogLevel::Debug, $func, $format, $($arg),*)
    };
}

#[cfg(test)]
mod tests {
    use std::{io, sync::Arc, time::Duration};
    use cpuident_base::EnumFromNameT;
    use parking_lot::Mutex;

    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    fn test_logger(buffer: &SharedBuffer) -> Logger {
        let logger = Logger::new();
        logger.set_log_to_console(false);
        assert!(logger.add_writer(Box::new(buffer.clone())).is_ok());
        logger
    }

    const CATEGORY : LogCategory = LogCategory::new_with_sub("cpuident", "test");

    #[test]
    fn messages_are_cached_until_flush() {
        let buffer = SharedBuffer::default();
        let logger = test_logger(&buffer);

        let loc = LogLocation::new("lib.rs", 10, "f", TimeStamp::from_duration(Duration::from_millis(3_723_004)));
        logger.log(CATEGORY, LogLevel::Info, loc, "hello");
        assert!(buffer.contents().is_empty());

        logger.flush();
        assert_eq!(buffer.contents(), "01:02:03.004 [INFO   ] [cpuident(test)]: hello\n");
    }

    #[test]
    fn errors_include_location() {
        let buffer = SharedBuffer::default();
        let logger = test_logger(&buffer);
        logger.set_always_flush(true);

        let loc = LogLocation::new("raw.rs", 42, "load", TimeStamp::from_duration(Duration::ZERO));
        logger.log_fmt(CATEGORY, LogLevel::Error, loc, format_args!("bad line {}", 7));
        assert_eq!(buffer.contents(), "00:00:00.000 [ERROR  ] [cpuident(test)] (raw.rs:42: load): bad line 7\n");
    }

    #[test]
    fn max_level_filters() {
        let buffer = SharedBuffer::default();
        let logger = test_logger(&buffer);
        logger.set_max_level(LogLevel::Warning);
        assert!(!logger.is_enabled(LogLevel::Info));

        logger.log(CATEGORY, LogLevel::Debug, LogLocation::new("", 0, "", TimeStamp::now()), "hidden");
        logger.flush();
        assert!(buffer.contents().is_empty());
    }

    #[test]
    fn writer_slots_are_limited() {
        let logger = Logger::new();
        for _ in 0..8 {
            assert!(logger.add_writer(Box::new(io::sink())).is_ok());
        }
        assert!(logger.add_writer(Box::new(io::sink())).is_err());
        assert!(logger.remove_writer(3).is_some());
        assert_eq!(logger.add_writer(Box::new(io::sink())).ok(), Some(3));
    }

    #[test]
    fn level_from_name() {
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warning));
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("loud"), None);
    }
}
