//! Leveled kernel log.
//!
//! Lines are formatted straight into the attached sink without allocation.
//! Until a sink is attached (the serial driver does this during early init)
//! every line is dropped, so code that logs can run in host unit tests.

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

use spin::Once;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum KlogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl KlogLevel {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => KlogLevel::Error,
            1 => KlogLevel::Warn,
            2 => KlogLevel::Info,
            3 => KlogLevel::Debug,
            _ => KlogLevel::Trace,
        }
    }
}

/// Byte sink a log line is written to, piece by piece.
pub type KlogSink = fn(&str);

const DEFAULT_LEVEL: KlogLevel = if cfg!(feature = "log-trace") {
    KlogLevel::Trace
} else if cfg!(feature = "log-quiet") {
    KlogLevel::Warn
} else {
    KlogLevel::Info
};

static CURRENT_LEVEL: AtomicU8 = AtomicU8::new(DEFAULT_LEVEL as u8);
static SINK: Once<KlogSink> = Once::new();

#[inline(always)]
fn is_enabled(level: KlogLevel) -> bool {
    level as u8 <= CURRENT_LEVEL.load(Ordering::Relaxed)
}

struct KlogWriter(KlogSink);

impl fmt::Write for KlogWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        (self.0)(s);
        Ok(())
    }
}

pub fn log_args(level: KlogLevel, args: fmt::Arguments<'_>) {
    if !is_enabled(level) {
        return;
    }
    let Some(&sink) = SINK.get() else {
        return;
    };
    let _ = fmt::write(&mut KlogWriter(sink), args);
    sink("\n");
}

/// Route log output to `sink`. Only the first attachment takes effect.
pub fn klog_attach(sink: KlogSink) {
    SINK.call_once(|| sink);
}

pub fn klog_set_level(level: KlogLevel) {
    CURRENT_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn klog_get_level() -> KlogLevel {
    KlogLevel::from_raw(CURRENT_LEVEL.load(Ordering::Relaxed))
}

#[macro_export]
macro_rules! klog_error {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Error, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_warn {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Warn, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_info {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Info, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_debug {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Debug, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_trace {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Trace, ::core::format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered_by_verbosity() {
        assert!(KlogLevel::Error < KlogLevel::Warn);
        assert!(KlogLevel::Debug < KlogLevel::Trace);
        assert_eq!(KlogLevel::from_raw(9), KlogLevel::Trace);
    }

    #[test]
    fn logging_without_a_sink_is_a_no_op() {
        klog_info!("dropped line {}", 1);
        klog_error!("dropped too");
    }
}
