//! Sampler log output.
//!
//! Moves entries from a [`LogStream`] into the `log` facade. Runs in a
//! task that is allowed to block (the facade backend may write to UART).
//!
//! ```text
//! LogStream ──▶ forward() ──▶ log::log!() ──▶ EspLogger / test logger
//! ```

use core::fmt::Write;

use crate::logging::{BufWriter, LogEntry, LogStream, MAX_MSG_LEN};

/// Target used for forwarded sampler messages.
pub const SAMPLER_TARGET: &str = "btndrv::sampler";

/// Longest formatted line: tick column plus message.
const LINE_LEN: usize = MAX_MSG_LEN + 16;

/// Format a log entry as `[tick] message`. The level is left to the
/// logger backend.
///
/// Returns the number of bytes written.
pub fn format_log_entry(entry: &LogEntry, buf: &mut [u8]) -> usize {
    let mut writer = BufWriter { buf, pos: 0 };
    let _ = write!(writer, "[{:10}] {}", entry.tick, entry.message());
    writer.pos
}

/// Drain everything currently queued into the `log` facade.
///
/// Reports and clears the dropped counter. Returns the number of entries
/// forwarded.
pub fn forward<const N: usize>(stream: &LogStream<N>) -> usize {
    let mut line = [0u8; LINE_LEN];
    let mut forwarded = 0;

    while let Some(entry) = stream.drain() {
        let len = format_log_entry(&entry, &mut line);
        let text = core::str::from_utf8(&line[..len]).unwrap_or("<invalid utf8>");
        log::log!(target: SAMPLER_TARGET, log::Level::from(entry.level), "{}", text);
        forwarded += 1;
    }

    let dropped = stream.take_dropped();
    if dropped > 0 {
        log::warn!(target: SAMPLER_TARGET, "dropped {} sampler log messages", dropped);
    }

    forwarded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;

    fn entry(tick: u32, level: LogLevel, text: &[u8]) -> LogEntry {
        let mut msg = [0u8; MAX_MSG_LEN];
        msg[..text.len()].copy_from_slice(text);
        LogEntry {
            tick,
            level,
            len: text.len() as u8,
            msg,
        }
    }

    #[test]
    fn test_format_log_entry() {
        let mut buf = [0u8; 128];
        let len = format_log_entry(&entry(1234567, LogLevel::Info, b"Hello world"), &mut buf);

        let formatted = core::str::from_utf8(&buf[..len]).unwrap();
        assert_eq!(formatted, "[   1234567] Hello world");
    }

    #[test]
    fn test_format_truncated_message() {
        let mut e = entry(999, LogLevel::Error, b"TEST12345X");
        e.len = 5;

        let mut buf = [0u8; 128];
        let len = format_log_entry(&e, &mut buf);

        let formatted = core::str::from_utf8(&buf[..len]).unwrap();
        assert!(formatted.starts_with("[       999]"));
        assert!(formatted.contains("TEST1"));
        assert!(!formatted.contains('X'));
    }

    #[test]
    fn test_forward_empties_stream() {
        let stream = LogStream::<4>::new();
        for t in 0..6 {
            stream.push(t, LogLevel::Debug, b"tick");
        }

        assert_eq!(forward(&stream), 4);
        assert_eq!(stream.pending(), 0);
        assert_eq!(stream.dropped(), 0);
        assert_eq!(forward(&stream), 0);
    }
}
