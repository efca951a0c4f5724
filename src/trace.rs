//! Sinks receiving the narration of the `_traced` encode and decode functions.
//!
//! The narration is meant for humans: one line per step, with hex dumps of the
//! bytes each step produced or consumed. Any implementation of [`LogSink`]
//! will do; the fast entry points never touch a sink.

use std::fmt;

/// Receiver of trace narration lines.
pub trait LogSink {
    /// write one message (it may span several lines)
    fn write(&mut self, line: &str);

    /// write a formatted message
    fn writef(&mut self, args: fmt::Arguments<'_>) {
        match args.as_str() {
            Some(s) => self.write(s),
            None => self.write(&args.to_string()),
        }
    }
}

/// Sink that drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct Discard;

impl LogSink for Discard {
    fn write(&mut self, _line: &str) {}

    fn writef(&mut self, _args: fmt::Arguments<'_>) {}
}

/// Sink printing each message to stdout.
#[derive(Clone, Copy, Debug, Default)]
pub struct Console;

impl LogSink for Console {
    fn write(&mut self, line: &str) {
        println!("{}", line);
    }
}

/// Sink forwarding each message as a `tracing` debug event with target `agentx_codec::trace`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&mut self, line: &str) {
        tracing::debug!(target: "agentx_codec::trace", "{}", line);
    }
}

/// Buffering sink, one entry per message.
impl LogSink for Vec<String> {
    fn write(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

impl<T: LogSink + ?Sized> LogSink for &mut T {
    fn write(&mut self, line: &str) {
        (**self).write(line);
    }

    fn writef(&mut self, args: fmt::Arguments<'_>) {
        (**self).writef(args);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_sink() {
        let mut log: Vec<String> = Vec::new();
        log.write("plain");
        log.writef(format_args!("value: {}", 42));
        assert_eq!(log, vec!["plain".to_string(), "value: 42".to_string()]);
    }

    #[test]
    fn sinks_through_references() {
        fn narrate(log: &mut dyn LogSink) {
            log.writef(format_args!("{}-{}", 1, 2));
        }

        let mut log: Vec<String> = Vec::new();
        narrate(&mut log);
        narrate(&mut Discard);
        narrate(&mut TracingSink);
        assert_eq!(log, vec!["1-2".to_string()]);
    }
}
