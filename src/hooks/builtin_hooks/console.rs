//! Console output for failures.
//!
//! [`ConsoleSink`] prints a single line per failure:
//!
//! ```text
//! [FAILURE] <source> :: <ErrorType>(<message>) <YYYY-mm-dd HH:MM:SS>
//! ```
//!
//! Two presets are available:
//! - **Plain** ([`ConsoleSink::PLAIN`]) - no escape codes, suitable for log
//!   files and pipes
//! - **ANSI** ([`ConsoleSink::ANSI`]) - colored output for terminals
//!
//! # Environment Variables
//!
//! [`ConsoleSink::from_env`] reads `FAULTSCOPE_CONSOLE`, a comma-separated
//! list of options:
//!   - `plain` - Never use colors
//!   - `ansi` - Always use colors
//!   - `no-time` - Omit the timestamp
//!
//! Without `plain` or `ansi`, colors are used when standard output is a
//! terminal.
//!
//! # Examples
//!
//! ```
//! use faultscope::{Failure, Label, error::Message, hooks::builtin_hooks::console::ConsoleSink};
//!
//! let failure = Failure::new(Label::new("job.load").unwrap(), Message::new("missing file"));
//! let sink = ConsoleSink {
//!     time_format: None,
//!     ..ConsoleSink::PLAIN
//! };
//! assert_eq!(
//!     sink.format_line(&failure),
//!     "[FAILURE] job.load :: Message(missing file)"
//! );
//! ```

use alloc::string::String;
use core::fmt;
use std::{
    io::{IsTerminal, Write as _},
    sync::OnceLock,
};

use chrono::{DateTime, Local};

use crate::{Failure, Handler};

/// Prefix and suffix written around one part of the output line.
///
/// # Examples
///
/// ```rust
/// use faultscope::hooks::builtin_hooks::console::PartFormatting;
///
/// let red = PartFormatting::new("\x1b[31m", "\x1b[0m");
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PartFormatting {
    /// Text written before the part
    pub prefix: &'static str,
    /// Text written after the part
    pub suffix: &'static str,
}

impl PartFormatting {
    /// Creates a new part formatting.
    pub const fn new(prefix: &'static str, suffix: &'static str) -> Self {
        Self { prefix, suffix }
    }

    const NONE: Self = Self::new("", "");
}

/// Where the console sink writes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stream {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
}

/// Prints failures as single lines.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ConsoleSink {
    /// Formatting of the `[FAILURE]` tag
    pub tag: PartFormatting,
    /// Formatting of the failure source
    pub source: PartFormatting,
    /// Formatting of the error type name and its parentheses
    pub error_type: PartFormatting,
    /// Formatting of the error message
    pub message: PartFormatting,
    /// Formatting of the timestamp
    pub time: PartFormatting,
    /// `chrono` format string of the timestamp, or `None` to omit it
    pub time_format: Option<&'static str>,
    /// Output stream
    pub stream: Stream,
}

impl ConsoleSink {
    /// A configuration without any escape codes.
    pub const PLAIN: Self = Self {
        tag: PartFormatting::NONE,
        source: PartFormatting::NONE,
        error_type: PartFormatting::NONE,
        message: PartFormatting::NONE,
        time: PartFormatting::NONE,
        time_format: Some("%Y-%m-%d %H:%M:%S"),
        stream: Stream::Stdout,
    };

    /// A configuration using ANSI colors.
    ///
    /// The tag and the error type are bright red, the source bold white, the
    /// message bright white and the timestamp dimmed cyan.
    pub const ANSI: Self = Self {
        tag: PartFormatting::new("\x1b[1;91m", "\x1b[0m"),
        source: PartFormatting::new("\x1b[1;37m", "\x1b[0m"),
        error_type: PartFormatting::new("\x1b[1;91m", "\x1b[0m"),
        message: PartFormatting::new("\x1b[97m", "\x1b[39m"),
        time: PartFormatting::new("\x1b[2;36m", "\x1b[0m"),
        time_format: Some("%Y-%m-%d %H:%M:%S"),
        stream: Stream::Stdout,
    };

    /// Returns the configuration selected by `FAULTSCOPE_CONSOLE`.
    pub fn from_env() -> Self {
        let options = ConsoleEnvOptions::get();
        let colored = options
            .colored
            .unwrap_or_else(|| std::io::stdout().is_terminal());
        let base = if colored { Self::ANSI } else { Self::PLAIN };
        Self {
            time_format: if options.no_time {
                None
            } else {
                base.time_format
            },
            ..base
        }
    }

    /// Writes the line for `failure`, without a trailing newline, using
    /// `now` as the timestamp.
    pub fn write_line(
        &self,
        out: &mut impl fmt::Write,
        failure: &Failure,
        now: &DateTime<Local>,
    ) -> fmt::Result {
        let error = failure.error();
        write!(
            out,
            "{}[FAILURE]{} {}{}{} :: {}{}({}{}{}{}{}){}",
            self.tag.prefix,
            self.tag.suffix,
            self.source.prefix,
            failure.source(),
            self.source.suffix,
            self.error_type.prefix,
            error.short_type_name(),
            self.error_type.suffix,
            self.message.prefix,
            error,
            self.message.suffix,
            self.error_type.prefix,
            self.error_type.suffix,
        )?;
        if let Some(time_format) = self.time_format {
            write!(
                out,
                " {}{}{}",
                self.time.prefix,
                now.format(time_format),
                self.time.suffix
            )?;
        }
        Ok(())
    }

    /// Returns the line for `failure` stamped with the current local time.
    pub fn format_line(&self, failure: &Failure) -> String {
        let mut line = String::new();
        self.write_line(&mut line, failure, &Local::now())
            .expect("Unable to format failure line");
        line
    }

    /// Prints the line for `failure`.
    ///
    /// Output errors are ignored: a failure that cannot be printed is lost.
    pub fn emit(&self, failure: &Failure) {
        let mut line = self.format_line(failure);
        line.push('\n');
        let _ = match self.stream {
            Stream::Stdout => std::io::stdout().lock().write_all(line.as_bytes()),
            Stream::Stderr => std::io::stderr().lock().write_all(line.as_bytes()),
        };
    }

    /// Creates a handler printing every failure with this configuration.
    pub fn into_handler(self) -> Handler {
        Handler::new(move |failure| self.emit(failure))
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::from_env()
    }
}

struct ConsoleEnvOptions {
    colored: Option<bool>,
    no_time: bool,
}

impl ConsoleEnvOptions {
    fn get() -> &'static Self {
        static FAULTSCOPE_CONSOLE_FLAGS: OnceLock<ConsoleEnvOptions> = OnceLock::new();

        FAULTSCOPE_CONSOLE_FLAGS.get_or_init(|| {
            let mut colored = None;
            let mut no_time = false;

            if let Some(var) = std::env::var_os("FAULTSCOPE_CONSOLE") {
                for v in var.to_string_lossy().split(',') {
                    let v = v.trim();
                    if v.eq_ignore_ascii_case("plain") {
                        colored = Some(false);
                    } else if v.eq_ignore_ascii_case("ansi") {
                        colored = Some(true);
                    } else if v.eq_ignore_ascii_case("no-time") {
                        no_time = true;
                    }
                }
            }

            ConsoleEnvOptions { colored, no_time }
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{Label, error::Message};

    fn failure() -> Failure {
        Failure::new(Label::new("root.step").unwrap(), Message::new("boom"))
    }

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 17, 12, 30, 5).unwrap()
    }

    #[test]
    fn test_plain_line() {
        let mut line = String::new();
        ConsoleSink::PLAIN
            .write_line(&mut line, &failure(), &noon())
            .unwrap();
        assert_eq!(
            line,
            "[FAILURE] root.step :: Message(boom) 2024-05-17 12:30:05"
        );
    }

    #[test]
    fn test_ansi_line_keeps_field_order() {
        let mut line = String::new();
        ConsoleSink::ANSI
            .write_line(&mut line, &failure(), &noon())
            .unwrap();
        let tag = line.find("[FAILURE]").unwrap();
        let source = line.find("root.step").unwrap();
        let error_type = line.find("Message").unwrap();
        let message = line.find("boom").unwrap();
        let time = line.find("2024-05-17 12:30:05").unwrap();
        assert!(tag < source && source < error_type && error_type < message && message < time);
        assert!(line.contains('\x1b'));
    }

    #[test]
    fn test_without_time() {
        let sink = ConsoleSink {
            time_format: None,
            ..ConsoleSink::PLAIN
        };
        assert_eq!(sink.format_line(&failure()), "[FAILURE] root.step :: Message(boom)");
    }
}
