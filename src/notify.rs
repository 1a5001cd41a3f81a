//! User-visible notifications.

use std::fmt;

use chrono::Local;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => write!(f, "info"),
            Level::Warning => write!(f, "warning"),
            Level::Error => write!(f, "error"),
        }
    }
}

/// Surface for messages meant for the user, as opposed to logs.
pub trait Notifier: Send + Sync {
    fn notify(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.notify(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.notify(Level::Warning, message);
    }

    fn error(&self, message: &str) {
        self.notify(Level::Error, message);
    }
}

/// Prints timestamped notifications to the terminal.
///
/// Info goes to stdout; warnings (yellow) and errors (red) go to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: Level, message: &str) {
        let time = Local::now().format("%H:%M:%S");
        match level {
            Level::Info => println!("[{}] ✓ {}", time, message),
            Level::Warning => eprintln!("\x1b[33m[{}] ⚠ {}\x1b[0m", time, message),
            Level::Error => eprintln!("\x1b[31m[{}] ✗ {}\x1b[0m", time, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(Level, String)>>);

    impl Notifier for Recorder {
        fn notify(&self, level: Level, message: &str) {
            self.0.lock().unwrap().push((level, message.to_string()));
        }
    }

    #[test]
    fn test_level_helpers_route_to_notify() {
        let recorder = Recorder::default();
        recorder.info("a");
        recorder.warn("b");
        recorder.error("c");

        let seen = recorder.0.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (Level::Info, "a".to_string()),
                (Level::Warning, "b".to_string()),
                (Level::Error, "c".to_string()),
            ]
        );
    }

    #[test]
    fn test_level_display() {
        assert_eq!(Level::Warning.to_string(), "warning");
    }
}
