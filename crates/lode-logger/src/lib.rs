use crossterm::{ExecutableCommand, cursor, terminal};
use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::sync::OnceLock;
use std::time::Instant;

pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
    Debug,
}

pub struct Logger {
    start_time: Instant,
    quiet: bool,
}

impl Logger {
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            start_time: Instant::now(),
            quiet,
        }
    }

    fn clear_status_line(&self) {
        if self.quiet {
            return;
        }
        let mut stdout = io::stdout();
        let _ = stdout.execute(cursor::MoveToColumn(0));
        let _ = stdout.execute(terminal::Clear(terminal::ClearType::CurrentLine));
        let _ = stdout.flush();
    }

    /// Overwrite the current status line without advancing.
    pub fn status(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.clear_status_line();
        print!("{} {}", "◦".bright_cyan(), message);
        let _ = io::stdout().flush();
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if self.quiet && !matches!(level, LogLevel::Error) {
            return;
        }
        self.clear_status_line();

        let prefix = match level {
            LogLevel::Info => "lode".bright_cyan().bold().to_string(),
            LogLevel::Success => "✓".bright_green().bold().to_string(),
            LogLevel::Warning => "⚠".bright_yellow().bold().to_string(),
            LogLevel::Error => "✗".bright_red().bold().to_string(),
            LogLevel::Debug => "•".bright_black().bold().to_string(),
        };
        println!("{prefix} {message}");
    }

    /// Final line of a command, annotated with the elapsed time.
    pub fn finish(&self, message: &str) {
        let elapsed = self.start_time.elapsed();
        let time_str = if elapsed.as_millis() < 1000 {
            format!("{}ms", elapsed.as_millis())
        } else {
            format!("{:.2}s", elapsed.as_secs_f64())
        };

        self.clear_status_line();
        println!(
            "{} {} {}",
            "✓".bright_green().bold(),
            message.bright_green(),
            format!("[{time_str}]").bright_black()
        );
    }
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Install the process-wide logger. Later calls are no-ops, so tests and
/// library consumers that never call this get a non-quiet default.
pub fn init_logger(quiet: bool) {
    let _ = LOGGER.set(Logger::new(quiet));
}

fn get_logger() -> &'static Logger {
    LOGGER.get_or_init(|| Logger::new(false))
}

pub fn status(message: &str) {
    get_logger().status(message);
}

pub fn info(message: &str) {
    get_logger().log(LogLevel::Info, message);
}

pub fn success(message: &str) {
    get_logger().log(LogLevel::Success, message);
}

pub fn warn(message: &str) {
    get_logger().log(LogLevel::Warning, message);
}

pub fn error(message: &str) {
    get_logger().log(LogLevel::Error, message);
}

pub fn debug(message: &str, debug_enabled: bool) {
    if debug_enabled {
        get_logger().log(LogLevel::Debug, message);
    }
}

pub fn finish(message: &str) {
    get_logger().finish(message);
}
