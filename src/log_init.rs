use log::{LevelFilter, Metadata, Record};
use std::fs::OpenOptions;
use std::io::Write;

enum Target {
    File(String),
    Stderr,
}

struct CompilerLogger {
    target: Target,
    level: LevelFilter,
}

impl log::Log for CompilerLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match &self.target {
            Target::File(path) => {
                if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
                    let _ = writeln!(file, "[{}] {}", record.level(), record.args());
                }
            }
            Target::Stderr => {
                eprintln!("lessc: {}: {}", record.level().as_str().to_lowercase(), record.args());
            }
        }
    }

    fn flush(&self) {}
}

/// Installs the global logger, appending to `path` if given and writing to
/// stderr otherwise.
pub fn init_logger(path: Option<&str>, level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let target = match path {
        Some(path) => Target::File(path.to_string()),
        None => Target::Stderr,
    };
    log::set_boxed_logger(Box::new(CompilerLogger { target, level }))?;
    log::set_max_level(level);
    Ok(())
}
