use log::{LevelFilter, Metadata, Record};

static STDOUT_LOGGER: SimpleLogger = SimpleLogger { output: Output::Stdout };
static STDERR_LOGGER: SimpleLogger = SimpleLogger { output: Output::Stderr };

/// Where log lines are written. The CLI keeps stdout for its own output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Stdout,
    Stderr,
}

struct SimpleLogger {
    output: Output,
}

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = format_line(record);
            match self.output {
                Output::Stdout => println!("{}", line),
                Output::Stderr => eprintln!("{}", line),
            }
        }
    }

    fn flush(&self) {}
}

fn format_line(record: &Record) -> String {
    format!(
        "{} {} [{}] {}",
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        record.level(),
        record.target(),
        record.args()
    )
}

pub fn init(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    init_to(level, Output::Stdout)
}

pub fn init_to(level: LevelFilter, output: Output) -> Result<(), log::SetLoggerError> {
    let logger = match output {
        Output::Stdout => &STDOUT_LOGGER,
        Output::Stderr => &STDERR_LOGGER,
    };
    log::set_logger(logger).map(|()| log::set_max_level(level))
}
