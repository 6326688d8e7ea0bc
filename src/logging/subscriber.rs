//! Console and file output for shaper's tracing events.
//!
//! Events with these targets get dedicated rendering:
//!
//! | target | emitted by | console | file |
//! |---|---|---|---|
//! | `shaper::stage` | step start | `==> name` | yes |
//! | `shaper::dry_run` | previews | `[dry run] msg` | yes |
//! | `shaper::delta` | set steps | with `-v` | counts as fields |
//! | `shaper::step` | step result | hidden | status and detail as fields |
//! | `shaper::summary` | end of run | coloured by `status` | yes |
use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;
use tracing::field::{Field, Visit};

pub(super) const STAGE: &str = "shaper::stage";
pub(super) const DRY_RUN: &str = "shaper::dry_run";
pub(super) const DELTA: &str = "shaper::delta";
pub(super) const STEP: &str = "shaper::step";
pub(super) const SUMMARY: &str = "shaper::summary";

/// The `message` of an event plus its other fields as `key=value` pairs.
#[derive(Default)]
struct Fields {
    message: String,
    status: Option<String>,
    rest: String,
}

impl Fields {
    fn of(event: &tracing::Event<'_>) -> Self {
        let mut fields = Self::default();
        event.record(&mut fields);
        fields
    }
}

impl Visit for Fields {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            let _ = write!(self.rest, " {}={value:?}", field.name());
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            "status" => {
                self.status = Some(value.to_string());
                let _ = write!(self.rest, " status={value}");
            }
            name => {
                let _ = write!(self.rest, " {name}={value:?}");
            }
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        let _ = write!(self.rest, " {}={value}", field.name());
    }
}

/// Writes every event, `DEBUG` and up, to the run's log file as one
/// timestamped line with its structured fields.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Truncate `path`, write a run header and return the layer.
    ///
    /// Returns `None` if the file cannot be created.
    pub(super) fn create(path: &Path) -> Option<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok()?;
        }
        let version =
            option_env!("SHAPER_VERSION").unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        let mut file = fs::File::create(path).ok()?;
        writeln!(file, "# shaper {version} run started {}", timestamp()).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let metadata = event.metadata();
        let fields = Fields::of(event);
        let line = format!(
            "{} {:<5} [{}] {}{}",
            timestamp(),
            metadata.level().as_str(),
            metadata.target(),
            fields.message,
            fields.rest
        );
        if let Ok(mut file) = self.file.lock() {
            writeln!(file, "{line}").ok();
        }
    }
}

fn status_color(status: &str) -> &'static str {
    match status {
        "ok" => "\x1b[32m",
        "n/a" => "\x1b[2m",
        "skipped" => "\x1b[33m",
        "attention" => "\x1b[1;33m",
        "failed" => "\x1b[31m",
        _ => "\x1b[37m",
    }
}

/// Console rendering of shaper's event targets.
struct ConsoleFormat;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormat
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let fields = Fields::of(event);
        let msg = &fields.message;

        match (*metadata.level(), metadata.target()) {
            (_, STEP) => Ok(()),
            (Level::ERROR, _) => writeln!(writer, "\x1b[31merror:\x1b[0m {msg}"),
            (Level::WARN, _) => writeln!(writer, "\x1b[33mwarning:\x1b[0m {msg}"),
            (_, STAGE) => writeln!(writer, "\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m"),
            (_, DRY_RUN) => writeln!(writer, "  \x1b[33m[dry run]\x1b[0m {msg}"),
            (_, SUMMARY) => match &fields.status {
                Some(status) => writeln!(writer, "  {}{msg}\x1b[0m", status_color(status)),
                None => writeln!(writer, "  {msg}"),
            },
            (Level::INFO, _) => writeln!(writer, "  {msg}"),
            _ => writeln!(writer, "  \x1b[2m{msg}{}\x1b[0m", fields.rest),
        }
    }
}

/// Install the global [`tracing`] subscriber.
///
/// The console layer sends warnings and errors to stderr and the rest to
/// stdout; `verbose` lowers it to `DEBUG`. The file layer always records
/// `DEBUG` and up at [`log_file_path`](super::log_file_path). Call once at
/// startup; later calls keep the first subscriber.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let make_writer = std::io::stderr
        .with_max_level(Level::WARN)
        .and(std::io::stdout.with_min_level(Level::INFO));

    let console_layer = fmt::layer()
        .event_format(ConsoleFormat)
        .with_writer(make_writer)
        .with_filter(console_level);

    let file_layer = super::log_file_path(command)
        .and_then(|path| FileLayer::create(&path))
        .map(|layer| layer.with_filter(LevelFilter::DEBUG));

    let _ = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
