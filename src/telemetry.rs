// Логирование: dev, json или tskv

use chrono::{SecondsFormat, Utc};
use std::fmt::{self, Write as _};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{AppConfig, LoggerType};

pub fn init(app: &AppConfig) -> anyhow::Result<()> {
    let dev = (app.logger_type == LoggerType::Dev).then(|| tracing_subscriber::fmt::layer());
    let json = (app.logger_type == LoggerType::Json).then(|| tracing_subscriber::fmt::layer().json());
    let tskv = (app.logger_type == LoggerType::Tskv).then(|| tracing_subscriber::fmt::layer().event_format(TskvFormat));

    tracing_subscriber::registry()
        .with(EnvFilter::new(&app.rust_log))
        .with(dev)
        .with(json)
        .with(tskv)
        .try_init()?;
    Ok(())
}

/// Формат TSKV: одна строка на событие, поля `ключ=значение` через табуляцию.
#[derive(Debug, Clone, Copy, Default)]
pub struct TskvFormat;

impl<S, N> FormatEvent<S, N> for TskvFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(&self, _ctx: &FmtContext<'_, S, N>, mut writer: Writer<'_>, event: &Event<'_>) -> fmt::Result {
        let meta = event.metadata();
        write!(
            writer,
            "tskv\ttimestamp={}\tlevel={}\ttarget={}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            meta.level(),
            escape(meta.target()),
        )?;

        let mut visitor = TskvVisitor { line: String::new() };
        event.record(&mut visitor);
        writer.write_str(&visitor.line)?;
        writeln!(writer)
    }
}

struct TskvVisitor {
    line: String,
}

impl TskvVisitor {
    fn push(&mut self, field: &Field, value: &str) {
        // запись в String не падает
        let _ = write!(self.line, "\t{}={}", field.name(), escape(value));
    }
}

impl Visit for TskvVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value);
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, &format!("{:?}", value));
    }
}

/// Экранирует символы, ломающие разбор TSKV-строки.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '=' => out.push_str("\\="),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn escapes_separators() {
        assert_eq!(escape("a\tb\nc"), "a\\tb\\nc");
        assert_eq!(escape("k=v\\"), "k\\=v\\\\");
        assert_eq!(escape("Сеанс 19:00"), "Сеанс 19:00");
    }

    #[test]
    fn writes_one_line_per_event_with_fields() {
        let buffer = Buffer::default();
        let make_writer = {
            let buffer = buffer.clone();
            move || buffer.clone()
        };
        let subscriber = tracing_subscriber::fmt()
            .event_format(TskvFormat)
            .with_writer(make_writer)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(tickets = 2, showing = "film-1 @ 19:00", "Order created");
        });

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 1);
        let line = lines[0];
        assert!(line.starts_with("tskv\ttimestamp="));
        assert!(line.contains("\tlevel=INFO"));
        assert!(line.contains("\tmessage=Order created"));
        assert!(line.contains("\ttickets=2"));
        assert!(line.contains("\tshowing=film-1 @ 19:00"));
    }
}
