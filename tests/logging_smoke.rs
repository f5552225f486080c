use std::io;
use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use rankgrid::{
    format_heatmap_data, interpolate, log_app_bind, log_app_start, log_heatmap_config, Bucket,
    DisplayZone, HeatmapConfig, HeatmapKeyword, HeatmapResponse, LoggingConfig, RankObservation,
};
use tracing::dispatcher::with_default;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriter;

#[derive(Clone, Default)]
struct SharedWriter {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedWriter {
    fn output_string(&self) -> String {
        let bytes = self
            .inner
            .lock()
            .expect("writer lock should not be poisoned");
        String::from_utf8_lossy(&bytes).to_string()
    }
}

struct SharedWriterGuard {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl<'a> MakeWriter<'a> for SharedWriter {
    type Writer = SharedWriterGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedWriterGuard {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Write for SharedWriterGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut out = self
            .inner
            .lock()
            .expect("writer lock should not be poisoned");
        out.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture_logs(max_level: Level, f: impl FnOnce()) -> String {
    let writer = SharedWriter::default();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_max_level(max_level)
        .with_writer(writer.clone())
        .finish();
    let dispatch = tracing::Dispatch::new(subscriber);

    with_default(&dispatch, f);
    writer.output_string()
}

fn obs(date: &str, interpolated: bool) -> RankObservation {
    RankObservation {
        bucket: Some(Bucket::Text(format!("{date}T00:00:00Z"))),
        organic_rank: Some(12.0),
        is_interpolated: interpolated,
        ..RankObservation::default()
    }
}

#[test]
fn startup_events_are_structured() {
    let logs = capture_logs(Level::INFO, || {
        log_app_start(&LoggingConfig::default());
        log_heatmap_config(&HeatmapConfig::default());
        log_app_bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080));
    });

    assert!(logs.contains("\"event\":\"app.start\""));
    assert!(logs.contains("\"event\":\"config.selected\""));
    assert!(logs.contains("\"time_zone\":\"PST\""));
    assert!(logs.contains("\"event\":\"app.bind\""));
    assert!(logs.contains("127.0.0.1:8080"));
}

#[test]
fn heatmap_build_reports_row_and_span_counts() {
    let data = HeatmapResponse {
        keywords: vec![HeatmapKeyword {
            keyword_id: "kw1".to_string(),
            ranks: vec![
                obs("2024-03-01", false),
                obs("2024-03-02", true),
                obs("2024-03-03", false),
            ],
            ..HeatmapKeyword::default()
        }],
        ..HeatmapResponse::default()
    };
    let dates: Vec<String> = ["2024-03-01", "2024-03-02", "2024-03-03"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let logs = capture_logs(Level::INFO, || {
        format_heatmap_data(&data, &DisplayZone::utc(), &dates);
    });

    assert!(logs.contains("\"event\":\"heatmap.built\""));
    assert!(logs.contains("\"mode\":\"keywords\""));
    assert!(logs.contains("\"rows\":1"));
    assert!(logs.contains("\"spans\":1"));
}

#[test]
fn skipped_observations_and_splits_log_at_debug() {
    let mut no_bucket = obs("2024-01-30", true);
    no_bucket.bucket = None;
    let ranks = vec![
        no_bucket,
        obs("2024-01-31", true),
        obs("2024-02-01", true),
        obs("2024-02-02", false),
    ];
    let dates: Vec<String> = ["2024-01-30", "2024-01-31", "2024-02-01", "2024-02-02"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let logs = capture_logs(Level::DEBUG, || {
        interpolate(&ranks, &DisplayZone::utc(), &dates);
    });
    assert!(logs.contains("\"event\":\"observation.skipped\""));
    assert!(logs.contains("\"event\":\"span.split\""));

    let quiet = capture_logs(Level::INFO, || {
        interpolate(&ranks, &DisplayZone::utc(), &dates);
    });
    assert!(!quiet.contains("span.split"));
}
