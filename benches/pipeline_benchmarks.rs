use async_trait::async_trait;
use chrono::{DateTime, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use gas_sentinel::{
    classify, parse_line, AppState, ArchiveUploader, Broadcaster, Collaborators, IngestPipeline,
    Messenger, PipelineConfig, RawLine, Reading, ReadingStore, Result, RiskTier, SensorEvent,
    Thresholds,
};
use std::sync::Arc;

/// Collaborator that accepts everything and does nothing
struct NullSink;

#[async_trait]
impl ReadingStore for NullSink {
    async fn save(&self, _reading: &Reading) -> Result<()> {
        Ok(())
    }

    async fn save_audit_line(&self, _raw: &str, _timestamp: DateTime<Utc>) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Messenger for NullSink {
    async fn send(&self, _text: &str) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ArchiveUploader for NullSink {
    async fn upload(&self, batch: &[RawLine]) -> Result<String> {
        Ok(format!("null://{}", batch.len()))
    }
}

impl Broadcaster for NullSink {
    fn publish(&self, _event: SensorEvent) -> Result<()> {
        Ok(())
    }
}

fn sample_reading() -> Reading {
    Reading {
        current_value: 200,
        baseline: 120,
        difference: 80,
        tier: RiskTier::Danger,
        timestamp: Utc::now(),
        device: "/dev/ttyACM0".to_string(),
        raw: "Valor actual: 200".to_string(),
        calibrated: true,
    }
}

/// Benchmark line parsing across the line kinds the board emits
fn bench_line_parsing(c: &mut Criterion) {
    let lines = [
        ("calibration", "Calibracion completa. Valor base: 120"),
        ("measurement", "Valor actual: 150"),
        ("chatter", "Calentando sensor, espere por favor..."),
    ];

    for (name, line) in lines.iter() {
        c.bench_with_input(BenchmarkId::new("parse_line", name), line, |b, line| {
            b.iter(|| parse_line(line))
        });
    }
}

/// Benchmark tier classification
fn bench_classification(c: &mut Criterion) {
    let thresholds = Thresholds::default();

    c.bench_function("classify_sweep", |b| {
        b.iter(|| {
            (0..500u32)
                .map(|value| classify(value, 120, &thresholds))
                .filter(|tier| tier.is_alert())
                .count()
        })
    });
}

/// Benchmark WebSocket event preparation
fn bench_event_serialization(c: &mut Criterion) {
    let event = SensorEvent::SensorData(sample_reading());

    c.bench_function("sensor_event_serialization", |b| {
        b.iter(|| serde_json::to_string(&event).expect("Should serialize"))
    });
}

/// Benchmark the full line path with inert collaborators
fn bench_pipeline_throughput(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Should create tokio runtime");
    let sink = Arc::new(NullSink);
    let collaborators = Collaborators {
        store: sink.clone(),
        messenger: sink.clone(),
        archive: sink.clone(),
        broadcaster: sink,
    };
    let mut pipeline = IngestPipeline::new(
        AppState::shared(Default::default()),
        collaborators,
        PipelineConfig::default(),
    );
    pipeline.begin_connection("/dev/ttyACM0");
    rt.block_on(pipeline.process_line(RawLine::new("Calibracion completa. Valor base: 120")));

    c.bench_function("pipeline_measurement_line", |b| {
        b.iter(|| rt.block_on(pipeline.process_line(RawLine::new("Valor actual: 150"))))
    });

    rt.block_on(pipeline.drain());
}

criterion_group!(
    benches,
    bench_line_parsing,
    bench_classification,
    bench_event_serialization,
    bench_pipeline_throughput
);
criterion_main!(benches);
