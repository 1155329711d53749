//! Simulated metric producers.
//!
//! Each [`VirtualSensor`] publishes one sample per interval under a fixed
//! source tag. Fields follow deterministic sine waves so rules and tests see
//! reproducible threshold crossings.

use std::f64::consts::TAU;
use std::time::Duration;

use relayhub_app::ports::SampleSink;
use relayhub_app::shutdown::ShutdownSignal;
use relayhub_domain::id::RelayId;
use relayhub_domain::rule::Sample;
use tokio::task::JoinHandle;

/// Source tag of the environmental sensor.
pub const ENVIRONMENTAL_SOURCE: &str = "environmental";

/// Source tag of the supply-rail power monitor.
pub const MAIN_SOURCE: &str = "main";

/// `base + amplitude * sin(2π * step / period)` for one metric field.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub field: String,
    pub base: f64,
    pub amplitude: f64,
    /// Samples per full cycle; at least 1.
    pub period: u32,
}

impl Waveform {
    #[must_use]
    pub fn new(field: impl Into<String>, base: f64, amplitude: f64, period: u32) -> Self {
        Self {
            field: field.into(),
            base,
            amplitude,
            period: period.max(1),
        }
    }

    /// Value at `step`, rounded to two decimals.
    #[must_use]
    pub fn value_at(&self, step: u64) -> f64 {
        let period = u64::from(self.period.max(1));
        #[allow(clippy::cast_precision_loss)]
        let phase = (step % period) as f64 / period as f64 * TAU;
        let value = self.base + self.amplitude * phase.sin();
        (value * 100.0).round() / 100.0
    }
}

/// A simulated sensor publishing samples for one source.
#[derive(Debug, Clone)]
pub struct VirtualSensor {
    source: String,
    waveforms: Vec<Waveform>,
}

impl VirtualSensor {
    #[must_use]
    pub fn new(source: impl Into<String>, waveforms: Vec<Waveform>) -> Self {
        Self {
            source: source.into(),
            waveforms,
        }
    }

    /// Power monitor on one relay's output: `volts`, `amps` and `watts`.
    #[must_use]
    pub fn power(relay: &RelayId) -> Self {
        Self::new(
            relay.as_str(),
            vec![
                Waveform::new("volts", 12.0, 0.3, 17),
                Waveform::new("amps", 4.0, 2.5, 24),
            ],
        )
    }

    /// Power monitor on the supply rail, shared by every relay.
    #[must_use]
    pub fn main_supply() -> Self {
        Self::new(
            MAIN_SOURCE,
            vec![
                Waveform::new("volts", 24.0, 0.5, 31),
                Waveform::new("amps", 9.0, 4.0, 40),
            ],
        )
    }

    /// Ambient sensor: `temperature` (°C) and `humidity` (%).
    #[must_use]
    pub fn environmental() -> Self {
        Self::new(
            ENVIRONMENTAL_SOURCE,
            vec![
                Waveform::new("temperature", 24.0, 6.0, 60),
                Waveform::new("humidity", 55.0, 20.0, 90),
            ],
        )
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The sample published at `step`.
    ///
    /// Power sensors derive `watts` from `volts * amps` like the real monitor.
    #[must_use]
    pub fn sample(&self, step: u64) -> Sample {
        let mut sample: Sample = self
            .waveforms
            .iter()
            .map(|wave| (wave.field.clone(), wave.value_at(step)))
            .collect();
        if let (Some(volts), Some(amps)) = (sample.get("volts"), sample.get("amps")) {
            let watts = (volts * amps * 100.0).round() / 100.0;
            sample.insert("watts".to_string(), watts);
        }
        sample
    }

    /// Publish a sample every `interval` into `sink` until shutdown.
    pub fn spawn<S>(self, sink: S, interval: Duration, mut shutdown: ShutdownSignal) -> JoinHandle<()>
    where
        S: SampleSink + 'static,
    {
        tokio::spawn(async move {
            tracing::info!(
                source = %self.source,
                interval_secs = interval.as_secs(),
                "virtual sensor started"
            );

            let mut step: u64 = 0;
            while !shutdown.is_triggered() {
                let sample = self.sample(step);
                tracing::trace!(source = %self.source, ?sample, "virtual sample");
                sink.ingest(&self.source, &sample).await;
                step = step.wrapping_add(1);

                tokio::select! {
                    () = tokio::time::sleep(interval) => {}
                    () = shutdown.triggered() => {}
                }
            }

            tracing::info!(source = %self.source, "virtual sensor stopped");
        })
    }
}
