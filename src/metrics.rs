/// Receives per-epoch scalar metrics. Fire-and-forget: sinks cannot fail the run.
pub trait MetricSink {
    fn log_value(&mut self, name: &str, value: f32, epoch: usize);
}

/// Emits every metric as a `tracing` event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl MetricSink for TracingSink {
    fn log_value(&mut self, name: &str, value: f32, epoch: usize) {
        tracing::info!(target: "mixtrain::metrics", metric = name, value, epoch);
    }
}

/// Keeps every metric in memory, in arrival order.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    records: Vec<(String, f32, usize)>,
}

impl MemorySink {
    pub fn records(&self) -> &[(String, f32, usize)] {
        &self.records
    }

    pub fn get(&self, name: &str, epoch: usize) -> Option<f32> {
        self.records.iter().find(|(n, _, e)| n == name && *e == epoch).map(|(_, v, _)| *v)
    }
}

impl MetricSink for MemorySink {
    fn log_value(&mut self, name: &str, value: f32, epoch: usize) {
        self.records.push((name.to_string(), value, epoch));
    }
}

impl<T: MetricSink + ?Sized> MetricSink for &mut T {
    fn log_value(&mut self, name: &str, value: f32, epoch: usize) {
        (**self).log_value(name, value, epoch);
    }
}
