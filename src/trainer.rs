mod eval;
pub mod logger;
mod train;

use std::time::Instant;

use crate::{
    config::TrainConfig,
    data::DataSource,
    error::Result,
    loss::Loss,
    metrics::{MetricSink, TracingSink},
    mixup::BatchMixer,
    model::Model,
    optimiser::Optimiser,
};

/// Averages over one training epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EpochStats {
    pub loss: f32,
    pub precision: f32,
    pub batches: usize,
    pub samples: usize,
    pub mixup: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpochSummary {
    pub epoch: usize,
    pub lr: f32,
    pub train: EpochStats,
    pub val_precision: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    pub best_precision: f32,
    pub best_epoch: Option<usize>,
    pub epochs: Vec<EpochSummary>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassAccuracy {
    pub name: String,
    pub correct: usize,
    pub total: usize,
}

impl ClassAccuracy {
    /// Percentage correct, or `None` if no sample of this class was seen.
    pub fn accuracy(&self) -> Option<f32> {
        (self.total > 0).then(|| 100.0 * self.correct as f32 / self.total as f32)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TestReport {
    /// Batch-size weighted mean of per-batch top-1 precision.
    pub accuracy: f32,
    pub correct: usize,
    pub total: usize,
    pub per_class: Vec<ClassAccuracy>,
}

/// Owns the model and its collaborators and runs training, validation and test epochs.
pub struct Trainer<M, O, L, X, S = TracingSink> {
    pub model: M,
    pub optimiser: O,
    pub loss: L,
    pub mixer: X,
    pub config: TrainConfig,
    metrics: Option<S>,
}

impl<M: Model, O: Optimiser, L: Loss, X: BatchMixer> Trainer<M, O, L, X> {
    pub fn new(model: M, optimiser: O, loss: L, mixer: X, config: TrainConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { model, optimiser, loss, mixer, config, metrics: None })
    }
}

impl<M: Model, O: Optimiser, L: Loss, X: BatchMixer, S: MetricSink> Trainer<M, O, L, X, S> {
    /// Reports per-epoch averages to `sink`.
    pub fn with_metrics<T: MetricSink>(self, sink: T) -> Trainer<M, O, L, X, T> {
        let Self { model, optimiser, loss, mixer, config, .. } = self;
        Trainer { model, optimiser, loss, mixer, config, metrics: Some(sink) }
    }

    pub fn metrics(&self) -> Option<&S> {
        self.metrics.as_ref()
    }

    fn log_value(&mut self, name: &str, value: f32, epoch: usize) {
        if let Some(sink) = self.metrics.as_mut() {
            sink.log_value(name, value, epoch);
        }
    }

    /// Trains then validates every epoch of the schedule, tracking the best
    /// validation precision. `callback` runs after each epoch.
    pub fn run<T: DataSource, V: DataSource>(
        &mut self,
        train: &T,
        val: &V,
        mut callback: impl FnMut(&mut Self, &EpochSummary) -> Result<()>,
    ) -> Result<RunSummary> {
        println!("{}", logger::ansi("Beginning Training", "34;1"));
        self.config.display();
        println!("Train Batches          : {}", logger::ansi(train.num_batches(), 31));
        println!("Validation Batches     : {}", logger::ansi(val.num_batches(), 31));

        let schedule = self.config.schedule.clone();
        let timer = Instant::now();
        let mut prev_lr = schedule.lr(schedule.start_epoch);
        let mut summary = RunSummary::default();

        for (finished, epoch) in (schedule.start_epoch..=schedule.end_epoch).enumerate() {
            let epoch_timer = Instant::now();

            let lr = schedule.lr(epoch);
            logger::report_lr_change(prev_lr, lr);
            prev_lr = lr;

            if epoch > schedule.start_epoch && schedule.is_mixup(epoch - 1) && !schedule.is_mixup(epoch) {
                println!("Mixup disabled from epoch {}", logger::ansi(epoch, 31));
            }

            let train_stats = self.train_epoch(train, epoch, lr)?;
            let val_precision = self.validate(val, epoch)?;

            let epoch_summary = EpochSummary { epoch, lr, train: train_stats, val_precision };

            if summary.best_epoch.is_none() || val_precision > summary.best_precision {
                summary.best_precision = val_precision;
                summary.best_epoch = Some(epoch);
            }

            let total_time = timer.elapsed().as_secs_f32();
            logger::report_epoch_finished(&epoch_summary, epoch_timer.elapsed().as_secs_f32(), total_time);
            logger::report_time_left(finished + 1, schedule.num_epochs(), total_time);

            callback(self, &epoch_summary)?;
            summary.epochs.push(epoch_summary);
        }

        let (hours, minutes, seconds) = logger::seconds_to_hms(timer.elapsed().as_secs() as u32);
        println!(
            "Total Training Time: {}h {}m {}s | Best Prec@1 {}",
            logger::ansi(hours, 36),
            logger::ansi(minutes, 36),
            logger::ansi(seconds, 36),
            logger::ansi(format!("{:.3}", summary.best_precision), 35),
        );

        Ok(summary)
    }
}

/// `100 * correct / total`, zero for an empty total.
fn percent(correct: f32, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        100.0 * correct / total as f32
    }
}

/// Count of samples whose predicted class equals the label.
fn hits(predicted: &[usize], labels: &[usize]) -> usize {
    predicted.iter().zip(labels).filter(|(p, l)| p == l).count()
}
