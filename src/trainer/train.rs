use std::time::Instant;

use crate::{
    data::DataSource,
    error::{Error, Result},
    loss::Loss,
    meter::RunningAverage,
    metrics::MetricSink,
    mixup::{blended_loss, BatchMixer},
    model::{Model, TrainMode},
    optimiser::Optimiser,
};

use super::{
    hits,
    logger::{self, Meters},
    percent, EpochStats, Trainer,
};

impl<M: Model, O: Optimiser, L: Loss, X: BatchMixer, S: MetricSink> Trainer<M, O, L, X, S> {
    /// One pass over `data` with one optimiser step per batch.
    ///
    /// Epochs up to `mixup_until` train on mixed batches and report precision
    /// cumulatively over the epoch so far. Later epochs train on the batches as
    /// given and report the precision of each batch on its own.
    pub fn train_epoch<D: DataSource>(&mut self, data: &D, epoch: usize, lr: f32) -> Result<EpochStats> {
        let is_mixup = self.config.schedule.is_mixup(epoch);
        let placement = self.config.placement;
        let print_freq = self.config.schedule.print_freq.max(1);
        let batches = data.num_batches();

        tracing::debug!(epoch, lr, is_mixup, batches, "training epoch");

        let mut batch_time = RunningAverage::default();
        let mut losses = RunningAverage::default();
        let mut top1 = RunningAverage::default();

        // mixup only
        let mut total = 0;
        let mut correct = 0.0;

        let mut batch_idx = 0;
        let mut end = Instant::now();

        let Self { model, optimiser, loss, mixer, .. } = self;
        let mut net = TrainMode::enter(model);

        data.map_batches(|batch| {
            let batch = placement.place(batch)?;
            let n = batch.len();

            let (output, prec1) = if is_mixup {
                let mixed = mixer.mix(&batch)?;
                let logits = net.forward(&mixed.inputs)?;
                let output = blended_loss(&*loss, &logits, &mixed.targets_a, &mixed.targets_b, mixed.lambda)?;

                total += n;
                correct += mixed.soft_correct(&logits.argmax_columns());

                (output, percent(correct, total))
            } else {
                let logits = net.forward(&batch.inputs)?;
                let output = loss.evaluate(&logits, &batch.labels)?;
                let prec1 = percent(hits(&logits.argmax_columns(), &batch.labels) as f32, n);

                (output, prec1)
            };

            if !output.value.is_finite() {
                return Err(Error::NonFiniteLoss { epoch, batch: batch_idx, loss: output.value });
            }

            losses.update(output.value, n);
            top1.update(prec1, n);

            optimiser.zero_grad(&mut net.parameters());
            net.backward(&output.grad)?;
            optimiser.step(&mut net.parameters(), lr)?;

            batch_time.update(end.elapsed().as_secs_f32(), 1);
            end = Instant::now();

            if batch_idx % print_freq == 0 {
                let meters = Meters { batch_time: &batch_time, loss: &losses, top1: &top1 };
                logger::report_train_progress(epoch, batch_idx, batches, meters);
            }

            batch_idx += 1;

            Ok(())
        })?;

        self.log_value("train_loss", losses.avg(), epoch);
        self.log_value("train_acc", top1.avg(), epoch);

        Ok(EpochStats {
            loss: losses.avg(),
            precision: top1.avg(),
            batches: batch_idx,
            samples: losses.count(),
            mixup: is_mixup,
        })
    }
}
