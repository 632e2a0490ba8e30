use std::time::Instant;

use crate::{
    data::DataSource,
    error::{Error, Result},
    loss::Loss,
    meter::RunningAverage,
    metrics::MetricSink,
    mixup::BatchMixer,
    model::{EvalMode, Model},
    optimiser::Optimiser,
};

use super::{
    hits,
    logger::{self, Meters},
    percent, ClassAccuracy, TestReport, Trainer,
};

impl<M: Model, O: Optimiser, L: Loss, X: BatchMixer, S: MetricSink> Trainer<M, O, L, X, S> {
    /// Evaluates the model on `data` without updating it and returns the
    /// batch-size weighted mean of per-batch top-1 precision.
    pub fn validate<D: DataSource>(&mut self, data: &D, epoch: usize) -> Result<f32> {
        let placement = self.config.placement;
        let print_freq = self.config.schedule.print_freq.max(1);
        let batches = data.num_batches();

        tracing::debug!(epoch, batches, "validating");

        let mut batch_time = RunningAverage::default();
        let mut losses = RunningAverage::default();
        let mut top1 = RunningAverage::default();

        let mut batch_idx = 0;
        let mut end = Instant::now();

        let loss = &self.loss;
        let mut net = EvalMode::enter(&mut self.model);

        data.map_batches(|batch| {
            let batch = placement.place(batch)?;
            let n = batch.len();

            let logits = net.infer(&batch.inputs)?;
            let value = loss.value(&logits, &batch.labels)?;
            let prec1 = percent(hits(&logits.argmax_columns(), &batch.labels) as f32, n);

            losses.update(value, n);
            top1.update(prec1, n);

            batch_time.update(end.elapsed().as_secs_f32(), 1);
            end = Instant::now();

            if batch_idx % print_freq == 0 {
                let meters = Meters { batch_time: &batch_time, loss: &losses, top1: &top1 };
                logger::report_val_progress(batch_idx, batches, meters);
            }

            batch_idx += 1;

            Ok(())
        })?;

        logger::report_val_finished(top1.avg());

        self.log_value("val_loss", losses.avg(), epoch);
        self.log_value("val_acc", top1.avg(), epoch);

        Ok(top1.avg())
    }

    /// Evaluates the model on `data` and breaks the result down by class.
    ///
    /// Only the leading `samples_per_batch` samples of each batch count
    /// towards the per-class figures.
    pub fn test<D: DataSource>(&mut self, data: &D) -> Result<TestReport> {
        let placement = self.config.placement;
        let buckets = &self.config.test;
        let classes = buckets.num_classes();

        let mut top1 = RunningAverage::default();
        let mut correct = 0;
        let mut total = 0;
        let mut class_correct = vec![0; classes];
        let mut class_total = vec![0; classes];

        let mut net = EvalMode::enter(&mut self.model);

        data.map_batches(|batch| {
            let batch = placement.place(batch)?;
            let n = batch.len();

            let logits = net.infer(&batch.inputs)?;
            let predicted = logits.argmax_columns();

            let batch_hits = hits(&predicted, &batch.labels);
            top1.update(percent(batch_hits as f32, n), n);
            correct += batch_hits;
            total += n;

            let attributed = buckets.attributed(n);
            if let Some(expected) = buckets.samples_per_batch {
                if n < expected {
                    tracing::warn!(expected, found = n, "short batch, attributing only the samples present");
                }
            }

            for (&label, &guess) in batch.labels.iter().zip(&predicted).take(attributed) {
                if label >= classes {
                    return Err(Error::LabelOutOfRange { label, classes });
                }

                class_total[label] += 1;
                if guess == label {
                    class_correct[label] += 1;
                }
            }

            Ok(())
        })?;

        let per_class = buckets
            .classes
            .iter()
            .zip(class_correct.into_iter().zip(class_total))
            .map(|(name, (correct, total))| ClassAccuracy { name: name.clone(), correct, total })
            .collect();

        let report = TestReport { accuracy: top1.avg(), correct, total, per_class };
        logger::report_test(&report);

        Ok(report)
    }
}
