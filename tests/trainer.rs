use mixtrain::{
    mix_with, Batch, BatchMixer, ClassBuckets, CrossEntropy, DenseMatrix, Error, InMemorySource, Linear,
    LrScheduler, MemorySink, MixedBatch, MixupSampler, Mode, Model, Optimiser, Param, Result, Sgd, SgdParams,
    Shape, TrainConfig, Trainer, TrainingSchedule,
};

const CLASSES: usize = 4;

/// Outputs its inputs as logits, so a one-hot input is a prediction.
#[derive(Default)]
struct Identity {
    mode: Option<Mode>,
    backward_calls: usize,
}

impl Model for Identity {
    fn forward(&mut self, inputs: &DenseMatrix) -> Result<DenseMatrix> {
        Ok(inputs.clone())
    }

    fn infer(&mut self, inputs: &DenseMatrix) -> Result<DenseMatrix> {
        Ok(inputs.clone())
    }

    fn backward(&mut self, _: &DenseMatrix) -> Result<()> {
        self.backward_calls += 1;
        Ok(())
    }

    fn parameters(&mut self) -> Vec<Param<'_>> {
        Vec::new()
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = Some(mode);
    }
}

/// Always mixes with the same permutation and coefficient, counting calls.
struct FixedMixer {
    index: Vec<usize>,
    lambda: f32,
    calls: usize,
}

impl FixedMixer {
    fn new(index: Vec<usize>, lambda: f32) -> Self {
        Self { index, lambda, calls: 0 }
    }
}

impl BatchMixer for FixedMixer {
    fn mix(&mut self, batch: &Batch) -> Result<MixedBatch> {
        self.calls += 1;
        mix_with(batch, &self.index, self.lambda)
    }
}

fn one_hot(class: usize) -> Vec<f32> {
    let mut col = vec![0.0; CLASSES];
    col[class] = 1.0;
    col
}

/// Samples whose identity logits predict `predicted`, labelled `labels`.
fn source(predicted: &[usize], labels: &[usize], batch_size: usize) -> InMemorySource {
    let vals = predicted.iter().flat_map(|&p| one_hot(p)).collect();
    let samples = DenseMatrix::from_vec(Shape::new(CLASSES, predicted.len()), vals).unwrap();
    InMemorySource::new(samples, labels.to_vec(), batch_size).unwrap()
}

fn config(mixup_until: usize) -> TrainConfig {
    TrainConfig {
        schedule: TrainingSchedule {
            start_epoch: 1,
            end_epoch: 1,
            mixup_until,
            print_freq: 1,
            lr: LrScheduler::Constant { value: 0.1 },
        },
        test: ClassBuckets { classes: ["a", "b", "c", "d"].map(String::from).to_vec(), samples_per_batch: None },
        ..Default::default()
    }
}

fn trainer(mixer: FixedMixer, config: TrainConfig) -> Trainer<Identity, Sgd, CrossEntropy, FixedMixer> {
    Trainer::new(Identity::default(), Sgd::new(SgdParams::default()), CrossEntropy, mixer, config).unwrap()
}

#[test]
fn mixup_epoch_accumulates_soft_precision() {
    let labels = [0, 1, 2, 3, 0, 1, 2, 3];
    let data = source(&labels, &labels, 4);

    // every sample is mixed with a sample of a different class, and 0.7 of
    // the blend keeps the prediction on its own label
    let mut trainer = trainer(FixedMixer::new(vec![1, 2, 3, 0], 0.7), config(1));
    let stats = trainer.train_epoch(&data, 1, 0.1).unwrap();

    assert!(stats.mixup);
    assert_eq!(stats.batches, 2);
    assert_eq!(stats.samples, 8);
    assert!((stats.precision - 70.0).abs() < 1e-3, "{}", stats.precision);
    assert!(stats.loss.is_finite());
    assert_eq!(trainer.mixer.calls, 2);
    assert_eq!(trainer.model.backward_calls, 2);
    assert_eq!(trainer.model.mode, Some(Mode::Train));
}

#[test]
fn precision_is_cumulative_with_mixup_and_per_batch_without() {
    let labels = [0, 1, 2, 3, 0, 1, 2, 3];
    let predicted = [0, 1, 2, 3, 0, 0, 2, 2];
    let data = source(&predicted, &labels, 4);

    let mut trainer = trainer(FixedMixer::new(vec![0, 1, 2, 3], 1.0), config(1));

    // batch precision 100 then 50
    let plain = trainer.train_epoch(&data, 2, 0.1).unwrap();
    assert!(!plain.mixup);
    assert!((plain.precision - 75.0).abs() < 1e-4);
    assert_eq!(trainer.mixer.calls, 0);

    // cumulative precision 100 then 75
    let mixup = trainer.train_epoch(&data, 1, 0.1).unwrap();
    assert!(mixup.mixup);
    assert!((mixup.precision - 87.5).abs() < 1e-4);
    assert_eq!(trainer.mixer.calls, 2);
}

#[test]
fn mixer_is_unused_after_cut_off() {
    let labels = [0, 1, 2, 3, 0, 1];
    let data = source(&labels, &labels, 2);

    let mut trainer = trainer(FixedMixer::new(vec![1, 0], 0.5), config(300));

    trainer.train_epoch(&data, 301, 0.1).unwrap();
    assert_eq!(trainer.mixer.calls, 0);

    trainer.train_epoch(&data, 300, 0.1).unwrap();
    assert_eq!(trainer.mixer.calls, 3);
}

#[test]
fn epoch_averages_reach_sink() {
    let labels = [0, 1, 2, 3];
    let predicted = [0, 1, 2, 2];
    let data = source(&predicted, &labels, 2);

    let mut trainer = trainer(FixedMixer::new(vec![0, 1], 1.0), config(0)).with_metrics(MemorySink::default());

    let stats = trainer.train_epoch(&data, 1, 0.1).unwrap();
    let val = trainer.validate(&data, 1).unwrap();

    let sink = trainer.metrics().unwrap();
    assert_eq!(sink.get("train_loss", 1), Some(stats.loss));
    assert_eq!(sink.get("train_acc", 1), Some(stats.precision));
    assert_eq!(sink.get("val_acc", 1), Some(val));
    assert!(sink.get("val_loss", 1).is_some());
    assert_eq!(sink.records().len(), 4);
}

#[test]
fn validation_weights_batches_by_size() {
    let labels = [0, 1, 2, 3];
    let predicted = [0, 1, 2, 0];
    let data = source(&predicted, &labels, 3);

    let mut trainer = trainer(FixedMixer::new(vec![0, 1, 2], 1.0), config(0));
    let precision = trainer.validate(&data, 1).unwrap();

    assert!((precision - 75.0).abs() < 1e-4);
    assert_eq!(trainer.model.mode, Some(Mode::Eval));
    assert_eq!(trainer.model.backward_calls, 0);
}

#[test]
fn test_breaks_down_leading_samples_by_class() {
    let labels = [0, 1, 2, 3, 0, 1, 2, 3];
    let predicted = [0, 1, 2, 3, 1, 1, 2, 3];
    let data = source(&predicted, &labels, 4);

    let mut config = config(0);
    config.test.samples_per_batch = Some(2);

    let mut trainer = trainer(FixedMixer::new(vec![0, 1, 2, 3], 1.0), config);
    let report = trainer.test(&data).unwrap();

    assert_eq!(report.correct, 7);
    assert_eq!(report.total, 8);
    assert!((report.accuracy - 87.5).abs() < 1e-4);

    let counts: Vec<(usize, usize)> = report.per_class.iter().map(|c| (c.correct, c.total)).collect();
    assert_eq!(counts, vec![(1, 2), (2, 2), (0, 0), (0, 0)]);

    assert_eq!(report.per_class[0].accuracy(), Some(50.0));
    assert_eq!(report.per_class[2].accuracy(), None);
    assert_eq!(report.per_class[3].name, "d");
}

#[test]
fn short_batches_attribute_present_samples() {
    let labels = [0, 1, 2, 3, 0, 1];
    let data = source(&labels, &labels, 4);

    let mut config = config(0);
    config.test.samples_per_batch = Some(4);

    let mut trainer = trainer(FixedMixer::new(vec![0, 1, 2, 3], 1.0), config);
    let report = trainer.test(&data).unwrap();

    let attributed: usize = report.per_class.iter().map(|c| c.total).sum();
    assert_eq!(attributed, 6);
    assert_eq!(report.per_class[0].accuracy(), Some(100.0));
}

#[test]
fn test_rejects_labels_without_a_class() {
    let predicted = [0, 1, 2, 3];
    let labels = [0, 1, 3, 2];
    let data = source(&predicted, &labels, 4);

    let mut config = config(0);
    config.test.classes = vec!["a".to_string(), "b".to_string()];

    let mut trainer = trainer(FixedMixer::new(vec![0, 1, 2, 3], 1.0), config);

    assert!(matches!(trainer.test(&data), Err(Error::LabelOutOfRange { label: 3, classes: 2 })));
}

#[test]
fn non_finite_loss_stops_before_backward() {
    let samples = DenseMatrix::from_vec(Shape::new(CLASSES, 2), vec![f32::NAN; 2 * CLASSES]).unwrap();
    let data = InMemorySource::new(samples, vec![0, 1], 2).unwrap();

    let mut trainer = trainer(FixedMixer::new(vec![1, 0], 0.5), config(0));

    assert!(matches!(trainer.train_epoch(&data, 1, 0.1), Err(Error::NonFiniteLoss { epoch: 1, batch: 0, .. })));
    assert_eq!(trainer.model.backward_calls, 0);
}

#[test]
fn linear_model_learns_separable_classes() {
    let labels: Vec<usize> = (0..16).map(|i| i % CLASSES).collect();
    let data = source(&labels, &labels, 4);

    let mut config = config(2);
    config.schedule.end_epoch = 10;
    config.schedule.print_freq = 100;
    config.schedule.lr = LrScheduler::Constant { value: 0.5 };

    let sgd = Sgd::new(SgdParams { momentum: 0.0, weight_decay: 0.0, nesterov: false });
    let mixer = MixupSampler::seeded(1.0, Some(11)).unwrap();

    let mut trainer = Trainer::new(Linear::zeroed(CLASSES, CLASSES), sgd, CrossEntropy, mixer, config).unwrap();

    let mut seen = Vec::new();
    let summary = trainer
        .run(&data, &data, |_, epoch| {
            seen.push(epoch.epoch);
            Ok(())
        })
        .unwrap();

    assert_eq!(seen, (1..=10).collect::<Vec<_>>());
    assert_eq!(summary.epochs.len(), 10);
    assert!(summary.epochs[..2].iter().all(|e| e.train.mixup));
    assert!(summary.epochs[2..].iter().all(|e| !e.train.mixup));
    assert!(summary.best_precision > 99.0);
    assert!(summary.best_epoch.is_some());

    let last = summary.epochs[9].train.loss;
    assert!(last < summary.epochs[2].train.loss);
    assert_eq!(trainer.model.mode(), Mode::Eval);
}

#[test]
fn callback_errors_end_the_run() {
    let labels = [0, 1, 2, 3];
    let data = source(&labels, &labels, 2);

    let mut config = config(0);
    config.schedule.end_epoch = 5;

    let mut trainer = trainer(FixedMixer::new(vec![0, 1], 1.0), config);
    let result = trainer.run(&data, &data, |_, epoch| {
        if epoch.epoch == 2 {
            Err(Error::Config("stop".to_string()))
        } else {
            Ok(())
        }
    });

    assert!(matches!(result, Err(Error::Config(_))));
}
