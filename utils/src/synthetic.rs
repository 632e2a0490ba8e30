use std::{path::PathBuf, time::Instant};

use anyhow::Context;
use mixtrain::{
    logger, CrossEntropy, DenseMatrix, InMemorySource, Linear, MixupSampler, Optimiser, Sgd, Shape, TracingSink,
    TrainConfig, Trainer,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal, Uniform};
use structopt::StructOpt;

/// Trains a linear classifier on gaussian clusters, one per class.
#[derive(StructOpt)]
pub struct SyntheticOptions {
    #[structopt(short, long)]
    config: Option<PathBuf>,
    #[structopt(long, default_value = "4096")]
    train_samples: usize,
    #[structopt(long, default_value = "1024")]
    val_samples: usize,
    #[structopt(long, default_value = "32")]
    features: usize,
    #[structopt(short, long, default_value = "128")]
    batch_size: usize,
    /// Standard deviation of each cluster around its centre.
    #[structopt(long, default_value = "1.0")]
    spread: f32,
    /// Overrides the config's last epoch.
    #[structopt(short, long)]
    epochs: Option<usize>,
    #[structopt(long)]
    seed: Option<u64>,
}

impl SyntheticOptions {
    pub fn run(&self) -> anyhow::Result<()> {
        let mut config = match &self.config {
            Some(path) => TrainConfig::load(path).with_context(|| format!("Invalid config: {}", path.display()))?,
            None => TrainConfig::default(),
        };

        if let Some(epochs) = self.epochs {
            config.schedule.end_epoch = epochs;
            config.validate().with_context(|| "Invalid epoch override.")?;
        }

        logger::set_colour(config.colour);

        let mut rng = self.seed.map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64);
        let clusters = Clusters::new(config.test.num_classes(), self.features, self.spread, &mut rng)?;

        let timer = Instant::now();
        let train = clusters.sample(self.train_samples, self.batch_size, &mut rng)?;
        let val = clusters.sample(self.val_samples, self.batch_size, &mut rng)?;
        println!(
            "Generated {} train and {} validation samples in {:.2} seconds",
            train.num_samples(),
            val.num_samples(),
            timer.elapsed().as_secs_f32()
        );

        let model = Linear::randomised(self.features, clusters.classes, &mut rng);
        let optimiser = Sgd::new(config.sgd.clone());
        let mixer = MixupSampler::seeded(config.mixup.alpha, config.mixup.seed)?;
        let log_metrics = config.log_metrics;

        let mut trainer = Trainer::new(model, optimiser, CrossEntropy, mixer, config)?;
        if log_metrics {
            trainer = trainer.with_metrics(TracingSink);
        }

        let summary = trainer.run(&train, &val, |_, _| Ok(()))?;
        tracing::info!(best_precision = summary.best_precision, best_epoch = ?summary.best_epoch, "finished training");

        trainer.test(&val)?;

        Ok(())
    }
}

/// One gaussian cluster centre per class.
struct Clusters {
    classes: usize,
    features: usize,
    centres: Vec<f32>,
    noise: Normal<f32>,
}

impl Clusters {
    fn new(classes: usize, features: usize, spread: f32, rng: &mut impl Rng) -> anyhow::Result<Self> {
        let noise = Normal::new(0.0, spread).with_context(|| format!("Invalid spread: {spread}"))?;
        let centres = Uniform::new(-2.0, 2.0).sample_iter(&mut *rng).take(classes * features).collect();

        Ok(Self { classes, features, centres, noise })
    }

    fn sample(&self, samples: usize, batch_size: usize, rng: &mut impl Rng) -> anyhow::Result<InMemorySource> {
        let mut vals = Vec::with_capacity(samples * self.features);
        let mut labels = Vec::with_capacity(samples);

        for _ in 0..samples {
            let label = rng.gen_range(0..self.classes);
            let centre = &self.centres[label * self.features..(label + 1) * self.features];

            vals.extend(centre.iter().map(|c| c + self.noise.sample(rng)));
            labels.push(label);
        }

        let inputs = DenseMatrix::from_vec(Shape::new(self.features, samples), vals)?;
        Ok(InMemorySource::new(inputs, labels, batch_size)?)
    }
}
