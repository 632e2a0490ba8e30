use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    data::Placement,
    error::{Error, Result},
    optimiser::SgdParams,
    schedule::TrainingSchedule,
    trainer::logger::ansi,
};

pub const CIFAR10_CLASSES: [&str; 10] = ["plane", "car", "bird", "cat", "deer", "dog", "frog", "horse", "ship", "truck"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixupConfig {
    /// Beta distribution parameter. Non-positive disables blending.
    pub alpha: f32,
    /// Fixes the sampler's random stream. Drawn from OS entropy when absent.
    pub seed: Option<u64>,
}

impl Default for MixupConfig {
    fn default() -> Self {
        Self { alpha: 1.0, seed: None }
    }
}

/// Per-class accounting in test mode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassBuckets {
    /// Class names, indexed by label.
    pub classes: Vec<String>,
    /// Only the first `samples_per_batch` samples of each batch are attributed
    /// to their class. Every sample is attributed when absent.
    pub samples_per_batch: Option<usize>,
}

impl Default for ClassBuckets {
    fn default() -> Self {
        Self { classes: CIFAR10_CLASSES.iter().map(|c| c.to_string()).collect(), samples_per_batch: None }
    }
}

impl ClassBuckets {
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// How many leading samples of a batch of `len` get attributed.
    pub fn attributed(&self, len: usize) -> usize {
        self.samples_per_batch.map_or(len, |n| n.min(len))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub schedule: TrainingSchedule,
    pub mixup: MixupConfig,
    pub sgd: SgdParams,
    pub test: ClassBuckets,
    pub placement: Placement,
    /// Report per-epoch averages to a metric sink.
    pub log_metrics: bool,
    /// ANSI colour in console reports.
    pub colour: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            schedule: TrainingSchedule::default(),
            mixup: MixupConfig::default(),
            sgd: SgdParams::default(),
            test: ClassBuckets::default(),
            placement: Placement::default(),
            log_metrics: false,
            colour: true,
        }
    }
}

impl TrainConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let schedule = &self.schedule;

        if schedule.print_freq == 0 {
            return Err(Error::Config("print_freq must be positive".to_string()));
        }

        if schedule.end_epoch < schedule.start_epoch {
            return Err(Error::Config(format!(
                "end_epoch {} is before start_epoch {}",
                schedule.end_epoch, schedule.start_epoch
            )));
        }

        schedule.lr.check()?;

        if !self.mixup.alpha.is_finite() {
            return Err(Error::Config(format!("mixup alpha {} must be finite", self.mixup.alpha)));
        }

        if self.test.classes.is_empty() {
            return Err(Error::Config("at least one class is required".to_string()));
        }

        if self.test.samples_per_batch == Some(0) {
            return Err(Error::Config("samples_per_batch must be positive".to_string()));
        }

        Ok(())
    }

    pub fn display(&self) {
        self.schedule.display();
        println!("Mixup Alpha            : {}", ansi(self.mixup.alpha, 31));
        if let Some(seed) = self.mixup.seed {
            println!("Mixup Seed             : {}", ansi(seed, 31));
        }
        println!(
            "SGD                    : momentum {} weight decay {} nesterov {}",
            ansi(self.sgd.momentum, 31),
            ansi(self.sgd.weight_decay, 31),
            ansi(self.sgd.nesterov, 31),
        );
        println!("Classes                : {}", ansi(self.test.num_classes(), 31));
        println!("Placement              : {}", ansi(self.placement.name(), "32;1"));
        println!("Log Metrics            : {}", ansi(self.log_metrics, 31));
    }
}
