use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    trainer::logger::ansi,
};

/// Epoch range, mixup cut-off, reporting rate and learning rate schedule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSchedule {
    pub start_epoch: usize,
    pub end_epoch: usize,
    /// Last epoch trained with mixup. Later epochs use the plain loss.
    pub mixup_until: usize,
    /// Progress is reported every `print_freq` batches, starting with the first.
    pub print_freq: usize,
    pub lr: LrScheduler,
}

impl Default for TrainingSchedule {
    fn default() -> Self {
        Self { start_epoch: 1, end_epoch: 300, mixup_until: 300, print_freq: 10, lr: LrScheduler::default() }
    }
}

impl TrainingSchedule {
    pub fn is_mixup(&self, epoch: usize) -> bool {
        epoch <= self.mixup_until
    }

    pub fn lr(&self, epoch: usize) -> f32 {
        self.lr.lr(epoch)
    }

    pub fn should_print(&self, batch: usize) -> bool {
        batch % self.print_freq == 0
    }

    pub fn num_epochs(&self) -> usize {
        (self.end_epoch + 1).saturating_sub(self.start_epoch)
    }

    pub fn display(&self) {
        println!("Start Epoch            : {}", ansi(self.start_epoch, 31));
        println!("End Epoch              : {}", ansi(self.end_epoch, 31));
        println!("Mixup Until Epoch      : {}", ansi(self.mixup_until, 31));
        println!("Print Frequency        : {}", ansi(self.print_freq, 31));
        println!("LR Scheduler           : {}", self.lr.colourful());
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum LrScheduler {
    /// Constant rate.
    Constant { value: f32 },
    /// Drop once after epoch `drop`, by a factor of `gamma`.
    Drop { start: f32, gamma: f32, drop: usize },
    /// Drop every `step` epochs by a factor of `gamma`.
    Step { start: f32, gamma: f32, step: usize },
    /// Drop by a factor of `gamma` after each epoch in `milestones`.
    MultiStep { start: f32, gamma: f32, milestones: Vec<usize> },
}

impl Default for LrScheduler {
    fn default() -> Self {
        Self::Constant { value: 0.1 }
    }
}

impl LrScheduler {
    pub fn lr(&self, epoch: usize) -> f32 {
        match self {
            Self::Constant { value } => *value,
            Self::Drop { start, gamma, drop } => {
                if epoch > *drop {
                    start * gamma
                } else {
                    *start
                }
            }
            Self::Step { start, gamma, step } => {
                let steps = epoch.saturating_sub(1) / (*step).max(1);
                start * gamma.powi(steps as i32)
            }
            Self::MultiStep { start, gamma, milestones } => {
                let passed = milestones.iter().filter(|&&m| epoch > m).count();
                start * gamma.powi(passed as i32)
            }
        }
    }

    pub(crate) fn check(&self) -> Result<()> {
        let (start, gamma) = match self {
            Self::Constant { value } => (*value, 1.0),
            Self::Drop { start, gamma, .. } | Self::MultiStep { start, gamma, .. } => (*start, *gamma),
            Self::Step { start, gamma, step } => {
                if *step == 0 {
                    return Err(Error::Config("lr step must be positive".to_string()));
                }
                (*start, *gamma)
            }
        };

        if !(start.is_finite() && start >= 0.0) {
            return Err(Error::Config(format!("learning rate {start} must be finite and non-negative")));
        }

        if !(gamma.is_finite() && gamma >= 0.0) {
            return Err(Error::Config(format!("lr gamma {gamma} must be finite and non-negative")));
        }

        Ok(())
    }

    pub fn colourful(&self) -> String {
        match self {
            Self::Constant { value } => format!("constant {}", ansi(value, 31)),
            Self::Drop { start, gamma, drop } => {
                format!("start {} gamma {} drop at {} epochs", ansi(start, 31), ansi(gamma, 31), ansi(drop, 31))
            }
            Self::Step { start, gamma, step } => {
                format!("start {} gamma {} drop every {} epochs", ansi(start, 31), ansi(gamma, 31), ansi(step, 31))
            }
            Self::MultiStep { start, gamma, milestones } => {
                format!(
                    "start {} gamma {} drop after epochs {}",
                    ansi(start, 31),
                    ansi(gamma, 31),
                    ansi(format!("{milestones:?}"), 31),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixup_cut_off() {
        let schedule = TrainingSchedule::default();

        assert!(schedule.is_mixup(1));
        assert!(schedule.is_mixup(300));
        assert!(!schedule.is_mixup(301));
    }

    #[test]
    fn print_includes_first_batch() {
        let schedule = TrainingSchedule { print_freq: 3, ..Default::default() };
        let printed: Vec<usize> = (0..8).filter(|&b| schedule.should_print(b)).collect();

        assert_eq!(printed, vec![0, 3, 6]);
    }

    #[test]
    fn drop_and_step() {
        let drop = LrScheduler::Drop { start: 1.0, gamma: 0.5, drop: 2 };
        assert_eq!([1, 2, 3].map(|e| drop.lr(e)), [1.0, 1.0, 0.5]);

        let step = LrScheduler::Step { start: 1.0, gamma: 0.5, step: 2 };
        assert_eq!([1, 2, 3, 4, 5].map(|e| step.lr(e)), [1.0, 1.0, 0.5, 0.5, 0.25]);
    }

    #[test]
    fn multi_step() {
        let lr = LrScheduler::MultiStep { start: 0.1, gamma: 0.1, milestones: vec![150, 225] };

        assert_eq!(lr.lr(150), 0.1);
        assert!((lr.lr(151) - 0.01).abs() < 1e-6);
        assert!((lr.lr(226) - 0.001).abs() < 1e-6);
    }

    #[test]
    fn check_rejects_bad_rates() {
        assert!(LrScheduler::Constant { value: 0.1 }.check().is_ok());
        assert!(LrScheduler::Constant { value: -0.1 }.check().is_err());
        assert!(LrScheduler::Constant { value: f32::NAN }.check().is_err());
        assert!(LrScheduler::Step { start: 0.1, gamma: 0.1, step: 0 }.check().is_err());
        assert!(LrScheduler::MultiStep { start: 0.1, gamma: f32::INFINITY, milestones: vec![] }.check().is_err());
    }

    #[test]
    fn num_epochs() {
        let schedule = TrainingSchedule { start_epoch: 3, end_epoch: 5, ..Default::default() };
        assert_eq!(schedule.num_epochs(), 3);
    }
}
