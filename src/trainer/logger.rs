use std::{
    fmt::Display,
    sync::atomic::{AtomicBool, Ordering::SeqCst},
};

use crate::meter::RunningAverage;

use super::{EpochSummary, TestReport};

static COLOUR: AtomicBool = AtomicBool::new(true);

pub fn ansi<T: Display, U: Display>(x: T, y: U) -> String {
    if COLOUR.load(SeqCst) {
        format!("\x1b[{y}m{x}\x1b[0m")
    } else {
        format!("{x}")
    }
}

pub fn set_colour(val: bool) {
    COLOUR.store(val, SeqCst)
}

/// Colour code for reported numbers.
const NUM_CS: i32 = 36;

/// The running statistics reported on each progress line.
pub struct Meters<'a> {
    pub batch_time: &'a RunningAverage,
    pub loss: &'a RunningAverage,
    pub top1: &'a RunningAverage,
}

impl Meters<'_> {
    fn line(&self) -> String {
        format!(
            "Time {} ({})\tLoss {} ({})\tPrec@1 {} ({})",
            ansi(format!("{:.3}", self.batch_time.val()), NUM_CS),
            ansi(format!("{:.3}", self.batch_time.avg()), NUM_CS),
            ansi(format!("{:.4}", self.loss.val()), NUM_CS),
            ansi(format!("{:.4}", self.loss.avg()), NUM_CS),
            ansi(format!("{:.3}", self.top1.val()), NUM_CS),
            ansi(format!("{:.3}", self.top1.avg()), NUM_CS),
        )
    }
}

pub fn report_train_progress(epoch: usize, batch: usize, batches: usize, meters: Meters) {
    println!("Epoch: [{}][{}/{}]\t{}", ansi(epoch, NUM_CS), batch, batches, meters.line());
}

pub fn report_val_progress(batch: usize, batches: usize, meters: Meters) {
    println!("Test: [{}/{}]\t{}", batch, batches, meters.line());
}

pub fn report_val_finished(precision: f32) {
    println!(" * Prec@1 {}", ansi(format!("{precision:.3}"), 35));
}

pub fn report_test(report: &TestReport) {
    println!(
        "Accuracy of the model on the test images: {}%",
        ansi(format!("{:.2}", report.accuracy), 35)
    );

    for class in &report.per_class {
        let accuracy = class.accuracy().map_or_else(|| "n/a".to_string(), |acc| format!("{acc:.2}%"));
        println!("Accuracy of {} : {}", class.name, ansi(accuracy, NUM_CS));
    }
}

pub fn report_lr_change(prev: f32, lr: f32) {
    if lr < prev {
        println!("LR dropped to {}", ansi(lr, NUM_CS));
    } else if lr > prev {
        println!("LR increased to {}", ansi(lr, NUM_CS));
    }
}

pub fn report_epoch_finished(summary: &EpochSummary, epoch_time: f32, total_time: f32) {
    println!(
        "epoch {} | time {}s | train loss {} | train prec {} | val prec {} | total time {}s",
        ansi(summary.epoch, NUM_CS),
        ansi(format!("{epoch_time:.1}"), NUM_CS),
        ansi(format!("{:.4}", summary.train.loss), NUM_CS),
        ansi(format!("{:.3}", summary.train.precision), NUM_CS),
        ansi(format!("{:.3}", summary.val_precision), NUM_CS),
        ansi(format!("{total_time:.1}"), NUM_CS),
    );
}

pub fn report_time_left(finished_epochs: usize, total_epochs: usize, total_time: f32) {
    let pct = finished_epochs as f32 / total_epochs.max(1) as f32;
    let time_left = total_time / pct - total_time;

    let (hours, minutes, seconds) = seconds_to_hms(time_left as u32);

    println!(
        "Estimated time remaining in training: {}h {}m {}s",
        ansi(hours, NUM_CS),
        ansi(minutes, NUM_CS),
        ansi(seconds, NUM_CS),
    );
}

pub fn seconds_to_hms(mut seconds: u32) -> (u32, u32, u32) {
    let mut minutes = seconds / 60;
    let hours = minutes / 60;
    seconds -= minutes * 60;
    minutes -= hours * 60;

    (hours, minutes, seconds)
}
