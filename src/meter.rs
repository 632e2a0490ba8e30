/// Tracks the latest value of a scalar and the weighted mean of every value seen.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningAverage {
    val: f32,
    sum: f32,
    count: usize,
}

impl RunningAverage {
    /// Records `val` as the mean of `n` observations.
    pub fn update(&mut self, val: f32, n: usize) {
        self.val = val;
        self.sum += val * n as f32;
        self.count += n;
    }

    pub fn val(&self) -> f32 {
        self.val
    }

    pub fn sum(&self) -> f32 {
        self.sum
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Zero until the first update.
    pub fn avg(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f32
        }
    }
}
