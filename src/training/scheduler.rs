use burn::{config::Config, LearningRate};

/// Reductions smaller than this are not applied
const MIN_REDUCTION: f64 = 1e-8;

/// Configuration of the [PlateauScheduler]
#[derive(Config, Debug)]
pub struct PlateauSchedulerConfig {
    /// The starting learning rate
    pub initial_lr: LearningRate,

    /// Multiplier applied to the learning rate on a plateau
    #[config(default = 0.1)]
    pub factor: f64,

    /// Epochs without improvement tolerated before reducing
    #[config(default = 10)]
    pub patience: usize,

    /// Relative improvement needed to count as better
    #[config(default = 1e-4)]
    pub threshold: f64,

    /// Epochs to wait after a reduction before counting bad epochs again
    #[config(default = 0)]
    pub cooldown: usize,

    /// Lower bound for the learning rate
    #[config(default = 0.0)]
    pub min_lr: LearningRate,
}

impl PlateauSchedulerConfig {
    /// Build the scheduler
    pub fn init(&self) -> PlateauScheduler {
        PlateauScheduler {
            lr: self.initial_lr,
            factor: self.factor,
            patience: self.patience,
            threshold: self.threshold,
            cooldown: self.cooldown,
            min_lr: self.min_lr,
            best: f64::INFINITY,
            bad_epochs: 0,
            cooldown_left: 0,
        }
    }
}

/// Reduces the learning rate when a minimized metric stops improving.
///
/// The metric improves when it drops below `best * (1 - threshold)`. After more than
/// `patience` consecutive epochs without improvement the rate is multiplied by `factor`,
/// never going below `min_lr`.
#[derive(Debug, Clone)]
pub struct PlateauScheduler {
    lr: LearningRate,
    factor: f64,
    patience: usize,
    threshold: f64,
    cooldown: usize,
    min_lr: LearningRate,
    best: f64,
    bad_epochs: usize,
    cooldown_left: usize,
}

impl PlateauScheduler {
    /// The current learning rate
    pub fn learning_rate(&self) -> LearningRate {
        self.lr
    }

    /// The best metric seen so far
    pub fn best(&self) -> f64 {
        self.best
    }

    /// Record an epoch's metric and return the learning rate for the next epoch
    pub fn step(&mut self, metric: f64) -> LearningRate {
        if metric < self.best * (1.0 - self.threshold) {
            self.best = metric;
            self.bad_epochs = 0;
        } else {
            self.bad_epochs += 1;
        }

        if self.cooldown_left > 0 {
            self.cooldown_left -= 1;
            self.bad_epochs = 0;
        }

        if self.bad_epochs > self.patience {
            self.reduce();
            self.cooldown_left = self.cooldown;
            self.bad_epochs = 0;
        }

        self.lr
    }

    fn reduce(&mut self) {
        let reduced = (self.lr * self.factor).max(self.min_lr);

        if self.lr - reduced > MIN_REDUCTION {
            log::info!(
                "Validation loss plateaued, reducing learning rate to {:.4e}",
                reduced
            );
            self.lr = reduced;
        }
    }
}
