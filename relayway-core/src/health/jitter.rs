use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded noise applied to selection ranking, never to the score itself.
///
/// Identical seeds produce identical sequences, so runs with jitter enabled
/// are still reproducible.
#[derive(Debug, Clone)]
pub struct ScoreJitter {
    rng: StdRng,
    amplitude: f64,
}

impl ScoreJitter {
    pub fn new(seed: u64, amplitude: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            amplitude: amplitude.abs(),
        }
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn perturb(&mut self, score: f64) -> f64 {
        if self.amplitude == 0.0 {
            return score;
        }

        score + self.rng.random_range(-self.amplitude..=self.amplitude)
    }
}
