// Target selector module
use rand::Rng;

use crate::error::BenchError;

/// Builds timeline request targets for a seeded user population.
///
/// Users are named `{prefix}{n}` with `n` in `1..=population`, matching the
/// naming used when the store is seeded. Each target draws its user
/// independently, so a batch may contain the same user more than once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSelector {
    base_url: String,
    prefix: String,
    population: u32,
}

impl TargetSelector {
    pub fn new(base_url: &str, prefix: &str, population: u32) -> Result<Self, BenchError> {
        if population == 0 {
            return Err(BenchError::InvalidTargetPopulation);
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            prefix: prefix.to_string(),
            population,
        })
    }

    /// Draw a user id uniformly from the population.
    pub fn user_id(&self) -> String {
        self.user_id_with(&mut rand::thread_rng())
    }

    pub fn user_id_with<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        format!("{}{}", self.prefix, rng.gen_range(1..=self.population))
    }

    pub fn timeline_url(&self, user_id: &str) -> String {
        format!("{}/api/timeline?user={}", self.base_url, user_id)
    }

    /// `volume` timeline URLs, each for an independently drawn user.
    pub fn batch(&self, volume: usize) -> Vec<String> {
        self.batch_with(volume, &mut rand::thread_rng())
    }

    pub fn batch_with<R: Rng + ?Sized>(&self, volume: usize, rng: &mut R) -> Vec<String> {
        (0..volume)
            .map(|_| self.timeline_url(&self.user_id_with(rng)))
            .collect()
    }
}
