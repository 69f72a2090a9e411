// ============================================
// Vector Initializer
// ============================================
//
// Cold-start profile for a newly onboarded user:
//   v = [base_interest; 10]
//   v += demographic nudges          -> rescale to target_sum
//   v[c] += preference_boost  once per distinct declared c -> rescale to target_sum
//
// Metadata starts at the neutral default for every dimension.

use super::demographics::demographic_nudge;
use crate::config::ProfileConfig;
use crate::models::{Category, CategoryVector, Demographics, MetadataVector, CATEGORY_DIM};
use crate::utils::rescale_and_normalize;
use tracing::debug;

pub struct VectorInitializer {
    base_interest: f64,
    preference_boost: f64,
    target_sum: f64,
}

impl Default for VectorInitializer {
    fn default() -> Self {
        Self::new(&ProfileConfig::default())
    }
}

impl VectorInitializer {
    pub fn new(config: &ProfileConfig) -> Self {
        Self {
            base_interest: config.base_interest,
            preference_boost: config.preference_boost,
            target_sum: config.target_sum,
        }
    }

    pub fn build(
        &self,
        demographics: &Demographics,
        declared: &[Category],
    ) -> (CategoryVector, MetadataVector) {
        let mut values = CategoryVector::uniform(self.base_interest).0;

        let nudge = demographic_nudge(demographics);
        values.iter_mut().zip(nudge).for_each(|(v, d)| *v += d);
        rescale_and_normalize(&mut values, self.target_sum);

        // declared categories are a set; repeats get a single boost
        let mut boosted = [false; CATEGORY_DIM];
        for category in declared {
            let slot = category.index();
            if !boosted[slot] {
                boosted[slot] = true;
                values[slot] += self.preference_boost;
            }
        }
        rescale_and_normalize(&mut values, self.target_sum);

        debug!(
            age = demographics.age,
            gender = ?demographics.gender,
            location = ?demographics.location,
            declared = declared.len(),
            "Built cold-start interest vector"
        );

        (CategoryVector(values), MetadataVector::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, Location};

    fn demographics(age: u32, gender: Gender, location: Location) -> Demographics {
        Demographics {
            age,
            gender,
            location,
        }
    }

    #[test]
    fn test_no_signal_gives_uniform_vector() {
        let initializer = VectorInitializer::default();
        let (vector, meta) =
            initializer.build(&demographics(120, Gender::Unknown, Location::Unknown), &[]);

        for v in vector.values() {
            assert!((v - 0.5).abs() < 1e-9);
        }
        assert_eq!(meta, MetadataVector::default());
    }

    #[test]
    fn test_sum_is_target_after_initialization() {
        let initializer = VectorInitializer::default();
        let (vector, _) = initializer.build(
            &demographics(25, Gender::Female, Location::Urban),
            &[Category::ScienceTechnology, Category::Sports],
        );

        assert!((vector.sum_abs() - 5.0).abs() < 1e-6);
        assert!(vector.values().iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_declared_category_gets_boosted() {
        let initializer = VectorInitializer::default();
        let demo = demographics(40, Gender::Unknown, Location::Unknown);

        let (plain, _) = initializer.build(&demo, &[]);
        let (boosted, _) = initializer.build(&demo, &[Category::Sports]);

        assert!(boosted.get(Category::Sports) > plain.get(Category::Sports));
        assert!(boosted.get(Category::Sports) > boosted.get(Category::PoliticsLaw));
    }

    #[test]
    fn test_repeated_declaration_boosts_once() {
        let initializer = VectorInitializer::default();
        let demo = demographics(40, Gender::Unknown, Location::Unknown);

        let (once, _) = initializer.build(&demo, &[Category::Sports]);
        let (repeated, _) =
            initializer.build(&demo, &[Category::Sports, Category::Sports, Category::Sports]);

        assert_eq!(once, repeated);
    }

    #[test]
    fn test_demographics_shift_interest() {
        let initializer = VectorInitializer::default();
        let (senior, _) =
            initializer.build(&demographics(70, Gender::Unknown, Location::Unknown), &[]);

        assert!(senior.get(Category::HealthWellness) > senior.get(Category::Sports));
    }
}
