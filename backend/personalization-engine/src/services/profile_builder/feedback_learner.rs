// ============================================
// Feedback Learner
// ============================================
//
// Median-ratio update applied to a user's profile for one article.
//
// For each dimension i, with m the median of the user's sub-vector:
//   ratio[i] = 1 - a[i]/m   if a[i] <= m
//            = 1 - m/a[i]   otherwise
//
// Polarity:
//   Like / Click: a[i] >= m  => u[i] += lr * ratio[i], else u[i] -= lr * ratio[i]
//   Dislike:      a[i] <= m  => u[i] += lr * ratio[i], else u[i] -= lr * ratio[i]
//
// Category sub-vector is rescaled back to target_sum afterwards.
// Metadata sub-vector uses its own median, skips static dimensions and is
// clipped to [0, 1].

use crate::config::ProfileConfig;
use crate::models::{
    CategoryVector, FeedbackAction, MetadataStaticMask, MetadataVector, METADATA_DIM,
};
use crate::utils::{median, median_ratio_from, rescale_and_normalize};
use tracing::debug;

/// Result of one learning step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearnedProfile {
    pub category_vector: CategoryVector,
    pub metadata: MetadataVector,
}

pub struct FeedbackLearner {
    base_learning_rate: f64,
    click_rate_scale: f64,
    target_sum: f64,
}

impl Default for FeedbackLearner {
    fn default() -> Self {
        Self::new(&ProfileConfig::default())
    }
}

impl FeedbackLearner {
    pub fn new(config: &ProfileConfig) -> Self {
        Self {
            base_learning_rate: config.base_learning_rate,
            click_rate_scale: config.click_rate_scale,
            target_sum: config.target_sum,
        }
    }

    pub fn learning_rate(&self, action: FeedbackAction) -> f64 {
        match action {
            FeedbackAction::Click => self.base_learning_rate * self.click_rate_scale,
            FeedbackAction::Like | FeedbackAction::Dislike => self.base_learning_rate,
        }
    }

    /// Apply one interaction to the user's vectors.
    /// Missing article metadata is treated as the neutral default.
    pub fn apply(
        &self,
        user_categories: &CategoryVector,
        user_metadata: &MetadataVector,
        static_mask: &MetadataStaticMask,
        article_categories: &CategoryVector,
        article_metadata: Option<&MetadataVector>,
        action: FeedbackAction,
    ) -> LearnedProfile {
        let lr = self.learning_rate(action);

        // Category sub-vector
        let mut categories = user_categories.0;
        let category_median = median(&categories);
        let article = article_categories.values();
        let ratio = median_ratio_from(category_median, article);

        for (i, value) in categories.iter_mut().enumerate() {
            *value += polarity(action, article[i], category_median) * lr * ratio[i];
        }
        rescale_and_normalize(&mut categories, self.target_sum);

        // Metadata sub-vector
        let mut metadata = user_metadata.to_array();
        let metadata_median = median(&metadata);
        let article_meta = article_metadata.copied().unwrap_or_default().to_array();
        let meta_ratio = median_ratio_from(metadata_median, &article_meta);

        for i in 0..METADATA_DIM {
            if static_mask.is_static_index(i) {
                continue;
            }
            let step = polarity(action, article_meta[i], metadata_median) * lr * meta_ratio[i];
            metadata[i] = (metadata[i] + step).clamp(0.0, 1.0);
        }

        debug!(
            action = ?action,
            learning_rate = lr,
            category_median = category_median,
            metadata_median = metadata_median,
            "Applied median-ratio update"
        );

        LearnedProfile {
            category_vector: CategoryVector(categories),
            metadata: MetadataVector::from_array(metadata),
        }
    }
}

/// +1.0 when the dimension should move up by `lr * ratio`, -1.0 otherwise
fn polarity(action: FeedbackAction, article_value: f64, median: f64) -> f64 {
    let reinforce = match action {
        FeedbackAction::Like | FeedbackAction::Click => article_value >= median,
        FeedbackAction::Dislike => article_value <= median,
    };
    if reinforce {
        1.0
    } else {
        -1.0
    }
}
