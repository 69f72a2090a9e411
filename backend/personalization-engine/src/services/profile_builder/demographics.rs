// ============================================
// Demographic Nudges
// ============================================
//
// Hand-tuned per-category deltas applied once at onboarding.
// Age, gender and location contribute independently and are summed.

use crate::models::{Category, Demographics, Gender, Location, CATEGORY_DIM};

type Nudges = &'static [(Category, f64)];

struct AgeBracket {
    min: u32,
    max: u32,
    nudges: Nudges,
}

const AGE_BRACKETS: [AgeBracket; 6] = [
    AgeBracket {
        min: 0,
        max: 17,
        nudges: &[
            (Category::CultureEntertainment, 0.15),
            (Category::ScienceTechnology, 0.10),
            (Category::Sports, 0.05),
        ],
    },
    AgeBracket {
        min: 18,
        max: 24,
        nudges: &[
            (Category::CultureEntertainment, 0.10),
            (Category::ScienceTechnology, 0.10),
            (Category::Sports, 0.05),
        ],
    },
    AgeBracket {
        min: 25,
        max: 34,
        nudges: &[
            (Category::ScienceTechnology, 0.10),
            (Category::EconomyBusiness, 0.07),
            (Category::CultureEntertainment, 0.05),
        ],
    },
    AgeBracket {
        min: 35,
        max: 49,
        nudges: &[
            (Category::HealthWellness, 0.10),
            (Category::EducationSociety, 0.07),
            (Category::OpinionGeneral, 0.05),
        ],
    },
    AgeBracket {
        min: 50,
        max: 64,
        nudges: &[
            (Category::HealthWellness, 0.12),
            (Category::OpinionGeneral, 0.10),
        ],
    },
    AgeBracket {
        min: 65,
        max: 100,
        nudges: &[
            (Category::HealthWellness, 0.15),
            (Category::OpinionGeneral, 0.10),
        ],
    },
];

fn age_nudges(age: u32) -> Nudges {
    AGE_BRACKETS
        .iter()
        .find(|bracket| (bracket.min..=bracket.max).contains(&age))
        .map(|bracket| bracket.nudges)
        .unwrap_or(&[])
}

fn gender_nudges(gender: Gender) -> Nudges {
    match gender {
        Gender::Female => &[
            (Category::HealthWellness, 0.08),
            (Category::OpinionGeneral, 0.05),
        ],
        Gender::Male => &[(Category::Sports, 0.08), (Category::ScienceTechnology, 0.05)],
        Gender::Unknown => &[],
    }
}

fn location_nudges(location: Location) -> Nudges {
    match location {
        Location::Urban => &[
            (Category::PoliticsLaw, 0.10),
            (Category::WorldAffairs, 0.10),
            (Category::EconomyBusiness, 0.05),
        ],
        Location::Suburban => &[
            (Category::EducationSociety, 0.10),
            (Category::CultureEntertainment, 0.05),
        ],
        Location::Rural => &[
            (Category::EconomyBusiness, 0.10),
            (Category::EducationSociety, 0.05),
        ],
        Location::Unknown => &[],
    }
}

/// Sum of the age, gender and location deltas for every category
pub fn demographic_nudge(demographics: &Demographics) -> [f64; CATEGORY_DIM] {
    let mut delta = [0.0; CATEGORY_DIM];
    let sources = [
        age_nudges(demographics.age),
        gender_nudges(demographics.gender),
        location_nudges(demographics.location),
    ];

    for nudges in sources {
        for (category, weight) in nudges {
            delta[category.index()] += weight;
        }
    }
    delta
}
