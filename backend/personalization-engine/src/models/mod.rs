use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

pub const CATEGORY_DIM: usize = 10;
pub const METADATA_DIM: usize = 5;

/// Neutral value for every metadata dimension
pub const DEFAULT_METADATA_VALUE: f64 = 0.5;

// ============================================
// Category taxonomy
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    PoliticsLaw,
    EconomyBusiness,
    ScienceTechnology,
    HealthWellness,
    EducationSociety,
    CultureEntertainment,
    ReligionBelief,
    Sports,
    WorldAffairs,
    OpinionGeneral,
}

impl Category {
    /// Taxonomy order; index `i` of every category vector refers to `ALL[i]`
    pub const ALL: [Category; CATEGORY_DIM] = [
        Category::PoliticsLaw,
        Category::EconomyBusiness,
        Category::ScienceTechnology,
        Category::HealthWellness,
        Category::EducationSociety,
        Category::CultureEntertainment,
        Category::ReligionBelief,
        Category::Sports,
        Category::WorldAffairs,
        Category::OpinionGeneral,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::PoliticsLaw => "Politics & Law",
            Category::EconomyBusiness => "Economy & Business",
            Category::ScienceTechnology => "Science & Technology",
            Category::HealthWellness => "Health & Wellness",
            Category::EducationSociety => "Education & Society",
            Category::CultureEntertainment => "Culture & Entertainment",
            Category::ReligionBelief => "Religion & Belief",
            Category::Sports => "Sports",
            Category::WorldAffairs => "World & International Affairs",
            Category::OpinionGeneral => "Opinion & General News",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_label(s)
            .ok_or_else(|| EngineError::InvalidInput(format!("unknown category: {}", s)))
    }
}

/// Parse declared preference labels, dropping the ones outside the taxonomy
pub fn parse_declared_categories<I, S>(labels: I) -> Vec<Category>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed = Vec::new();
    for label in labels {
        match Category::from_label(label.as_ref()) {
            Some(category) if !parsed.contains(&category) => parsed.push(category),
            Some(_) => {}
            None => debug!(label = label.as_ref(), "Ignoring unknown category label"),
        }
    }
    parsed
}

// ============================================
// Vectors
// ============================================

/// Per-category interest or relevance scores, in taxonomy order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryVector(pub [f64; CATEGORY_DIM]);

impl CategoryVector {
    pub fn uniform(value: f64) -> Self {
        Self([value; CATEGORY_DIM])
    }

    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let array: [f64; CATEGORY_DIM] = values.try_into().map_err(|_| {
            EngineError::InvalidInput(format!(
                "category vector must have {} values, got {}",
                CATEGORY_DIM,
                values.len()
            ))
        })?;
        Ok(Self(array))
    }

    pub fn values(&self) -> &[f64; CATEGORY_DIM] {
        &self.0
    }

    pub fn get(&self, category: Category) -> f64 {
        self.0[category.index()]
    }

    pub fn sum_abs(&self) -> f64 {
        self.0.iter().map(|v| v.abs()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetadataDimension {
    Length,
    Complexity,
    Neutral,
    Informative,
    Emotional,
}

impl MetadataDimension {
    pub const ALL: [MetadataDimension; METADATA_DIM] = [
        MetadataDimension::Length,
        MetadataDimension::Complexity,
        MetadataDimension::Neutral,
        MetadataDimension::Informative,
        MetadataDimension::Emotional,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(&self) -> &'static str {
        match self {
            MetadataDimension::Length => "Length",
            MetadataDimension::Complexity => "Complexity",
            MetadataDimension::Neutral => "Neutral",
            MetadataDimension::Informative => "Informative",
            MetadataDimension::Emotional => "Emotional",
        }
    }
}

/// Stylistic preferences, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetadataVector {
    pub length: f64,
    pub complexity: f64,
    pub neutral: f64,
    pub informative: f64,
    pub emotional: f64,
}

impl Default for MetadataVector {
    fn default() -> Self {
        Self::from_array([DEFAULT_METADATA_VALUE; METADATA_DIM])
    }
}

impl MetadataVector {
    pub fn from_array(values: [f64; METADATA_DIM]) -> Self {
        Self {
            length: values[0],
            complexity: values[1],
            neutral: values[2],
            informative: values[3],
            emotional: values[4],
        }
    }

    pub fn to_array(&self) -> [f64; METADATA_DIM] {
        [
            self.length,
            self.complexity,
            self.neutral,
            self.informative,
            self.emotional,
        ]
    }

    pub fn get(&self, dim: MetadataDimension) -> f64 {
        self.to_array()[dim.index()]
    }

    /// Build from a name → score map as produced by the classifier.
    /// Missing dimensions fall back to the neutral default, values are clipped to [0, 1].
    pub fn from_named(scores: &HashMap<String, f64>) -> Self {
        let mut values = [DEFAULT_METADATA_VALUE; METADATA_DIM];
        for dim in MetadataDimension::ALL {
            if let Some(value) = scores.get(dim.label()) {
                values[dim.index()] = value.clamp(0.0, 1.0);
            }
        }
        Self::from_array(values)
    }

    pub fn to_named(&self) -> HashMap<String, f64> {
        MetadataDimension::ALL
            .iter()
            .map(|dim| (dim.label().to_string(), self.get(*dim)))
            .collect()
    }
}

/// Marks metadata dimensions that feedback must leave untouched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataStaticMask([bool; METADATA_DIM]);

impl MetadataStaticMask {
    pub fn all_dynamic() -> Self {
        Self::default()
    }

    pub fn with_static(mut self, dim: MetadataDimension) -> Self {
        self.0[dim.index()] = true;
        self
    }

    pub fn is_static(&self, dim: MetadataDimension) -> bool {
        self.0[dim.index()]
    }

    pub(crate) fn is_static_index(&self, index: usize) -> bool {
        self.0[index]
    }
}

// ============================================
// Profile
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    /// `None` until onboarding has run (cold start)
    pub category_vector: Option<CategoryVector>,
    pub metadata: MetadataVector,
    #[serde(default)]
    pub metadata_static: MetadataStaticMask,
    /// Write counter used for compare-and-swap in the profile store
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// A registered user with no preference vector yet
    pub fn cold_start(user_id: Uuid) -> Self {
        Self {
            user_id,
            category_vector: None,
            metadata: MetadataVector::default(),
            metadata_static: MetadataStaticMask::all_dynamic(),
            version: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn is_cold_start(&self) -> bool {
        self.category_vector.is_none()
    }
}

// ============================================
// Demographics
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
    Unknown,
}

impl FromStr for Gender {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "female" => Ok(Gender::Female),
            "male" => Ok(Gender::Male),
            "unknown" => Ok(Gender::Unknown),
            other => Err(EngineError::InvalidInput(format!("unknown gender: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Urban,
    Suburban,
    Rural,
    Unknown,
}

impl FromStr for Location {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "urban" => Ok(Location::Urban),
            "suburban" => Ok(Location::Suburban),
            "rural" => Ok(Location::Rural),
            "unknown" => Ok(Location::Unknown),
            other => Err(EngineError::InvalidInput(format!(
                "unknown location: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demographics {
    pub age: u32,
    pub gender: Gender,
    pub location: Location,
}

// ============================================
// Catalog
// ============================================

/// What the ranker needs from any catalog entry
pub trait Rankable {
    fn id(&self) -> Uuid;
    fn category_vector(&self) -> Option<&CategoryVector>;
    fn metadata(&self) -> Option<&MetadataVector>;
    fn published_at(&self) -> DateTime<Utc>;
}

/// Article scraped from a single publisher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawArticle {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub category_vector: Option<CategoryVector>,
    #[serde(default)]
    pub metadata: Option<MetadataVector>,
}

/// Article written from several raw sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedArticle {
    pub id: Uuid,
    pub title: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub source_ids: Vec<Uuid>,
    #[serde(default)]
    pub category_vector: Option<CategoryVector>,
    #[serde(default)]
    pub metadata: Option<MetadataVector>,
}

impl Rankable for RawArticle {
    fn id(&self) -> Uuid {
        self.id
    }

    fn category_vector(&self) -> Option<&CategoryVector> {
        self.category_vector.as_ref()
    }

    fn metadata(&self) -> Option<&MetadataVector> {
        self.metadata.as_ref()
    }

    fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }
}

impl Rankable for SynthesizedArticle {
    fn id(&self) -> Uuid {
        self.id
    }

    fn category_vector(&self) -> Option<&CategoryVector> {
        self.category_vector.as_ref()
    }

    fn metadata(&self) -> Option<&MetadataVector> {
        self.metadata.as_ref()
    }

    // Synthesized articles are "published" when generated
    fn published_at(&self) -> DateTime<Utc> {
        self.generated_at
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogItem {
    Raw(RawArticle),
    Synthesized(SynthesizedArticle),
}

impl CatalogItem {
    fn inner(&self) -> &dyn Rankable {
        match self {
            CatalogItem::Raw(article) => article as &dyn Rankable,
            CatalogItem::Synthesized(article) => article as &dyn Rankable,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            CatalogItem::Raw(article) => &article.title,
            CatalogItem::Synthesized(article) => &article.title,
        }
    }
}

impl Rankable for CatalogItem {
    fn id(&self) -> Uuid {
        self.inner().id()
    }

    fn category_vector(&self) -> Option<&CategoryVector> {
        self.inner().category_vector()
    }

    fn metadata(&self) -> Option<&MetadataVector> {
        self.inner().metadata()
    }

    fn published_at(&self) -> DateTime<Utc> {
        self.inner().published_at()
    }
}

// ============================================
// Interactions
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackAction {
    Like,
    Dislike,
    Click,
}

impl FeedbackAction {
    pub fn as_state(&self) -> FeedbackState {
        match self {
            FeedbackAction::Like => FeedbackState::Liked,
            FeedbackAction::Dislike => FeedbackState::Disliked,
            FeedbackAction::Click => FeedbackState::Clicked,
        }
    }
}

impl FromStr for FeedbackAction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "like" => Ok(FeedbackAction::Like),
            "dislike" => Ok(FeedbackAction::Dislike),
            "click" => Ok(FeedbackAction::Click),
            other => Err(EngineError::InvalidInput(format!(
                "unknown feedback action: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackState {
    Liked,
    Disliked,
    Clicked,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub state: FeedbackState,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_labels_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_label(category.label()), Some(category));
        }
        assert_eq!(Category::ALL[7], Category::Sports);
        assert_eq!(Category::Sports.index(), 7);
    }

    #[test]
    fn test_parse_declared_categories_skips_unknown() {
        let parsed = parse_declared_categories(["sports", "Knitting", "Sports", "Health & Wellness"]);
        assert_eq!(parsed, vec![Category::Sports, Category::HealthWellness]);
    }

    #[test]
    fn test_category_vector_length_check() {
        assert!(CategoryVector::from_slice(&[0.5; 10]).is_ok());
        assert!(matches!(
            CategoryVector::from_slice(&[0.5; 9]),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_metadata_from_named_defaults_and_clips() {
        let mut scores = HashMap::new();
        scores.insert("Length".to_string(), 0.9);
        scores.insert("Emotional".to_string(), 1.7);

        let meta = MetadataVector::from_named(&scores);
        assert_eq!(meta.length, 0.9);
        assert_eq!(meta.complexity, DEFAULT_METADATA_VALUE);
        assert_eq!(meta.emotional, 1.0);

        let named = meta.to_named();
        assert_eq!(named.len(), METADATA_DIM);
        assert_eq!(named["Informative"], DEFAULT_METADATA_VALUE);
    }

    #[test]
    fn test_enum_inputs_rejected() {
        assert_eq!("Female".parse::<Gender>().unwrap(), Gender::Female);
        assert!("robot".parse::<Gender>().is_err());
        assert_eq!("RURAL".parse::<Location>().unwrap(), Location::Rural);
        assert!("moon".parse::<Location>().is_err());
        assert!("share".parse::<FeedbackAction>().is_err());
    }

    #[test]
    fn test_catalog_item_variants_expose_published_at() {
        let generated_at = Utc::now();
        let item = CatalogItem::Synthesized(SynthesizedArticle {
            id: Uuid::new_v4(),
            title: "Roundup".to_string(),
            generated_at,
            source_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
            category_vector: None,
            metadata: None,
        });
        assert_eq!(item.published_at(), generated_at);
        assert!(item.category_vector().is_none());

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["kind"], "synthesized");
    }
}
