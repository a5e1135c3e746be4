//! Photo classification and deduplication.
//!
//! Images are filtered, deduplicated by payload digest and then assigned to
//! exactly one [`Bucket`] by an ordered rule table. The first matching rule
//! wins; images no rule matches are left out of the document.

use crate::model::{ImageId, ImageRecord};
use crate::text::{contains_words, word_key};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Named image group feeding one section of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Bucket {
    /// Gauges, meters and test instruments
    InstrumentReading,
    /// Overall views of the pool
    Primary,
    /// Close-ups of individual pool components
    ComponentDetail,
    /// Technical room and surroundings
    AuxiliarySite,
}

impl Bucket {
    /// All buckets in rule order.
    pub const ALL: [Bucket; 4] = [
        Bucket::InstrumentReading,
        Bucket::Primary,
        Bucket::ComponentDetail,
        Bucket::AuxiliarySite,
    ];

    /// Stable identifier.
    pub fn name(&self) -> &'static str {
        match self {
            Bucket::InstrumentReading => "instrument-reading",
            Bucket::Primary => "primary",
            Bucket::ComponentDetail => "component-detail",
            Bucket::AuxiliarySite => "auxiliary-site",
        }
    }
}

/// One row of the classification table.
///
/// Keywords match whole words of the folded text; the last word of a keyword
/// also matches its plural.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationRule {
    /// Bucket claimed on match
    pub bucket: Bucket,
    /// Any of these in description or category matches
    pub include: &'static [&'static str],
    /// Any of these vetoes the match
    pub exclude: &'static [&'static str],
    /// Category tags that match on their own
    pub categories: &'static [&'static str],
}

impl ClassificationRule {
    /// Whether the rule claims an image, given the [`word_key`] of its
    /// description and category together and of its category alone.
    pub fn matches(&self, haystack: &str, category: &str) -> bool {
        if self.exclude.iter().any(|k| contains_words(haystack, k)) {
            return false;
        }
        self.categories.iter().any(|c| category == word_key(c))
            || self.include.iter().any(|k| contains_words(haystack, k))
    }
}

const COMPONENT_KEYWORDS: &[&str] = &[
    "skimmer",
    "buse",
    "refoulement",
    "bonde",
    "prise balai",
    "projecteur",
    "canalisation",
    "vanne",
    "filtre",
    "pompe",
];

/// Default rule table. Instrument readings are tested before overall views so
/// that a gauge photographed next to the pool lands with the readings.
pub const RULES: &[ClassificationRule] = &[
    ClassificationRule {
        bucket: Bucket::InstrumentReading,
        include: &["manometre", "pression", "compteur", "testeur", "mesure", "lecture"],
        exclude: &[],
        categories: &["instrument", "releve", "mesure"],
    },
    ClassificationRule {
        bucket: Bucket::Primary,
        include: &["vue d'ensemble", "vue generale", "vue globale", "bassin", "piscine"],
        exclude: &[
            "local technique",
            "skimmer",
            "buse",
            "refoulement",
            "bonde",
            "prise balai",
            "projecteur",
            "vanne",
            "filtre",
            "pompe",
            "canalisation",
        ],
        categories: &["vue generale", "bassin", "piscine"],
    },
    ClassificationRule {
        bucket: Bucket::ComponentDetail,
        include: COMPONENT_KEYWORDS,
        exclude: &[],
        categories: &["equipement", "composant"],
    },
    ClassificationRule {
        bucket: Bucket::AuxiliarySite,
        include: &["local technique", "abri", "environnement", "plage", "terrasse"],
        exclude: &[],
        categories: &["local technique", "environnement"],
    },
];

const REJECTED_QUALITY: &[&str] = &["inutilisable", "rejected", "rejete", "floue"];

const UNINFORMATIVE: &[&str] = &[
    "schema",
    "diagramme",
    "logo",
    "page de garde",
    "couverture du rapport",
    "cover page",
    "illustration",
    "capture d'ecran",
];

/// Ordered, mutually exclusive image groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageBuckets {
    buckets: BTreeMap<Bucket, Vec<ImageId>>,
}

impl ImageBuckets {
    /// Images of a bucket, in display order.
    pub fn get(&self, bucket: Bucket) -> &[ImageId] {
        self.buckets.get(&bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every classified image, bucket by bucket.
    pub fn all_ids(&self) -> Vec<ImageId> {
        self.buckets.values().flatten().copied().collect()
    }

    /// Total number of classified images.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Whether no image was classified.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bucket holding an image, if any.
    pub fn bucket_of(&self, id: ImageId) -> Option<Bucket> {
        self.buckets
            .iter()
            .find(|(_, ids)| ids.contains(&id))
            .map(|(bucket, _)| *bucket)
    }
}

/// Rule-driven classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<ClassificationRule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(RULES.to_vec())
    }
}

impl Classifier {
    /// Classifier over a custom rule table, tested in order.
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Filter, deduplicate and bucket the images.
    pub fn classify(&self, images: &[ImageRecord]) -> ImageBuckets {
        let candidates = deduplicate(images, prefilter(images));

        let folded: BTreeMap<ImageId, (String, String)> = candidates
            .iter()
            .map(|id| {
                let record = &images[id.index()];
                let category = word_key(&record.category);
                let haystack = format!("{} {}", word_key(&record.description), category);
                (*id, (haystack, category))
            })
            .collect();

        let mut claimed = BTreeSet::new();
        let mut buckets: BTreeMap<Bucket, Vec<ImageId>> = BTreeMap::new();

        for rule in &self.rules {
            for id in &candidates {
                if claimed.contains(id) {
                    continue;
                }
                let (haystack, category) = &folded[id];
                if rule.matches(haystack, category) {
                    claimed.insert(*id);
                    buckets.entry(rule.bucket).or_default().push(*id);
                }
            }
        }

        for ids in buckets.values_mut() {
            // stable: input order breaks priority ties
            ids.sort_by_key(|id| images[id.index()].display_priority);
        }

        let dropped = candidates.len() - claimed.len();
        log::debug!(
            "Classified {} of {} images ({} unmatched)",
            claimed.len(),
            images.len(),
            dropped
        );
        for (bucket, ids) in &buckets {
            log::debug!("  {}: {}", bucket.name(), ids.len());
        }

        ImageBuckets { buckets }
    }
}

/// Classify with the default rule table.
pub fn classify(images: &[ImageRecord]) -> ImageBuckets {
    Classifier::default().classify(images)
}

fn prefilter(images: &[ImageRecord]) -> Vec<ImageId> {
    images
        .iter()
        .enumerate()
        .filter(|(index, record)| {
            let quality = word_key(&record.quality);
            if REJECTED_QUALITY.iter().any(|q| contains_words(&quality, q)) {
                log::debug!("Image {} dropped: quality '{}'", index, record.quality);
                return false;
            }
            let text = format!("{} {}", word_key(&record.description), word_key(&record.category));
            if UNINFORMATIVE.iter().any(|k| contains_words(&text, k)) {
                log::debug!("Image {} dropped: uninformative", index);
                return false;
            }
            true
        })
        .map(|(index, _)| ImageId(index))
        .collect()
}

fn deduplicate(images: &[ImageRecord], ids: Vec<ImageId>) -> Vec<ImageId> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| {
            let digest = Sha256::digest(&images[id.index()].data);
            let first = seen.insert(digest);
            if !first {
                log::debug!("Image {} dropped: duplicate payload", id.index());
            }
            first
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(seed: u8, description: &str) -> ImageRecord {
        ImageRecord::new(vec![seed, seed, 1], "image/jpeg").with_description(description)
    }

    #[test]
    fn test_rule_order_instrument_before_primary() {
        let images = vec![image(1, "Manomètre du filtre à côté du bassin")];
        let buckets = classify(&images);
        assert_eq!(buckets.get(Bucket::InstrumentReading), &[ImageId(0)]);
        assert!(buckets.get(Bucket::Primary).is_empty());
    }

    #[test]
    fn test_primary_excludes_components() {
        let images = vec![
            image(1, "Vue générale du bassin"),
            image(2, "Skimmer du bassin"),
            image(3, "Local technique, abri filtration"),
        ];
        let buckets = classify(&images);
        assert_eq!(buckets.get(Bucket::Primary), &[ImageId(0)]);
        assert_eq!(buckets.get(Bucket::ComponentDetail), &[ImageId(1)]);
        assert_eq!(buckets.get(Bucket::AuxiliarySite), &[ImageId(2)]);
    }

    #[test]
    fn test_category_tag_matches() {
        let images = vec![image(1, "").with_category("Local_Technique")];
        let buckets = classify(&images);
        assert_eq!(buckets.get(Bucket::AuxiliarySite), &[ImageId(0)]);
    }

    #[test]
    fn test_prefilter_drops_rejected_and_uninformative() {
        let images = vec![
            image(1, "Vue d'ensemble").with_quality("Floue"),
            image(2, "Schéma hydraulique du bassin"),
            image(3, "Logo de l'entreprise"),
            image(4, "Vue d'ensemble"),
        ];
        let buckets = classify(&images);
        assert_eq!(buckets.all_ids(), vec![ImageId(3)]);
    }

    #[test]
    fn test_keywords_match_whole_words() {
        let images = vec![
            image(1, "Impression générale du bassin"),
            image(2, "Couverture automatique du bassin"),
            image(3, "Couverture du rapport"),
            image(4, "Deux skimmers encrassés"),
        ];
        let buckets = classify(&images);
        assert_eq!(buckets.get(Bucket::Primary), &[ImageId(0), ImageId(1)]);
        assert!(buckets.get(Bucket::InstrumentReading).is_empty());
        assert_eq!(buckets.bucket_of(ImageId(2)), None);
        assert_eq!(buckets.get(Bucket::ComponentDetail), &[ImageId(3)]);
    }

    #[test]
    fn test_duplicates_keep_first() {
        let images = vec![image(7, "Bonde de fond"), image(7, "Bonde de fond (copie)")];
        let buckets = classify(&images);
        assert_eq!(buckets.get(Bucket::ComponentDetail), &[ImageId(0)]);
    }

    #[test]
    fn test_unmatched_images_dropped() {
        let images = vec![image(1, "Chat du client")];
        assert!(classify(&images).is_empty());
    }

    #[test]
    fn test_priority_sort_is_stable() {
        let images = vec![
            image(1, "Skimmer").with_priority(2),
            image(2, "Buse de refoulement").with_priority(1),
            image(3, "Projecteur").with_priority(2),
        ];
        let buckets = classify(&images);
        assert_eq!(
            buckets.get(Bucket::ComponentDetail),
            &[ImageId(1), ImageId(0), ImageId(2)]
        );
        assert_eq!(buckets.bucket_of(ImageId(2)), Some(Bucket::ComponentDetail));
    }

    #[test]
    fn test_custom_rule_table() {
        let classifier = Classifier::new(vec![ClassificationRule {
            bucket: Bucket::AuxiliarySite,
            include: &["chat"],
            exclude: &[],
            categories: &[],
        }]);
        let buckets = classifier.classify(&[image(1, "Chat du client")]);
        assert_eq!(buckets.get(Bucket::AuxiliarySite), &[ImageId(0)]);
        assert_eq!(classifier.rules().len(), 1);
    }
}
