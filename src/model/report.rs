//! The validated inspection record.
//!
//! Field names on the wire are the French keys produced by the upstream
//! extraction service; Rust field names are English.

use crate::error::{Error, Result};
use crate::text::{contains_words, is_blank, word_key};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Complete inspection record. Immutable once parsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportRecord {
    /// Client identity
    pub client: Client,
    /// Inspection metadata
    pub inspection: Inspection,
    /// Pool attributes
    #[serde(rename = "piscine")]
    pub pool: PoolDetails,
    /// Equipment quantities by kind
    #[serde(rename = "equipements")]
    pub equipment: Equipment,
    /// Conformity test results, in display order
    #[serde(rename = "conformite")]
    pub conformity: Vec<ConformityResult>,
    /// Technical description narrative
    #[serde(rename = "description_technique")]
    pub technical_description: String,
    /// Technical room notes
    #[serde(rename = "local_technique")]
    pub technical_room: String,
    /// Conclusion and recommendations
    #[serde(rename = "bilan")]
    pub summary: Summary,
    /// Liability statement
    #[serde(rename = "responsabilite")]
    pub liability: String,
}

impl ReportRecord {
    /// Parse and validate a record from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let record: Self = serde_json::from_str(json)?;
        record.validate()?;
        Ok(record)
    }

    /// Check the required identity fields.
    pub fn validate(&self) -> Result<()> {
        if is_blank(&self.client.last_name) {
            return Err(Error::InvalidInput("client.nom is required".to_string()));
        }
        if is_blank(&self.inspection.date) {
            return Err(Error::InvalidInput("inspection.date is required".to_string()));
        }
        Ok(())
    }
}

/// Client identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Client {
    /// Family name (required)
    #[serde(rename = "nom")]
    pub last_name: String,
    /// Given name
    #[serde(rename = "prenom")]
    pub first_name: String,
    /// Street address
    #[serde(rename = "adresse")]
    pub address: String,
    /// Postal code
    #[serde(rename = "code_postal")]
    pub postal_code: String,
    /// City
    #[serde(rename = "ville")]
    pub city: String,
    /// Phone number
    #[serde(rename = "telephone")]
    pub phone: String,
    /// Email address
    pub email: String,
}

impl Client {
    /// "Given Family", skipping blank parts.
    pub fn display_name(&self) -> String {
        join_non_blank(&[&self.first_name, &self.last_name], " ")
    }

    /// Street, postal code and city on one line.
    pub fn full_address(&self) -> String {
        let locality = join_non_blank(&[&self.postal_code, &self.city], " ");
        join_non_blank(&[&self.address, &locality], ", ")
    }
}

/// Inspection metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Inspection {
    /// Inspection date as provided (required)
    pub date: String,
    /// Technician name
    #[serde(rename = "technicien")]
    pub technician: String,
    /// File reference
    pub reference: String,
    /// Services performed
    #[serde(rename = "prestations")]
    pub services: Vec<String>,
}

/// Pool attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolDetails {
    /// Lining type
    #[serde(rename = "type_revetement")]
    pub lining_type: String,
    /// Lining age
    #[serde(rename = "age_revetement")]
    pub lining_age: String,
    /// Filtration type
    #[serde(rename = "type_filtration")]
    pub filtration_type: String,
    /// Water state
    #[serde(rename = "etat_eau")]
    pub water_state: String,
    /// Dimensions
    pub dimensions: String,
    /// Volume
    pub volume: String,
}

impl PoolDetails {
    /// Labelled attributes in display order, blank values skipped.
    pub fn rows(&self) -> Vec<(&'static str, &str)> {
        [
            ("Type de revêtement", self.lining_type.as_str()),
            ("Âge du revêtement", self.lining_age.as_str()),
            ("Type de filtration", self.filtration_type.as_str()),
            ("État de l'eau", self.water_state.as_str()),
            ("Dimensions", self.dimensions.as_str()),
            ("Volume", self.volume.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !is_blank(value))
        .map(|(label, value)| (label, value.trim()))
        .collect()
    }
}

/// Quantity of one equipment kind.
///
/// Accepts `{"quantite": 2}`, a bare number or a numeric string; anything
/// else counts as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EquipmentItem {
    /// Number of units installed
    #[serde(rename = "quantite")]
    pub quantity: u32,
}

impl EquipmentItem {
    /// Item with the given quantity.
    pub fn new(quantity: u32) -> Self {
        Self { quantity }
    }
}

impl<'de> Deserialize<'de> for EquipmentItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let raw = match &value {
            serde_json::Value::Object(map) => map.get("quantite").or_else(|| map.get("quantity")),
            other => Some(other),
        };
        Ok(Self {
            quantity: raw.map(quantity_from_value).unwrap_or(0),
        })
    }
}

fn quantity_from_value(value: &serde_json::Value) -> u32 {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f.round() as u64))
            .map(|q| q.min(u32::MAX as u64) as u32)
            .unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
        serde_json::Value::Bool(true) => 1,
        _ => 0,
    }
}

/// Equipment quantities: the known kinds plus any extra kinds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Equipment {
    /// Skimmers
    pub skimmer: EquipmentItem,
    /// Main drains
    #[serde(rename = "bonde_fond")]
    pub main_drain: EquipmentItem,
    /// Return inlets
    #[serde(rename = "refoulement")]
    pub return_inlet: EquipmentItem,
    /// Vacuum points
    #[serde(rename = "prise_balai")]
    pub vacuum_point: EquipmentItem,
    /// Underwater lights
    #[serde(rename = "projecteur")]
    pub light: EquipmentItem,
    /// Counter-current swim units
    #[serde(rename = "nage_contre_courant")]
    pub counter_current: EquipmentItem,
    /// Any other kind, keyed by its wire name
    #[serde(flatten)]
    pub others: BTreeMap<String, EquipmentItem>,
}

impl Equipment {
    /// Every kind with its display label: known kinds in fixed order, then
    /// extra kinds in key order.
    pub fn entries(&self) -> Vec<(String, u32)> {
        let known = [
            ("Skimmer", self.skimmer),
            ("Bonde de fond", self.main_drain),
            ("Refoulement", self.return_inlet),
            ("Prise balai", self.vacuum_point),
            ("Projecteur", self.light),
            ("Nage à contre-courant", self.counter_current),
        ];
        known
            .into_iter()
            .map(|(label, item)| (label.to_string(), item.quantity))
            .chain(
                self.others
                    .iter()
                    .map(|(key, item)| (equipment_label(key), item.quantity)),
            )
            .collect()
    }
}

/// `"pompe_a_chaleur"` -> `"Pompe a chaleur"`.
pub fn equipment_label(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Classified conformity outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConformityStatus {
    /// Test passed
    Conforme,
    /// Test failed
    NonConforme,
    /// Passed but needs monitoring
    ASurveiller,
}

/// Matched with separators removed, so `NonConforme` and `Non-conforme` agree.
const NON_CONFORMING_COMPACT: &[&str] = &["nonconforme"];
const NON_CONFORMING_WORDS: &[&str] = &["defaut", "fuite"];
const WATCH_COMPACT: &[&str] = &["surveiller"];

impl ConformityStatus {
    /// Classify a raw status string, case- and accent-insensitively.
    ///
    /// # Examples
    ///
    /// ```
    /// use report_oxide::model::ConformityStatus;
    ///
    /// assert_eq!(ConformityStatus::classify("Non conforme"), ConformityStatus::NonConforme);
    /// assert_eq!(ConformityStatus::classify("Défaut d'étanchéité"), ConformityStatus::NonConforme);
    /// assert_eq!(ConformityStatus::classify("À surveiller"), ConformityStatus::ASurveiller);
    /// assert_eq!(ConformityStatus::classify("Conforme"), ConformityStatus::Conforme);
    /// ```
    pub fn classify(raw: &str) -> Self {
        let key = word_key(raw);
        let compact = key.replace(' ', "");
        if NON_CONFORMING_COMPACT.iter().any(|k| compact.contains(k))
            || NON_CONFORMING_WORDS.iter().any(|k| contains_words(&key, k))
        {
            ConformityStatus::NonConforme
        } else if WATCH_COMPACT.iter().any(|k| compact.contains(k)) {
            ConformityStatus::ASurveiller
        } else {
            ConformityStatus::Conforme
        }
    }

    /// Canonical label.
    pub fn label(&self) -> &'static str {
        match self {
            ConformityStatus::Conforme => "Conforme",
            ConformityStatus::NonConforme => "Non conforme",
            ConformityStatus::ASurveiller => "À surveiller",
        }
    }
}

/// One conformity test result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConformityResult {
    /// Tested element
    pub element: String,
    /// Raw status as written by the technician
    #[serde(rename = "statut")]
    pub status_label: String,
    /// Optional comment
    #[serde(rename = "commentaire")]
    pub comment: String,
}

impl ConformityResult {
    /// Result with an element and a raw status.
    pub fn new(element: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            status_label: status.into(),
            comment: String::new(),
        }
    }

    /// Classified status.
    pub fn status(&self) -> ConformityStatus {
        ConformityStatus::classify(&self.status_label)
    }

    /// Raw label, or the canonical label when the raw one is blank.
    pub fn display_status(&self) -> String {
        if is_blank(&self.status_label) {
            self.status().label().to_string()
        } else {
            self.status_label.trim().to_string()
        }
    }
}

/// Conclusion and recommendations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Summary {
    /// Conclusion text
    pub conclusion: String,
    /// Recommendations
    #[serde(rename = "recommandations")]
    pub recommendations: Vec<String>,
}

fn join_non_blank(parts: &[&str], separator: &str) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}
