//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use report_oxide::{ImageRecord, ReportRecord};
use std::io::Cursor;

/// A small solid-colour PNG; the colour makes each payload unique.
pub fn png(seed: u8, width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([seed, 120, 255 - seed]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageOutputFormat::Png)
        .expect("encode png");
    out.into_inner()
}

/// A PNG photo with a description.
pub fn photo(seed: u8, description: &str) -> ImageRecord {
    ImageRecord::new(png(seed, 16, 12), "image/png").with_description(description)
}

/// Minimal valid record.
pub fn minimal_report() -> ReportRecord {
    ReportRecord::from_json(
        r#"{"client": {"nom": "Durand", "prenom": "Alice"},
            "inspection": {"date": "2024-05-14"}}"#,
    )
    .expect("minimal record")
}

/// Record exercising every section.
pub fn full_report() -> ReportRecord {
    ReportRecord::from_json(
        r#"{
            "client": {
                "nom": "Durand", "prenom": "Alice",
                "adresse": "12 chemin des Oliviers", "code_postal": "30000", "ville": "Nîmes",
                "telephone": "04 66 00 00 00", "email": "alice.durand@example.fr"
            },
            "inspection": {
                "date": "2024-05-14", "technicien": "M. Petit", "reference": "INS-2024-051",
                "prestations": ["Inspection visuelle", "Test d'étanchéité"]
            },
            "piscine": {"type_revetement": "Liner", "volume": "48 m3"},
            "equipements": {"skimmer": {"quantite": 2}, "bonde_fond": {"quantite": 0}},
            "description_technique": "Filtration à sable\nPompe 1 CV\nChauffage par pompe à chaleur",
            "local_technique": "Local enterré, sec et ventilé",
            "conformite": [
                {"element": "Local technique", "statut": "Non conforme", "commentaire": "Ventilation obstruée"},
                {"element": "Skimmers", "statut": "Conforme"},
                {"element": "Canalisations", "statut": "A surveiller"}
            ],
            "bilan": {
                "conclusion": "Le bassin est en bon état général.\n\nLe local technique doit être remis en conformité.",
                "recommandations": ["Dégager la ventilation du local", "Contrôler les canalisations dans un an"]
            },
            "responsabilite": "Ce rapport décrit l'état constaté le jour de l'intervention."
        }"#,
    )
    .expect("full record")
}

/// One photo per bucket plus an instrument pair.
pub fn full_photos() -> Vec<ImageRecord> {
    vec![
        photo(10, "Vue d'ensemble du bassin"),
        photo(20, "Skimmer côté plage"),
        photo(30, "Local technique, vue intérieure"),
        photo(40, "Manomètre du filtre"),
        photo(50, "Compteur d'eau"),
    ]
}
