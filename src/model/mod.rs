//! Input data model: the inspection record and the analysed photographs.

pub mod image;
pub mod report;

pub use image::{probe, ImageCatalog, ImageId, ImageInfo, ImageKind, ImageRecord};
pub use report::{
    equipment_label, Client, ConformityResult, ConformityStatus, Equipment, EquipmentItem,
    Inspection, PoolDetails, ReportRecord, Summary,
};
