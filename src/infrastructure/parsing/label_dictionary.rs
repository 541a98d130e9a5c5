//! Label dictionary
//!
//! Declarative table mapping the free-text labels printed on registry pages
//! to record fields. The site renames labels between releases; absorbing a
//! new spelling means adding a row here, not another branch in the mapper.

use super::normalizer::{PriceUnit, collapse_whitespace};
use crate::domain::RecordField;

/// How a value is shaped before it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Cleaned text, stored as is
    Text,
    /// Numbered list split into entries
    NumberedList,
    /// Price with the unit the label implies
    Price(PriceUnit),
    /// Address column that may carry a trailing `โทรศัพท์ <number>`
    AddressWithPhone,
}

/// One or more label spellings for a single target field.
#[derive(Debug, Clone, Copy)]
pub struct LabelRule {
    pub labels: &'static [&'static str],
    pub field: RecordField,
    pub transform: Transform,
}

impl LabelRule {
    const fn new(labels: &'static [&'static str], field: RecordField, transform: Transform) -> Self {
        Self {
            labels,
            field,
            transform,
        }
    }
}

/// Result of resolving a label: the field to set and how to shape the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldTarget {
    pub field: RecordField,
    pub transform: Transform,
}

impl From<&LabelRule> for FieldTarget {
    fn from(rule: &LabelRule) -> Self {
        Self {
            field: rule.field,
            transform: rule.transform,
        }
    }
}

/// Label marking the phone number embedded in an address column
pub const PHONE_MARKER: &str = "โทรศัพท์";

/// Rules in priority order. Within one pass the first matching rule wins,
/// so longer spellings that share a prefix with a shorter one come first.
pub const DEFAULT_RULES: &[LabelRule] = &[
    // Listing widgets
    LabelRule::new(&["ชื่อผลิตภัณฑ์/บริการ", "ชื่อผลิตภัณฑ์", "Product name"], RecordField::ProductName, Transform::Text),
    LabelRule::new(&["ชื่อ", "ชื่อวิสาหกิจชุมชน", "ชื่อองค์กร", "Name", "Enterprise name"], RecordField::EnterpriseName, Transform::Text),
    LabelRule::new(&["กลุ่มกิจการ", "Business group"], RecordField::BusinessGroup, Transform::Text),
    LabelRule::new(&["ประเภทกิจการ", "Business type"], RecordField::BusinessType, Transform::Text),
    // Organisation table
    LabelRule::new(&["รหัสผลิตภัณฑ์", "Product code"], RecordField::PsId, Transform::Text),
    LabelRule::new(&["รหัสสินค้า"], RecordField::SmceId, Transform::Text),
    LabelRule::new(&["รหัสทะเบียน", "Registration code"], RecordField::RegistrationCode, Transform::Text),
    LabelRule::new(&["ที่ตั้ง", "ที่อยู่", "Address"], RecordField::Address, Transform::Text),
    LabelRule::new(&[PHONE_MARKER, "Phone", "Tel"], RecordField::Phone, Transform::Text),
    LabelRule::new(&["โทรสาร", "Fax"], RecordField::Fax, Transform::Text),
    LabelRule::new(&["ผู้มีอำนาจทำการแทน", "Authorized representatives"], RecordField::Representatives, Transform::NumberedList),
    // Product table
    LabelRule::new(&["คุณสมบัติ", "Properties"], RecordField::Properties, Transform::Text),
    LabelRule::new(&["องค์ประกอบ", "Composition"], RecordField::Composition, Transform::Text),
    LabelRule::new(&["ข้อมูลโภชนาการ", "Nutrition"], RecordField::NutritionInfo, Transform::Text),
    LabelRule::new(&["ระยะเวลาการผลิต", "Production period"], RecordField::ProductionPeriod, Transform::Text),
    LabelRule::new(&["ความสามารถในการผลิต", "Production capacity"], RecordField::ProductionCapacity, Transform::Text),
    LabelRule::new(&["ราคา ต่อ ตัน", "ราคาต่อตัน", "Price per ton"], RecordField::Price, Transform::Price(PriceUnit::PerTon)),
    LabelRule::new(&["ราคา", "Price"], RecordField::Price, Transform::Price(PriceUnit::Unspecified)),
    LabelRule::new(&["การรับรองคุณภาพ", "Quality assurance"], RecordField::QualityAssurance, Transform::Text),
    LabelRule::new(&["มาตรฐาน", "Standards"], RecordField::Standards, Transform::Text),
    LabelRule::new(&["เทศกาลที่ใช้", "Seasonal use"], RecordField::SeasonalUse, Transform::Text),
    LabelRule::new(&["ช่องทางการจัดจำหน่าย", "Distribution channels"], RecordField::DistributionChannels, Transform::Text),
];

/// Normalise a label for lookup: collapse whitespace, drop a trailing colon.
///
/// `"โทรศัพท์  :"`, `" โทรศัพท์ "` and `"โทรศัพท์"` all normalise the same.
pub fn normalize_label(label: &str) -> String {
    let collapsed = collapse_whitespace(label);
    collapsed
        .trim_end_matches([':', '：'])
        .trim_end()
        .to_string()
}

/// Lookup table from label spellings to field targets.
#[derive(Debug, Clone)]
pub struct LabelDictionary {
    rules: Vec<LabelRule>,
}

impl Default for LabelDictionary {
    fn default() -> Self {
        Self::new(DEFAULT_RULES.to_vec())
    }
}

impl LabelDictionary {
    pub fn new(rules: Vec<LabelRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[LabelRule] {
        &self.rules
    }

    /// Exact lookup after normalisation. Unknown labels give `None`.
    pub fn resolve(&self, label: &str) -> Option<FieldTarget> {
        let label = normalize_label(label);
        if label.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find(|rule| rule.labels.iter().any(|known| normalize_label(known) == label))
            .map(FieldTarget::from)
    }

    /// Resolve a combined `"label : value"` cell into its target and value.
    ///
    /// The text before the first colon is tried as an exact label first. If
    /// that fails, a known label at the start of the text is stripped as a
    /// prefix and the remainder kept as the value.
    pub fn resolve_inline(&self, text: &str) -> Option<(FieldTarget, String)> {
        let text = collapse_whitespace(text);

        if let Some((label, value)) = text.split_once([':', '：']) {
            if let Some(target) = self.resolve(label) {
                return Some((target, value.trim().to_string()));
            }
        }

        self.resolve_prefix(&text)
    }

    fn resolve_prefix(&self, text: &str) -> Option<(FieldTarget, String)> {
        self.rules.iter().find_map(|rule| {
            rule.labels.iter().find_map(|known| {
                let known = normalize_label(known);
                let rest = text.strip_prefix(known.as_str())?;
                // The label must end on a boundary, not mid-word.
                let at_boundary = rest.is_empty() || rest.starts_with([' ', ':', '：']);
                at_boundary.then(|| {
                    let value = rest.trim_start_matches([' ', ':', '：']).trim().to_string();
                    (FieldTarget::from(rule), value)
                })
            })
        })
    }
}
