use serde::{Deserialize, Serialize};
use std::fmt;

/// A (latitude, longitude) pair taken from a map link.
///
/// Absence is modelled as `Option<Coordinate>` at the use site, never as `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting values outside the WGS84 ranges.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let in_range = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        in_range.then_some(Self { latitude, longitude })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// Every field of a [`Record`] that extraction can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    SmceId,
    PsId,
    Serial,
    EnterpriseName,
    BusinessGroup,
    BusinessType,
    ProductName,
    ImageUrl,
    RegistrationCode,
    Address,
    Phone,
    Fax,
    Representatives,
    Properties,
    Composition,
    NutritionInfo,
    ProductionPeriod,
    ProductionCapacity,
    Price,
    Standards,
    QualityAssurance,
    SeasonalUse,
    DistributionChannels,
}

impl RecordField {
    /// JSON key of the field in the output artifact.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SmceId => "smce_id",
            Self::PsId => "ps_id",
            Self::Serial => "serial",
            Self::EnterpriseName => "enterprise_name",
            Self::BusinessGroup => "business_group",
            Self::BusinessType => "business_type",
            Self::ProductName => "product_name",
            Self::ImageUrl => "image_url",
            Self::RegistrationCode => "registration_code",
            Self::Address => "address",
            Self::Phone => "phone",
            Self::Fax => "fax",
            Self::Representatives => "representatives",
            Self::Properties => "properties",
            Self::Composition => "composition",
            Self::NutritionInfo => "nutrition_info",
            Self::ProductionPeriod => "production_period",
            Self::ProductionCapacity => "production_capacity",
            Self::Price => "price_per_kg",
            Self::Standards => "standards",
            Self::QualityAssurance => "quality_assurance",
            Self::SeasonalUse => "seasonal_use",
            Self::DistributionChannels => "distribution_channels",
        }
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One business-registry entity, summary and detail fields combined.
///
/// Every attribute is absent until set. Absent values are omitted from the
/// JSON output rather than written as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smce_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ps_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enterprise_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fax: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub representatives: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrition_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_capacity: Option<String>,
    /// Price exactly as printed on the page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standards: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_assurance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasonal_use: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution_channels: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl Record {
    /// Set a text-valued field. Empty values are ignored so a blank cell
    /// never clears data.
    pub fn set_text(&mut self, field: RecordField, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            return;
        }
        let slot = match field {
            RecordField::SmceId => &mut self.smce_id,
            RecordField::PsId => &mut self.ps_id,
            RecordField::Serial => &mut self.serial,
            RecordField::EnterpriseName => &mut self.enterprise_name,
            RecordField::BusinessGroup => &mut self.business_group,
            RecordField::BusinessType => &mut self.business_type,
            RecordField::ProductName => &mut self.product_name,
            RecordField::ImageUrl => &mut self.image_url,
            RecordField::RegistrationCode => &mut self.registration_code,
            RecordField::Address => &mut self.address,
            RecordField::Phone => &mut self.phone,
            RecordField::Fax => &mut self.fax,
            RecordField::Properties => &mut self.properties,
            RecordField::Composition => &mut self.composition,
            RecordField::NutritionInfo => &mut self.nutrition_info,
            RecordField::ProductionPeriod => &mut self.production_period,
            RecordField::ProductionCapacity => &mut self.production_capacity,
            RecordField::Price => &mut self.price_text,
            RecordField::Standards => &mut self.standards,
            RecordField::QualityAssurance => &mut self.quality_assurance,
            RecordField::SeasonalUse => &mut self.seasonal_use,
            RecordField::DistributionChannels => &mut self.distribution_channels,
            RecordField::Representatives => {
                self.representatives = vec![value];
                return;
            }
        };
        *slot = Some(value);
    }

    pub fn set_representatives(&mut self, names: Vec<String>) {
        let names: Vec<String> = names.into_iter().filter(|n| !n.is_empty()).collect();
        if !names.is_empty() {
            self.representatives = names;
        }
    }

    pub fn set_coordinate(&mut self, coordinate: Coordinate) {
        self.latitude = Some(coordinate.latitude);
        self.longitude = Some(coordinate.longitude);
    }

    /// Coordinate pair, present only when both halves are known.
    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::new(self.latitude?, self.longitude?)
    }

    /// Whether the row carried anything that identifies an entity.
    ///
    /// Rows without identity (header rows, spacer rows) are dropped by the driver.
    pub fn has_identity(&self) -> bool {
        self.smce_id.is_some()
            || self.ps_id.is_some()
            || self.registration_code.is_some()
            || self.enterprise_name.is_some()
            || self.product_name.is_some()
    }

    /// Overlay the fields `detail` actually sets onto `self`.
    ///
    /// Fields absent from `detail` are left untouched, never cleared. The
    /// printed price and its per-kilogram value travel together.
    pub fn merge_from(&mut self, detail: Record) {
        fn overlay<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        let detail_coordinate = detail.coordinate();
        overlay(&mut self.smce_id, detail.smce_id);
        overlay(&mut self.ps_id, detail.ps_id);
        overlay(&mut self.serial, detail.serial);
        overlay(&mut self.enterprise_name, detail.enterprise_name);
        overlay(&mut self.business_group, detail.business_group);
        overlay(&mut self.business_type, detail.business_type);
        overlay(&mut self.product_name, detail.product_name);
        overlay(&mut self.image_url, detail.image_url);
        overlay(&mut self.registration_code, detail.registration_code);
        overlay(&mut self.address, detail.address);
        overlay(&mut self.phone, detail.phone);
        overlay(&mut self.fax, detail.fax);
        overlay(&mut self.properties, detail.properties);
        overlay(&mut self.composition, detail.composition);
        overlay(&mut self.nutrition_info, detail.nutrition_info);
        overlay(&mut self.production_period, detail.production_period);
        overlay(&mut self.production_capacity, detail.production_capacity);
        if detail.price_text.is_some() || detail.price_per_kg.is_some() {
            self.price_text = detail.price_text;
            self.price_per_kg = detail.price_per_kg;
        }
        overlay(&mut self.standards, detail.standards);
        overlay(&mut self.quality_assurance, detail.quality_assurance);
        overlay(&mut self.seasonal_use, detail.seasonal_use);
        overlay(&mut self.distribution_channels, detail.distribution_channels);
        if let Some(coordinate) = detail_coordinate {
            self.set_coordinate(coordinate);
        }
        if !detail.representatives.is_empty() {
            self.representatives = detail.representatives;
        }
    }

    /// Short human label for log lines.
    pub fn display_name(&self) -> &str {
        self.enterprise_name
            .as_deref()
            .or(self.product_name.as_deref())
            .or(self.registration_code.as_deref())
            .unwrap_or("<unnamed>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_rejects_out_of_range_values() {
        assert!(Coordinate::new(13.7563, 100.5018).is_some());
        assert!(Coordinate::new(0.0, 0.0).is_some());
        assert!(Coordinate::new(91.0, 100.0).is_none());
        assert!(Coordinate::new(13.0, 181.0).is_none());
        assert!(Coordinate::new(f64::NAN, 1.0).is_none());
    }

    #[test]
    fn merge_keeps_fields_absent_from_detail() {
        let mut summary = Record::default();
        summary.set_text(RecordField::EnterpriseName, "วิสาหกิจชุมชนบ้านนา");
        summary.set_text(RecordField::ImageUrl, "https://example.com/a.jpg");
        summary.set_text(RecordField::SmceId, "42");

        let mut detail = Record::default();
        detail.set_text(RecordField::Address, "12 หมู่ 3");
        detail.set_text(RecordField::EnterpriseName, "วิสาหกิจชุมชนบ้านนา (ใหม่)");

        summary.merge_from(detail);

        assert_eq!(summary.enterprise_name.as_deref(), Some("วิสาหกิจชุมชนบ้านนา (ใหม่)"));
        assert_eq!(summary.image_url.as_deref(), Some("https://example.com/a.jpg"));
        assert_eq!(summary.address.as_deref(), Some("12 หมู่ 3"));
        assert_eq!(summary.smce_id.as_deref(), Some("42"));
    }

    #[test]
    fn merge_takes_the_detail_coordinate() {
        let mut summary = Record::default();
        summary.set_text(RecordField::SmceId, "42");

        let mut detail = Record::default();
        detail.set_coordinate(Coordinate::new(14.8818, 103.4936).unwrap());
        detail.set_text(RecordField::Phone, "044-000-000");

        summary.merge_from(detail);

        assert_eq!(summary.coordinate(), Coordinate::new(14.8818, 103.4936));
        assert_eq!(summary.phone.as_deref(), Some("044-000-000"));
        assert_eq!(summary.smce_id.as_deref(), Some("42"));
    }

    #[test]
    fn merge_replaces_price_text_and_value_together() {
        let mut summary = Record::default();
        summary.set_text(RecordField::Price, "15,000");
        summary.price_per_kg = Some(15.0);

        let mut detail = Record::default();
        detail.set_text(RecordField::Price, "สอบถามทางโทรศัพท์");
        summary.merge_from(detail);

        assert_eq!(summary.price_text.as_deref(), Some("สอบถามทางโทรศัพท์"));
        assert_eq!(summary.price_per_kg, None);

        let mut unpriced = Record::default();
        unpriced.set_text(RecordField::Phone, "02-000-0000");
        summary.merge_from(unpriced);
        assert_eq!(summary.price_text.as_deref(), Some("สอบถามทางโทรศัพท์"));
    }

    #[test]
    fn blank_values_never_clear_a_field() {
        let mut record = Record::default();
        record.set_text(RecordField::Phone, "0812345678");
        record.set_text(RecordField::Phone, "");
        record.set_representatives(vec![String::new()]);

        assert_eq!(record.phone.as_deref(), Some("0812345678"));
        assert!(record.representatives.is_empty());
    }

    #[test]
    fn absent_fields_are_omitted_from_json() {
        let mut record = Record::default();
        record.set_text(RecordField::SmceId, "42");

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"smce_id":"42"}"#);
    }

    #[test]
    fn zero_coordinate_is_a_real_value() {
        let mut record = Record::default();
        record.set_coordinate(Coordinate::new(0.0, 0.0).unwrap());

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""latitude":0.0"#));
        assert_eq!(record.coordinate(), Coordinate::new(0.0, 0.0));
    }

    #[test]
    fn identity_requires_some_identifying_field() {
        let mut record = Record::default();
        record.set_text(RecordField::Phone, "02-000-0000");
        assert!(!record.has_identity());

        record.set_text(RecordField::RegistrationCode, "1-10-01-01/1-0001");
        assert!(record.has_identity());
    }
}
