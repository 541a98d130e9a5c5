//! Field normalizer
//!
//! Stateless transforms applied to raw cell text: whitespace and markup
//! cleanup, numbered-list splitting, unit-aware price parsing and map-link
//! coordinate extraction. None of them panic; bad input degrades to
//! trimmed text or an explicit "absent".

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use url::Url;

use super::error::NormalizationError;
use crate::domain::constants::units;
use crate::domain::Coordinate;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\u{00A0}\u{200B}]+").unwrap());
static LIST_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|\s)\d{1,2}\.").unwrap());
static PRICE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").unwrap());
static AT_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@(-?\d+(?:\.\d+)?),(-?\d+(?:\.\d+)?)").unwrap());
static EMBED_3D_4D: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!3d(-?\d+(?:\.\d+)?)!4d(-?\d+(?:\.\d+)?)").unwrap());

/// Remove markup tags, leaving a space where each tag stood.
pub fn strip_tags(text: &str) -> String {
    TAG.replace_all(text, " ").into_owned()
}

/// Collapse whitespace runs (including NBSP) to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Strip tags then collapse whitespace.
pub fn clean_text(text: &str) -> String {
    if text.contains('<') {
        collapse_whitespace(&strip_tags(text))
    } else {
        collapse_whitespace(text)
    }
}

/// Split a blob like `"1. Alice 2. Bob"` into its numbered entries.
///
/// Unnumbered text comes back as a single entry; only empty input yields an
/// empty list. A marker directly followed by a digit (`12.5`) is a decimal,
/// not a list marker.
pub fn split_numbered_list(text: &str) -> Vec<String> {
    let text = clean_text(text);
    if text.is_empty() {
        return Vec::new();
    }

    let markers: Vec<(usize, usize)> = LIST_MARKER
        .find_iter(&text)
        .filter(|m| {
            !text[m.end()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit())
        })
        .map(|m| (m.start(), m.end()))
        .collect();

    if markers.is_empty() {
        return vec![text];
    }

    let entries: Vec<String> = markers
        .iter()
        .enumerate()
        .map(|(i, &(_, content_start))| {
            let content_end = markers.get(i + 1).map_or(text.len(), |&(next, _)| next);
            text[content_start..content_end].trim().to_string()
        })
        .filter(|entry| !entry.is_empty())
        .collect();

    if entries.is_empty() { vec![text] } else { entries }
}

/// Unit printed after (or implied by the label of) a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceUnit {
    PerTon,
    PerKilogram,
    PerBag,
    #[default]
    Unspecified,
}

impl PriceUnit {
    /// Recognise a unit keyword; unknown words give `None`.
    pub fn from_keyword(word: &str) -> Option<Self> {
        let word = word
            .trim_matches(|c: char| c.is_ascii_punctuation() && c != '.')
            .to_lowercase();
        let matches = |candidates: &[&str]| candidates.iter().any(|c| word.starts_with(c));

        if matches(units::PER_TON) {
            Some(Self::PerTon)
        } else if matches(units::PER_KILOGRAM) {
            Some(Self::PerKilogram)
        } else if matches(units::PER_BAG) {
            Some(Self::PerBag)
        } else {
            None
        }
    }

    /// Last unit keyword anywhere in `text`.
    ///
    /// Currency words and `ต่อ`/`per` glued to a token are skipped, so
    /// `บาท/ตัน`, `(ต่อ ตัน)` and `ต่อ 1 ตัน` all find the ton.
    fn last_in(text: &str) -> Option<Self> {
        text.split(|c: char| c.is_whitespace() || "/()[]{},;:".contains(c))
            .filter_map(|token| Self::from_keyword(strip_connectives(token)))
            .last()
    }

    fn to_per_kilogram(self, value: f64) -> f64 {
        match self {
            Self::PerTon => value / units::KILOGRAMS_PER_TON,
            Self::PerKilogram | Self::PerBag | Self::Unspecified => value,
        }
    }
}

fn strip_connectives(mut token: &str) -> &str {
    'strip: loop {
        for connective in units::CONNECTIVES {
            let head = token.get(..connective.len());
            if head.is_some_and(|head| head.eq_ignore_ascii_case(connective)) {
                token = &token[connective.len()..];
                continue 'strip;
            }
        }
        return token;
    }
}

/// Parse the leading price in `text` and express it per kilogram.
///
/// The last unit keyword after the number wins over `implied`, the unit the
/// cell's label carries (e.g. a "price per ton" column). Unknown or missing
/// units leave the value unscaled. Text with no number is an error, never zero.
pub fn normalize_price(text: &str, implied: PriceUnit) -> Result<f64, NormalizationError> {
    let invalid = || NormalizationError::InvalidPrice {
        text: text.to_string(),
    };

    let number = PRICE_NUMBER.find(text).ok_or_else(invalid)?;
    let value: f64 = number.as_str().replace(',', "").parse().map_err(|_| invalid())?;

    let unit = PriceUnit::last_in(&text[number.end()..]).unwrap_or(implied);

    Ok(unit.to_per_kilogram(value))
}

/// One way of reading a coordinate pair out of a map URL.
pub trait CoordinateStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, url: &Url) -> Option<Coordinate>;
}

/// `...?q=13.7563,100.5018`
pub struct QueryParameter;

/// `.../@13.7563,100.5018,15z`
pub struct AtPathSegment;

/// `...?pb=!1m18...!3d13.7563!4d100.5018...`
pub struct EmbedParameter;

impl CoordinateStrategy for QueryParameter {
    fn name(&self) -> &'static str {
        "q-parameter"
    }

    fn extract(&self, url: &Url) -> Option<Coordinate> {
        let (_, q) = url.query_pairs().find(|(key, _)| key == "q")?;
        let (lat, lng) = q.split_once(',')?;
        parse_pair(lat, lng)
    }
}

impl CoordinateStrategy for AtPathSegment {
    fn name(&self) -> &'static str {
        "at-path"
    }

    fn extract(&self, url: &Url) -> Option<Coordinate> {
        let caps = AT_PATH.captures(url.path())?;
        parse_pair(caps.get(1)?.as_str(), caps.get(2)?.as_str())
    }
}

impl CoordinateStrategy for EmbedParameter {
    fn name(&self) -> &'static str {
        "pb-embed"
    }

    fn extract(&self, url: &Url) -> Option<Coordinate> {
        let (_, pb) = url.query_pairs().find(|(key, _)| key == "pb")?;
        let caps = EMBED_3D_4D.captures(&pb)?;
        parse_pair(caps.get(1)?.as_str(), caps.get(2)?.as_str())
    }
}

/// Strategies in the order they are tried; the first hit wins.
pub static COORDINATE_STRATEGIES: &[&dyn CoordinateStrategy] =
    &[&QueryParameter, &AtPathSegment, &EmbedParameter];

fn parse_pair(lat: &str, lng: &str) -> Option<Coordinate> {
    let latitude = lat.trim().parse::<f64>().ok()?;
    let longitude = lng.trim().parse::<f64>().ok()?;
    Coordinate::new(latitude, longitude)
}

/// Extract coordinates from a map link, trying each strategy in order.
///
/// Returns `Err` when the link parses but none of the strategies match, or
/// when the link is not a URL at all. Callers treat that as "absent".
pub fn extract_coordinates(link: &str) -> Result<Coordinate, NormalizationError> {
    let link = link.trim();
    let invalid = || NormalizationError::InvalidCoordinate {
        url: link.to_string(),
    };

    let parsed = if link.starts_with("//") {
        Url::parse(&format!("https:{link}"))
    } else {
        Url::parse(link)
    }
    .map_err(|_| invalid())?;

    COORDINATE_STRATEGIES
        .iter()
        .find_map(|strategy| {
            let found = strategy.extract(&parsed)?;
            debug!(strategy = strategy.name(), %found, "Extracted coordinates");
            Some(found)
        })
        .ok_or_else(invalid)
}

/// Whether a link points at an embedded or linked map.
pub fn is_map_link(link: &str) -> bool {
    let link = link.to_ascii_lowercase();
    link.contains("maps.google.") || link.contains("google.com/maps") || link.contains("goo.gl/maps")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn clean_text_strips_markup_and_collapses_whitespace() {
        assert_eq!(clean_text("  ชื่อ \n\t <b>บ้านนา</b>\u{00A0} "), "ชื่อ บ้านนา");
        assert_eq!(clean_text("a <br/>b"), "a b");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn clean_text_degrades_to_trimmed_text_on_broken_markup() {
        assert_eq!(clean_text("  price < 100 "), "price < 100");
    }

    #[test]
    fn numbered_list_is_split_in_order() {
        assert_eq!(split_numbered_list("1. Alice 2. Bob"), vec!["Alice", "Bob"]);
        assert_eq!(
            split_numbered_list("1.นายสมชาย ใจดี<br />2.นางสมศรี ใจดี"),
            vec!["นายสมชาย ใจดี", "นางสมศรี ใจดี"]
        );
    }

    #[test]
    fn unnumbered_text_is_a_single_entry() {
        assert_eq!(split_numbered_list("Alice"), vec!["Alice"]);
        assert_eq!(split_numbered_list("  Alice  Smith "), vec!["Alice Smith"]);
        assert!(split_numbered_list("   ").is_empty());
    }

    #[test]
    fn decimals_are_not_list_markers() {
        assert_eq!(split_numbered_list("น้ำหนัก 12.5 กิโลกรัม"), vec!["น้ำหนัก 12.5 กิโลกรัม"]);
    }

    #[test]
    fn price_per_ton_is_converted_to_per_kilogram() {
        assert_eq!(normalize_price("12,000 บาท ต่อ ตัน", PriceUnit::Unspecified), Ok(12.0));
        assert_eq!(normalize_price("25,000 / ton", PriceUnit::Unspecified), Ok(25.0));
        assert_eq!(normalize_price("8,500", PriceUnit::PerTon), Ok(8.5));
    }

    #[test]
    fn unit_later_in_the_text_is_found() {
        let per_ton = [
            ("12,000 - 15,000 บาท ต่อ ตัน", 12.0),
            ("15,000 บาท (ต่อ ตัน)", 15.0),
            ("15,000 บาท ต่อ 1 ตัน", 15.0),
            ("15,000 บาท/1 ตัน", 15.0),
            ("15,000 บาทต่อตัน", 15.0),
        ];
        for (text, expected) in per_ton {
            assert_eq!(normalize_price(text, PriceUnit::Unspecified), Ok(expected), "{text}");
        }
    }

    #[test]
    fn currency_words_are_skipped_before_the_unit() {
        assert_eq!(normalize_price("15,000 Baht per ton", PriceUnit::Unspecified), Ok(15.0));
        assert_eq!(normalize_price("35 ฿/kg", PriceUnit::PerTon), Ok(35.0));
    }

    #[test]
    fn explicit_unit_wins_over_implied_unit() {
        assert_eq!(normalize_price("35 บาท ต่อ กิโลกรัม", PriceUnit::PerTon), Ok(35.0));
    }

    #[test]
    fn unknown_or_missing_unit_leaves_value_unscaled() {
        assert_eq!(normalize_price("150 บาท ต่อ ถุง", PriceUnit::Unspecified), Ok(150.0));
        assert_eq!(normalize_price("1,250.75", PriceUnit::Unspecified), Ok(1250.75));
        assert_eq!(normalize_price("99 ต่อ กล่อง", PriceUnit::Unspecified), Ok(99.0));
    }

    #[test]
    fn unparseable_price_is_absent_not_zero() {
        assert!(matches!(
            normalize_price("ติดต่อสอบถาม", PriceUnit::Unspecified),
            Err(NormalizationError::InvalidPrice { .. })
        ));
        assert!(normalize_price("", PriceUnit::PerTon).is_err());
    }

    proptest! {
        #[test]
        fn price_normalize_is_idempotent(value in 0.0f64..1.0e9) {
            let once = normalize_price(&value.to_string(), PriceUnit::Unspecified).unwrap();
            let twice = normalize_price(&once.to_string(), PriceUnit::Unspecified).unwrap();
            prop_assert_eq!(once, twice);
        }
    }

    #[test]
    fn coordinates_from_q_parameter() {
        let found = extract_coordinates("https://maps.google.com/maps?q=13.7563,100.5018&hl=th&z=14&output=embed").unwrap();
        assert_eq!(found.latitude, 13.7563);
        assert_eq!(found.longitude, 100.5018);
    }

    #[test]
    fn coordinates_from_at_path_segment() {
        let found = extract_coordinates("https://www.google.com/maps/place/x/@14.0208,99.5328,15z").unwrap();
        assert_eq!(found, Coordinate::new(14.0208, 99.5328).unwrap());
    }

    #[test]
    fn coordinates_from_embed_parameter() {
        let link = "https://www.google.com/maps/embed?pb=!1m18!1m12!1m3!1d3875.5!2d100.5!3d13.75!2m3!1f0!2f0!3f0!3m2!1i1024!2i768!4f13.1!3m3!1m2!1s0x0%3A0x0!2zMTPCsDQ1!3d13.7563!4d100.5018!5e0";
        let found = extract_coordinates(link).unwrap();
        assert_eq!(found, Coordinate::new(13.7563, 100.5018).unwrap());
    }

    #[test]
    fn q_parameter_is_tried_before_path() {
        let found = extract_coordinates("https://www.google.com/maps/@1.0,2.0,15z?q=3.0,4.0").unwrap();
        assert_eq!(found, Coordinate::new(3.0, 4.0).unwrap());
    }

    #[test]
    fn link_without_pattern_is_absent_never_zero() {
        let result = extract_coordinates("https://maps.google.com/maps?hl=th&output=embed");
        assert!(matches!(result, Err(NormalizationError::InvalidCoordinate { .. })));
        assert!(extract_coordinates("not a url").is_err());
    }

    #[test]
    fn protocol_relative_links_are_accepted() {
        let found = extract_coordinates("//maps.google.com/maps?q=-6.2,106.8").unwrap();
        assert_eq!(found, Coordinate::new(-6.2, 106.8).unwrap());
    }

    #[test]
    fn map_link_detection() {
        assert!(is_map_link("https://maps.google.com/maps?q=1,2"));
        assert!(is_map_link("https://www.google.com/maps/embed?pb=x"));
        assert!(!is_map_link("https://smce2023.doae.go.th/product_detail.php"));
    }
}
