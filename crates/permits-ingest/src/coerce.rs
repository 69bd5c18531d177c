//! String → typed value coercions for raw CSV cells.

use std::sync::LazyLock;

use chrono::NaiveDate;
use permits_core::permit::GeoPoint;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A San Diego zip code (91xxx or 92xxx) standing on its own in an address.
static ZIP_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?:^|[^0-9])(9[12][0-9]{3})(?:[^0-9]|$)")
    .expect("zip code pattern is valid")
});

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%Y%m%d"];

/// Parse a date cell. Accepts plain dates in a few common layouts, and
/// timestamps whose first ten characters are an ISO date followed by `T` or a
/// space.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
  let raw = raw.trim();
  if let Some((date, rest)) = raw.split_at_checked(10)
    && (rest.starts_with('T') || rest.starts_with(' '))
  {
    return NaiveDate::parse_from_str(date, "%Y-%m-%d").ok();
  }
  DATE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Parse a non-negative unit counter. Integral floats (`"3.0"`) are
/// accepted since some exports write counters as floats.
pub fn parse_count(raw: &str) -> Option<u32> {
  let raw = raw.trim();
  if let Ok(n) = raw.parse::<u32>() {
    return Some(n);
  }
  let f = raw.parse::<f64>().ok()?;
  (f.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&f))
    .then_some(f as u32)
}

/// Parse a dollar amount, tolerating `$` and thousands separators.
pub fn parse_amount(raw: &str) -> Option<f64> {
  let cleaned: String = raw
    .trim()
    .chars()
    .filter(|c| !matches!(c, '$' | ',' | ' '))
    .collect();
  cleaned.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// An inclusive latitude/longitude box. Coordinates outside it are treated
/// as geocoding errors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
  pub lat_min: f64,
  pub lat_max: f64,
  pub lng_min: f64,
  pub lng_max: f64,
}

impl GeoBounds {
  /// The City of San Diego and its immediate surroundings.
  pub const SAN_DIEGO: Self = Self {
    lat_min: 32.5,
    lat_max: 33.3,
    lng_min: -117.7,
    lng_max: -116.8,
  };

  pub fn contains(&self, p: GeoPoint) -> bool {
    (self.lat_min..=self.lat_max).contains(&p.lat)
      && (self.lng_min..=self.lng_max).contains(&p.lng)
  }
}

impl Default for GeoBounds {
  fn default() -> Self { Self::SAN_DIEGO }
}

/// Outcome of coercing a coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Location {
  Absent,
  Valid(GeoPoint),
  /// Present but unparseable or outside the bounds.
  Rejected,
}

pub fn parse_location(
  lat: Option<&str>,
  lng: Option<&str>,
  bounds: Option<&GeoBounds>,
) -> Location {
  let (Some(lat), Some(lng)) = (lat, lng) else {
    return if lat.is_none() && lng.is_none() {
      Location::Absent
    } else {
      Location::Rejected
    };
  };
  let (Ok(lat), Ok(lng)) = (lat.parse::<f64>(), lng.parse::<f64>()) else {
    return Location::Rejected;
  };
  let point = GeoPoint { lat, lng };
  match bounds {
    Some(b) if !b.contains(point) => Location::Rejected,
    _ if !(lat.is_finite() && lng.is_finite()) => Location::Rejected,
    _ => Location::Valid(point),
  }
}

/// Extract the first standalone San Diego zip code from an address.
pub fn extract_zip(address: &str) -> Option<String> {
  ZIP_RE
    .captures(address)
    .and_then(|c| c.get(1))
    .map(|m| m.as_str().to_owned())
}

/// Trim a code-like cell, dropping a spurious `.0` suffix left by exports
/// that wrote the column as floats.
pub fn clean_code(raw: &str) -> String {
  let raw = raw.trim();
  raw
    .strip_suffix(".0")
    .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
    .unwrap_or(raw)
    .to_owned()
}
