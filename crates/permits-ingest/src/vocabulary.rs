//! Approval-type vocabulary: raw type text → [`ApprovalType`].
//!
//! Rules are evaluated in order against the upper-cased text and the first
//! match wins, so a raw code can never map to more than one value. Text that
//! matches nothing is [`ApprovalType::Other`].

use permits_core::permit::ApprovalType;

/// How a rule matches the upper-cased raw type text.
#[derive(Debug, Clone, Copy)]
pub enum Pattern {
  /// The text contains the phrase anywhere.
  Contains(&'static str),
  /// The text starts with the phrase.
  Prefix(&'static str),
  /// One of the text's alphanumeric words equals the token. Used for short
  /// abbreviations that would otherwise match inside longer words.
  Word(&'static str),
}

impl Pattern {
  fn matches(self, upper: &str) -> bool {
    match self {
      Self::Contains(p) => upper.contains(p),
      Self::Prefix(p) => upper.starts_with(p),
      Self::Word(w) => upper
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|word| word == w),
    }
  }
}

#[derive(Debug, Clone, Copy)]
pub struct TypeRule {
  pub pattern: Pattern,
  pub maps_to: ApprovalType,
}

const fn rule(pattern: Pattern, maps_to: ApprovalType) -> TypeRule {
  TypeRule { pattern, maps_to }
}

use ApprovalType as T;
use Pattern::{Contains, Prefix, Word};

/// The shared rule table. Solar is checked first so that a combination
/// building/PV approval counts as solar.
pub const DEFAULT_TYPE_RULES: &[TypeRule] = &[
  rule(Contains("PHOTOVOLTAIC"), T::SolarPv),
  rule(Contains("SOLAR"), T::SolarPv),
  rule(Word("PV"), T::SolarPv),
  rule(Contains("COMBINATION BUILDING"), T::BuildingPermit),
  rule(Prefix("BUILDING PERMIT"), T::BuildingPermit),
  rule(Contains("ELECTRICAL"), T::Electrical),
  rule(Contains("PLUMBING"), T::Plumbing),
  rule(Contains("MECHANICAL"), T::Mechanical),
  rule(Contains("FIRE"), T::Fire),
  rule(Contains("RIGHT OF WAY"), T::RightOfWay),
  rule(Contains("RIGHT-OF-WAY"), T::RightOfWay),
  rule(Word("ROW"), T::RightOfWay),
  rule(Word("SIGN"), T::Sign),
  rule(Word("SIGNS"), T::Sign),
];

/// Map raw type text onto the closed vocabulary using `rules`.
pub fn classify_type(raw: &str, rules: &[TypeRule]) -> ApprovalType {
  let upper = raw.trim().to_ascii_uppercase();
  rules
    .iter()
    .find(|r| r.pattern.matches(&upper))
    .map_or(ApprovalType::Other, |r| r.maps_to)
}
