//! Street and locality parsing shared by the party extractors.

use crate::pipeline::rules::Ruleset;

/// Address fragments recovered from a run of lines.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AddressParts {
    pub line1: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

impl AddressParts {
    pub fn is_empty(&self) -> bool {
        self.line1.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.postal_code.is_none()
    }
}

/// Scan up to ten lines for street, city/state/zip and bare-zip shapes.
/// The first street hit wins; a later city/state/zip line replaces an
/// earlier one; a bare zip only fills an empty slot.
pub fn parse_address<'a>(lines: impl Iterator<Item = &'a str>, rules: &Ruleset) -> AddressParts {
    let mut parts = AddressParts::default();

    for line in lines.take(10) {
        let line = line.trim();

        if parts.line1.is_none() {
            if let Some(captures) = rules.street_address.captures(line) {
                parts.line1 = Some(captures[1].trim().to_string());
                continue;
            }
        }

        if let Some(captures) = rules.city_state_zip.captures(line) {
            parts.city = Some(captures[1].trim().to_string());
            parts.state = Some(captures[2].to_string());
            parts.postal_code = Some(captures[3].to_string());
            continue;
        }

        if parts.postal_code.is_none() {
            if let Some(captures) = rules.postal_code.captures(line) {
                parts.postal_code = Some(captures[1].to_string());
            }
        }
    }

    parts
}
