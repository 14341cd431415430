//! Instrument-type label normalization
//!
//! Free-text type labels arrive with mixed casing, stray whitespace and
//! decomposed accents. Normalizing them keeps one physical type on one
//! report row.

use std::collections::BTreeMap;
use unicode_normalization::UnicodeNormalization;

use crate::config::defaults::UNKNOWN_TYPE_LABEL;

/// Upper-case the first cased letter of every word, lower-case the rest.
///
/// A word starts after any non-alphabetic character, so `"termo-higrómetro"`
/// becomes `"Termo-Higrómetro"` and `"3mm"` becomes `"3Mm"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// Maps raw labels to canonical type names.
#[derive(Debug, Clone, Default)]
pub struct TypeNormalizer {
    corrections: BTreeMap<String, String>,
}

impl TypeNormalizer {
    /// Correction keys are normalized the same way labels are, then matched
    /// case-insensitively.
    pub fn new(corrections: &BTreeMap<String, String>) -> Self {
        let corrections = corrections
            .iter()
            .map(|(variant, canonical)| (clean(variant).to_lowercase(), canonical.clone()))
            .collect();
        Self { corrections }
    }

    pub fn normalize(&self, raw: &str) -> String {
        let cleaned = clean(raw);
        if cleaned.is_empty() {
            return UNKNOWN_TYPE_LABEL.to_string();
        }
        self.corrections
            .get(&cleaned.to_lowercase())
            .cloned()
            .unwrap_or(cleaned)
    }
}

/// NFC, collapse whitespace, title-case.
fn clean(raw: &str) -> String {
    let composed: String = raw.nfc().collect();
    let collapsed = composed.split_whitespace().collect::<Vec<_>>().join(" ");
    title_case(&collapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AggregationConfig;

    fn normalizer() -> TypeNormalizer {
        TypeNormalizer::new(&AggregationConfig::default().type_corrections)
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("pie de rey"), "Pie De Rey");
        assert_eq!(title_case("MANÓMETRO digital"), "Manómetro Digital");
        assert_eq!(title_case("termo-higrómetro"), "Termo-Higrómetro");
        assert_eq!(title_case("3mm"), "3Mm");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_whitespace_and_case_collapse() {
        let n = normalizer();
        assert_eq!(n.normalize("  balanza   DIGITAL "), "Balanza Digital");
        assert_eq!(n.normalize("balanza digital"), "Balanza Digital");
    }

    #[test]
    fn test_nfc_merges_decomposed_accents() {
        let n = normalizer();
        let decomposed = "Mano\u{0301}metro";
        let composed = "Manómetro";
        assert_eq!(n.normalize(decomposed), composed);
        assert_eq!(n.normalize(composed), composed);
    }

    #[test]
    fn test_corrections_canonicalize_variants() {
        let n = normalizer();
        assert_eq!(n.normalize("TERMOHIGROMETRO"), "Termohigrómetro");
        assert_eq!(n.normalize("termo  higrometro"), "Termohigrómetro");
        assert_eq!(n.normalize("manometro"), "Manómetro");
        assert_eq!(n.normalize("pie de rey"), "Calibrador Pie De Rey");
    }

    #[test]
    fn test_empty_label_is_unclassified() {
        let n = normalizer();
        assert_eq!(n.normalize(""), UNKNOWN_TYPE_LABEL);
        assert_eq!(n.normalize("   \t"), UNKNOWN_TYPE_LABEL);
    }
}
