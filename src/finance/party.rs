#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Party {
    Democratic,
    Republican,
}

impl Party {
    pub fn code(self) -> &'static str {
        match self {
            Self::Democratic => "D",
            Self::Republican => "R",
        }
    }
}

enum Pattern {
    StartsWith(&'static str),
    Contains(&'static str),
}

impl Pattern {
    fn matches(&self, upper: &str) -> bool {
        match self {
            Self::StartsWith(prefix) => upper.starts_with(prefix),
            Self::Contains(needle) => upper.contains(needle),
        }
    }
}

/// Evaluated top to bottom; the first rule with any matching pattern decides.
const PARTY_RULES: &[(&[Pattern], Party)] = &[
    (
        &[Pattern::StartsWith("D"), Pattern::Contains("DEM")],
        Party::Democratic,
    ),
    (
        &[Pattern::StartsWith("R"), Pattern::Contains("REP")],
        Party::Republican,
    ),
];

pub fn classify_party(raw: &str) -> Option<Party> {
    let upper = raw.trim().to_uppercase();
    if upper.is_empty() {
        return None;
    }

    PARTY_RULES
        .iter()
        .find(|(patterns, _)| patterns.iter().any(|pattern| pattern.matches(&upper)))
        .map(|(_, party)| *party)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn classifies_common_affiliations() {
        assert_eq!(classify_party("Republican Party"), Some(Party::Republican));
        assert_eq!(classify_party("democratic-farmer-labor"), Some(Party::Democratic));
        assert_eq!(classify_party("Independent"), None);
        assert_eq!(classify_party("REP"), Some(Party::Republican));
        assert_eq!(classify_party("d"), Some(Party::Democratic));
        assert_eq!(classify_party(""), None);
        assert_eq!(classify_party("   "), None);
    }

    #[test]
    fn substrings_classify_without_a_leading_letter() {
        assert_eq!(classify_party("Independent Democrat"), Some(Party::Democratic));
        assert_eq!(classify_party("Liberty Republican"), Some(Party::Republican));
        assert_eq!(classify_party("Green"), None);
    }

    #[test]
    fn democratic_rules_win_ties() {
        assert_eq!(
            classify_party("Democrat-Republican Fusion"),
            Some(Party::Democratic)
        );
        assert_eq!(classify_party("Fusion: DEM/REP"), Some(Party::Democratic));
        assert_eq!(classify_party("Fusion: REP/DEM"), Some(Party::Democratic));
    }

    #[test]
    fn democratic_substring_beats_republican_leading_letter() {
        assert_eq!(
            classify_party("Republicans for Democracy"),
            Some(Party::Democratic)
        );
        assert_eq!(classify_party("Rural Democrats"), Some(Party::Democratic));
        assert_eq!(classify_party("Reform"), Some(Party::Republican));
    }

    proptest! {
        #[test]
        fn classification_is_pure(raw in ".{0,24}") {
            prop_assert_eq!(classify_party(&raw), classify_party(&raw));
        }

        #[test]
        fn classification_ignores_case(raw in "[a-zA-Z -]{0,24}") {
            prop_assert_eq!(
                classify_party(&raw.to_lowercase()),
                classify_party(&raw.to_uppercase())
            );
        }

        #[test]
        fn rep_substring_without_democratic_markers_is_republican(
            prefix in "[ac-ln-qs-z ]{0,8}",
            suffix in "[a-z ]{0,8}",
        ) {
            let raw = format!("x{prefix}rep{suffix}");
            prop_assume!(!raw.to_uppercase().contains("DEM"));
            prop_assert_eq!(classify_party(&raw), Some(Party::Republican));
        }
    }
}
