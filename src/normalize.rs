// 🏷️ Category Normalizer - Rules as Data
// Ordered substring rules mapping free-text labels onto closed vocabularies

use crate::record::{Metric, Pathogen};

// ============================================================================
// RULE DEFINITION
// ============================================================================

/// How a rule compares its patterns against the lower-cased label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Label must equal one of the patterns
    Exact,
    /// Label must contain one of the patterns
    Contains,
}

#[derive(Debug, Clone)]
pub struct NormalizationRule<T> {
    /// Rule ID for tracing which rule fired
    pub id: &'static str,

    pub kind: MatchKind,

    /// Lower-case patterns; any one of them matching fires the rule
    pub patterns: Vec<&'static str>,

    pub target: T,
}

impl<T> NormalizationRule<T> {
    pub fn new(id: &'static str, kind: MatchKind, patterns: &[&'static str], target: T) -> Self {
        NormalizationRule {
            id,
            kind,
            patterns: patterns.to_vec(),
            target,
        }
    }

    /// Check a label that is already trimmed and lower-cased.
    pub fn matches(&self, label: &str) -> bool {
        match self.kind {
            MatchKind::Exact => self.patterns.iter().any(|p| label == *p),
            MatchKind::Contains => self.patterns.iter().any(|p| label.contains(p)),
        }
    }
}

// ============================================================================
// RULE SET
// ============================================================================

/// Rules evaluated in insertion order; the first match wins.
#[derive(Debug, Clone)]
pub struct RuleSet<T> {
    rules: Vec<NormalizationRule<T>>,
}

impl<T> RuleSet<T> {
    pub fn from_rules(rules: Vec<NormalizationRule<T>>) -> Self {
        RuleSet { rules }
    }

    /// First matching rule for `label`, compared case-insensitively.
    pub fn classify(&self, label: &str) -> Option<&NormalizationRule<T>> {
        let label = label.trim().to_lowercase();
        self.rules.iter().find(|rule| rule.matches(&label))
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

// ============================================================================
// DEFAULT VOCABULARIES
// ============================================================================

pub fn pathogen_rules() -> RuleSet<Pathogen> {
    use MatchKind::Contains;

    RuleSet::from_rules(vec![
        NormalizationRule::new("influenza", Contains, &["influenza"], Pathogen::Influenza),
        NormalizationRule::new("rsv", Contains, &["rsv", "respiratory syncytial"], Pathogen::Rsv),
        NormalizationRule::new("sars-cov-2", Contains, &["covid", "sars", "cov-2"], Pathogen::SarsCov2),
    ])
}

/// Exact ECDC indicator names first, then looser keyword fallbacks.
pub fn indicator_rules() -> RuleSet<Metric> {
    use MatchKind::{Contains, Exact};

    RuleSet::from_rules(vec![
        NormalizationRule::new("positivity", Exact, &["positivity"], Metric::PositivityRate),
        NormalizationRule::new("detections", Exact, &["detections"], Metric::Cases),
        NormalizationRule::new("tests", Exact, &["tests"], Metric::Tests),
        NormalizationRule::new("positivity-like", Contains, &["positivity", "percent"], Metric::PositivityRate),
        NormalizationRule::new("cases-like", Contains, &["detection", "case", "positive"], Metric::Cases),
        NormalizationRule::new("tests-like", Contains, &["test", "specimen"], Metric::Tests),
    ])
}

// ============================================================================
// NORMALIZER
// ============================================================================

pub struct CategoryNormalizer {
    pathogens: RuleSet<Pathogen>,
    indicators: RuleSet<Metric>,
}

impl CategoryNormalizer {
    pub fn new(pathogens: RuleSet<Pathogen>, indicators: RuleSet<Metric>) -> Self {
        CategoryNormalizer {
            pathogens,
            indicators,
        }
    }

    /// Map a pathogen label onto the vocabulary.
    ///
    /// Unrecognised labels are passed through trimmed but otherwise verbatim.
    pub fn pathogen(&self, raw: &str) -> Pathogen {
        match self.pathogens.classify(raw) {
            Some(rule) => rule.target.clone(),
            None => Pathogen::Other(raw.trim().to_string()),
        }
    }

    /// Map an indicator label onto a metric. `None` means the row should be skipped.
    pub fn metric(&self, raw: &str) -> Option<Metric> {
        self.indicators.classify(raw).map(|rule| rule.target)
    }
}

impl Default for CategoryNormalizer {
    fn default() -> Self {
        CategoryNormalizer::new(pathogen_rules(), indicator_rules())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pathogen_labels() {
        let normalizer = CategoryNormalizer::default();

        assert_eq!(normalizer.pathogen("Influenza"), Pathogen::Influenza);
        assert_eq!(normalizer.pathogen("Influenza A(H3N2)"), Pathogen::Influenza);
        assert_eq!(normalizer.pathogen("RSV"), Pathogen::Rsv);
        assert_eq!(normalizer.pathogen("Respiratory Syncytial Virus"), Pathogen::Rsv);
        assert_eq!(normalizer.pathogen("SARS-CoV-2"), Pathogen::SarsCov2);
        assert_eq!(normalizer.pathogen("COVID-19"), Pathogen::SarsCov2);
        assert_eq!(normalizer.pathogen("hCoV-2"), Pathogen::SarsCov2);
    }

    #[test]
    fn test_pathogen_priority() {
        let normalizer = CategoryNormalizer::default();

        // Influenza is checked before the SARS keywords
        assert_eq!(normalizer.pathogen("influenza/sars co-detection"), Pathogen::Influenza);
    }

    #[test]
    fn test_unknown_pathogen_passes_through_trimmed() {
        let normalizer = CategoryNormalizer::default();

        assert_eq!(
            normalizer.pathogen("  Human Metapneumovirus "),
            Pathogen::Other("Human Metapneumovirus".to_string())
        );
    }

    #[test]
    fn test_exact_indicators() {
        let normalizer = CategoryNormalizer::default();

        assert_eq!(normalizer.metric("positivity"), Some(Metric::PositivityRate));
        assert_eq!(normalizer.metric(" Detections "), Some(Metric::Cases));
        assert_eq!(normalizer.metric("TESTS"), Some(Metric::Tests));
    }

    #[test]
    fn test_fuzzy_indicators() {
        let normalizer = CategoryNormalizer::default();

        assert_eq!(normalizer.metric("percent positive"), Some(Metric::PositivityRate));
        assert_eq!(normalizer.metric("weekly positivity %"), Some(Metric::PositivityRate));
        assert_eq!(normalizer.metric("confirmed cases"), Some(Metric::Cases));
        assert_eq!(normalizer.metric("positive specimens"), Some(Metric::Cases));
        assert_eq!(normalizer.metric("specimens"), Some(Metric::Tests));
        assert_eq!(normalizer.metric("tested"), Some(Metric::Tests));
    }

    #[test]
    fn test_unknown_indicator_is_none() {
        let normalizer = CategoryNormalizer::default();

        assert_eq!(normalizer.metric("hospitalizations"), None);
        assert_eq!(normalizer.metric(""), None);
    }

    #[test]
    fn test_rule_reports_id() {
        let rules = indicator_rules();
        assert_eq!(rules.rule_count(), 6);

        let rule = rules.classify("Number of detections").unwrap();
        assert_eq!(rule.id, "cases-like");
        assert_eq!(rule.kind, MatchKind::Contains);
    }
}
