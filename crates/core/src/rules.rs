//! Literal replacement rules for auxiliary templates.

/// Rule value that stands for the current case identifier.
pub const CASE_NUMBER_SENTINEL: &str = "CASE_NUMBER";

/// Placeholder that every template may use for the case identifier.
pub const CASE_NAME_PLACEHOLDER: &str = "CaseName";

/// Replacement text of a single rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleValue {
    /// Substitute the text verbatim.
    Literal(String),
    /// Substitute the identifier of the case being generated.
    CaseIdentifier,
}

impl RuleValue {
    /// Interpret configured text, recognising [`CASE_NUMBER_SENTINEL`].
    pub fn parse(raw: &str) -> Self {
        if raw == CASE_NUMBER_SENTINEL {
            Self::CaseIdentifier
        } else {
            Self::Literal(raw.to_string())
        }
    }

    /// Text to substitute for the case `case_id`.
    pub fn resolve<'a>(&'a self, case_id: &'a str) -> &'a str {
        match self {
            Self::Literal(text) => text,
            Self::CaseIdentifier => case_id,
        }
    }
}

/// Ordered `old -> new` rules, applied first to last.
///
/// Always starts with `CaseName -> CASE_NUMBER`; an explicit rule with the
/// same key replaces it in place.
///
/// Overriding `CaseName` does not change generated output: the first
/// substitution pass already replaces every `CaseName` with the case
/// identifier before any rule runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementRuleSet {
    rules: Vec<(String, RuleValue)>,
}

impl Default for ReplacementRuleSet {
    fn default() -> Self {
        Self {
            rules: vec![(CASE_NAME_PLACEHOLDER.to_string(), RuleValue::CaseIdentifier)],
        }
    }
}

impl ReplacementRuleSet {
    /// The default rules extended by `overrides`, in iteration order.
    pub fn with_overrides<I, K, V>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut set = Self::default();
        for (old, new) in overrides {
            set.set(old, RuleValue::parse(new.as_ref()));
        }
        set
    }

    /// Add a rule, replacing an existing rule for the same text.
    pub fn set(&mut self, old: impl Into<String>, new: RuleValue) {
        let old = old.into();
        match self.rules.iter_mut().find(|(o, _)| *o == old) {
            Some(rule) => rule.1 = new,
            None => self.rules.push((old, new)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuleValue)> {
        self.rules.iter().map(|(o, n)| (o.as_str(), n))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_maps_case_name() {
        let rules = ReplacementRuleSet::default();
        let all: Vec<_> = rules.iter().collect();
        assert_eq!(all, vec![("CaseName", &RuleValue::CaseIdentifier)]);
    }

    #[test]
    fn sentinel_parses() {
        assert_eq!(RuleValue::parse("CASE_NUMBER"), RuleValue::CaseIdentifier);
        assert_eq!(
            RuleValue::parse("case_number"),
            RuleValue::Literal("case_number".into())
        );
    }

    #[test]
    fn resolve_values() {
        assert_eq!(RuleValue::CaseIdentifier.resolve("Case04"), "Case04");
        assert_eq!(RuleValue::Literal("k-eps".into()).resolve("Case04"), "k-eps");
    }

    #[test]
    fn override_replaces_default_in_place() {
        let rules = ReplacementRuleSet::with_overrides([
            ("Solver", "coupled"),
            ("CaseName", "fixed"),
        ]);
        let all: Vec<_> = rules.iter().collect();
        assert_eq!(
            all,
            vec![
                ("CaseName", &RuleValue::Literal("fixed".into())),
                ("Solver", &RuleValue::Literal("coupled".into())),
            ]
        );
        assert_eq!(rules.len(), 2);
    }
}
