use std::collections::HashSet;

use crate::models::label::MatchRule;

/// Evaluate a caption against a set of substring match rules.
///
/// A rule's label is awarded when any of its substrings appears in the
/// caption; a rule contributes its label at most once, and the returned set
/// never contains a label twice even when several rules map to it. The
/// caption is expected to be lower-cased upstream; substrings are matched
/// verbatim. An empty result is not an error.
pub fn match_labels(caption: &str, rules: &[MatchRule]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut labels = Vec::new();

    for rule in rules {
        if rule.match_rules.iter().any(|s| caption.contains(s.as_str()))
            && seen.insert(rule.label.as_str())
        {
            labels.push(rule.label.clone());
        }
    }

    labels
}
