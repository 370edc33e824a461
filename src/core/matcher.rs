/// Trigger matching — exact phrase lookup, then fuzzy token-set similarity.

use rustc_hash::FxHashSet;

use crate::core::catalog::Catalog;
use crate::schema::template::Template;

/// Minimum token-set similarity for a fuzzy hit, inclusive.
pub const FUZZY_THRESHOLD: f64 = 0.70;

/// A successful trigger match. Exact matches score `1.0`.
#[derive(Debug, Clone, Copy)]
pub struct TriggerMatch<'a> {
    pub template: &'a Template,
    pub score: f64,
}

/// Case-insensitive, whitespace-trimmed trigger normalization. The catalog
/// indexes triggers under this form, so exact matching is a single lookup.
pub fn normalize(phrase: &str) -> String {
    phrase.trim().to_lowercase()
}

fn token_set(phrase: &str) -> FxHashSet<String> {
    phrase
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect()
}

/// Token-set overlap in `[0, 1]`: intersection size over union size of
/// whitespace-delimited lowercase tokens. Cheap and explainable, and unlike
/// edit distance its score does not swing with phrase length on short
/// command-like triggers.
fn similarity(a: &FxHashSet<String>, b: &FxHashSet<String>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Resolve a phrase to a template.
///
/// Two passes: an exact hit on the normalized trigger index wins outright
/// (triggers are unique catalog-wide, so there is at most one). Otherwise
/// every registered trigger is scored by token-set overlap and the best
/// candidate at or above [`FUZZY_THRESHOLD`] is returned. Ties break on the
/// larger count of tokens shared with the phrase, then on the
/// lexicographically smallest template id, so the result is fully
/// deterministic.
pub fn match_trigger<'a>(phrase: &str, catalog: &'a Catalog) -> Option<TriggerMatch<'a>> {
    if let Some(template) = catalog.template_for_trigger(&normalize(phrase)) {
        return Some(TriggerMatch {
            template,
            score: 1.0,
        });
    }

    let phrase_tokens = token_set(phrase);
    let mut best: Option<(f64, usize, &'a Template)> = None;

    for template in catalog.iter() {
        for trigger in template.triggers() {
            let trigger_tokens = token_set(trigger);
            let score = similarity(&phrase_tokens, &trigger_tokens);
            if score < FUZZY_THRESHOLD {
                continue;
            }
            let overlap = phrase_tokens.intersection(&trigger_tokens).count();
            log::debug!(
                "fuzzy candidate: trigger '{}' (template '{}') scored {:.3}",
                trigger,
                template.id(),
                score
            );
            let better = match &best {
                None => true,
                Some((best_score, best_overlap, best_template)) => {
                    score > *best_score
                        || (score == *best_score && overlap > *best_overlap)
                        || (score == *best_score
                            && overlap == *best_overlap
                            && template.id() < best_template.id())
                }
            };
            if better {
                best = Some((score, overlap, template));
            }
        }
    }

    best.map(|(score, _, template)| TriggerMatch { template, score })
}
