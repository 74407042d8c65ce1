/// A single search hit in a form the ranking boosts can operate on
/// without depending on `ScoredMemory`'s wire shape.
#[derive(Debug, Clone)]
pub struct RankableDocument {
    pub doc_id: String,
    pub base_score: f32,
    pub text: String,
    pub tags: Vec<String>,
    pub doc_type: Option<String>,
}

/// Signals pulled from the active memory/session that bias ranking toward
/// what the user is already talking about. A caller with no session or
/// memory context simply passes `None` and gets the base ranking back
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct RankingContext {
    pub memory_keywords: Vec<String>,
    pub session_keywords: Vec<String>,
    pub preferred_tags: Vec<String>,
    pub preferred_types: Vec<String>,
}

const MEMORY_BOOST: f32 = 0.15;
const SESSION_BOOST: f32 = 0.10;
const PREFERRED_TAG_BOOST: f32 = 0.10;
const PREFERRED_TYPE_BOOST: f32 = 0.10;

/// Re-ranks `results` by boosting documents that overlap with the active
/// memory/session context or match a preferred tag/type, capping each
/// score at `1.0` and re-sorting descending. A `None` context is a no-op.
pub fn apply_context_aware_ranking(
    mut results: Vec<RankableDocument>,
    ctx: Option<&RankingContext>,
) -> Vec<RankableDocument> {
    let Some(ctx) = ctx else {
        return results;
    };

    for doc in &mut results {
        let text_lower = doc.text.to_lowercase();
        let mut boost = 0.0f32;

        if ctx.memory_keywords.iter().any(|k| text_lower.contains(&k.to_lowercase())) {
            boost += MEMORY_BOOST;
        }
        if ctx.session_keywords.iter().any(|k| text_lower.contains(&k.to_lowercase())) {
            boost += SESSION_BOOST;
        }
        if doc.tags.iter().any(|t| ctx.preferred_tags.contains(t)) {
            boost += PREFERRED_TAG_BOOST;
        }
        if doc
            .doc_type
            .as_ref()
            .is_some_and(|t| ctx.preferred_types.contains(t))
        {
            boost += PREFERRED_TYPE_BOOST;
        }

        doc.base_score = (doc.base_score + boost).min(1.0);
    }

    results.sort_by(|a, b| b.base_score.partial_cmp(&a.base_score).unwrap());
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, score: f32, text: &str, tags: &[&str]) -> RankableDocument {
        RankableDocument {
            doc_id: id.into(),
            base_score: score,
            text: text.into(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            doc_type: None,
        }
    }

    #[test]
    fn no_context_leaves_results_unchanged() {
        let results = vec![doc("a", 0.5, "dark mode preference", &[])];
        let out = apply_context_aware_ranking(results.clone(), None);
        assert_eq!(out[0].base_score, results[0].base_score);
    }

    #[test]
    fn memory_keyword_overlap_boosts_score() {
        let ctx = RankingContext {
            memory_keywords: vec!["dark mode".into()],
            ..Default::default()
        };
        let results = vec![
            doc("a", 0.5, "the user prefers dark mode", &[]),
            doc("b", 0.5, "unrelated content", &[]),
        ];
        let out = apply_context_aware_ranking(results, Some(&ctx));
        assert_eq!(out[0].doc_id, "a");
        assert!((out[0].base_score - 0.65).abs() < 1e-6);
    }

    #[test]
    fn boosts_stack_but_cap_at_one() {
        let ctx = RankingContext {
            memory_keywords: vec!["dark".into()],
            session_keywords: vec!["mode".into()],
            preferred_tags: vec!["ui".into()],
            preferred_types: vec!["preference".into()],
        };
        let mut d = doc("a", 0.9, "dark mode", &["ui"]);
        d.doc_type = Some("preference".into());
        let out = apply_context_aware_ranking(vec![d], Some(&ctx));
        assert_eq!(out[0].base_score, 1.0);
    }

    #[test]
    fn result_is_re_sorted_after_boosting() {
        let ctx = RankingContext {
            preferred_tags: vec!["ui".into()],
            ..Default::default()
        };
        let results = vec![doc("a", 0.6, "higher base", &[]), doc("b", 0.5, "lower base", &["ui"])];
        let out = apply_context_aware_ranking(results, Some(&ctx));
        assert_eq!(out[0].doc_id, "b");
    }
}
