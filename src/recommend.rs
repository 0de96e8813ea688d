use crate::models::RecommendationRecord;

/// Conjunctive filter criteria. An empty search term passes everything;
/// `"all"` for kind or provider is a pass-through.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    pub search_term: String,
    pub kind: String,
    pub provider: String,
}

impl FilterCriteria {
    pub fn new(search_term: &str, kind: &str, provider: &str) -> Self {
        Self {
            search_term: search_term.to_string(),
            kind: kind.to_string(),
            provider: provider.to_string(),
        }
    }
}

pub fn filter<'a>(
    records: &'a [RecommendationRecord],
    criteria: &FilterCriteria,
) -> Vec<&'a RecommendationRecord> {
    let needle = criteria.search_term.to_lowercase();
    records
        .iter()
        .filter(|rec| {
            let matches_search = needle.is_empty()
                || rec.title.to_lowercase().contains(&needle)
                || rec.skill_name.to_lowercase().contains(&needle);

            let matches_kind = criteria.kind.is_empty()
                || criteria.kind == "all"
                || rec.recommendation_type == criteria.kind;

            let matches_provider = criteria.provider.is_empty()
                || criteria.provider == "all"
                || rec
                    .provider
                    .as_deref()
                    .is_some_and(|p| p.eq_ignore_ascii_case(&criteria.provider));

            matches_search && matches_kind && matches_provider
        })
        .collect()
}

/// Groups records by skill, keeping skills in order of first appearance
/// and records in their original relative order within each group, so
/// repeated renderings of the same list are identical.
pub fn group_by_skill<'a>(
    records: &[&'a RecommendationRecord],
) -> Vec<(String, Vec<&'a RecommendationRecord>)> {
    let mut groups: Vec<(String, Vec<&RecommendationRecord>)> = Vec::new();
    for &rec in records {
        match groups.iter_mut().find(|(skill, _)| *skill == rec.skill_name) {
            Some((_, members)) => members.push(rec),
            None => groups.push((rec.skill_name.clone(), vec![rec])),
        }
    }
    groups
}
