//! Autocomplete ranking shared by key names and catalog titles.

/// Jaro-Winkler similarity a candidate needs before it is offered as a
/// typo correction.
pub const SIMILARITY_CUTOFF: f64 = 0.7;

/// Rank `candidates` against `query`, case-insensitively.
///
/// Prefix matches come first, then substring matches, both in candidate
/// order. Candidates that contain neither follow, best Jaro-Winkler score
/// first, as long as they reach [`SIMILARITY_CUTOFF`]. An empty query
/// returns the first `limit` candidates.
pub fn rank<'a>(query: &str, candidates: &[&'a str], limit: usize) -> Vec<&'a str> {
    let needle = query.trim().to_lowercase();
    let lowered: Vec<String> = candidates.iter().map(|c| c.to_lowercase()).collect();

    let prefix = lowered.iter().zip(candidates).filter(|(lower, _)| lower.starts_with(&needle));
    let substring = lowered
        .iter()
        .zip(candidates)
        .filter(|(lower, _)| !lower.starts_with(&needle) && lower.contains(&needle));

    let mut ranked: Vec<&'a str> = prefix.chain(substring).map(|(_, c)| *c).collect();

    if ranked.len() < limit && !needle.is_empty() {
        let mut similar: Vec<(f64, &'a str)> = lowered
            .iter()
            .zip(candidates)
            .filter(|(lower, _)| !lower.contains(&needle))
            .map(|(lower, c)| (strsim::jaro_winkler(&needle, lower), *c))
            .filter(|(score, _)| *score >= SIMILARITY_CUTOFF)
            .collect();
        // stable, so equal scores keep candidate order
        similar.sort_by(|a, b| b.0.total_cmp(&a.0));
        ranked.extend(similar.into_iter().map(|(_, c)| c));
    }

    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TITLES: [&str; 4] = [
        "Imagine Dragons - Bones",
        "Creo - Atmosphere",
        "Bones - Dirt",
        "Waterflame - Glorious Morning",
    ];

    #[test]
    fn prefix_before_substring() {
        assert_eq!(
            rank("bones", &TITLES, 10),
            vec!["Bones - Dirt", "Imagine Dragons - Bones"]
        );
    }

    #[test]
    fn misspelled_titles_fall_back_to_similarity() {
        let ranked = rank("Imagin Dragon - Bone", &TITLES, 10);
        assert_eq!(ranked[0], "Imagine Dragons - Bones");

        let ranked = rank("creo atmosfere", &TITLES, 10);
        assert_eq!(ranked[0], "Creo - Atmosphere");
    }

    #[test]
    fn unrelated_query_finds_nothing() {
        assert!(rank("zzzz", &TITLES, 10).is_empty());
    }

    #[test]
    fn empty_query_lists_in_order_up_to_limit() {
        assert_eq!(rank("", &TITLES, 2), vec![TITLES[0], TITLES[1]]);
    }
}
