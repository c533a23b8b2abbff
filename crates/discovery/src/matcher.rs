use crate::config::MatchWeights;
use crate::keywords::{split_camel_case, Keyword};
use crate::synonyms::SynonymTable;
use context_indexer::is_ignored_dir_name;
use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Matcher, Utf32String};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Share of `exact` granted when the keyword is one word of a multi-word stem
const STEM_WORD_RATIO: f64 = 0.8;

/// Fuzzy matches below this share of a perfect score are ignored
const FUZZY_MIN_RATIO: f64 = 0.5;

const FUZZY_MIN_CHARS: usize = 4;

/// A file proposed as relevant to a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateFile {
    /// Root-relative path with forward slashes
    pub path: String,
    pub score: f64,
    /// Keywords that contributed to the score, in keyword order
    pub keywords: Vec<String>,
}

/// Scores a file listing against keywords
#[derive(Debug, Clone)]
pub struct FileMatcher {
    weights: MatchWeights,
    synonyms: SynonymTable,
    extra_ignored: Vec<String>,
}

impl FileMatcher {
    pub fn new(weights: MatchWeights) -> Self {
        Self {
            weights,
            synonyms: SynonymTable::new(),
            extra_ignored: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_synonyms(mut self, synonyms: SynonymTable) -> Self {
        self.synonyms = synonyms;
        self
    }

    /// Additional directory names excluded before scoring
    #[must_use]
    pub fn ignore_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extra_ignored
            .extend(dirs.into_iter().map(|d| d.as_ref().to_lowercase()));
        self
    }

    pub fn weights(&self) -> &MatchWeights {
        &self.weights
    }

    /// Rank `listing` against `keywords`, best first, at most `max_results` entries.
    ///
    /// Files scoring zero are dropped; ties go to the shorter path, then the
    /// lexicographically smaller one.
    pub fn match_files(
        &self,
        keywords: &[Keyword],
        listing: &[String],
        max_results: usize,
    ) -> Vec<CandidateFile> {
        let keywords: Vec<&Keyword> = keywords
            .iter()
            .filter(|keyword| !keyword.text.trim().is_empty())
            .collect();
        if keywords.is_empty() || listing.is_empty() || max_results == 0 {
            return Vec::new();
        }

        let mut matcher = Matcher::new(nucleo_matcher::Config::DEFAULT);
        let queries: Vec<KeywordQuery> = keywords
            .iter()
            .map(|keyword| KeywordQuery::new(keyword, &self.weights, &mut matcher))
            .collect();

        let mut candidates: Vec<CandidateFile> = listing
            .iter()
            .filter(|path| !self.is_excluded(path))
            .filter_map(|path| {
                let file = FileName::parse(path);
                let mut score = 0.0;
                let mut matched = Vec::new();

                for query in &queries {
                    if let Some(pair_score) = self.score_pair(query, &file, &mut matcher) {
                        score += query.tier_weight * pair_score;
                        matched.push(query.text.clone());
                    }
                }

                (score > 0.0).then(|| CandidateFile {
                    path: path.clone(),
                    score,
                    keywords: matched,
                })
            })
            .collect();

        candidates.sort_by(compare_candidates);
        candidates.truncate(max_results);
        candidates
    }

    /// Unweighted score of one keyword against one file, `None` when nothing matched
    fn score_pair(
        &self,
        query: &KeywordQuery,
        file: &FileName,
        matcher: &mut Matcher,
    ) -> Option<f64> {
        let mut score = 0.0;
        let mut matched = false;

        if file.stem == query.text {
            score += self.weights.exact;
            matched = true;
        } else if file.stem_words.len() > 1 && file.stem_words.contains(&query.text) {
            score += self.weights.exact * STEM_WORD_RATIO;
            matched = true;
        }

        if file.lowered.contains(&query.text) {
            score += self.weights.path;
            matched = true;
        } else if let Some(ratio) = query.fuzzy_ratio(&file.haystack, matcher) {
            score += self.weights.path * 0.5 * ratio;
            matched = true;
        }

        if !matched {
            let hits = self
                .synonyms
                .fragments(&query.text)
                .iter()
                .filter(|fragment| file.has_word_prefix(fragment))
                .count();
            if hits > 0 {
                score += self.weights.synonym * hits as f64;
                matched = true;
            }
        }

        matched.then_some(score)
    }

    fn is_excluded(&self, path: &str) -> bool {
        let mut components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        components.pop();
        components.iter().any(|component| {
            is_ignored_dir_name(component)
                || self
                    .extra_ignored
                    .iter()
                    .any(|ignored| ignored.eq_ignore_ascii_case(component))
        })
    }
}

impl Default for FileMatcher {
    fn default() -> Self {
        Self::new(MatchWeights::default())
    }
}

fn compare_candidates(a: &CandidateFile, b: &CandidateFile) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.path.len().cmp(&b.path.len()))
        .then_with(|| a.path.cmp(&b.path))
}

/// A keyword prepared for scoring
struct KeywordQuery {
    text: String,
    tier_weight: f64,
    /// Fuzzy pattern with the score it gets against itself
    fuzzy: Option<(Pattern, u32)>,
}

impl KeywordQuery {
    fn new(keyword: &Keyword, weights: &MatchWeights, matcher: &mut Matcher) -> Self {
        let text = keyword.text.trim().to_lowercase();
        let fuzzy = (text.chars().count() >= FUZZY_MIN_CHARS)
            .then(|| Pattern::parse(&text, CaseMatching::Ignore, Normalization::Smart))
            .and_then(|pattern| {
                let perfect = pattern.score(Utf32String::from(text.as_str()).slice(..), matcher)?;
                (perfect > 0).then_some((pattern, perfect))
            });

        Self {
            text,
            tier_weight: weights.tier(keyword.tier),
            fuzzy,
        }
    }

    /// Fuzzy score as a share of a perfect match, when it clears the threshold
    fn fuzzy_ratio(&self, haystack: &Utf32String, matcher: &mut Matcher) -> Option<f64> {
        let (pattern, perfect) = self.fuzzy.as_ref()?;
        let score = pattern.score(haystack.slice(..), matcher)?;
        let ratio = (f64::from(score) / f64::from(*perfect)).min(1.0);
        (ratio >= FUZZY_MIN_RATIO).then_some(ratio)
    }
}

/// Lower-cased views of a listed path
struct FileName {
    lowered: String,
    haystack: Utf32String,
    stem: String,
    stem_words: Vec<String>,
    path_words: Vec<String>,
}

impl FileName {
    fn parse(path: &str) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path);
        let stem = match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        };

        Self {
            lowered: path.to_lowercase(),
            haystack: Utf32String::from(path),
            stem: stem.to_lowercase(),
            stem_words: words(stem),
            path_words: words(path),
        }
    }

    fn has_word_prefix(&self, fragment: &str) -> bool {
        self.path_words.iter().any(|word| word.starts_with(fragment))
    }
}

/// Split on non-alphanumerics and camelCase, lower-cased
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .flat_map(split_camel_case)
        .map(|word| word.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::KeywordTier;
    use pretty_assertions::assert_eq;

    fn listing(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    fn paths(candidates: &[CandidateFile]) -> Vec<&str> {
        candidates.iter().map(|c| c.path.as_str()).collect()
    }

    fn kw(text: &str, tier: KeywordTier) -> Keyword {
        Keyword::new(text, tier)
    }

    #[test]
    fn test_exact_stem_beats_path_substring() {
        let matcher = FileMatcher::default();
        let result = matcher.match_files(
            &[kw("cache", KeywordTier::Domain)],
            &listing(&["src/cache_utils/helpers.rs", "src/cache.rs"]),
            10,
        );
        assert_eq!(paths(&result), vec!["src/cache.rs", "src/cache_utils/helpers.rs"]);
        assert_eq!(result[0].score, (10.0 + 5.0) * 1.5);
        assert_eq!(result[1].score, 5.0 * 1.5);
    }

    #[test]
    fn test_multi_word_stem_counts_at_reduced_weight() {
        let matcher = FileMatcher::default();
        let result = matcher.match_files(
            &[kw("user", KeywordTier::Regular)],
            &listing(&["user_service.py"]),
            10,
        );
        assert_eq!(result[0].score, 10.0 * 0.8 + 5.0);
    }

    #[test]
    fn test_synonyms_only_when_nothing_else_matched() {
        let matcher = FileMatcher::default();
        let result = matcher.match_files(
            &[kw("authentication", KeywordTier::Domain)],
            &listing(&["auth.py", "authentication.py", "main.py"]),
            10,
        );
        assert_eq!(paths(&result), vec!["authentication.py", "auth.py"]);
        assert_eq!(result[1].score, 2.0 * 1.5);
    }

    #[test]
    fn test_fuzzy_match_needs_four_chars() {
        let matcher = FileMatcher::default();
        let result = matcher.match_files(
            &[kw("cfg", KeywordTier::Regular)],
            &listing(&["config.toml"]),
            10,
        );
        assert!(result.is_empty());

        let result = matcher.match_files(
            &[kw("cnfg", KeywordTier::Regular)],
            &listing(&["src/cnf_g.rs", "src/zzz.rs"]),
            10,
        );
        assert_eq!(paths(&result), vec!["src/cnf_g.rs"]);
        assert!(result[0].score > 0.0 && result[0].score <= 2.5);
    }

    #[test]
    fn test_ties_break_by_length_then_name() {
        let matcher = FileMatcher::default();
        let result = matcher.match_files(
            &[kw("parser", KeywordTier::Regular)],
            &listing(&["b/parser.rs", "a/parser.rs", "parser.rs"]),
            10,
        );
        assert_eq!(paths(&result), vec!["parser.rs", "a/parser.rs", "b/parser.rs"]);
    }

    #[test]
    fn test_ignored_directories_excluded() {
        let matcher = FileMatcher::default().ignore_dirs(["generated"]);
        let result = matcher.match_files(
            &[kw("index", KeywordTier::Regular)],
            &listing(&[
                "node_modules/pkg/index.js",
                ".git/index",
                "generated/index.ts",
                "src/index.ts",
            ]),
            10,
        );
        assert_eq!(paths(&result), vec!["src/index.ts"]);
    }

    #[test]
    fn test_empty_inputs_yield_nothing() {
        let matcher = FileMatcher::default();
        assert!(matcher
            .match_files(&[], &listing(&["a.rs"]), 10)
            .is_empty());
        assert!(matcher
            .match_files(&[kw("", KeywordTier::Fallback)], &listing(&["a.rs"]), 10)
            .is_empty());
        assert!(matcher
            .match_files(&[kw("a", KeywordTier::Regular)], &[], 10)
            .is_empty());
    }

    #[test]
    fn test_result_is_truncated() {
        let matcher = FileMatcher::default();
        let result = matcher.match_files(
            &[kw("mod", KeywordTier::Regular)],
            &listing(&["a/mod.rs", "b/mod.rs", "c/mod.rs"]),
            2,
        );
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_contributing_keywords_recorded() {
        let matcher = FileMatcher::default();
        let result = matcher.match_files(
            &[kw("user", KeywordTier::Domain), kw("zebra", KeywordTier::Regular)],
            &listing(&["user.py"]),
            10,
        );
        assert_eq!(result[0].keywords, vec!["user".to_string()]);
    }
}
