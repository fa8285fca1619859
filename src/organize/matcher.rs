use crate::organize::config::OrganizeConfig;
use crate::organize::title::normalize_title;
use crate::organize::types::{MatchCandidate, SeriesFolder};

/// Score base for titles where one contains the other.
/// Partial matches land in `PARTIAL_BASE..PARTIAL_BASE + PARTIAL_RANGE`,
/// always below the score of an exact match.
const PARTIAL_BASE: f64 = 0.6;
const PARTIAL_RANGE: f64 = 0.3;

/// Fuzzy title matcher.
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    min_score: f64,
    auto_score: f64,
    min_partial_chars: usize,
}

impl Matcher {
    #[must_use]
    pub const fn new(min_score: f64, auto_score: f64, min_partial_chars: usize) -> Self {
        Self {
            min_score,
            auto_score,
            min_partial_chars,
        }
    }

    #[must_use]
    pub const fn from_config(config: &OrganizeConfig) -> Self {
        Self::new(config.min_score, config.auto_score, config.min_partial_chars)
    }

    /// Similarity score and edit distance between two normalized titles.
    ///
    /// The score is the best of exact equality, substring containment and normalized Levenshtein similarity.
    #[must_use]
    pub fn score(&self, title: &str, folder: &str) -> (f64, usize) {
        let distance = strsim::levenshtein(title, folder);
        if title.is_empty() || folder.is_empty() {
            return (0.0, distance);
        }
        if title == folder {
            return (1.0, 0);
        }

        let title_len = title.chars().count();
        let folder_len = folder.chars().count();
        let longest = title_len.max(folder_len);
        let similarity = 1.0 - distance as f64 / longest as f64;

        let (shorter, longer, shorter_len) = if title_len <= folder_len {
            (title, folder, title_len)
        } else {
            (folder, title, folder_len)
        };
        let partial = if shorter_len >= self.min_partial_chars && longer.contains(shorter) {
            PARTIAL_BASE + PARTIAL_RANGE * shorter_len as f64 / longest as f64
        } else {
            0.0
        };

        (similarity.max(partial), distance)
    }

    /// All folders that clear the minimum score, best first.
    ///
    /// When one folder title equals the archive title exactly,
    /// every other candidate is kept below the auto score so the exact folder is the only high-confidence one.
    /// Ties are broken by the shorter edit distance, then title and path order,
    /// so the result is the same for every run over the same library.
    #[must_use]
    pub fn candidates(&self, title: &str, folders: &[SeriesFolder]) -> Vec<MatchCandidate> {
        let normalized = normalize_title(title);
        let mut candidates: Vec<MatchCandidate> = folders
            .iter()
            .filter_map(|folder| {
                let (score, distance) = self.score(&normalized, &folder.normalized);
                (score >= self.min_score).then(|| MatchCandidate::new(folder.clone(), score, distance))
            })
            .collect();

        if candidates.iter().any(MatchCandidate::is_exact) {
            let ceiling = self.auto_score.next_down();
            for candidate in candidates.iter_mut().filter(|c| !c.is_exact()) {
                candidate.score = candidate.score.min(ceiling);
            }
        }

        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.distance.cmp(&b.distance))
                .then_with(|| a.folder.title.cmp(&b.folder.title))
                .then_with(|| a.folder.path.cmp(&b.folder.path))
        });
        candidates
    }

    /// The candidate to use without asking, if any.
    ///
    /// Only a lone candidate at or above the auto score qualifies:
    /// a second folder clearing the minimum score always goes to the resolver.
    #[must_use]
    pub fn auto_select<'a>(&self, candidates: &'a [MatchCandidate]) -> Option<&'a MatchCandidate> {
        match candidates {
            [single] if single.score >= self.auto_score => Some(single),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_high_confidence(&self, candidate: &MatchCandidate) -> bool {
        candidate.score >= self.auto_score
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(
            crate::organize::config::DEFAULT_MIN_SCORE,
            crate::organize::config::DEFAULT_AUTO_SCORE,
            crate::organize::config::DEFAULT_MIN_PARTIAL_CHARS,
        )
    }
}
