//! Four-way multiple-choice generation.
//!
//! Pure: no I/O, no shared state. Callers pass the RNG, so tests can seed
//! a `StdRng` and production code uses `rand::rng()`.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::types::{AnswerOption, OptionSet, Song};

/// Titles equal to this (after normalization) are never used as distractors.
const UNKNOWN_TITLE: &str = "unknown";

/// Upper bound on reuse draws when the pool has fewer than 3 distinct
/// eligible titles, so a degenerate pool cannot loop forever.
const REUSE_CAP: usize = 16;

/// Strip a leading track-number prefix ("01. ", "3 - ", "12 ") and trim.
pub fn normalize_title(raw: &str) -> String {
    let trimmed = raw.trim();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    if digits_end > 0 && digits_end < trimmed.len() {
        let rest = &trimmed[digits_end..];
        let sep_end = rest
            .find(|c: char| !matches!(c, '.' | '-') && !c.is_whitespace())
            .unwrap_or(rest.len());
        if sep_end > 0 {
            return rest[sep_end..].trim().to_string();
        }
    }
    trimmed.to_string()
}

fn title_key(raw: &str) -> String {
    normalize_title(raw).to_lowercase()
}

/// Build the option set for `correct`: one correct entry and three
/// distractors drawn from `pool`, shuffled, with the correct position
/// recorded.
///
/// The correct song is excluded from the pool by index when
/// `exclude_index` is given, and always by normalized-title equality.
/// Distractors are unique by normalized title when the pool allows it;
/// too-small pools fall back to repeats, and an empty pool pads with the
/// correct title itself.
pub fn generate(
    song_index: usize,
    correct: &Song,
    pool: &[Song],
    exclude_index: Option<usize>,
    rng: &mut impl Rng,
) -> OptionSet {
    let correct_title = normalize_title(&correct.title);
    let correct_key = correct_title.to_lowercase();

    let mut candidates: Vec<String> = pool
        .iter()
        .enumerate()
        .filter(|(i, song)| {
            if exclude_index == Some(*i) {
                return false;
            }
            let key = title_key(&song.title);
            key != correct_key && key != UNKNOWN_TITLE
        })
        .map(|(_, song)| normalize_title(&song.title))
        .collect();
    candidates.shuffle(rng);

    let mut distractors: Vec<String> = Vec::with_capacity(3);
    let mut seen: HashSet<String> = HashSet::new();
    for title in &candidates {
        if distractors.len() == 3 {
            break;
        }
        if seen.insert(title.to_lowercase()) {
            distractors.push(title.clone());
        }
    }

    // Not enough distinct titles: allow repeats from the eligible pool.
    let mut draws = 0;
    while distractors.len() < 3 && !candidates.is_empty() && draws < REUSE_CAP {
        let pick = candidates[rng.random_range(0..candidates.len())].clone();
        distractors.push(pick);
        draws += 1;
    }

    // Empty pool: pad with the correct title rather than fail.
    while distractors.len() < 3 {
        distractors.push(correct_title.clone());
    }

    let mut options: Vec<AnswerOption> = Vec::with_capacity(4);
    options.push(AnswerOption {
        text: correct_title,
        is_correct: true,
    });
    options.extend(distractors.into_iter().map(|text| AnswerOption {
        text,
        is_correct: false,
    }));
    options.shuffle(rng);

    debug_assert_eq!(options.iter().filter(|o| o.is_correct).count(), 1);
    let correct_index = options
        .iter()
        .position(|o| o.is_correct)
        .unwrap_or_default();

    OptionSet {
        song_index,
        options,
        correct_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn song(title: &str) -> Song {
        Song {
            title: title.to_string(),
            artist: String::new(),
            album: String::new(),
            year: None,
            audio_ref: String::new(),
        }
    }

    #[test]
    fn strips_track_number_prefixes() {
        assert_eq!(normalize_title("01. Thriller"), "Thriller");
        assert_eq!(normalize_title("3 - Hey Jude"), "Hey Jude");
        assert_eq!(normalize_title("12 Yesterday"), "Yesterday");
        assert_eq!(normalize_title("  Help!  "), "Help!");
        // All-digit titles are not prefixes.
        assert_eq!(normalize_title("1999"), "1999");
        assert_eq!(normalize_title("99 Luftballons"), "Luftballons");
    }

    #[test]
    fn exactly_one_correct_and_three_distinct_distractors() {
        let pool: Vec<Song> = ["01. A", "02. B", "03. C", "04. D", "05. E"]
            .iter()
            .map(|t| song(t))
            .collect();
        let mut rng = StdRng::seed_from_u64(7);
        let set = generate(0, &pool[0], &pool, Some(0), &mut rng);

        assert_eq!(set.options.len(), 4);
        assert_eq!(set.options.iter().filter(|o| o.is_correct).count(), 1);
        assert!(set.options[set.correct_index].is_correct);
        assert_eq!(set.options[set.correct_index].text, "A");

        let mut titles: Vec<String> = set
            .options
            .iter()
            .map(|o| o.text.to_lowercase())
            .collect();
        titles.sort();
        titles.dedup();
        assert_eq!(titles.len(), 4, "distractors must be pairwise distinct");
    }

    #[test]
    fn excludes_unknown_and_duplicate_titles() {
        let pool = vec![
            song("Target"),
            song("unknown"),
            song("TARGET"),
            song("Other"),
            song("other"),
        ];
        let mut rng = StdRng::seed_from_u64(1);
        let set = generate(0, &pool[0], &pool, Some(0), &mut rng);
        for opt in set.options.iter().filter(|o| !o.is_correct) {
            assert_ne!(opt.text.to_lowercase(), "unknown");
            assert_ne!(opt.text.to_lowercase(), "target");
        }
    }

    #[test]
    fn empty_pool_pads_with_correct_title() {
        let correct = song("Lonely");
        let mut rng = StdRng::seed_from_u64(3);
        let set = generate(0, &correct, &[], None, &mut rng);
        assert_eq!(set.options.len(), 4);
        assert!(set.options.iter().all(|o| o.text == "Lonely"));
        assert_eq!(set.options.iter().filter(|o| o.is_correct).count(), 1);
    }

    #[test]
    fn single_candidate_pool_reuses_it() {
        let correct = song("Alpha");
        let pool = vec![song("Beta")];
        let mut rng = StdRng::seed_from_u64(9);
        let set = generate(0, &correct, &pool, None, &mut rng);
        let mut distinct: Vec<&str> =
            set.options.iter().map(|o| o.text.as_str()).collect();
        distinct.sort();
        distinct.dedup();
        assert_eq!(distinct, vec!["Alpha", "Beta"]);
    }

    #[test]
    fn fully_degenerate_pool_terminates() {
        let correct = song("unknown");
        let pool = vec![song("unknown"), song("Unknown"), song("UNKNOWN")];
        let mut rng = StdRng::seed_from_u64(5);
        let set = generate(0, &correct, &pool, None, &mut rng);
        assert_eq!(set.options.len(), 4);
        assert!(set.options.iter().all(|o| o.text == "unknown"));
    }

    #[test]
    fn deterministic_for_a_fixed_seed() {
        let pool: Vec<Song> = ["A", "B", "C", "D", "E", "F"]
            .iter()
            .map(|t| song(t))
            .collect();
        let a = generate(2, &pool[2], &pool, Some(2), &mut StdRng::seed_from_u64(42));
        let b = generate(2, &pool[2], &pool, Some(2), &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
