/// Small kana that merge with the preceding character into a single mora.
/// The geminate marker (っ/ッ) and the long-vowel mark are absent on purpose:
/// each of those is a full mora.
const SMALL_KANA: &[char] = &[
    'ゃ', 'ゅ', 'ょ', 'ぁ', 'ぃ', 'ぅ', 'ぇ', 'ぉ', 'ャ', 'ュ', 'ョ', 'ァ', 'ィ', 'ゥ', 'ェ', 'ォ',
];

const LONG_VOWEL_MARK: char = 'ー';

/// Hiragana ぁ..ん, katakana ァ..ン, or the long-vowel mark.
pub fn is_countable_kana(c: char) -> bool {
    matches!(c, '\u{3041}'..='\u{3093}' | '\u{30A1}'..='\u{30F3}') || c == LONG_VOWEL_MARK
}

fn is_small_kana(c: char) -> bool {
    SMALL_KANA.contains(&c)
}

/// Count morae in a kana reading.
///
/// Anything outside the kana blocks (kanji, Latin, digits, punctuation,
/// whitespace) is ignored. Small kana never add a mora of their own, even at
/// the start of the string.
pub fn mora_count(text: &str) -> usize {
    text.chars()
        .filter(|&c| is_countable_kana(c))
        .filter(|&c| !is_small_kana(c))
        .count()
}

/// [`mora_count`] for a reading that may be absent.
pub fn mora_count_opt(text: Option<&str>) -> usize {
    text.map(mora_count).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_absent_are_zero() {
        assert_eq!(mora_count(""), 0);
        assert_eq!(mora_count_opt(None), 0);
    }

    #[test]
    fn palatalized_pair_is_one() {
        assert_eq!(mora_count("きゃ"), 1);
        assert_eq!(mora_count("キャ"), 1);
    }

    #[test]
    fn geminate_counts_on_its_own() {
        assert_eq!(mora_count("がっこう"), 4);
        assert_eq!(mora_count("ひっこしたなつ"), 7);
    }

    #[test]
    fn small_yo_merges() {
        // と / う / きょ / う
        assert_eq!(mora_count("とうきょう"), 4);
        assert_eq!(mora_count("じょそうざい"), 5);
    }

    #[test]
    fn long_vowel_mark_counts() {
        assert_eq!(mora_count("コーヒー"), 4);
    }

    #[test]
    fn non_kana_is_ignored() {
        assert_eq!(mora_count("abc123"), 0);
        assert_eq!(mora_count("春の夜の"), 2);
        assert_eq!(mora_count("「ごめんね」と"), 5);
        assert_eq!(mora_count(" は る の よ の\n"), 5);
    }

    #[test]
    fn leading_small_kana_is_skipped() {
        assert_eq!(mora_count("ゃあ"), 1);
    }

    #[test]
    fn kana_outside_filtered_range_is_dropped() {
        // ゔ and ヴ sit just past ん / ン.
        assert_eq!(mora_count("ゔヴ"), 0);
    }
}
