//! Offline Hangul romanization used to derive login slugs.
//!
//! Follows the Revised Romanization letter tables syllable by syllable. Sound
//! change rules across syllable boundaries are not applied, which is fine for
//! slugs: the output only needs to be stable and readable.

use boxfinder_core::{SlugTranslator, StoreError};

const SYLLABLE_BASE: u32 = 0xAC00;
const SYLLABLE_LAST: u32 = 0xD7A3;
const MEDIALS_PER_INITIAL: u32 = 21 * 28;
const FINALS: u32 = 28;

const INITIALS: [&str; 19] = [
    "g", "kk", "n", "d", "tt", "r", "m", "b", "pp", "s", "ss", "", "j", "jj", "ch", "k", "t", "p",
    "h",
];

const MEDIALS: [&str; 21] = [
    "a", "ae", "ya", "yae", "eo", "e", "yeo", "ye", "o", "wa", "wae", "oe", "yo", "u", "wo", "we",
    "wi", "yu", "eu", "ui", "i",
];

const FINAL_CONSONANTS: [&str; 28] = [
    "", "k", "k", "k", "n", "n", "n", "t", "l", "k", "m", "l", "l", "l", "p", "l", "m", "p", "p",
    "t", "t", "ng", "t", "t", "k", "t", "p", "t",
];

/// Romanizes one precomposed Hangul syllable, or returns `None` for any
/// other character.
fn romanize_syllable(c: char) -> Option<String> {
    let code = u32::from(c);
    if !(SYLLABLE_BASE..=SYLLABLE_LAST).contains(&code) {
        return None;
    }
    let index = code - SYLLABLE_BASE;
    let initial = (index / MEDIALS_PER_INITIAL) as usize;
    let medial = ((index % MEDIALS_PER_INITIAL) / FINALS) as usize;
    let last = (index % FINALS) as usize;
    Some(format!(
        "{}{}{}",
        INITIALS[initial], MEDIALS[medial], FINAL_CONSONANTS[last]
    ))
}

/// Lower-case ASCII slug of `name` with Hangul romanized and every other
/// run of non-alphanumerics collapsed to a single hyphen.
#[must_use]
pub fn romanize(name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    for c in name.chars() {
        if let Some(latin) = romanize_syllable(c) {
            current.push_str(&latin);
        } else if c.is_ascii_alphanumeric() {
            current.push(c.to_ascii_lowercase());
        } else if !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words.join("-")
}

/// [`SlugTranslator`] backed by [`romanize`]. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct HangulRomanizer;

impl SlugTranslator for HangulRomanizer {
    async fn translate(&self, display_name: &str) -> Result<String, StoreError> {
        Ok(romanize(display_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn romanizes_common_gym_words() {
        assert_eq!(romanize("강남"), "gangnam");
        assert_eq!(romanize("크로스핏"), "keuroseupit");
        assert_eq!(romanize("서울"), "seoul");
    }

    #[test]
    fn mixed_scripts_keep_word_boundaries() {
        assert_eq!(romanize("CF 강남"), "cf-gangnam");
        assert_eq!(romanize("크로스핏 역삼 (2호점)"), "keuroseupit-yeoksam-2hojeom");
    }

    #[test]
    fn unsupported_characters_only_yield_empty() {
        assert_eq!(romanize("★☆"), "");
        assert_eq!(romanize(""), "");
    }

    #[test]
    fn silent_initial_contributes_nothing() {
        assert_eq!(romanize("아이"), "ai");
    }
}
