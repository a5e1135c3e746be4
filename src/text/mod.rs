//! Text utilities: accent folding, narrative splitting and word wrapping.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    /// A period followed by whitespace and an upper-case letter
    static ref RE_SENTENCE_BREAK: Regex = Regex::new(r"\.\s+\p{Lu}").unwrap();
}

/// Fold text for keyword matching: decompose, drop accents, lower-case,
/// normalise apostrophes and underscores, collapse whitespace.
///
/// # Examples
///
/// ```
/// use report_oxide::text::fold;
///
/// assert_eq!(fold("Manomètre  du FILTRE"), "manometre du filtre");
/// assert_eq!(fold("Capture d’écran"), "capture d'ecran");
/// assert_eq!(fold("local_technique"), "local technique");
/// ```
pub fn fold(text: &str) -> String {
    let folded: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            '\u{2019}' | '\u{2018}' | '`' => '\'',
            '_' => ' ',
            other => other,
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Folded text reduced to its words: every character that is not a letter
/// or a digit separates words.
///
/// # Examples
///
/// ```
/// use report_oxide::text::word_key;
///
/// assert_eq!(word_key("Vue d'ensemble, côté NORD"), "vue d ensemble cote nord");
/// assert_eq!(word_key("Non-conforme"), "non conforme");
/// ```
pub fn word_key(text: &str) -> String {
    fold(text)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `phrase` occurs as whole words in `key` (a [`word_key`]).
///
/// The last word of the phrase also matches its plural in `s` or `x`.
///
/// # Examples
///
/// ```
/// use report_oxide::text::{contains_words, word_key};
///
/// let key = word_key("Deux skimmers près du bassin");
/// assert!(contains_words(&key, "skimmer"));
/// assert!(contains_words(&key, "près du"));
/// assert!(!contains_words(&word_key("Impression générale"), "pression"));
/// ```
pub fn contains_words(key: &str, phrase: &str) -> bool {
    let phrase = word_key(phrase);
    let needle: Vec<&str> = phrase.split(' ').filter(|w| !w.is_empty()).collect();
    let words: Vec<&str> = key.split(' ').filter(|w| !w.is_empty()).collect();
    if needle.is_empty() || words.len() < needle.len() {
        return false;
    }
    let last = needle.len() - 1;
    words.windows(needle.len()).any(|window| {
        window
            .iter()
            .zip(&needle)
            .enumerate()
            .all(|(i, (word, wanted))| word == wanted || (i == last && is_plural_of(word, wanted)))
    })
}

fn is_plural_of(word: &str, stem: &str) -> bool {
    word.len() == stem.len() + 1 && word.starts_with(stem) && word.ends_with(['s', 'x'])
}

/// Whether a field carries no content.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Split a narrative field into bullet items.
///
/// Splits on `|` when present, otherwise at sentence boundaries (`. `
/// followed by an upper-case letter). Items are trimmed, leading bullet
/// markers are removed, empty items are dropped and every item ends with
/// terminal punctuation.
///
/// # Examples
///
/// ```
/// use report_oxide::text::split_items;
///
/// assert_eq!(
///     split_items("Filtre à sable. Pompe 0,75 CV"),
///     vec!["Filtre à sable.".to_string(), "Pompe 0,75 CV.".to_string()]
/// );
/// assert_eq!(
///     split_items("Vanne 6 voies | Coffret électrique!"),
///     vec!["Vanne 6 voies.".to_string(), "Coffret électrique!".to_string()]
/// );
/// ```
pub fn split_items(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let raw: Vec<&str> = if text.contains('|') {
        text.split('|').collect()
    } else {
        split_sentences(text)
    };

    raw.into_iter()
        .map(|item| item.trim().trim_start_matches(['-', '*', '\u{2022}']).trim())
        .filter(|item| !item.is_empty())
        .map(ensure_terminal_punctuation)
        .collect()
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut start = 0;
    for m in RE_SENTENCE_BREAK.find_iter(text) {
        // keep the period with the sentence it closes
        items.push(&text[start..m.start() + 1]);
        let capital_len = m.as_str().chars().last().map_or(0, char::len_utf8);
        start = m.end() - capital_len;
    }
    items.push(&text[start..]);
    items
}

/// Append a period unless the text already ends with `.`, `!` or `?`.
pub fn ensure_terminal_punctuation(text: &str) -> String {
    let trimmed = text.trim_end().trim_end_matches([',', ';', ':']).trim_end();
    if trimmed.ends_with(['.', '!', '?']) {
        trimmed.to_string()
    } else {
        format!("{}.", trimmed)
    }
}

/// Split free text into paragraphs at line breaks, dropping blank lines.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Greedy word wrap. `measure` returns the rendered width of a string.
///
/// Words wider than `max_width` are broken between characters. Always returns
/// at least one line.
pub fn wrap_text(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        let test_line = if current_line.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current_line, word)
        };

        if measure(&test_line) <= max_width {
            current_line = test_line;
            continue;
        }

        if !current_line.is_empty() {
            lines.push(std::mem::take(&mut current_line));
        }

        if measure(word) <= max_width {
            current_line = word.to_string();
        } else {
            for ch in word.chars() {
                current_line.push(ch);
                if measure(&current_line) > max_width && current_line.chars().count() > 1 {
                    current_line.pop();
                    lines.push(std::mem::take(&mut current_line));
                    current_line.push(ch);
                }
            }
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> f32 {
        s.chars().count() as f32
    }

    #[test]
    fn test_fold_strips_accents_and_case() {
        assert_eq!(fold("Équipements"), "equipements");
        assert_eq!(fold("  Vue   Générale "), "vue generale");
        assert_eq!(fold("NON CONFORME"), "non conforme");
        assert_eq!(fold("Défaut"), "defaut");
    }

    #[test]
    fn test_word_key_splits_on_punctuation() {
        assert_eq!(word_key("NON-CONFORME"), "non conforme");
        assert_eq!(word_key("Capture d’écran"), "capture d ecran");
        assert_eq!(word_key("local_technique / abri"), "local technique abri");
    }

    #[test]
    fn test_contains_words_respects_boundaries() {
        let key = word_key("Impression générale du bassin");
        assert!(!contains_words(&key, "pression"));
        assert!(contains_words(&key, "bassin"));
        assert!(contains_words(&word_key("Deux bondes de fond"), "bonde"));
        assert!(contains_words(&word_key("Vue d'ensemble"), "vue d'ensemble"));
        assert!(!contains_words(&word_key("Filtration"), "filtre"));
        assert!(!contains_words("", "bassin"));
        assert!(!contains_words(&key, ""));
    }

    #[test]
    fn test_split_items_pipe_takes_precedence() {
        let items = split_items("Pompe. Filtre | Vanne");
        assert_eq!(items, vec!["Pompe. Filtre.", "Vanne."]);
    }

    #[test]
    fn test_split_items_sentences() {
        let items = split_items("Local sec. Bonne ventilation. Éclairage présent");
        assert_eq!(
            items,
            vec!["Local sec.", "Bonne ventilation.", "Éclairage présent."]
        );
    }

    #[test]
    fn test_split_items_keeps_lowercase_continuation() {
        let items = split_items("Débit 12 m3/h. environ. Pression 1.2 bar");
        assert_eq!(items, vec!["Débit 12 m3/h. environ.", "Pression 1.2 bar."]);
    }

    #[test]
    fn test_split_items_drops_empty_and_markers() {
        assert!(split_items("   ").is_empty());
        assert_eq!(split_items("| - Filtre |  | Pompe ?"), vec!["Filtre.", "Pompe ?"]);
    }

    #[test]
    fn test_ensure_terminal_punctuation() {
        assert_eq!(ensure_terminal_punctuation("Fuite"), "Fuite.");
        assert_eq!(ensure_terminal_punctuation("Fuite!"), "Fuite!");
        assert_eq!(ensure_terminal_punctuation("Fuite;"), "Fuite.");
    }

    #[test]
    fn test_split_paragraphs() {
        let paragraphs = split_paragraphs("Premier.\n\n  Second.  \nTroisième.");
        assert_eq!(paragraphs, vec!["Premier.", "Second.", "Troisième."]);
    }

    #[test]
    fn test_wrap_text() {
        let lines = wrap_text("aaa bbb ccc", 7.0, chars);
        assert_eq!(lines, vec!["aaa bbb", "ccc"]);
    }

    #[test]
    fn test_wrap_text_breaks_long_words() {
        let lines = wrap_text("abcdefghij", 4.0, chars);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_text_empty() {
        assert_eq!(wrap_text("", 10.0, chars), vec![String::new()]);
    }
}
