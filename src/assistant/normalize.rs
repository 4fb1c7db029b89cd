//! Text normalization shared by phrase matching and name resolution

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonical comparison form of user text
///
/// Lower-cases, decomposes (NFD) and drops combining marks, turns every
/// character outside `[a-z0-9а-яё]` into a separator, then collapses runs of
/// separators into single spaces with no leading or trailing space.
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;

    for c in input.to_lowercase().nfd() {
        if is_combining_mark(c) {
            continue;
        }
        if is_kept(c) {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }

    out
}

fn is_kept(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | 'а'..='я' | 'ё')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_collapses_whitespace() {
        assert_eq!(normalize("  Включи   ПОЛИТИКУ\tOffice "), "включи политику office");
    }

    #[test]
    fn test_punctuation_becomes_separator() {
        assert_eq!(normalize("Smart-TV, гостиная!"), "smart tv гостиная");
        assert_eq!(normalize("AA:BB:CC"), "aa bb cc");
    }

    #[test]
    fn test_strips_diacritics() {
        assert_eq!(normalize("Café Résumé"), "cafe resume");
        assert_eq!(normalize("Ёлка"), normalize("елка"));
    }

    #[test]
    fn test_blank_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  ?! "), "");
    }

    #[test]
    fn test_idempotent() {
        let once = normalize("Ноутбук Макс — рабочий (5 ГГц)");
        assert_eq!(normalize(&once), once);
    }
}
