//! Flat `key=value` properties parsing for the translation document.

use std::collections::BTreeMap;

/// Parse a properties document into a key→value map.
///
/// Blank lines and `#`/`!` comments are skipped, the separator is the first
/// unescaped `=` or `:`, and later duplicates override earlier ones.
pub fn parse(text: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some(split) = separator_index(line) else {
            continue;
        };
        let key = unescape(line[..split].trim());
        let value = unescape(line[split + 1..].trim());
        if key.is_empty() {
            continue;
        }
        out.insert(key, value);
    }
    out
}

fn separator_index(line: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '=' | ':' if !escaped => return Some(i),
            _ => escaped = false,
        }
    }
    None
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_and_skips_comments() {
        let text = "# header\n\n! bang comment\nPUSH_UP_PUSH_UP = Push-Up\nPLANK_PLANK:Plank\n";
        let map = parse(text);
        assert_eq!(map.len(), 2);
        assert_eq!(map["PUSH_UP_PUSH_UP"], "Push-Up");
        assert_eq!(map["PLANK_PLANK"], "Plank");
    }

    #[test]
    fn splits_on_first_separator_only() {
        let map = parse("RATIO_KEY=1:2=3");
        assert_eq!(map["RATIO_KEY"], "1:2=3");
    }

    #[test]
    fn unescapes_unicode_and_separators() {
        let map = parse("CAT_CAF\\u00c9=Caf\\u00e9\nA\\=B=c");
        assert_eq!(map["CAT_CAFÉ"], "Café");
        assert_eq!(map["A=B"], "c");
    }

    #[test]
    fn later_duplicate_overrides() {
        let map = parse("K=first\nK=second");
        assert_eq!(map["K"], "second");
    }

    #[test]
    fn lines_without_separator_are_ignored() {
        assert!(parse("just some words").is_empty());
    }
}
