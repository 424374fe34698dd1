//! Tokenization and a compact suffix-stripping stemmer for memory
//! indexing and query scoring.

/// Lowercase, split on non-alphanumeric runs, drop tokens of length
/// <= 1, then stem each surviving token.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|tok| tok.len() > 1)
        .map(stem)
        .collect()
}

/// Tokenize an entry's key and value text, duplicating the key's
/// tokens so the key is weighted 2x relative to the value in scoring.
pub fn tokenize_entry(key: &str, value_text: &str) -> Vec<String> {
    let mut tokens = tokenize(key);
    tokens.extend(tokenize(key));
    tokens.extend(tokenize(value_text));
    tokens
}

/// Strip a closed set of suffixes, each guarded by a minimum stem
/// length so short words are left untouched. Rules apply in order;
/// the first matching rule wins.
pub fn stem(word: String) -> String {
    let rules: &[(&str, &str, usize)] = &[
        ("ing", "", 6),
        ("tion", "", 7),
        ("ness", "", 7),
        ("ment", "", 7),
        ("able", "", 7),
        ("ies", "y", 5),
        ("es", "", 5),
        ("ed", "", 5),
        ("ly", "", 5),
    ];

    for (suffix, replacement, min_len) in rules {
        if word.len() >= *min_len && word.ends_with(suffix) {
            let stem_len = word.len() - suffix.len();
            return format!("{}{}", &word[..stem_len], replacement);
        }
    }

    if word.len() > 4 && word.ends_with('s') && !word.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }

    word
}
