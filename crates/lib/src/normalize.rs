//! Shared name normalizer: case-fold + accent strip.
//!
//! Every resolver compares names through this one function so that
//! "José Pérez", "jose perez" and "JOSE  PEREZ" all land on the same key.

/// Fold a free-text name into its canonical comparable form: collapse
/// whitespace runs, lowercase, and strip Latin diacritics.
pub fn fold_name(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .chars()
        .flat_map(char::to_lowercase)
        .map(strip_accent)
        .collect()
}

fn strip_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        _ => c,
    }
}
