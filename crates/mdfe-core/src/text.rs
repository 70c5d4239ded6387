//! # Free-Text Sanitizing
//!
//! Authority layouts accept a restricted character set in free-text fields
//! (contingency motive, cancellation justification). Accented Latin letters
//! are folded to ASCII, `&` becomes `e`, and anything outside
//! `[A-Za-z0-9 @,-.;:/]` is dropped.

/// Trim, truncate to `max_chars` characters, then fold special characters.
pub fn sanitize(text: &str, max_chars: usize) -> String {
    let truncated: String = text.trim().chars().take(max_chars).collect();
    replace_special_chars(&truncated)
}

/// Fold accented characters to ASCII and drop disallowed symbols.
pub fn replace_special_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.trim().chars() {
        match fold(c) {
            Some(folded) => out.push_str(folded),
            None if is_allowed(c) => out.push(c),
            None => {}
        }
    }
    out
}

fn fold(c: char) -> Option<&'static str> {
    let folded = match c {
        '&' => "e",
        'á' | 'à' | 'ã' | 'â' | 'ä' => "a",
        'é' | 'è' | 'ê' | 'ë' => "e",
        'í' | 'ì' | 'î' | 'ï' => "i",
        'ó' | 'ò' | 'õ' | 'ô' | 'ö' => "o",
        'ú' | 'ù' | 'û' | 'ü' => "u",
        'ç' => "c",
        'ñ' => "n",
        'Á' | 'À' | 'Ã' | 'Â' | 'Ä' => "A",
        'É' | 'È' | 'Ê' | 'Ë' => "E",
        'Í' | 'Ì' | 'Î' | 'Ï' => "I",
        'Ó' | 'Ò' | 'Õ' | 'Ô' | 'Ö' => "O",
        'Ú' | 'Ù' | 'Û' | 'Ü' => "U",
        'Ç' => "C",
        'Ñ' => "N",
        _ => return None,
    };
    Some(folded)
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ' ' | '@' | ',' | '-' | '.' | ';' | ':' | '/')
}
