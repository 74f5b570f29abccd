/// Convert full-width ASCII variants (`５００ｇ`, `ＭＬ`) and the ideographic
/// space to their half-width forms. Other characters pass through.
pub fn normalize_width(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\u{3000}' => ' ',
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// Returns `None` for strings that are empty after trimming.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Show the first and last few characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_full_width_digits_and_units() {
        assert_eq!(normalize_width("豚肉　５００ｇ"), "豚肉 500g");
        assert_eq!(normalize_width("牛乳２００ＭＬ"), "牛乳200ML");
    }

    #[test]
    fn keeps_kana_untouched() {
        assert_eq!(normalize_width("たまねぎ"), "たまねぎ");
    }

    #[test]
    fn non_blank_filters_whitespace() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(Some(" a ")), Some("a"));
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn masks_long_and_short_secrets() {
        assert_eq!(mask_secret("1234567890abcdef"), "1234…cdef");
        assert_eq!(mask_secret("short"), "*****");
    }
}
