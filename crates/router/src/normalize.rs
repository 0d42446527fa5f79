//! Query text normalization.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Strip diacritics, lower-case and trim: `"Tiêu hóa"` → `"tieu hoa"`.
///
/// Compatibility-decomposes, drops combining marks, and folds the stroked
/// `đ`/`Đ` (which has no decomposition) to `d`.
pub fn fold_diacritics(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'đ' | 'Đ' => 'd',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_accents_and_lowercases() {
        assert_eq!(fold_diacritics("Tiêu hóa"), "tieu hoa");
        assert_eq!(fold_diacritics("  Đau đầu "), "dau dau");
        assert_eq!(fold_diacritics("Gastroentérologie"), "gastroenterologie");
    }

    #[test]
    fn ascii_is_only_lowercased() {
        assert_eq!(fold_diacritics("ENT"), "ent");
        assert_eq!(fold_diacritics("internal medicine"), "internal medicine");
    }
}
