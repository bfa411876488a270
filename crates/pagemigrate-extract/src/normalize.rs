use pagemigrate_model::Settings;
use unicode_normalization::UnicodeNormalization;

/// Credit line prefixes, including the soft-hyphen spellings the legacy
/// templates used to control line breaks.
pub const AUTHOR_PREFIXES: &[&str] = &["By "];
pub const PHOTO_CREDIT_PREFIXES: &[&str] = &[
    "Photo&shy;graphy by ",
    "Photo\u{ad}graphy by ",
    "Photography by ",
];
pub const ILLUSTRATION_CREDIT_PREFIXES: &[&str] = &[
    "Illustra&shy;tion by ",
    "Illustra\u{ad}tion by ",
    "Illustration by ",
];

/// Normalize Unicode text to NFC form and trim it.
///
/// Keeps accented names in credit lines and titles in one canonical form no
/// matter how the legacy page encoded them.
pub fn normalize_text(input: &str) -> String {
    input.nfc().collect::<String>().trim().to_string()
}

/// Remove every occurrence of each prefix, then normalize.
pub fn clean_credit(text: &str, prefixes: &[&str]) -> String {
    let mut cleaned = text.to_string();
    for prefix in prefixes {
        cleaned = cleaned.replace(prefix, "");
    }
    normalize_text(&cleaned)
}

/// Rewrite legacy markup for the new site before it is parsed.
///
/// `.cfm` page suffixes are dropped (`/index.cfm` becomes `/`), root-relative
/// `src` references move under the asset base path and root-relative `href`
/// links under the page base path.
pub fn clean_legacy_html(raw: &str, settings: &Settings) -> String {
    raw.replace("/index.cfm", "/")
        .replace(".cfm", "")
        .replace("src=\"/", &format!("src=\"{}/", settings.asset_base_path))
        .replace("href=\"/", &format!("href=\"{}/", settings.page_base_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_nfc() {
        // e + combining acute accent -> é (precomposed)
        let decomposed = " Jose\u{0301} ";
        assert_eq!(normalize_text(decomposed), "José");
    }

    #[test]
    fn test_clean_credit_soft_hyphen_variants() {
        assert_eq!(
            clean_credit("Photo\u{ad}graphy by Jeff Watts", PHOTO_CREDIT_PREFIXES),
            "Jeff Watts"
        );
        assert_eq!(
            clean_credit("Photography by Jeff Watts", PHOTO_CREDIT_PREFIXES),
            "Jeff Watts"
        );
        assert_eq!(
            clean_credit("Illustra\u{ad}tion by Ana Lee", ILLUSTRATION_CREDIT_PREFIXES),
            "Ana Lee"
        );
        assert_eq!(clean_credit("By Sam Ortiz", AUTHOR_PREFIXES), "Sam Ortiz");
        assert_eq!(clean_credit("", AUTHOR_PREFIXES), "");
    }

    #[test]
    fn test_clean_legacy_html() {
        let settings = Settings::default();
        let raw = r#"<a href="/news/index.cfm">News</a><a href="/about/story.cfm">Story</a><img src="/images/x.jpg"><a href="https://other.edu/">x</a>"#;
        assert_eq!(
            clean_legacy_html(raw, &settings),
            r#"<a href="/content/au/news/">News</a><a href="/content/au/about/story">Story</a><img src="/content/dam/au/assets/images/x.jpg"><a href="https://other.edu/">x</a>"#
        );
    }
}
