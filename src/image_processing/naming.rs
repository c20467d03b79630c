use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Product code at the start of a stem: `PREFIX-NNNNN...` (e.g. ALCH-00001, GN-05015, SLES-51046-P).
///
/// Captures: prefix (letters plus optional `-alnum` groups), the first three
/// digits, the next two digits and whatever trails them.
static PRODUCT_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]+(?:-[A-Za-z0-9]+)*)-(\d{3})(\d{2})(.*)")
        .expect("product code pattern is valid")
});

/// Resolve the output filename for an input image.
///
/// Stems that start with a product code are rewritten to `{prefix}_{num3}.{num2}{extras}{suffix}.png`,
/// anything else becomes `{stem}{suffix}.png`. Pure and total: no filesystem access, never fails.
pub fn resolve(filename: &str, suffix: &str) -> String {
    let stem = file_stem(filename);

    if let Some(caps) = PRODUCT_CODE.captures(stem) {
        return format!(
            "{}_{}.{}{}{}.png",
            &caps[1], &caps[2], &caps[3], &caps[4], suffix
        );
    }

    format!("{}{}.png", stem, suffix)
}

/// Filename with its final extension removed. Leading-dot names keep their dot.
fn file_stem(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolve_product_codes() {
        assert_eq!(resolve("ALCH-00001.jpg", "_mod"), "ALCH_000.01_mod.png");
        assert_eq!(resolve("SLES-51046-P.png", ""), "SLES_510.46-P.png");
        assert_eq!(resolve("GN-05015.jpeg", "_COV"), "GN_050.15_COV.png");
        assert_eq!(resolve("SLUS-20002-COV-2.JPG", ""), "SLUS_200.02-COV-2.png");
    }

    #[test]
    fn test_resolve_prefers_longest_prefix() {
        // The prefix may itself contain hyphenated alphanumeric groups
        assert_eq!(resolve("ABC-12345-67890.png", ""), "ABC-12345_678.90.png");
        assert_eq!(resolve("SCES-A1-50001.png", "_x"), "SCES-A1_500.01_x.png");
    }

    #[test]
    fn test_resolve_keeps_inner_dots_as_extras() {
        assert_eq!(
            resolve("SLES-51046.front.jpg", "_mod"),
            "SLES_510.46.front_mod.png"
        );
    }

    #[test]
    fn test_resolve_fallback() {
        assert_eq!(resolve("random_cover.png", "_mod"), "random_cover_mod.png");
        // Fewer than 5 digits
        assert_eq!(resolve("ALCH-1234.jpg", "_mod"), "ALCH-1234_mod.png");
        // Non-digit where a digit is expected
        assert_eq!(resolve("ALCH-0000A.jpg", ""), "ALCH-0000A.png");
        // No letters before the digits
        assert_eq!(resolve("12345.png", "_s"), "12345_s.png");
        // No separator between prefix and digits
        assert_eq!(resolve("ALCH00001.png", ""), "ALCH00001.png");
    }

    #[test]
    fn test_resolve_is_anchored_at_stem_start() {
        assert_eq!(resolve("_ALCH-00001.jpg", "_mod"), "_ALCH-00001_mod.png");
        assert_eq!(
            resolve("cover of SLES-51046.png", ""),
            "cover of SLES-51046.png"
        );
    }

    #[test]
    fn test_resolve_without_extension() {
        assert_eq!(resolve("ALCH-00001", ""), "ALCH_000.01.png");
        assert_eq!(resolve("artwork", "_v2"), "artwork_v2.png");
    }

    #[test]
    fn test_resolve_is_total_and_deterministic() {
        let inputs = [
            "", ".png", "..", "a.b.c", "ünïcødé.jpg", "SLES-51046-P.png", "-.png", "A-00000",
        ];
        for input in inputs {
            let first = resolve(input, "_sfx");
            let second = resolve(input, "_sfx");
            assert_eq!(first, second);
            assert!(first.ends_with(".png"), "{:?} -> {:?}", input, first);
        }
    }
}
