//! PNB legacy-font glyph transliteration to Gurmukhi Unicode.
//!
//! The PNB font reuses Latin-1 code points for Gurmukhi glyphs and stores some
//! vowel signs in visual rather than logical order. Conversion runs in three
//! ordered passes:
//!
//! 1. collapse runs of repeated marker glyphs,
//! 2. apply ordered multi-glyph substitutions (including the reorder swaps),
//! 3. map remaining glyphs one by one.
//!
//! Characters without a mapping pass through untouched.

use std::sync::OnceLock;

use phf::phf_map;
use regex::{NoExpand, Regex};

////////////////////////////////////////////////////////////////////////////////
// #region GlyphTables

/// Single-glyph table. Where the font reuses a glyph the later meaning wins
/// (`°` is ਚ, `¹` is ਡ੍ਰ).
static MAP_SINGLE_GLYPH: phf::Map<char, &'static str> = phf_map! {
    '§' => "\u{0A13}",
    '¤' => "\u{0A05}",
    'Ó' => "\u{0A38}",
    'Õ' => "\u{0A39}",
    // k
    '¨' => "\u{0A15}",
    'ª' => "\u{0A16}",
    '«' => "\u{0A59}",
    '¬' => "\u{0A17}",
    '®' => "\u{0A18}",
    // ch
    '°' => "\u{0A1A}",
    '±' => "\u{0A1B}",
    '²' => "\u{0A1C}",
    '³' => "\u{0A5B}",
    '¯' => "\u{0A1D}",
    // retroflex
    '¶' => "\u{0A1F}",
    '·' => "\u{0A20}",
    '¸' => "\u{0A21}",
    '¹' => "\u{0A21}\u{0A4D}\u{0A30}",
    '»' => "\u{0A23}",
    // dental
    '¼' => "\u{0A24}",
    'Á' => "\u{0A25}",
    'Â' => "\u{0A26}",
    'Ä' => "\u{0A27}",
    'Å' => "\u{0A28}",
    // labial
    'Æ' => "\u{0A2A}",
    'Ç' => "\u{0A2B}",
    'É' => "\u{0A2C}",
    'Ê' => "\u{0A2D}",
    'Ì' => "\u{0A2E}",
    // semivowels
    'Í' => "\u{0A2F}",
    'Î' => "\u{0A2F}",
    'Ï' => "\u{0A30}",
    'Ð' => "\u{0A32}",
    'Ò' => "\u{0A35}",
    'µ' => "\u{0A35}",
    'Ô' => "\u{0A36}",
    'Ñ' => "\u{0A33}",
    // conjunct tails and addak
    'Ü' => "\u{0A40}\u{0A02}",
    'ð' => "\u{0A4D}\u{0A39}",
    'ò' => "\u{0A4D}\u{0A35}",
    'È' => "\u{0A5E}",
    'ó' => "\u{0A71}",
    'ô' => "\u{0A71}",
    'õ' => "\u{0A71}",
    // vowel signs
    'â' => "\u{0A70}",
    'Þ' => "\u{0A42}",
    'Û' => "\u{0A40}",
    'ï' => "\u{0A4C}",
    'ë' => "\u{0A4B}",
    'Ú' => "\u{0A3F}",
    'Ý' => "\u{0A41}",
    'ã' => "\u{0A47}",
    'ñ' => "\u{0A4D}\u{0A30}",
    'è' => "\u{0A48}",
    'Ù' => "\u{0A3E}\u{0A02}",
    'Ø' => "\u{0A3E}",
    'Ö' => "\u{0A3C}",
    '×' => "\u{0A02}",
};

/// One multi-glyph substitution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumGlyphGroupRule {
    /// Replace every occurrence of the glyph sequence with the text.
    Literal(&'static str, &'static str),
    /// Move the marker after the character that follows it.
    SwapWithNext(char),
}

/// Ordered substitutions; later rules see the output of earlier ones.
pub const TUP_GLYPH_GROUP_RULES: [EnumGlyphGroupRule; 23] = [
    EnumGlyphGroupRule::Literal("ÓÖ", "\u{0A36}"),
    EnumGlyphGroupRule::Literal("ªÖ", "\u{0A59}"),
    EnumGlyphGroupRule::Literal("¬Ö", "\u{0A5A}"),
    EnumGlyphGroupRule::Literal("³Ö", "\u{0A1C}\u{0A3C}"),
    EnumGlyphGroupRule::Literal("ÆÖ", "\u{0A5E}"),
    EnumGlyphGroupRule::Literal("ÐÖ", "\u{0A33}"),
    EnumGlyphGroupRule::Literal("¦Ý", "\u{0A09}"),
    EnumGlyphGroupRule::Literal("¦Þ", "\u{0A0A}"),
    EnumGlyphGroupRule::Literal("Óè", "\u{0A10}"),
    EnumGlyphGroupRule::Literal("¥ã", "\u{0A0F}"),
    EnumGlyphGroupRule::Literal("©", "\u{0A15}\u{0A4D}\u{0A30}"),
    EnumGlyphGroupRule::SwapWithNext('f'),
    EnumGlyphGroupRule::Literal("Ú¥", "\u{0A07}"),
    EnumGlyphGroupRule::Literal("¥Û", "\u{0A08}"),
    EnumGlyphGroupRule::SwapWithNext('Ú'),
    EnumGlyphGroupRule::Literal("¤Ø", "\u{0A06}"),
    EnumGlyphGroupRule::Literal("¤è", "\u{0A10}"),
    EnumGlyphGroupRule::Literal("¤ï", "\u{0A14}"),
    EnumGlyphGroupRule::Literal("²Ö", "\u{0A1C}\u{0A3C}"),
    EnumGlyphGroupRule::Literal("ÞÝ", "Þ"),
    EnumGlyphGroupRule::Literal("ÝÞ", "Ý"),
    EnumGlyphGroupRule::Literal("âÞ", "Þâ"),
    EnumGlyphGroupRule::Literal("óÝ", "Ýó"),
];

/// Glyphs whose consecutive repeats collapse to one. `Ý` is deliberately absent.
pub const TUP_CLEANUP_MARKERS: [char; 20] = [
    'Ü', 'ð', 'ò', 'È', 'ó', 'ô', 'õ', 'â', 'Þ', 'Û', 'ï', 'ë', 'Ú', 'ã', 'ñ', 'è', 'Ù', 'Ø',
    'Ö', '×',
];

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CompiledPatterns

/// Compiled regex state shared by every call.
struct SpecGlyphPatterns {
    l_cleanup: Vec<(Regex, String)>,
    l_swaps: Vec<(char, Regex)>,
}

static GLYPH_PATTERNS: OnceLock<SpecGlyphPatterns> = OnceLock::new();

fn derive_glyph_patterns() -> &'static SpecGlyphPatterns {
    GLYPH_PATTERNS.get_or_init(|| {
        // Patterns are built from escaped literals, so compilation cannot fail.
        let l_cleanup = TUP_CLEANUP_MARKERS
            .iter()
            .filter_map(|c_marker| {
                let c_literal = c_marker.to_string();
                Regex::new(&format!("{}+", regex::escape(&c_literal)))
                    .ok()
                    .map(|re| (re, c_literal))
            })
            .collect();
        let l_swaps = TUP_GLYPH_GROUP_RULES
            .iter()
            .filter_map(|rule| match rule {
                EnumGlyphGroupRule::SwapWithNext(c_marker) => {
                    Regex::new(&format!("{}(.)", regex::escape(&c_marker.to_string())))
                        .ok()
                        .map(|re| (*c_marker, re))
                }
                EnumGlyphGroupRule::Literal(..) => None,
            })
            .collect();
        SpecGlyphPatterns { l_cleanup, l_swaps }
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Passes

/// Collapse each run of a cleanup marker (`ÚÚÚ` -> `Ú`).
pub fn collapse_duplicate_markers(text: &str) -> String {
    let mut text_out = text.to_string();
    for (re, c_marker) in &derive_glyph_patterns().l_cleanup {
        if re.is_match(&text_out) {
            text_out = re
                .replace_all(&text_out, NoExpand(c_marker.as_str()))
                .into_owned();
        }
    }
    text_out
}

/// Apply [`TUP_GLYPH_GROUP_RULES`] in order.
pub fn apply_group_substitutions(text: &str) -> String {
    let patterns = derive_glyph_patterns();
    let mut text_out = text.to_string();
    for rule in &TUP_GLYPH_GROUP_RULES {
        match rule {
            EnumGlyphGroupRule::Literal(c_from, c_to) => {
                if text_out.contains(c_from) {
                    text_out = text_out.replace(c_from, c_to);
                }
            }
            EnumGlyphGroupRule::SwapWithNext(c_marker) => {
                let Some((_, re)) = patterns.l_swaps.iter().find(|(c, _)| c == c_marker) else {
                    continue;
                };
                let c_replacement = format!("${{1}}{c_marker}");
                text_out = re.replace_all(&text_out, c_replacement.as_str()).into_owned();
            }
        }
    }
    text_out
}

/// Map each remaining glyph through the single-glyph table.
pub fn map_single_glyphs(text: &str) -> String {
    let mut text_out = String::with_capacity(text.len() * 2);
    for ch in text.chars() {
        match MAP_SINGLE_GLYPH.get(&ch) {
            Some(c_mapped) => text_out.push_str(c_mapped),
            None => text_out.push(ch),
        }
    }
    text_out
}

/// Convert PNB-encoded text to Gurmukhi Unicode.
///
/// Deterministic and total: unmapped characters (ASCII, digits, text that is
/// already Unicode Gurmukhi) are copied through.
pub fn transliterate(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let text_clean = collapse_duplicate_markers(text);
    let text_grouped = apply_group_substitutions(&text_clean);
    map_single_glyphs(&text_grouped)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transliterate_reorders_sihari() {
        assert_eq!(transliterate("¨Ú¼Ø"), "\u{0A15}\u{0A24}\u{0A3F}\u{0A3E}");
    }

    #[test]
    fn test_transliterate_passes_unmapped_text_through() {
        assert_eq!(transliterate("Hello 123"), "Hello 123");
        assert_eq!(transliterate(""), "");
        let c_gurmukhi = "\u{0A15}\u{0A3F}\u{0A24}\u{0A3E}";
        assert_eq!(transliterate(c_gurmukhi), c_gurmukhi);
    }

    #[test]
    fn test_transliterate_is_deterministic() {
        let c_input = "ÓÖÒÞ ¤Ø Ì×";
        assert_eq!(transliterate(c_input), transliterate(c_input));
    }

    #[test]
    fn test_collapse_duplicate_markers_keeps_u_sign_runs() {
        assert_eq!(collapse_duplicate_markers("ÚÚÚ¨ØØ"), "Ú¨Ø");
        assert_eq!(collapse_duplicate_markers("ÝÝ"), "ÝÝ");
        let c_once = collapse_duplicate_markers("ÛÛ××");
        assert_eq!(collapse_duplicate_markers(&c_once), c_once);
    }

    #[test]
    fn test_repeated_sihari_maps_once() {
        assert_eq!(transliterate("ÚÚ¨"), "\u{0A15}\u{0A3F}");
    }

    #[test]
    fn test_group_rules_run_in_order() {
        // nukta pair beats the single glyphs
        assert_eq!(transliterate("ÓÖÒÞ"), "\u{0A36}\u{0A35}\u{0A42}");
        // tippi moves after the u sign before single mapping
        assert_eq!(transliterate("¼âÞ"), "\u{0A24}\u{0A42}\u{0A70}");
        assert_eq!(apply_group_substitutions("fab"), "afb");
    }

    #[test]
    fn test_single_glyph_table_resolves_reused_glyphs() {
        assert_eq!(map_single_glyphs("°"), "\u{0A1A}");
        assert_eq!(map_single_glyphs("¹"), "\u{0A21}\u{0A4D}\u{0A30}");
        assert_eq!(map_single_glyphs("Ö"), "\u{0A3C}");
    }

    fn is_gurmukhi(chr: char) -> bool {
        ('\u{0A00}'..='\u{0A7F}').contains(&chr)
    }

    #[test]
    fn test_nukta_forms_stay_in_gurmukhi_block() {
        for c_input in ["Ö", "ÓÖ", "ªÖ", "¬Ö", "³Ö", "ÆÖ", "ÐÖ", "²Ö", "¨Ö"] {
            let c_output = transliterate(c_input);
            assert!(!c_output.is_empty(), "{c_input}");
            assert!(c_output.chars().all(is_gurmukhi), "{c_input} -> {c_output:?}");
        }
        assert_eq!(transliterate("¨Ö"), "\u{0A15}\u{0A3C}");
    }

    #[test]
    fn test_every_mapped_output_is_gurmukhi() {
        for (chr, c_output) in MAP_SINGLE_GLYPH.entries() {
            assert!(c_output.chars().all(is_gurmukhi), "{chr} -> {c_output:?}");
        }
        for rule in TUP_GLYPH_GROUP_RULES {
            if let EnumGlyphGroupRule::Literal(c_from, c_to) = rule {
                assert!(c_to.chars().all(is_gurmukhi), "{c_from} -> {c_to:?}");
            }
        }
    }
}
