//! HTML entity and backslash-escape decoding for raw text fragments.
use std::borrow::Cow;
use std::sync::LazyLock;

use regex_lite::Captures;
use regex_lite::Regex;

// Group 1: escaped ASCII punctuation. Group 2: entity body between `&` and `;`.
static PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"\\([!-/:-@\[-`{-~])|&(#[xX][0-9a-fA-F]{1,6}|#[0-9]{1,7}|[A-Za-z][A-Za-z0-9]{1,31});",
    )
    .ok()
});

/// Decodes entities and escapes in `text` according to the two independent switches.
///
/// Matches that are switched off, and entities that are not recognized, are left as written.
pub fn decode(text: &str, process_entities: bool, process_escapes: bool) -> String {
    decode_cow(text, process_entities, process_escapes).into_owned()
}

pub(crate) fn decode_cow(text: &str, process_entities: bool, process_escapes: bool) -> Cow<'_, str> {
    if !(process_entities || process_escapes) || !(text.contains('&') || text.contains('\\')) {
        return Cow::Borrowed(text);
    }
    let Some(re) = PATTERN.as_ref() else {
        return Cow::Borrowed(text);
    };
    re.replace_all(text, |caps: &Captures<'_>| {
        let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        if let Some(escaped) = caps.get(1) {
            return if process_escapes {
                escaped.as_str().to_string()
            } else {
                whole.to_string()
            };
        }
        let body = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        if !process_entities {
            return whole.to_string();
        }
        match decode_entity(body) {
            Some(decoded) => decoded,
            None => whole.to_string(),
        }
    })
}

fn decode_entity(body: &str) -> Option<String> {
    if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        let ch = match code {
            0 => char::REPLACEMENT_CHARACTER,
            c => char::from_u32(c).unwrap_or(char::REPLACEMENT_CHARACTER),
        };
        return Some(ch.to_string());
    }
    named_entity(body).map(str::to_string)
}

fn named_entity(name: &str) -> Option<&'static str> {
    let s = match name {
        "quot" => "\"",
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "iexcl" => "¡",
        "cent" => "¢",
        "pound" => "£",
        "curren" => "¤",
        "yen" => "¥",
        "brvbar" => "¦",
        "sect" => "§",
        "uml" => "¨",
        "copy" => "©",
        "ordf" => "ª",
        "laquo" => "«",
        "not" => "¬",
        "shy" => "\u{ad}",
        "reg" => "®",
        "macr" => "¯",
        "deg" => "°",
        "plusmn" => "±",
        "sup2" => "²",
        "sup3" => "³",
        "acute" => "´",
        "micro" => "µ",
        "para" => "¶",
        "middot" => "·",
        "cedil" => "¸",
        "sup1" => "¹",
        "ordm" => "º",
        "raquo" => "»",
        "frac14" => "¼",
        "frac12" => "½",
        "frac34" => "¾",
        "iquest" => "¿",
        "Agrave" => "À",
        "Aacute" => "Á",
        "Acirc" => "Â",
        "Atilde" => "Ã",
        "Auml" => "Ä",
        "Aring" => "Å",
        "AElig" => "Æ",
        "Ccedil" => "Ç",
        "Egrave" => "È",
        "Eacute" => "É",
        "Ntilde" => "Ñ",
        "Ouml" => "Ö",
        "times" => "×",
        "Oslash" => "Ø",
        "Uuml" => "Ü",
        "szlig" => "ß",
        "agrave" => "à",
        "aacute" => "á",
        "acirc" => "â",
        "atilde" => "ã",
        "auml" => "ä",
        "aring" => "å",
        "aelig" => "æ",
        "ccedil" => "ç",
        "egrave" => "è",
        "eacute" => "é",
        "ecirc" => "ê",
        "euml" => "ë",
        "iacute" => "í",
        "ntilde" => "ñ",
        "oacute" => "ó",
        "ouml" => "ö",
        "divide" => "÷",
        "oslash" => "ø",
        "uacute" => "ú",
        "uuml" => "ü",
        "Alpha" => "Α",
        "Beta" => "Β",
        "Gamma" => "Γ",
        "Delta" => "Δ",
        "Omega" => "Ω",
        "alpha" => "α",
        "beta" => "β",
        "gamma" => "γ",
        "delta" => "δ",
        "epsilon" => "ε",
        "lambda" => "λ",
        "mu" => "μ",
        "pi" => "π",
        "sigma" => "σ",
        "omega" => "ω",
        "ensp" => "\u{2002}",
        "emsp" => "\u{2003}",
        "thinsp" => "\u{2009}",
        "zwnj" => "\u{200c}",
        "zwj" => "\u{200d}",
        "ndash" => "–",
        "mdash" => "—",
        "lsquo" => "‘",
        "rsquo" => "’",
        "sbquo" => "‚",
        "ldquo" => "“",
        "rdquo" => "”",
        "bdquo" => "„",
        "dagger" => "†",
        "Dagger" => "‡",
        "bull" => "•",
        "hellip" => "…",
        "permil" => "‰",
        "prime" => "′",
        "Prime" => "″",
        "lsaquo" => "‹",
        "rsaquo" => "›",
        "euro" => "€",
        "trade" => "™",
        "larr" => "←",
        "uarr" => "↑",
        "rarr" => "→",
        "darr" => "↓",
        "harr" => "↔",
        "lArr" => "⇐",
        "rArr" => "⇒",
        "hArr" => "⇔",
        "forall" => "∀",
        "part" => "∂",
        "exist" => "∃",
        "empty" => "∅",
        "nabla" => "∇",
        "isin" => "∈",
        "notin" => "∉",
        "sum" => "∑",
        "minus" => "−",
        "infin" => "∞",
        "and" => "∧",
        "or" => "∨",
        "cap" => "∩",
        "cup" => "∪",
        "ne" => "≠",
        "equiv" => "≡",
        "le" => "≤",
        "ge" => "≥",
        "loz" => "◊",
        "spades" => "♠",
        "clubs" => "♣",
        "hearts" => "♥",
        "diams" => "♦",
        "check" => "✓",
        "cross" => "✗",
        _ => return None,
    };
    Some(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pattern_compiles() {
        assert!(PATTERN.is_some());
    }

    #[test]
    fn decodes_named_entities() {
        assert_eq!(decode("&amp;", true, false), "&");
        assert_eq!(decode("a &lt;b&gt; &quot;c&quot;", true, false), "a <b> \"c\"");
        assert_eq!(decode("&copy; 2024", true, true), "© 2024");
    }

    #[test]
    fn decodes_numeric_entities() {
        assert_eq!(decode("&#65;&#x42;&#X43;", true, false), "ABC");
        assert_eq!(decode("&#0;", true, false), "\u{fffd}");
        assert_eq!(decode("&#xD800;", true, false), "\u{fffd}");
    }

    #[test]
    fn decodes_escapes() {
        assert_eq!(decode("\\*", false, true), "*");
        assert_eq!(decode("\\[x\\]", false, true), "[x]");
        assert_eq!(decode("\\a", true, true), "\\a");
    }

    #[test]
    fn unknown_entity_is_untouched() {
        assert_eq!(decode("&unknown;", true, true), "&unknown;");
        assert_eq!(decode("AT&T", true, true), "AT&T");
    }

    #[test]
    fn disabled_switches_keep_source() {
        assert_eq!(decode("&amp; \\*", false, false), "&amp; \\*");
        assert_eq!(decode("&amp; \\*", false, true), "&amp; *");
        assert_eq!(decode("&amp; \\*", true, false), "& \\*");
    }

    #[test]
    fn entity_decoding_ignores_escape_switch_without_backslashes() {
        for text in ["&amp;&lt;", "x &hellip; y", "&mdash;&nbsp;"] {
            assert_eq!(decode(text, true, false), decode(text, true, true));
        }
    }

    #[test]
    fn escaped_ampersand_is_not_an_entity() {
        assert_eq!(decode("\\&amp;", true, true), "&amp;");
    }
}
