use icu_normalizer::ComposingNormalizerBorrowed;
use icu_properties::props::{DefaultIgnorableCodePoint, GeneralCategory};
use icu_properties::{CodePointMapData, CodePointSetData};

/// Make untrusted generated text typeable on a plain keyboard: compatibility
/// normalization, keyboard punctuation, no line breaks or pictographs, single
/// spaces, and at most `max_chars` chars (cut at a word boundary when one is
/// reasonably close).
pub fn sanitize_sentence(raw: &str, max_chars: usize) -> String {
    let normalized = ComposingNormalizerBorrowed::new_nfkc().normalize(raw);

    let mut out = String::with_capacity(normalized.len());
    let mut pending_space = false;
    for ch in normalized.chars() {
        let mapped = match ch {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' | '`' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' | '\u{00AB}'
            | '\u{00BB}' => '"',
            '\u{2010}'..='\u{2015}' | '\u{2212}' => '-',
            c if c.is_whitespace() => ' ',
            c if is_non_text(c) => continue,
            c => c,
        };
        if mapped == ' ' {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(mapped);
    }

    clip(&out, max_chars)
}

/// Invisible format characters (soft hyphen, joiners, bidi marks, variation
/// selectors, tags) have no key that produces them.
fn is_invisible(ch: char) -> bool {
    CodePointMapData::<GeneralCategory>::new().get(ch) == GeneralCategory::Format
        || CodePointSetData::new::<DefaultIgnorableCodePoint>().contains(ch)
}

fn is_non_text(ch: char) -> bool {
    ch.is_control()
        || is_invisible(ch)
        || matches!(ch as u32,
            0x2190..=0x23FF       // arrows, math operators, technical
            | 0x2500..=0x27BF     // box drawing, shapes, dingbats
            | 0x2B00..=0x2BFF
            | 0xE000..=0xF8FF     // private use
            | 0xFFF0..=0xFFFF
            | 0x1F000..=0x1FAFF)  // emoji and pictographs
}

fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    let boundary = cut
        .rfind(' ')
        .filter(|&byte_idx| cut[..byte_idx].chars().count() >= max_chars / 2);
    match boundary {
        Some(byte_idx) => cut[..byte_idx].trim_end().to_string(),
        None => cut.trim_end().to_string(),
    }
}
