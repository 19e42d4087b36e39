use crate::config::{NO_STYLE, QUALITY_BOOST, style_suffix};

/// Appends the style preset text and, optionally, the fixed quality suffix to
/// a user prompt. Unknown styles leave the prompt as typed.
pub fn enhance_prompt(prompt: &str, style: &str, quality_boost: bool) -> String {
    let mut enhanced = prompt.trim().to_string();

    if style != NO_STYLE {
        if let Some(suffix) = style_suffix(style).filter(|suffix| !suffix.is_empty()) {
            enhanced = format!("{enhanced}, {suffix}");
        }
    }

    if quality_boost {
        enhanced = format!("{enhanced}, {QUALITY_BOOST}");
    }

    enhanced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::STYLE_PRESETS;

    #[test]
    fn every_named_style_appends_its_suffix() {
        for (style, suffix) in STYLE_PRESETS.iter().filter(|(name, _)| *name != NO_STYLE) {
            let enhanced = enhance_prompt("a lighthouse", style, false);
            assert_eq!(enhanced, format!("a lighthouse, {suffix}"), "style {style}");
        }
    }

    #[test]
    fn none_style_keeps_prompt() {
        assert_eq!(enhance_prompt("a lighthouse", NO_STYLE, false), "a lighthouse");
        assert_eq!(
            enhance_prompt("a lighthouse", NO_STYLE, true),
            "a lighthouse, high quality, detailed, professional, sharp focus"
        );
    }

    #[test]
    fn unknown_style_is_ignored() {
        assert_eq!(enhance_prompt("  a lighthouse ", "Watercolor", false), "a lighthouse");
        assert_eq!(enhance_prompt("a lighthouse", "", false), "a lighthouse");
    }

    #[test]
    fn photorealistic_fox() {
        assert_eq!(
            enhance_prompt("a red fox", "Photorealistic", true),
            "a red fox, ultra-realistic, high-definition, professional photography, \
             sharp details, high quality, detailed, professional, sharp focus"
        );
    }
}
