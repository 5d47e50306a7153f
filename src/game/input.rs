use super::constants::{MAX_GLYPH_CODEPOINTS, MAX_PLAYER_NAME_LENGTH};
use super::math::{clamp, normalize};
use super::types::Vec2;

/// Re-normalizes an inbound direction vector. Rejects non-finite components;
/// a zero vector is valid and means "stop accelerating".
pub fn parse_input_vector(x: f64, y: f64) -> Option<Vec2> {
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    let n = normalize(Vec2 { x, y });
    Some(Vec2 {
        x: clamp(n.x, -1.0, 1.0),
        y: clamp(n.y, -1.0, 1.0),
    })
}

pub fn sanitize_player_name(name: &str, fallback: &str) -> String {
    let cleaned = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return fallback.to_string();
    }
    cleaned.chars().take(MAX_PLAYER_NAME_LENGTH).collect()
}

pub fn sanitize_glyph(glyph: &str, fallback: &str) -> String {
    let trimmed = glyph.trim();
    if trimmed.is_empty() {
        return fallback.to_string();
    }
    trimmed.chars().take(MAX_GLYPH_CODEPOINTS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_finite_components() {
        assert!(parse_input_vector(f64::NAN, 0.0).is_none());
        assert!(parse_input_vector(0.0, f64::INFINITY).is_none());
    }

    #[test]
    fn normalizes_to_unit_length() {
        let v = parse_input_vector(10.0, 0.0).unwrap();
        assert!((v.x - 1.0).abs() < 1e-12);
        assert_eq!(v.y, 0.0);
    }

    #[test]
    fn zero_vector_is_accepted() {
        let v = parse_input_vector(0.0, 0.0).unwrap();
        assert_eq!(v, Vec2::ZERO);
    }

    #[test]
    fn name_collapses_whitespace_and_truncates() {
        assert_eq!(sanitize_player_name("  a   b  ", "Player"), "a b");
        assert_eq!(sanitize_player_name("", "Player"), "Player");
        let long = "x".repeat(100);
        assert_eq!(sanitize_player_name(&long, "Player").chars().count(), MAX_PLAYER_NAME_LENGTH);
    }

    #[test]
    fn glyph_limited_to_two_codepoints() {
        assert_eq!(sanitize_glyph("abc", "?"), "ab");
        assert_eq!(sanitize_glyph("   ", "?"), "?");
    }
}
