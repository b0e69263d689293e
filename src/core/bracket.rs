/// Bracket weighting — `{tag}` to emphasize, `[tag]` to de-emphasize.

use rand::rngs::StdRng;
use rand::Rng;

/// Wrap `token` in `level` braces (positive) or brackets (negative).
pub fn wrap(token: &str, level: i32) -> String {
    let depth = level.unsigned_abs() as usize;
    let (open, close) = match level.signum() {
        1 => ("{", "}"),
        -1 => ("[", "]"),
        _ => return token.to_string(),
    };
    format!("{}{}{}", open.repeat(depth), token, close.repeat(depth))
}

/// Draw a level uniformly from `min..=max`. A fixed range draws nothing.
pub fn roll_level(min: i32, max: i32, rng: &mut StdRng) -> i32 {
    if min >= max {
        min
    } else {
        rng.gen_range(min..=max)
    }
}

/// Apply one rolled level to every token of a group's selection.
pub fn apply_brackets(tokens: Vec<String>, min: i32, max: i32, rng: &mut StdRng) -> Vec<String> {
    if tokens.is_empty() || (min == 0 && max == 0) {
        return tokens;
    }
    let level = roll_level(min, max, rng);
    if level == 0 {
        return tokens;
    }
    tokens.iter().map(|t| wrap(t, level)).collect()
}

/// The bare tag inside any bracket weighting.
pub fn strip_brackets(token: &str) -> &str {
    token.trim_matches(|c| matches!(c, '{' | '}' | '[' | ']'))
}
