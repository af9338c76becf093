//! Algebraic move notation to speakable words.
//!
//! `Nf3` becomes `knight f 3`, `exd5` becomes `E takes D 5`. Castling is
//! matched as a whole string first. Everything else is spelled character by
//! character and then passed through a fixed list of touch-ups for sequences
//! speech engines misread.

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

/// Maps a piece letter to its spoken role.
pub trait RoleLookup: Send + Sync {
    /// Role name for `piece`, or `None` when it is not a piece letter.
    fn role(&self, piece: char) -> Option<&'static str>;
}

/// Standard chess pieces, either case.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChessRoles;

impl RoleLookup for ChessRoles {
    fn role(&self, piece: char) -> Option<&'static str> {
        match piece.to_ascii_lowercase() {
            'p' => Some("pawn"),
            'n' => Some("knight"),
            'b' => Some("bishop"),
            'r' => Some("rook"),
            'q' => Some("queen"),
            'k' => Some("king"),
            _ => None,
        }
    }
}

const CASTLES: [(&str, &str); 6] = [
    ("O-O", "short castle"),
    ("O-O-O", "long castle"),
    ("O-O+", "short castle check"),
    ("O-O-O+", "long castle check"),
    ("O-O#", "short castle checkmate"),
    ("O-O-O#", "long castle checkmate"),
];

/// Applied in order; each replaces its first match only.
const TOUCH_UPS: [(&str, &str); 5] = [
    // "A 3" and "A takes" are read as the article
    (r"^A ", "A, "),
    // "1 E 5" is read as scientific notation
    (r"(\d) E (\d)", "${1},E ${2}"),
    // Capital C and F after a number are read as temperature units
    (r"C ", "c "),
    (r"F ", "f "),
    // "5 H 3" is read as hours
    (r"(\d) H (\d)", "${1}H${2}"),
];

struct TouchUp {
    pattern: Regex,
    replacement: &'static str,
}

fn touch_ups() -> &'static [TouchUp] {
    static RULES: OnceLock<Vec<TouchUp>> = OnceLock::new();
    RULES.get_or_init(|| {
        TOUCH_UPS
            .iter()
            .filter_map(|&(pattern, replacement)| match Regex::new(pattern) {
                Ok(pattern) => Some(TouchUp { pattern, replacement }),
                Err(e) => {
                    warn!("Skipping touch-up rule '{}': {}", pattern, e);
                    None
                },
            })
            .collect()
    })
}

fn spell(c: char, roles: &dyn RoleLookup) -> String {
    match c {
        'x' => "takes".to_string(),
        '+' => "check".to_string(),
        '#' => "checkmate".to_string(),
        '=' => "promotes to".to_string(),
        '@' => "at".to_string(),
        '1'..='8' => c.to_string(),
        'a'..='h' => c.to_ascii_uppercase().to_string(),
        _ => roles.role(c).map_or_else(|| c.to_string(), str::to_string),
    }
}

/// Translates SAN into words for text-to-speech.
#[must_use]
pub fn san_to_words(san: &str, roles: &dyn RoleLookup) -> String {
    if let Some((_, words)) = CASTLES.iter().find(|(notation, _)| *notation == san) {
        return (*words).to_string();
    }

    let spelled = san.chars().map(|c| spell(c, roles)).collect::<Vec<_>>().join(" ");

    touch_ups().iter().fold(spelled, |text, rule| {
        rule.pattern.replace(&text, rule.replacement).into_owned()
    })
}
