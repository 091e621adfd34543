/// Multi-word junk phrases stripped before tokenization, while the label is
/// still underscore-joined.
const PHRASES: &[&str] = &["main_title", "us_des"];

/// Tokens that carry no title information on their own.
const NOISE: &[&str] = &[
    // format tags
    "widescreen",
    "fullscreen",
    "ws",
    "fs",
    "16x9",
    "ps",
    "anamorphic",
    // broadcast standards
    "ntsc",
    "pal",
    // bare media markers
    "dvd",
    "disc",
    "disk",
    "bluray",
    // filler
    "movie",
    "feature",
];

/// Normalize a raw disc volume label into a catalog search query.
///
/// Lowercases, turns underscores into spaces, strips disc-number markers
/// (`disc 1`, `d1`, `dvd2`), format tags, region/rating markers and filler
/// words, then collapses whitespace. Letters inside words are never touched,
/// so `Se7en` survives intact.
pub fn clean_disc_label(raw: &str) -> String {
    let mut label = raw.to_lowercase();
    for phrase in PHRASES {
        label = label.replace(phrase, " ");
    }
    let label = label.replace('_', " ");

    let tokens: Vec<&str> = label.split_whitespace().collect();
    let mut kept: Vec<&str> = Vec::with_capacity(tokens.len());
    let mut skip_next = false;

    for (i, token) in tokens.iter().enumerate() {
        if skip_next {
            skip_next = false;
            continue;
        }
        // "disc 1" / "rated pg": the marker consumes the token after it.
        if matches!(*token, "disc" | "disk" | "dvd" | "cd") && followed_by_number(&tokens, i) {
            skip_next = true;
            continue;
        }
        if *token == "rated" {
            skip_next = followed_by_rating(&tokens, i);
            continue;
        }
        if NOISE.contains(token) || is_disc_marker(token) || is_region_code(token) {
            continue;
        }
        kept.push(*token);
    }

    kept.join(" ")
}

fn followed_by_number(tokens: &[&str], i: usize) -> bool {
    tokens
        .get(i + 1)
        .map_or(false, |t| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()))
}

fn followed_by_rating(tokens: &[&str], i: usize) -> bool {
    tokens
        .get(i + 1)
        .map_or(false, |t| matches!(*t, "g" | "pg" | "pg13" | "r" | "nc17"))
}

/// `d1`, `dvd2`, `disc3`, `cd2` and the like: a media prefix with a trailing
/// number, joined into one token.
fn is_disc_marker(token: &str) -> bool {
    for prefix in ["disc", "disk", "dvd", "cd", "d"] {
        if let Some(rest) = token.strip_prefix(prefix) {
            if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
                return true;
            }
        }
    }
    false
}

/// DVD region codes `r1`..`r6`.
fn is_region_code(token: &str) -> bool {
    matches!(token, "r1" | "r2" | "r3" | "r4" | "r5" | "r6")
}
