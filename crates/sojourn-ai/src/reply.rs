//! Extraction of place and activity type from a free-text model reply.
//!
//! The reply is read as an ordered segmentation `Place: .. Type: .. Reasoning: ..`.
//! Markers are matched case-insensitively and only after the previous marker,
//! so a stray "type:" inside the reasoning cannot shift the fields.

use sojourn_core::NONE_SENTINEL;

const PLACE: &str = "place:";
const TYPE: &str = "type:";
const REASONING: &str = "reasoning:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub place: String,
    pub activity_type: String,
}

impl ParsedReply {
    fn sentinel() -> Self {
        Self {
            place: NONE_SENTINEL.to_string(),
            activity_type: NONE_SENTINEL.to_string(),
        }
    }

    /// Both fields carry real values.
    pub fn is_complete(&self) -> bool {
        self.place != NONE_SENTINEL && self.activity_type != NONE_SENTINEL
    }
}

/// Never fails; missing fields come back as `"None"`.
pub fn parse_reply(reply: &str) -> ParsedReply {
    // ASCII lowercasing keeps byte offsets aligned with `reply`.
    let lower = reply.to_ascii_lowercase();

    let place_at = lower.find(PLACE);
    let type_from = place_at.map_or(0, |p| p + PLACE.len());
    let Some(type_at) = lower[type_from..].find(TYPE).map(|i| i + type_from) else {
        return ParsedReply::sentinel();
    };

    let place = match place_at {
        Some(p) => clean(&reply[p + PLACE.len()..type_at]),
        None => NONE_SENTINEL.to_string(),
    };

    let type_start = type_at + TYPE.len();
    let type_end = lower[type_start..]
        .find(REASONING)
        .map_or(reply.len(), |i| i + type_start);

    ParsedReply {
        place,
        activity_type: clean(&reply[type_start..type_end]),
    }
}

/// Strip whitespace and the markdown/quote decoration models like to add.
fn clean(field: &str) -> String {
    let cleaned = field
        .trim()
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '"' | '`' | '\'' | ','))
        .trim_end_matches('.')
        .trim();
    if cleaned.is_empty() {
        NONE_SENTINEL.to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_reply() {
        let parsed = parse_reply(
            "Place: Café du Soleil Type: Restaurant Reasoning: Lunch time and a restaurant 20m away.",
        );
        assert_eq!(parsed.place, "Café du Soleil");
        assert_eq!(parsed.activity_type, "Restaurant");
        assert!(parsed.is_complete());
    }

    #[test]
    fn multiline_markdown_reply() {
        let reply = "**Place:** Migros Plainpalais\n**Type:** Grocery shopping\n**Reasoning:** Many shops nearby.";
        let parsed = parse_reply(reply);
        assert_eq!(parsed.place, "Migros Plainpalais");
        assert_eq!(parsed.activity_type, "Grocery shopping");
    }

    #[test]
    fn markers_are_case_insensitive() {
        let parsed = parse_reply("PLACE: Gym TYPE: Sport REASONING: evening");
        assert_eq!(parsed.place, "Gym");
        assert_eq!(parsed.activity_type, "Sport");
    }

    #[test]
    fn missing_type_yields_sentinels() {
        let parsed = parse_reply("Place: Somewhere nice, I think.");
        assert_eq!(parsed, ParsedReply::sentinel());
        assert!(!parsed.is_complete());
    }

    #[test]
    fn missing_reasoning_takes_remainder() {
        let parsed = parse_reply("Place: Library Type: Studying");
        assert_eq!(parsed.place, "Library");
        assert_eq!(parsed.activity_type, "Studying");
    }

    #[test]
    fn missing_place_keeps_type() {
        let parsed = parse_reply("Type: Visiting a friend Reasoning: no POI nearby");
        assert_eq!(parsed.place, NONE_SENTINEL);
        assert_eq!(parsed.activity_type, "Visiting a friend");
    }

    #[test]
    fn type_inside_reasoning_is_ignored() {
        let parsed =
            parse_reply("Place: Bar Type: Nightlife Reasoning: this type: of place is busy at night");
        assert_eq!(parsed.activity_type, "Nightlife");
    }

    #[test]
    fn empty_fields_become_sentinels() {
        let parsed = parse_reply("Place: Type: Reasoning: nothing");
        assert_eq!(parsed, ParsedReply::sentinel());
    }

    #[test]
    fn garbage_never_panics() {
        for reply in ["", "type:", "Reasoning: Type: Place:", "ÄÖÜ place: é type: ß"] {
            let _ = parse_reply(reply);
        }
        let parsed = parse_reply("ÄÖÜ place: é type: ß");
        assert_eq!(parsed.place, "é");
        assert_eq!(parsed.activity_type, "ß");
    }
}
