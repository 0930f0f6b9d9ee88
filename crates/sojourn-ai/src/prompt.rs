//! Prompt construction for the POI-grounded activity classifier.

use chrono::{FixedOffset, Offset, Utc};
use sojourn_core::{ActivityParams, CandidatePoi, StayPoint};

/// Task description and classification heuristics. The stay description
/// follows directly after the final colon.
pub const TASK_PREAMBLE: &str = "\
You are a system that finds out which places a person visited. We only have the raw location \
data of this person, meaning longitude, latitude and start and end time of a stay. We want to \
know what exactly the person did there. To find out, you are given a list of the closest points \
of interest (POIs) from OpenStreetMap, with their name and some additional information. When \
classifying, please take the following into account: \
1. If there is no POI nearby, the person was probably visiting a friend or something similar. \
2. If there are many shopping POIs nearby, it might be a shopping mall. \
3. At typical lunch and dinner times (lunch: 12:00-14:00, dinner: 18:00-21:00), a visit to a \
restaurant or cafe is more likely. \
4. Activities during night hours are most likely stays at a hotel or sleeping at a friend's \
place. Home and work locations were already filtered out. \
Here is the data for the stay point of the person: ";

/// Requests exactly the three fields the reply parser extracts.
pub const OUTPUT_FORMAT: &str = "\n\
What place did the person visit or what activity did they do? \
Please answer with \"Place: <output> Type: <output> Reasoning: <reasoning>\"";

const NO_POIS: &str = "No OpenStreetMap points of interest were found nearby.";

/// Where and when the stay happened, rendered in local time.
pub fn describe_stay(stay: &StayPoint, offset: FixedOffset) -> String {
    let start = stay.started_at.with_timezone(&offset);
    let end = stay.finished_at.with_timezone(&offset);

    let end_fmt = if end.date_naive() == start.date_naive() {
        end.format("%I:%M %p").to_string()
    } else {
        end.format("%Y/%m/%d %I:%M %p").to_string()
    };

    let mut text = format!(
        "Detected at coordinates ({:.3}, {:.3}) on {}, {} to {}.",
        stay.point.lon,
        stay.point.lat,
        start.format("%A"),
        start.format("%Y/%m/%d from %I:%M %p"),
        end_fmt,
    );

    if let Some(label) = &stay.prior_label {
        text.push_str(&format!(
            " This point was already labelled as \"{label}\" (label not reliable!)."
        ));
    }
    text
}

/// One line per candidate. Candidates must already be ranked and capped.
pub fn render_pois(pois: &[CandidatePoi], skip_unnamed: bool) -> String {
    if pois.is_empty() {
        return NO_POIS.to_string();
    }

    let lines: Vec<String> = pois
        .iter()
        .map(|poi| {
            let mut attrs = vec![format!("type: {}", poi.category)];
            if !poi.details.is_empty() {
                attrs.push(format!("details: {}", poi.details));
            }
            if poi.has_known_hours() {
                attrs.push(format!("opening hours: {}", poi.opening_hours));
            }
            let distance = format!("with distance {}m", poi.distance_m.round() as i64);

            if skip_unnamed && !poi.is_named() {
                format!("- ({}) {distance}", attrs.join(", "))
            } else {
                format!("- {} ({}) {distance}", poi.name, attrs.join(", "))
            }
        })
        .collect();

    format!("Nearby OSM points of interest are:\n{}", lines.join("\n"))
}

/// Full prompt: preamble, stay description, POI context and output format.
pub fn build_prompt(stay: &StayPoint, pois: &[CandidatePoi], params: &ActivityParams) -> String {
    let offset = local_offset(params);
    format!(
        "{TASK_PREAMBLE}{}\n{}{OUTPUT_FORMAT}",
        describe_stay(stay, offset),
        render_pois(pois, params.skip_unnamed),
    )
}

/// Configured offset; UTC when the configured value is out of range.
pub fn local_offset(params: &ActivityParams) -> FixedOffset {
    FixedOffset::east_opt(params.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
}
