//! End-to-end runs of the pipeline with in-memory collaborators.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sojourn_ai::Pipeline;
use sojourn_core::{
    BoundingBox, Checkpoint, ClassificationStatus, GeoPoint, LanguageModel, LlmClassification,
    PipelineConfig, PoiNode, PoiSource, Purpose, StayPoint,
};

const HOME: GeoPoint = GeoPoint { lon: 6.1400, lat: 46.2000 };
const OFFICE: GeoPoint = GeoPoint { lon: 6.1600, lat: 46.2100 };
const CAFE: GeoPoint = GeoPoint { lon: 6.1800, lat: 46.2200 };

struct OneCafe;

#[async_trait]
impl PoiSource for OneCafe {
    async fn nodes_within(&self, bbox: &BoundingBox) -> anyhow::Result<Vec<PoiNode>> {
        let node = PoiNode {
            id: 1,
            point: GeoPoint::new(CAFE.lon + 0.0001, CAFE.lat),
            tags: [("name", "Café Remor"), ("amenity", "cafe")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        Ok(if bbox.contains(&node.point) { vec![node] } else { Vec::new() })
    }
}

/// Answers "Cafe" when the prompt mentions a cafe, otherwise a reply with no markers.
struct PromptEcho {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl LanguageModel for PromptEcho {
    fn model_name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if prompt.contains("Café Remor") {
            Ok("Place: Café Remor Type: Cafe Reasoning: it is next door".into())
        } else {
            Ok("No idea.".into())
        }
    }
}

#[derive(Default)]
struct Memory(Vec<Vec<LlmClassification>>);

impl Checkpoint for Memory {
    fn save(&mut self, records: &[LlmClassification]) -> anyhow::Result<()> {
        self.0.push(records.to_vec());
        Ok(())
    }
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    // April 2024 starts on a Monday.
    Utc.with_ymd_and_hms(2024, 4, day, hour, 0, 0).unwrap()
}

/// Two weeks of nights at home and weekday office hours, plus two cafe visits
/// and one stay far away from everything.
fn fortnight() -> Vec<StayPoint> {
    let mut stays = Vec::new();
    let mut id = 0;
    let mut push = |start: DateTime<Utc>, hours: i64, point: GeoPoint| {
        id += 1;
        stays.push(StayPoint::new(id, start, start + Duration::hours(hours), point));
    };
    for day in 1..=12 {
        push(at(day, 21), 10, HOME);
        if ![6, 7].contains(&day) {
            push(at(day, 9), 8, OFFICE);
        }
    }
    push(at(6, 12), 1, CAFE);
    push(at(7, 12), 1, CAFE);
    push(at(13, 15), 2, GeoPoint::new(7.0, 46.5));
    stays
}

#[tokio::test]
async fn full_run_labels_home_work_and_activities() {
    let pipeline = Pipeline::new(PipelineConfig::default());
    let model = PromptEcho {
        prompts: Mutex::new(Vec::new()),
    };
    let mut checkpoint = Memory::default();

    let outcome = pipeline
        .run(fortnight(), &OneCafe, &model, &mut checkpoint, Vec::new())
        .await
        .unwrap();

    assert_eq!(outcome.counts.home, 12);
    assert_eq!(outcome.counts.work, 10);
    assert_eq!(outcome.counts.activities.get("Cafe"), Some(&2));
    assert_eq!(outcome.counts.unlabelled, 1);

    // Only the three unresolved stays reach the model.
    assert_eq!(model.prompts.lock().unwrap().len(), 3);
    assert_eq!(outcome.classifications.len(), 3);
    assert_eq!(checkpoint.0.iter().map(Vec::len).collect::<Vec<_>>(), [1, 2, 3]);

    let far = outcome.classifications.last().unwrap();
    assert_eq!(far.status, ClassificationStatus::Unparseable);
    assert_eq!(far.poi_count, 0);

    let homes: Vec<_> = outcome
        .sites
        .iter()
        .filter(|s| s.purpose == sojourn_ai::HomeWork::Home)
        .collect();
    assert_eq!(homes.len(), 1);
    assert!(homes[0].center.distance_m(&HOME) < 1.0);
}

#[tokio::test]
async fn resumed_run_skips_settled_stays() {
    let pipeline = Pipeline::new(PipelineConfig::default());
    let first = PromptEcho {
        prompts: Mutex::new(Vec::new()),
    };
    let mut checkpoint = Memory::default();
    let outcome = pipeline
        .run(fortnight(), &OneCafe, &first, &mut checkpoint, Vec::new())
        .await
        .unwrap();

    let second = PromptEcho {
        prompts: Mutex::new(Vec::new()),
    };
    let resumed = pipeline
        .run(
            fortnight(),
            &OneCafe,
            &second,
            &mut Memory::default(),
            outcome.classifications.clone(),
        )
        .await
        .unwrap();

    assert!(second.prompts.lock().unwrap().is_empty());
    assert_eq!(resumed.stays, outcome.stays);
}

#[test]
fn frequency_stage_alone() {
    let stage = Pipeline::new(PipelineConfig::default()).home_work(fortnight());
    assert_eq!(stage.locations.len(), 4);
    assert_eq!(stage.sites.len(), 2);
    assert_eq!(stage.unresolved().len(), 3);
    assert!(
        stage
            .stays
            .iter()
            .filter(|s| s.point == OFFICE)
            .all(|s| s.purpose == Some(Purpose::Work))
    );
}
