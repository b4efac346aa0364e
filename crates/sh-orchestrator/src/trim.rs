//! Post-turn history trimming (spec §4.C8): a pure, synchronous,
//! LLM-free transform applied to the turns a run added before they are
//! handed to the session store for persistence. Deliberately not the
//! teacher's `compact.rs` summarization — that drops whole turns via an
//! extra model call, which this spec's trimming rule does not call for;
//! see DESIGN.md.

use serde_json::Value;

use sh_domain::session::{Part, Turn};

const ARRAY_TRIM_THRESHOLD: usize = 3;
const RESULTS_KEEP: usize = 5;

pub fn trim_turns(turns: Vec<Turn>) -> Vec<Turn> {
    turns
        .into_iter()
        .map(|turn| Turn {
            role: turn.role,
            parts: turn
                .parts
                .into_iter()
                .filter(|p| !p.is_thought())
                .map(trim_part)
                .collect(),
        })
        .collect()
}

fn trim_part(part: Part) -> Part {
    match part {
        Part::FunctionResponse { name, payload } => {
            Part::FunctionResponse { name, payload: trim_payload(payload) }
        }
        other => other,
    }
}

fn trim_payload(mut payload: Value) -> Value {
    let Some(obj) = payload.as_object_mut() else {
        return payload;
    };

    for field in ["posts", "reels"] {
        if let Some(Value::Array(items)) = obj.get(field) {
            if items.len() > ARRAY_TRIM_THRESHOLD {
                let n = items.len();
                obj.insert(
                    field.to_string(),
                    Value::String(format!("[{n} {field} — trimmed for context]")),
                );
            }
        }
    }

    if let Some(Value::Array(items)) = obj.get("results").cloned() {
        if items.len() > RESULTS_KEEP {
            obj.insert("results".into(), Value::Array(items.into_iter().take(RESULTS_KEEP).collect()));
            obj.insert("_trimmed".into(), Value::Bool(true));
        }
    }

    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use sh_domain::session::TurnRole;

    #[test]
    fn thought_parts_are_dropped() {
        let turns = vec![Turn {
            role: TurnRole::Model,
            parts: vec![
                Part::Thought { text: "secret reasoning".into() },
                Part::Text { text: "visible".into() },
            ],
        }];
        let trimmed = trim_turns(turns);
        assert_eq!(trimmed[0].parts.len(), 1);
        assert!(matches!(trimmed[0].parts[0], Part::Text { .. }));
    }

    #[test]
    fn large_posts_array_is_replaced_with_a_summary_string() {
        let payload = serde_json::json!({
            "username": "brand",
            "posts": (0..10).map(|i| serde_json::json!({"id": i})).collect::<Vec<_>>(),
            "totalFetched": 10,
        });
        let turns = vec![Turn {
            role: TurnRole::User,
            parts: vec![Part::FunctionResponse { name: "get_posts".into(), payload }],
        }];
        let trimmed = trim_turns(turns);
        let Part::FunctionResponse { payload, .. } = &trimmed[0].parts[0] else { panic!() };
        assert_eq!(payload["posts"], "[10 posts — trimmed for context]");
        assert_eq!(payload["totalFetched"], 10);
    }

    #[test]
    fn small_posts_array_passes_through_untouched() {
        let payload = serde_json::json!({ "posts": [{"id": 1}, {"id": 2}] });
        let turns = vec![Turn {
            role: TurnRole::User,
            parts: vec![Part::FunctionResponse { name: "get_posts".into(), payload }],
        }];
        let trimmed = trim_turns(turns);
        let Part::FunctionResponse { payload, .. } = &trimmed[0].parts[0] else { panic!() };
        assert_eq!(payload["posts"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn large_results_array_is_truncated_and_flagged() {
        let payload = serde_json::json!({ "results": (0..8).collect::<Vec<i32>>() });
        let turns = vec![Turn {
            role: TurnRole::User,
            parts: vec![Part::FunctionResponse { name: "rank_influencers".into(), payload }],
        }];
        let trimmed = trim_turns(turns);
        let Part::FunctionResponse { payload, .. } = &trimmed[0].parts[0] else { panic!() };
        assert_eq!(payload["results"].as_array().unwrap().len(), 5);
        assert_eq!(payload["_trimmed"], true);
    }
}
