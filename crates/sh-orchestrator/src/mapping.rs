//! Translation between the persisted conversation model
//! (`sh_domain::session::{Turn, Part}`) and the LLM wire model
//! (`sh_domain::tool::{Message, ContentPart}`).
//!
//! The two shapes diverge on purpose: `Part::FunctionCall` /
//! `Part::FunctionResponse` are paired by position (spec §3's
//! "positional alignment" invariant) and carry no call id, while every
//! provider wire format needs a `tool_use`/`tool_result` id pair. This
//! module synthesizes those ids when replaying stored history and
//! discards them again on the way back — they never leak into
//! persistence.

use sh_domain::session::{Part, Turn, TurnRole};
use sh_domain::tool::{ContentPart, Message, MessageContent, Role};

/// Build the message list a fresh LLM call needs: a system prompt
/// followed by every prior turn translated to wire format.
pub fn history_to_messages(system_prompt: &str, turns: &[Turn]) -> Vec<Message> {
    let mut messages = vec![Message::system(system_prompt)];
    let mut pending_call_ids: Vec<String> = Vec::new();
    let mut synth_seq = 0usize;

    for turn in turns {
        match turn.role {
            TurnRole::User => {
                if let Some(msg) = user_turn_to_message(turn, &pending_call_ids) {
                    messages.push(msg);
                }
                pending_call_ids.clear();
            }
            TurnRole::Model => {
                let (msg, call_ids) = model_turn_to_message(turn, &mut synth_seq);
                messages.push(msg);
                pending_call_ids = call_ids;
            }
        }
    }
    messages
}

fn model_turn_to_message(turn: &Turn, synth_seq: &mut usize) -> (Message, Vec<String>) {
    let mut parts = Vec::new();
    let mut call_ids = Vec::new();
    for part in &turn.parts {
        match part {
            Part::Text { text } => parts.push(ContentPart::Text { text: text.clone() }),
            Part::Thought { .. } => {} // never replayed to the wire; history is already trimmed by the time this runs
            Part::FunctionCall { name, args } => {
                let id = format!("call_{}", *synth_seq);
                *synth_seq += 1;
                call_ids.push(id.clone());
                parts.push(ContentPart::ToolUse { id, name: name.clone(), input: args.clone() });
            }
            Part::FunctionResponse { .. } => {} // only appears in user turns
        }
    }
    if parts.is_empty() {
        parts.push(ContentPart::Text { text: String::new() });
    }
    (Message { role: Role::Assistant, content: MessageContent::Parts(parts) }, call_ids)
}

fn user_turn_to_message(turn: &Turn, call_ids: &[String]) -> Option<Message> {
    let responses: Vec<&Part> = turn
        .parts
        .iter()
        .filter(|p| matches!(p, Part::FunctionResponse { .. }))
        .collect();

    if responses.is_empty() {
        let text = turn
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        return Some(Message::user(text));
    }

    let parts: Vec<ContentPart> = responses
        .iter()
        .zip(call_ids.iter())
        .map(|(part, id)| {
            let Part::FunctionResponse { payload, .. } = part else {
                unreachable!("filtered above")
            };
            let is_error = payload.get("error").is_some();
            ContentPart::ToolResult {
                tool_use_id: id.clone(),
                content: payload.to_string(),
                is_error,
            }
        })
        .collect();

    Some(Message { role: Role::Tool, content: MessageContent::Parts(parts) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_user_text_round_trips_to_a_user_message() {
        let turns = vec![Turn::user_text("hello")];
        let messages = history_to_messages("sys", &turns);
        assert_eq!(messages.len(), 2); // system + user
        assert_eq!(messages[1].content.extract_all_text(), "hello");
    }

    #[test]
    fn function_call_then_response_pair_by_position_not_id() {
        let turns = vec![
            Turn {
                role: TurnRole::Model,
                parts: vec![
                    Part::Thought { text: "thinking".into() },
                    Part::FunctionCall { name: "get_profile".into(), args: serde_json::json!({"username": "brand"}) },
                ],
            },
            Turn {
                role: TurnRole::User,
                parts: vec![Part::FunctionResponse {
                    name: "get_profile".into(),
                    payload: serde_json::json!({"followers": 100}),
                }],
            },
        ];
        let messages = history_to_messages("sys", &turns);
        assert_eq!(messages.len(), 3);
        let MessageContent::Parts(assistant_parts) = &messages[1].content else { panic!("expected parts") };
        assert_eq!(assistant_parts.len(), 1); // thought dropped
        let ContentPart::ToolUse { id, .. } = &assistant_parts[0] else { panic!("expected tool_use") };

        let MessageContent::Parts(tool_parts) = &messages[2].content else { panic!("expected parts") };
        let ContentPart::ToolResult { tool_use_id, is_error, .. } = &tool_parts[0] else { panic!("expected tool_result") };
        assert_eq!(tool_use_id, id);
        assert!(!is_error);
    }

    #[test]
    fn error_payload_marks_tool_result_as_error() {
        let turns = vec![
            Turn {
                role: TurnRole::Model,
                parts: vec![Part::FunctionCall { name: "get_profile".into(), args: serde_json::json!({}) }],
            },
            Turn {
                role: TurnRole::User,
                parts: vec![Part::FunctionResponse { name: "get_profile".into(), payload: serde_json::json!({"error": "boom"}) }],
            },
        ];
        let messages = history_to_messages("sys", &turns);
        let MessageContent::Parts(tool_parts) = &messages[2].content else { panic!("expected parts") };
        let ContentPart::ToolResult { is_error, .. } = &tool_parts[0] else { panic!("expected tool_result") };
        assert!(is_error);
    }
}
