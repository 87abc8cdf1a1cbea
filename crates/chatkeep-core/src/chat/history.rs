//! Loading stored history back into model context.

use chatkeep_types::llm::Turn;
use chatkeep_types::session::decode_history;
use tracing::warn;

/// Decode stored history and bound it to `max_len` turns.
///
/// Undecodable history degrades to an empty conversation instead of failing
/// the turn.
pub fn load_history(json: &str, max_len: usize) -> Vec<Turn> {
    let turns = match decode_history(json) {
        Ok(turns) => turns,
        Err(e) => {
            warn!(error = %e, bytes = json.len(), "Stored history is unreadable, starting from empty history");
            Vec::new()
        }
    };
    truncate_history(turns, max_len)
}

/// Keep at most the last `max_len` turns, starting at a user-initiated turn.
///
/// After slicing, leading turns that are not user-initiated (model answers,
/// function results) are dropped so the context never opens mid-exchange.
pub fn truncate_history(mut turns: Vec<Turn>, max_len: usize) -> Vec<Turn> {
    if turns.len() > max_len {
        let excess = turns.len() - max_len;
        turns.drain(..excess);
    }

    let start = turns
        .iter()
        .position(Turn::is_user_initiated)
        .unwrap_or(turns.len());
    turns.drain(..start);
    turns
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatkeep_types::llm::{FunctionResponse, Part, TurnRole};
    use chatkeep_types::session::encode_history;

    fn roles(turns: &[Turn]) -> Vec<TurnRole> {
        turns.iter().map(|t| t.role).collect()
    }

    #[test]
    fn test_truncation_starts_at_user_turn() {
        let history = vec![
            Turn::model("m1"),
            Turn::user("u1"),
            Turn::model("m2"),
            Turn::user("u2"),
            Turn::model("m3"),
        ];
        let truncated = truncate_history(history, 3);
        assert_eq!(roles(&truncated), vec![TurnRole::User, TurnRole::Model]);
        assert_eq!(truncated[0].text(), "u2");
    }

    #[test]
    fn test_short_history_is_kept() {
        let history = vec![Turn::user("u1"), Turn::model("m1")];
        assert_eq!(truncate_history(history.clone(), 10), history);
    }

    #[test]
    fn test_leading_model_turn_dropped_even_under_limit() {
        let history = vec![Turn::model("orphan"), Turn::user("u1"), Turn::model("m1")];
        let truncated = truncate_history(history, 10);
        assert_eq!(truncated.len(), 2);
        assert_eq!(truncated[0].text(), "u1");
    }

    #[test]
    fn test_no_user_turn_yields_empty() {
        let history = vec![Turn::model("m1"), Turn::model("m2")];
        assert!(truncate_history(history, 5).is_empty());
    }

    #[test]
    fn test_zero_limit_yields_empty() {
        let history = vec![Turn::user("u1"), Turn::model("m1")];
        assert!(truncate_history(history, 0).is_empty());
    }

    #[test]
    fn test_function_response_is_not_a_start() {
        let function_result = Turn {
            role: TurnRole::User,
            parts: vec![Part::FunctionResponse {
                function_response: FunctionResponse {
                    name: "lookup".to_string(),
                    response: serde_json::json!({"result": 42}),
                },
            }],
        };
        let history = vec![
            Turn::user("u1"),
            Turn::model("calling lookup"),
            function_result,
            Turn::model("it is 42"),
            Turn::user("thanks"),
        ];
        let truncated = truncate_history(history, 3);
        assert_eq!(truncated.len(), 1);
        assert_eq!(truncated[0].text(), "thanks");
    }

    #[test]
    fn test_load_history_degrades_on_garbage() {
        assert!(load_history("{not json", 10).is_empty());
        assert!(load_history(r#"{"role":"user"}"#, 10).is_empty());
    }

    #[test]
    fn test_load_history_truncates() {
        let history: Vec<Turn> = (0..10)
            .flat_map(|i| [Turn::user(format!("u{i}")), Turn::model(format!("m{i}"))])
            .collect();
        let json = encode_history(&history).unwrap();
        let loaded = load_history(&json, 4);
        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded[0].text(), "u8");
    }
}
