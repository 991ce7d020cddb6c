use std::cell::Cell;
use std::io::Cursor;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::fallback;
use super::pager::{action_for_key, PagerAction, Viewport};
use super::session::{ChatSession, Role};
use super::transport::{
    chat_piece, drain_fragments, generate_piece, BackendConfig, GenerateError, SamplingOptions,
};
use super::wrap::wrap_to_width;

fn test_config() -> BackendConfig {
    BackendConfig {
        base_url: "http://localhost:11434".to_string(),
        model: "llama3:8b".to_string(),
        options: SamplingOptions {
            temperature: 0.6,
            top_p: 0.9,
            num_predict: 2048,
        },
    }
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

// --- line wrapper ---

#[test]
fn wrap_never_exceeds_width() {
    let inputs = [
        "plain short line",
        "a much longer line that will certainly need to wrap at several points along the way",
        "unbrokenrunofcharacterswithnospacesatallanywhereinthewholeinput",
        "mixed content\nwith explicit\nline breaks and one veryverylongtokenthatmustbehardsplit",
    ];
    for width in [1, 2, 7, 20, 80] {
        for input in inputs {
            for line in wrap_to_width(input, width) {
                assert!(
                    line.chars().count() <= width,
                    "line {line:?} wider than {width}"
                );
            }
        }
    }
}

#[test]
fn wrap_is_idempotent_at_same_width() {
    let input = "The quick brown fox jumps over the lazy dog while the sun sets slowly behind the hills.";
    let once = wrap_to_width(input, 24);
    let twice = wrap_to_width(&once.join("\n"), 24);
    assert_eq!(once, twice);
}

#[test]
fn wrap_preserves_explicit_breaks_and_blank_lines() {
    let lines = wrap_to_width("first\n\nthird", 40);
    assert_eq!(lines, vec!["first", "", "third"]);
}

#[test]
fn wrap_rejoins_to_original_when_breaking_at_spaces() {
    let input = "one two three four five six seven eight nine ten eleven twelve";
    let lines = wrap_to_width(input, 10);
    assert!(lines.len() > 1);
    assert_eq!(lines.join(" "), input);
}

#[test]
fn wrap_hard_split_drops_no_characters() {
    let input = "abcdefghijklmnopqrstuvwxyz";
    let lines = wrap_to_width(input, 7);
    assert_eq!(lines.concat(), input);
    assert_eq!(lines[0], "abcdefg");
}

#[test]
fn wrap_breaks_at_rightmost_space_in_window() {
    // Window of 12 covers "alpha beta g"; the rightmost space is after
    // "beta", so the first line is "alpha beta".
    let lines = wrap_to_width("alpha beta gamma", 12);
    assert_eq!(lines, vec!["alpha beta", "gamma"]);
}

#[test]
fn wrap_of_empty_input_is_empty() {
    assert!(wrap_to_width("", 80).is_empty());
}

// --- fallback orchestrator ---

#[test]
fn fallback_prefers_streaming_result() {
    let buffered_called = Cell::new(false);
    let result = fallback::resolve(
        || Ok("A".to_string()),
        || {
            buffered_called.set(true);
            Ok("B".to_string())
        },
    );
    assert_eq!(result.expect("streaming succeeds"), "A");
    assert!(!buffered_called.get(), "buffered leg must not run");
}

#[test]
fn fallback_recovers_with_buffered_result() {
    let result = fallback::resolve(
        || Err(GenerateError::Transport("connection refused".to_string())),
        || Ok("B".to_string()),
    );
    assert_eq!(result.expect("buffered succeeds"), "B");
}

#[test]
fn fallback_exhaustion_carries_buffered_error() {
    let result = fallback::resolve(
        || {
            Err(GenerateError::Backend {
                status: 500,
                body: "stream broke".to_string(),
            })
        },
        || Err(GenerateError::Transport("timed out".to_string())),
    );

    match result.expect_err("both legs fail") {
        GenerateError::Exhausted(inner) => {
            assert!(matches!(*inner, GenerateError::Transport(ref msg) if msg == "timed out"));
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
}

#[test]
fn fallback_discards_partial_streaming_text() {
    let result = fallback::resolve(
        || {
            // A streaming leg that produced tokens before dying returns only
            // its error; nothing of the partial text survives.
            Err(GenerateError::Transport("reset mid-stream".to_string()))
        },
        || Ok("complete answer".to_string()),
    );
    assert_eq!(result.expect("buffered succeeds"), "complete answer");
}

// --- chat session ---

#[test]
fn session_keeps_messages_in_append_order() {
    let mut session = ChatSession::new(test_config());
    session.add_system("s");
    session.add_user("u");
    session.add_assistant("a");

    let messages = session.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(messages[0].content, "s");
    assert_eq!(messages[1].role, Role::User);
    assert_eq!(messages[1].content, "u");
    assert_eq!(messages[2].role, Role::Assistant);
    assert_eq!(messages[2].content, "a");
}

#[test]
fn session_wire_projection_uses_role_strings() {
    let mut session = ChatSession::new(test_config());
    session.add_system("be brief");
    session.add_user("hello");

    let wire = session.to_wire();
    let items = wire.as_array().expect("array");
    assert_eq!(items[0]["role"], "system");
    assert_eq!(items[0]["content"], "be brief");
    assert_eq!(items[1]["role"], "user");
    assert_eq!(items[1]["content"], "hello");
}

#[test]
fn empty_session_serializes_to_empty_array() {
    let session = ChatSession::new(test_config());
    assert_eq!(session.to_wire().as_array().map(Vec::len), Some(0));
}

// --- stream fragment handling ---

#[test]
fn fragments_accumulate_and_reach_the_token_callback() {
    let ndjson = "{\"response\":\"Hel\"}\n{\"response\":\"lo\"}\n{\"done\":true}\n";
    let mut seen = String::new();
    let text = drain_fragments(Cursor::new(ndjson), generate_piece, &mut |tok| {
        seen.push_str(tok)
    })
    .expect("drain stream");

    assert_eq!(text, "Hello");
    assert_eq!(seen, "Hello");
}

#[test]
fn done_marker_stops_reading_before_stream_end() {
    let ndjson =
        "{\"response\":\"yes\",\"done\":true}\n{\"response\":\" and this is never read\"}\n";
    let text = drain_fragments(Cursor::new(ndjson), generate_piece, &mut |_| {})
        .expect("drain stream");
    assert_eq!(text, "yes");
}

#[test]
fn malformed_fragments_are_skipped_silently() {
    let ndjson = "{\"response\":\"a\"}\nnot json at all\n{\"response\":\"b\"}\n";
    let text = drain_fragments(Cursor::new(ndjson), generate_piece, &mut |_| {})
        .expect("drain stream");
    assert_eq!(text, "ab");
}

#[test]
fn fragments_without_a_text_field_contribute_nothing() {
    let ndjson = "{\"model\":\"llama3:8b\"}\n{\"response\":\"x\"}\n";
    let text = drain_fragments(Cursor::new(ndjson), generate_piece, &mut |_| {})
        .expect("drain stream");
    assert_eq!(text, "x");
}

#[test]
fn chat_fragments_read_nested_message_content() {
    let ndjson = "{\"message\":{\"role\":\"assistant\",\"content\":\"Hi\"}}\n{\"done\":true}\n";
    let text =
        drain_fragments(Cursor::new(ndjson), chat_piece, &mut |_| {}).expect("drain stream");
    assert_eq!(text, "Hi");
}

#[test]
fn piece_extractors_treat_missing_fields_as_absent() {
    let value = serde_json::json!({ "done": false });
    assert_eq!(generate_piece(&value), None);
    assert_eq!(chat_piece(&value), None);

    let nested = serde_json::json!({ "message": { "role": "assistant" } });
    assert_eq!(chat_piece(&nested), None);
}

// --- viewport pager ---

#[test]
fn scroll_up_at_top_stays_at_top() {
    let mut view = Viewport::new("only a little content", 40, 10);
    view.scroll_up();
    assert_eq!(view.top(), 0);
}

#[test]
fn scroll_down_stops_at_last_page() {
    let content = (0..30).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
    let mut view = Viewport::new(&content, 40, 10);
    for _ in 0..100 {
        view.scroll_down();
    }
    assert_eq!(view.top(), view.max_top());
    assert_eq!(view.max_top(), 20);

    view.scroll_down();
    assert_eq!(view.top(), 20);
}

#[test]
fn short_content_never_scrolls() {
    let mut view = Viewport::new("one\ntwo", 40, 10);
    view.scroll_down();
    assert_eq!(view.top(), 0);
    assert_eq!(view.max_top(), 0);
}

#[test]
fn replace_content_jumps_to_bottom() {
    let initial = (0..15).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
    let mut view = Viewport::new(&initial, 40, 10);
    assert_eq!(view.top(), 0);

    let extended = format!("{initial}\n\n---\nUser: more?\n\nAssistant:\nplenty more");
    view.replace_content(&extended);

    assert_eq!(view.top(), view.max_top());
    assert_eq!(view.top(), view.line_count() - 10);
}

#[test]
fn render_rows_pads_short_content_to_full_height() {
    let view = Viewport::new("alpha\nbeta", 40, 10);
    let rows = view.render_rows();

    // title + indicator + rule, then exactly `height` body rows, rule, legend
    assert_eq!(rows.len(), 3 + 10 + 2);
    assert_eq!(rows[1], "Lines 1-2 of 2");
    assert_eq!(rows[3], "alpha");
    assert_eq!(rows[4], "beta");
    assert!(rows[5..13].iter().all(|row| row.is_empty()));
}

#[test]
fn render_rows_indicator_tracks_scroll_position() {
    let content = (0..40).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
    let mut view = Viewport::new(&content, 40, 10);
    view.scroll_down();
    view.scroll_down();

    let rows = view.render_rows();
    assert_eq!(rows[1], "Lines 3-12 of 40");
    assert_eq!(rows[3], "line 2");
}

#[test]
fn long_prose_scenario_wraps_and_renders_from_line_one() {
    let prose = "entropy measures disorder ".repeat(93) + "end.";
    assert!(prose.chars().count() >= 2400);
    assert!(!prose.contains('\n'));

    let view = Viewport::new(&prose, 80, 10);
    assert!(view.line_count() >= 2400 / 80);
    assert!(view.line_count() <= 2400 / 80 + 8);

    let rows = view.render_rows();
    assert_eq!(rows[1], format!("Lines 1-10 of {}", view.line_count()));
    assert!(!rows[3].is_empty());
}

#[test]
fn pager_keys_map_to_viewer_actions() {
    assert_eq!(action_for_key(&key(KeyCode::Esc)), Some(PagerAction::Exit));
    assert_eq!(
        action_for_key(&key(KeyCode::Char('q'))),
        Some(PagerAction::ScrollUp)
    );
    assert_eq!(
        action_for_key(&key(KeyCode::Char('E'))),
        Some(PagerAction::ScrollDown)
    );
    assert_eq!(
        action_for_key(&key(KeyCode::Up)),
        Some(PagerAction::ScrollUp)
    );
    assert_eq!(
        action_for_key(&key(KeyCode::Down)),
        Some(PagerAction::ScrollDown)
    );
    assert_eq!(
        action_for_key(&key(KeyCode::Char('b'))),
        Some(PagerAction::Save)
    );
    assert_eq!(
        action_for_key(&key(KeyCode::Char('T'))),
        Some(PagerAction::Continue)
    );
    assert_eq!(action_for_key(&key(KeyCode::Char('z'))), None);
    assert_eq!(action_for_key(&key(KeyCode::Enter)), None);
}

// --- prompt templates ---

#[test]
fn combined_prompt_embeds_topic_and_both_templates() {
    let prompt = super::build_combined_prompt("Entropy");
    assert!(prompt.starts_with(super::SYSTEM_PROMPT));
    assert!(prompt.contains("Topic: \"Entropy\""));
    assert!(prompt.contains(&super::build_user_prompt("Entropy")));
}
