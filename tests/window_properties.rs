//! Property tests for context window building

use proptest::prelude::*;
use studymate_context::{build_window, ConversationTurn, TurnRole};

fn turn_strategy() -> impl Strategy<Value = ConversationTurn> {
    (
        prop_oneof![
            Just(TurnRole::User),
            Just(TurnRole::Assistant),
            Just(TurnRole::System),
        ],
        "[a-z ]{0,12}",
    )
        .prop_map(|(role, content)| ConversationTurn::new(role, content))
}

proptest! {
    #[test]
    fn window_never_exceeds_cap(
        prior in prop::collection::vec(turn_strategy(), 0..60),
        max_turns in 2usize..40,
        prompt in "[a-z]{0,8}",
    ) {
        let window = build_window(&prompt, &prior, "current", max_turns);
        prop_assert!(window.len() <= max_turns);
    }

    #[test]
    fn window_ends_with_current_and_starts_with_prompt(
        prior in prop::collection::vec(turn_strategy(), 0..60),
        max_turns in 2usize..40,
    ) {
        let window = build_window("You are a tutor.", &prior, "what next?", max_turns);
        let current = ConversationTurn::user("what next?");

        prop_assert_eq!(window.current_turn(), Some(&current));
        prop_assert_eq!(window.turns()[0].clone(), ConversationTurn::system("You are a tutor."));
        prop_assert_eq!(window.iter().filter(|turn| turn.is_system()).count(), 1);
    }

    #[test]
    fn kept_history_is_most_recent_suffix(
        prior in prop::collection::vec(
            prop_oneof![
                "[a-z]{1,6}".prop_map(ConversationTurn::user),
                "[a-z]{1,6}".prop_map(ConversationTurn::assistant),
            ],
            0..60,
        ),
        max_turns in 2usize..40,
    ) {
        let window = build_window("tutor", &prior, "now", max_turns);
        let kept = &window.turns()[1..window.len() - 1];

        prop_assert_eq!(kept, &prior[prior.len() - kept.len()..]);
        prop_assert_eq!(kept.len(), prior.len().min(max_turns - 2));
    }
}

#[test]
fn twenty_five_prior_turns_trim_to_twenty_one() {
    let prior: Vec<ConversationTurn> = (0..25)
        .map(|i| ConversationTurn::user(format!("turn {i}")))
        .collect();

    let window = build_window("tutor", &prior, "current", 21);

    assert_eq!(window.len(), 21);
    assert_eq!(window.turns()[0], ConversationTurn::system("tutor"));
    assert_eq!(window.turns()[1].content, "turn 6");
    assert_eq!(window.turns()[19].content, "turn 24");
    assert_eq!(window.turns()[20], ConversationTurn::user("current"));
}
