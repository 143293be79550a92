use pretty_assertions::assert_eq;
use tracker_core::{update, AppState, DayPlan, Effect, MealType, Msg, SaveStatus};

fn after_failed_load() -> AppState {
    let (state, effects) = update(
        AppState::new(DayPlan::new("2026-10-15")),
        Msg::LoadFailed {
            message: "backend request timed out".to_string(),
        },
    );
    assert!(effects.is_empty());
    state
}

#[test]
fn failed_load_holds_saves_and_explains_why() {
    let state = after_failed_load();

    assert!(state.saves_held());
    assert_eq!(state.save_status(), SaveStatus::Held);
    let notice = state.view().notice.unwrap_or_default();
    assert!(notice.contains("backend request timed out"), "{notice}");
}

#[test]
fn edits_while_held_are_kept_but_not_saved() {
    let state = after_failed_load();

    let (state, effects) = update(state, Msg::MealToggled(MealType::Lunch));
    assert!(effects.is_empty());
    let (state, effects) = update(state, Msg::NotesEdited("offline".to_string()));
    assert!(effects.is_empty());

    assert_eq!(state.save_status(), SaveStatus::Held);
    assert_eq!(state.plan().notes, "offline");
}

#[test]
fn confirming_saves_the_edited_plan_once() {
    let state = after_failed_load();
    let (state, _) = update(state, Msg::NotesEdited("offline".to_string()));

    let (state, effects) = update(state, Msg::SavesResumed);
    assert_eq!(effects, vec![Effect::RequestSave(state.plan().clone())]);
    assert!(!state.saves_held());
    assert_eq!(state.save_status(), SaveStatus::Unsaved);
    assert_eq!(state.view().notice, None);

    let (_, effects) = update(state, Msg::MealToggled(MealType::Dinner));
    assert_eq!(effects.len(), 1);
}

#[test]
fn confirming_without_edits_requests_nothing() {
    let (state, effects) = update(after_failed_load(), Msg::SavesResumed);

    assert!(effects.is_empty());
    assert_eq!(state.save_status(), SaveStatus::Idle);
}

#[test]
fn successful_reload_lifts_the_hold() {
    let state = after_failed_load();
    let mut stored = DayPlan::new("2026-10-15");
    stored.notes = "stored".to_string();

    let (state, effects) = update(state, Msg::RestoreDay(stored.clone()));
    assert!(effects.is_empty());
    assert!(!state.saves_held());
    assert_eq!(state.plan(), &stored);
    assert_eq!(state.save_status(), SaveStatus::Idle);

    let (_, effects) = update(state, Msg::MealToggled(MealType::Snack));
    assert_eq!(effects.len(), 1);
}
