use crate::{AppState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
///
/// Every change to the day plan yields exactly one `RequestSave` carrying the
/// full plan, unless saves are held after a failed load. Coalescing is the
/// save coordinator's job.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let changed = match msg {
        Msg::ItemAdded { meal, item } => {
            if item.name.trim().is_empty() {
                return (state, Vec::new());
            }
            state.add_item(meal, item);
            true
        }
        Msg::ItemRemoved { meal, index } => state.remove_item(meal, index),
        Msg::MealToggled(meal) => {
            state.toggle_meal(meal);
            true
        }
        Msg::NotesEdited(notes) => state.set_notes(notes),
        Msg::TargetsChanged(targets) => state.set_targets(targets),
        Msg::RestoreDay(plan) => {
            state.restore(plan);
            false
        }
        Msg::LoadFailed { message } => {
            state.hold_saves(message);
            false
        }
        Msg::SavesResumed => state.resume_saves(),
        Msg::SaveStarted { .. } => {
            state.save_started();
            false
        }
        Msg::SaveSucceeded { .. } => {
            state.save_settled(None);
            false
        }
        Msg::SaveFailed { message, .. } => {
            state.save_settled(Some(message));
            false
        }
    };

    let effects = if changed && !state.saves_held() {
        vec![Effect::RequestSave(state.plan().clone())]
    } else {
        Vec::new()
    };
    (state, effects)
}
