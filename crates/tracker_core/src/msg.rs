use crate::{DayPlan, DispatchId, FoodItem, Macros, MealType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User added a food item to a meal.
    ItemAdded { meal: MealType, item: FoodItem },
    /// User removed the item at `index` from a meal.
    ItemRemoved { meal: MealType, index: usize },
    /// User flipped the eaten/not-eaten toggle of a meal.
    MealToggled(MealType),
    /// User edited the free-text notes (every keystroke).
    NotesEdited(String),
    /// User changed the daily macro targets.
    TargetsChanged(Macros),
    /// Replace the plan with one loaded from storage. Does not request a save.
    RestoreDay(DayPlan),
    /// Loading the stored plan failed. Saves are held so the stored copy is
    /// not overwritten by a blank day.
    LoadFailed { message: String },
    /// User chose to save the current plan despite the failed load.
    SavesResumed,
    /// The save coordinator dispatched a save.
    SaveStarted { dispatch_id: DispatchId },
    /// A dispatched save settled successfully.
    SaveSucceeded { dispatch_id: DispatchId },
    /// A dispatched save failed.
    SaveFailed {
        dispatch_id: DispatchId,
        message: String,
    },
}
