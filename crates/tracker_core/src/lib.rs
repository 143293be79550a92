//! Tracker core: meal-plan domain types and the pure day-plan state machine.
mod domain;
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use domain::{DayPlan, FoodItem, Macros, Meal, MealType, UnknownMealType, DAY_PLAN_TABLE};
pub use effect::Effect;
pub use msg::Msg;
pub use state::{AppState, DispatchId, SaveStatus};
pub use update::update;
pub use view_model::{DayViewModel, MacroProgress, MealRowView};
