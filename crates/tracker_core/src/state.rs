use crate::view_model::{DayViewModel, MacroProgress, MealRowView};
use crate::{DayPlan, FoodItem, Macros, MealType};

pub type DispatchId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStatus {
    /// Nothing changed since the plan was loaded.
    #[default]
    Idle,
    /// Edits are waiting for the debounce window to elapse.
    Unsaved,
    /// At least one save is in flight.
    Saving,
    Saved,
    Failed,
    /// The stored plan could not be loaded; edits are not saved.
    Held,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    plan: DayPlan,
    save_status: SaveStatus,
    in_flight: usize,
    edited_since_dispatch: bool,
    last_settled_failed: bool,
    saves_held: bool,
    notice: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new(plan: DayPlan) -> Self {
        Self {
            plan,
            ..Self::default()
        }
    }

    pub fn plan(&self) -> &DayPlan {
        &self.plan
    }

    pub fn save_status(&self) -> SaveStatus {
        self.save_status
    }

    pub fn saves_held(&self) -> bool {
        self.saves_held
    }

    pub fn view(&self) -> DayViewModel {
        let consumed = self.plan.consumed();
        let targets = self.plan.targets;
        DayViewModel {
            date: self.plan.date.clone(),
            meals: self
                .plan
                .meals
                .iter()
                .map(|meal| MealRowView {
                    meal_type: meal.meal_type,
                    items: meal
                        .items
                        .iter()
                        .map(|item| {
                            format!(
                                "{} ({} g, {} kcal)",
                                item.name, item.grams, item.macros.calories
                            )
                        })
                        .collect(),
                    totals: meal.totals(),
                    eaten: meal.eaten,
                })
                .collect(),
            progress: vec![
                MacroProgress::new("Calories", consumed.calories, targets.calories),
                MacroProgress::new("Protein", consumed.protein, targets.protein),
                MacroProgress::new("Carbs", consumed.carbs, targets.carbs),
                MacroProgress::new("Fat", consumed.fat, targets.fat),
            ],
            planned: self.plan.planned(),
            notes: self.plan.notes.clone(),
            save_status: self.save_status,
            notice: self.notice.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether a render is due and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn add_item(&mut self, meal: MealType, item: FoodItem) {
        self.plan.meal_mut(meal).items.push(item);
        self.mark_edited();
    }

    pub(crate) fn remove_item(&mut self, meal: MealType, index: usize) -> bool {
        let items = &mut self.plan.meal_mut(meal).items;
        if index >= items.len() {
            return false;
        }
        items.remove(index);
        self.mark_edited();
        true
    }

    pub(crate) fn toggle_meal(&mut self, meal: MealType) {
        let slot = self.plan.meal_mut(meal);
        slot.eaten = !slot.eaten;
        self.mark_edited();
    }

    pub(crate) fn set_notes(&mut self, notes: String) -> bool {
        if self.plan.notes == notes {
            return false;
        }
        self.plan.notes = notes;
        self.mark_edited();
        true
    }

    pub(crate) fn set_targets(&mut self, targets: Macros) -> bool {
        if self.plan.targets == targets {
            return false;
        }
        self.plan.targets = targets;
        self.mark_edited();
        true
    }

    pub(crate) fn restore(&mut self, plan: DayPlan) {
        self.plan = plan;
        self.edited_since_dispatch = false;
        if self.saves_held {
            self.saves_held = false;
            self.notice = None;
        }
        if self.in_flight == 0 {
            self.save_status = SaveStatus::Idle;
        }
        self.dirty = true;
    }

    pub(crate) fn hold_saves(&mut self, message: String) {
        self.saves_held = true;
        self.notice = Some(format!(
            "Could not load your saved day: {message}. Changes are not saved until you confirm."
        ));
        if self.in_flight == 0 {
            self.save_status = SaveStatus::Held;
        }
        self.dirty = true;
    }

    /// Lifts a hold; returns whether edits made meanwhile need saving.
    pub(crate) fn resume_saves(&mut self) -> bool {
        if !self.saves_held {
            return false;
        }
        self.saves_held = false;
        self.notice = None;
        if self.in_flight == 0 {
            self.save_status = if self.edited_since_dispatch {
                SaveStatus::Unsaved
            } else {
                SaveStatus::Idle
            };
        }
        self.dirty = true;
        self.edited_since_dispatch
    }

    pub(crate) fn save_started(&mut self) {
        self.in_flight += 1;
        self.edited_since_dispatch = false;
        self.save_status = SaveStatus::Saving;
        self.dirty = true;
    }

    pub(crate) fn save_settled(&mut self, failure: Option<String>) {
        // Events from a previous plan can still arrive after a restore.
        self.in_flight = self.in_flight.saturating_sub(1);
        match failure {
            Some(message) => {
                self.last_settled_failed = true;
                self.notice = Some(format!("Could not save your changes: {message}"));
            }
            None => {
                self.last_settled_failed = false;
                self.notice = None;
            }
        }

        if self.in_flight > 0 {
            self.save_status = SaveStatus::Saving;
        } else if self.saves_held {
            self.save_status = SaveStatus::Held;
        } else if self.edited_since_dispatch {
            self.save_status = SaveStatus::Unsaved;
        } else if self.last_settled_failed {
            self.save_status = SaveStatus::Failed;
        } else {
            self.save_status = SaveStatus::Saved;
        }
        self.dirty = true;
    }

    fn mark_edited(&mut self) {
        self.edited_since_dispatch = true;
        if self.in_flight == 0 && !self.saves_held {
            self.save_status = SaveStatus::Unsaved;
        }
        self.dirty = true;
    }
}
