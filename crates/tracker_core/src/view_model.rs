use crate::{Macros, MealType, SaveStatus};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DayViewModel {
    pub date: String,
    pub meals: Vec<MealRowView>,
    pub progress: Vec<MacroProgress>,
    pub planned: Macros,
    pub notes: String,
    pub save_status: SaveStatus,
    /// Failure message to surface until the next successful save.
    pub notice: Option<String>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealRowView {
    pub meal_type: MealType,
    pub items: Vec<String>,
    pub totals: Macros,
    pub eaten: bool,
}

/// Consumed vs. target for one macro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroProgress {
    pub label: &'static str,
    pub consumed: u32,
    pub target: u32,
    /// Uncapped percentage of the target, 0 when there is no target.
    pub percent: u32,
}

impl MacroProgress {
    pub fn new(label: &'static str, consumed: u32, target: u32) -> Self {
        let percent = if target == 0 {
            0
        } else {
            ((u64::from(consumed) * 100) / u64::from(target)).min(u64::from(u32::MAX)) as u32
        };
        Self {
            label,
            consumed,
            target,
            percent,
        }
    }

    /// Fill level for a progress bar, capped at 100.
    pub fn bar_percent(&self) -> u8 {
        self.percent.min(100) as u8
    }

    pub fn over_target(&self) -> bool {
        self.target > 0 && self.consumed > self.target
    }
}
