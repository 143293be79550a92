use crate::DayPlan;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Persist this snapshot of the plan. The runner debounces these.
    RequestSave(DayPlan),
}
