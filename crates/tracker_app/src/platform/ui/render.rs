use std::fmt::Write as _;

use tracker_core::{DayViewModel, MacroProgress, SaveStatus};

use super::constants::*;

pub fn render(view: &DayViewModel) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{SEPARATOR}");
    let _ = writeln!(out, "Day plan {}    [{}]", view.date, status_label(view.save_status));
    let _ = writeln!(out, "{SEPARATOR}");

    for meal in &view.meals {
        let mark = if meal.eaten { 'x' } else { ' ' };
        let _ = writeln!(
            out,
            "[{mark}] {:<10} {:>5} kcal  P {:>3}  C {:>3}  F {:>3}",
            meal.meal_type.label(),
            meal.totals.calories,
            meal.totals.protein,
            meal.totals.carbs,
            meal.totals.fat
        );
        for (index, item) in meal.items.iter().enumerate() {
            let _ = writeln!(out, "      {}. {}", index + 1, item);
        }
    }

    let _ = writeln!(out, "{SEPARATOR}");
    for progress in &view.progress {
        let _ = writeln!(out, "{}", progress_line(progress));
    }
    let _ = writeln!(
        out,
        "Planned: {} kcal, P {} / C {} / F {}",
        view.planned.calories, view.planned.protein, view.planned.carbs, view.planned.fat
    );

    if !view.notes.is_empty() {
        let _ = writeln!(out, "Notes: {}", view.notes);
    }
    if let Some(notice) = &view.notice {
        let _ = writeln!(out, "! {notice}");
    }
    out
}

/// One-line status for the prompt after each command.
pub fn status_line(view: &DayViewModel) -> String {
    match &view.notice {
        Some(notice) if matches!(view.save_status, SaveStatus::Failed | SaveStatus::Held) => {
            format!("[{}] {}", status_label(view.save_status), notice)
        }
        _ => format!("[{}]", status_label(view.save_status)),
    }
}

fn status_label(status: SaveStatus) -> &'static str {
    match status {
        SaveStatus::Idle => "up to date",
        SaveStatus::Unsaved => "unsaved changes",
        SaveStatus::Saving => "saving...",
        SaveStatus::Saved => "saved",
        SaveStatus::Failed => "save failed",
        SaveStatus::Held => "not saving",
    }
}

fn progress_line(progress: &MacroProgress) -> String {
    let filled = usize::from(progress.bar_percent()) * BAR_WIDTH / 100;
    let bar: String = std::iter::repeat(BAR_FILLED)
        .take(filled)
        .chain(std::iter::repeat(BAR_EMPTY).take(BAR_WIDTH - filled))
        .collect();
    let over = if progress.over_target() { " over" } else { "" };
    format!(
        "{:<9}[{bar}] {:>5} / {:<5} {:>3}%{over}",
        progress.label, progress.consumed, progress.target, progress.percent
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracker_core::{update, AppState, DayPlan, FoodItem, Macros, MealType, Msg};

    fn view_with_eaten_lunch() -> DayViewModel {
        let state = AppState::new(DayPlan::new("2026-10-15"));
        let (state, _) = update(
            state,
            Msg::ItemAdded {
                meal: MealType::Lunch,
                item: FoodItem {
                    name: "chicken rice".to_string(),
                    grams: 350,
                    macros: Macros::new(1000, 75, 100, 20),
                },
            },
        );
        let (state, _) = update(state, Msg::MealToggled(MealType::Lunch));
        state.view()
    }

    #[test]
    fn progress_bar_fills_proportionally() {
        let line = progress_line(&MacroProgress::new("Calories", 1000, 2000));
        assert!(line.contains("[##########..........]"), "{line}");
        assert!(line.contains(" 50%"), "{line}");
        assert!(!line.ends_with("over"));
    }

    #[test]
    fn progress_bar_caps_but_reports_overshoot() {
        let line = progress_line(&MacroProgress::new("Fat", 130, 65));
        assert!(line.contains(&format!("[{}]", "#".repeat(BAR_WIDTH))), "{line}");
        assert!(line.contains("200%"), "{line}");
        assert!(line.ends_with("over"), "{line}");
    }

    #[test]
    fn render_lists_meals_items_and_status() {
        let text = render(&view_with_eaten_lunch());
        assert!(text.contains("Day plan 2026-10-15"), "{text}");
        assert!(text.contains("[unsaved changes]"), "{text}");
        assert!(text.contains("[x] Lunch"), "{text}");
        assert!(text.contains("1. chicken rice (350 g, 1000 kcal)"), "{text}");
        assert!(text.contains("[ ] Breakfast"), "{text}");
    }

    #[test]
    fn failed_save_surfaces_the_notice() {
        let mut view = view_with_eaten_lunch();
        view.save_status = SaveStatus::Failed;
        view.notice = Some("Could not save your changes: timeout".to_string());

        assert_eq!(
            status_line(&view),
            "[save failed] Could not save your changes: timeout"
        );
        assert!(render(&view).contains("! Could not save your changes: timeout"));
    }
}
