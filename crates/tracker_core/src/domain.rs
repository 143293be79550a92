use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Backend table that stores one row per [`DayPlan`].
pub const DAY_PLAN_TABLE: &str = "day_plans";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    /// Display order on the day screen.
    pub const ALL: [MealType; 4] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Snack,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MealType::Breakfast => "Breakfast",
            MealType::Lunch => "Lunch",
            MealType::Dinner => "Dinner",
            MealType::Snack => "Snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown meal '{0}' (expected breakfast, lunch, dinner or snack)")]
pub struct UnknownMealType(pub String);

impl FromStr for MealType {
    type Err = UnknownMealType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakfast" | "b" => Ok(MealType::Breakfast),
            "lunch" | "l" => Ok(MealType::Lunch),
            "dinner" | "d" => Ok(MealType::Dinner),
            "snack" | "s" => Ok(MealType::Snack),
            _ => Err(UnknownMealType(s.to_string())),
        }
    }
}

/// Energy and macronutrients. Calories in kcal, the rest in grams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Macros {
    pub calories: u32,
    pub protein: u32,
    pub carbs: u32,
    pub fat: u32,
}

impl Macros {
    pub const fn new(calories: u32, protein: u32, carbs: u32, fat: u32) -> Self {
        Self {
            calories,
            protein,
            carbs,
            fat,
        }
    }
}

impl Add for Macros {
    type Output = Macros;

    fn add(self, rhs: Macros) -> Macros {
        Macros {
            calories: self.calories.saturating_add(rhs.calories),
            protein: self.protein.saturating_add(rhs.protein),
            carbs: self.carbs.saturating_add(rhs.carbs),
            fat: self.fat.saturating_add(rhs.fat),
        }
    }
}

impl Sum for Macros {
    fn sum<I: Iterator<Item = Macros>>(iter: I) -> Macros {
        iter.fold(Macros::default(), Add::add)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    pub grams: u32,
    pub macros: Macros,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meal {
    pub meal_type: MealType,
    #[serde(default)]
    pub items: Vec<FoodItem>,
    #[serde(default)]
    pub eaten: bool,
}

impl Meal {
    pub fn empty(meal_type: MealType) -> Self {
        Self {
            meal_type,
            items: Vec::new(),
            eaten: false,
        }
    }

    pub fn totals(&self) -> Macros {
        self.items.iter().map(|item| item.macros).sum()
    }
}

/// Everything planned and eaten on one calendar day.
///
/// `date` doubles as the record identifier (`YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPlan {
    pub date: String,
    pub meals: Vec<Meal>,
    pub targets: Macros,
    #[serde(default)]
    pub notes: String,
}

impl DayPlan {
    pub const DEFAULT_TARGETS: Macros = Macros::new(2000, 150, 200, 65);

    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            meals: MealType::ALL.iter().copied().map(Meal::empty).collect(),
            targets: Self::DEFAULT_TARGETS,
            notes: String::new(),
        }
    }

    pub fn meal(&self, meal_type: MealType) -> Option<&Meal> {
        self.meals.iter().find(|meal| meal.meal_type == meal_type)
    }

    /// Returns the meal slot, creating it when a stored plan lacks one.
    pub fn meal_mut(&mut self, meal_type: MealType) -> &mut Meal {
        let index = match self
            .meals
            .iter()
            .position(|meal| meal.meal_type == meal_type)
        {
            Some(index) => index,
            None => {
                self.meals.push(Meal::empty(meal_type));
                self.meals.len() - 1
            }
        };
        &mut self.meals[index]
    }

    /// Totals of meals marked as eaten.
    pub fn consumed(&self) -> Macros {
        self.meals
            .iter()
            .filter(|meal| meal.eaten)
            .map(Meal::totals)
            .sum()
    }

    /// Totals of every planned item, eaten or not.
    pub fn planned(&self) -> Macros {
        self.meals.iter().map(Meal::totals).sum()
    }
}

impl Default for DayPlan {
    fn default() -> Self {
        Self::new(String::new())
    }
}
