use std::str::FromStr;

use thiserror::Error;
use tracker_core::{FoodItem, Macros, MealType, Msg};

pub const HELP: &str = "\
Commands:
  add <meal> <grams> <kcal> <protein> <carbs> <fat> <name...>
  remove <meal> <n>          remove the n-th item of a meal
  toggle <meal>              mark a meal eaten / not eaten
  note <text>                replace the day's notes (empty clears)
  target <kcal> <protein> <carbs> <fat>
  show                       redraw the day
  retry                      load the stored day again after a failed load
  save                       start saving this version after a failed load
  help                       this text
  quit                       save pending edits and exit
Meals: breakfast, lunch, dinner, snack (or b, l, d, s).";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Update(Msg),
    Show,
    Retry,
    Help,
    Quit,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ParseError(String);

fn err(message: impl Into<String>) -> ParseError {
    ParseError(message.into())
}

pub fn parse(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb.to_ascii_lowercase().as_str() {
        "" => Ok(Command::Empty),
        "show" => Ok(Command::Show),
        "retry" | "reload" => Ok(Command::Retry),
        "save" => Ok(Command::Update(Msg::SavesResumed)),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        "note" | "notes" => Ok(Command::Update(Msg::NotesEdited(rest.to_string()))),
        "toggle" => {
            let meal = parse_meal(rest)?;
            Ok(Command::Update(Msg::MealToggled(meal)))
        }
        "remove" | "rm" => {
            let args: Vec<&str> = rest.split_whitespace().collect();
            let [meal, position] = args.as_slice() else {
                return Err(err("usage: remove <meal> <n>"));
            };
            let meal = parse_meal(meal)?;
            let position: usize = parse_number(position, "item number")?;
            if position == 0 {
                return Err(err("item numbers start at 1"));
            }
            Ok(Command::Update(Msg::ItemRemoved {
                meal,
                index: position - 1,
            }))
        }
        "target" | "targets" => {
            let args: Vec<&str> = rest.split_whitespace().collect();
            let [kcal, protein, carbs, fat] = args.as_slice() else {
                return Err(err("usage: target <kcal> <protein> <carbs> <fat>"));
            };
            Ok(Command::Update(Msg::TargetsChanged(parse_macros(
                kcal, protein, carbs, fat,
            )?)))
        }
        "add" => parse_add(rest),
        other => Err(err(format!("unknown command {other:?}; try `help`"))),
    }
}

fn parse_add(rest: &str) -> Result<Command, ParseError> {
    const USAGE: &str = "usage: add <meal> <grams> <kcal> <protein> <carbs> <fat> <name...>";
    let mut args = rest.split_whitespace();
    let mut next = || args.next().ok_or_else(|| err(USAGE));
    let meal = parse_meal(next()?)?;
    let grams = parse_number(next()?, "grams")?;
    let (kcal, protein, carbs, fat) = (next()?, next()?, next()?, next()?);
    let macros = parse_macros(kcal, protein, carbs, fat)?;
    let name = args.collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return Err(err(USAGE));
    }
    Ok(Command::Update(Msg::ItemAdded {
        meal,
        item: FoodItem {
            name,
            grams,
            macros,
        },
    }))
}

fn parse_meal(text: &str) -> Result<MealType, ParseError> {
    MealType::from_str(text).map_err(|e| err(e.to_string()))
}

fn parse_macros(kcal: &str, protein: &str, carbs: &str, fat: &str) -> Result<Macros, ParseError> {
    Ok(Macros::new(
        parse_number(kcal, "calories")?,
        parse_number(protein, "protein")?,
        parse_number(carbs, "carbs")?,
        parse_number(fat, "fat")?,
    ))
}

fn parse_number<N: FromStr>(text: &str, what: &str) -> Result<N, ParseError> {
    text.parse()
        .map_err(|_| err(format!("{what} must be a whole number, got {text:?}")))
}
