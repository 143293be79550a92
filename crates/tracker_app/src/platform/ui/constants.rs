/// Character cells in a macro progress bar.
pub const BAR_WIDTH: usize = 20;
pub const SEPARATOR: &str = "----------------------------------------------------";
pub const BAR_FILLED: char = '#';
pub const BAR_EMPTY: char = '.';
pub const PROMPT: &str = "> ";
