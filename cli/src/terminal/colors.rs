use colored::Color;

pub const PRIMARY: Color = Color::BrightBlue;
pub const ACCENT: Color = Color::BrightCyan;
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;

pub const RESOLVED: Color = Color::Green;
pub const UNRESOLVED: Color = Color::Red;
pub const UNIT: Color = Color::Yellow;
pub const TARGET: Color = Color::BrightWhite;
