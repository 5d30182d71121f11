//! Shared UI icons and emojis.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("\u{2705} ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("\u{274C} ", "[ERR]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("\u{2728} ", "*");
pub static WARN: Emoji<'_, '_> = Emoji("\u{26A0}\u{FE0F}  ", "[!]");

// Report sections
pub static PROGRESS: Emoji<'_, '_> = Emoji("\u{1F4CA} ", "[PROG]");
pub static LINK: Emoji<'_, '_> = Emoji("\u{1F517} ", "-");
pub static BOOK: Emoji<'_, '_> = Emoji("\u{1F4D6} ", "");
pub static SEARCH: Emoji<'_, '_> = Emoji("\u{1F50D} ", "");
