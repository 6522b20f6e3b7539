// src/constants.rs

/// The character separating the segments of a command name.
pub const NAME_SEPARATOR: char = ':';

/// The command every controller registers at construction and falls back to
/// when the user names no command.
pub const DEFAULT_COMMAND: &str = "help";

/// Shown in diagnostics in place of the empty command name.
pub const EMPTY_NAME_PLACEHOLDER: &str = "<none>";
