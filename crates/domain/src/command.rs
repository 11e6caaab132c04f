//! HPGL-derived commands and their wire encoding.
//!
//! Every statement on the wire is ASCII and terminated by `;`. A command is
//! classified once, when it enters the engine, so state transitions switch on
//! a closed set instead of re-reading text.

use std::fmt;

/// Square test pattern: settle, pen down, 5 mm square, pen up.
pub const DEFAULT_FLOW: &str = "!TS500;PD;PR5000,0;PR0,5000;PR-5000,0;PR0,-5000;PU;!TS0;";

/// A single plotter statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `IN;`
    Initialize,
    /// `PU;`
    PenUp,
    /// `PD;`
    PenDown,
    /// `PR{dx},{dy};`: relative move in micrometers.
    MoveRelative { dx: i64, dy: i64 },
    /// `PA{x},{y};`: absolute move in micrometers.
    MoveAbsolute { x: i64, y: i64 },
    /// `!EM1;` / `!EM0;`
    Motor(bool),
    /// `!ON0;`: ask the device for a position report.
    QueryPosition,
    /// Anything else, passed through verbatim (normalized to end in `;`).
    Raw(String),
}

impl Command {
    /// Classify one statement. Surrounding whitespace and a trailing `;` are
    /// ignored; mnemonics are matched case-insensitively.
    ///
    /// Unknown or malformed statements become [`Command::Raw`].
    #[must_use]
    pub fn parse(statement: &str) -> Self {
        let body = statement.trim();
        let body = body.strip_suffix(';').unwrap_or(body).trim();
        let upper = body.to_ascii_uppercase();

        match upper.as_str() {
            "IN" => return Self::Initialize,
            "PU" => return Self::PenUp,
            "PD" => return Self::PenDown,
            "!EM1" => return Self::Motor(true),
            "!EM0" => return Self::Motor(false),
            "!ON0" => return Self::QueryPosition,
            _ => {}
        }

        if let Some(args) = upper.strip_prefix("PR") {
            if let Some((dx, dy)) = parse_pair(args, true) {
                return Self::MoveRelative { dx, dy };
            }
        } else if let Some(args) = upper.strip_prefix("PA") {
            if let Some((x, y)) = parse_pair(args, false) {
                return Self::MoveAbsolute { x, y };
            }
        }

        Self::Raw(normalize(body))
    }

    /// Split a multi-statement text on `;` and classify each statement in
    /// wire order. Empty statements are skipped.
    #[must_use]
    pub fn parse_program(text: &str) -> Vec<Self> {
        text.split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::parse)
            .collect()
    }

    /// Wire form, always terminated by `;`.
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialize => f.write_str("IN;"),
            Self::PenUp => f.write_str("PU;"),
            Self::PenDown => f.write_str("PD;"),
            Self::MoveRelative { dx, dy } => write!(f, "PR{dx},{dy};"),
            Self::MoveAbsolute { x, y } => write!(f, "PA{x},{y};"),
            Self::Motor(true) => f.write_str("!EM1;"),
            Self::Motor(false) => f.write_str("!EM0;"),
            Self::QueryPosition => f.write_str("!ON0;"),
            Self::Raw(text) => f.write_str(text),
        }
    }
}

/// Trim user text and make sure it ends with `;`.
///
/// Returns an empty string for blank input.
#[must_use]
pub fn normalize(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() || text.ends_with(';') {
        text.to_string()
    } else {
        format!("{text};")
    }
}

/// Parse `a,b` (or `a` alone when `second_optional`) as signed integers.
fn parse_pair(args: &str, second_optional: bool) -> Option<(i64, i64)> {
    let mut parts = args.split(',').map(str::trim);
    let first = parts.next()?.parse().ok()?;
    let second = match parts.next() {
        Some(s) => s.parse().ok()?,
        None if second_optional => 0,
        None => return None,
    };
    if parts.next().is_some() {
        return None;
    }
    Some((first, second))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_encode_fixed_commands() {
        assert_eq!(Command::Initialize.encode(), "IN;");
        assert_eq!(Command::PenUp.encode(), "PU;");
        assert_eq!(Command::PenDown.encode(), "PD;");
        assert_eq!(Command::Motor(true).encode(), "!EM1;");
        assert_eq!(Command::Motor(false).encode(), "!EM0;");
        assert_eq!(Command::QueryPosition.encode(), "!ON0;");
    }

    #[test]
    fn should_encode_moves_with_signed_micrometers() {
        assert_eq!(
            Command::MoveRelative { dx: -5000, dy: 250 }.encode(),
            "PR-5000,250;"
        );
        assert_eq!(
            Command::MoveAbsolute { x: 10_000, y: 0 }.encode(),
            "PA10000,0;"
        );
    }

    #[test]
    fn should_parse_mnemonics_case_insensitively() {
        assert_eq!(Command::parse("pu;"), Command::PenUp);
        assert_eq!(Command::parse(" Pd; "), Command::PenDown);
        assert_eq!(Command::parse("!em1;"), Command::Motor(true));
        assert_eq!(Command::parse("!EM0"), Command::Motor(false));
        assert_eq!(Command::parse("in"), Command::Initialize);
        assert_eq!(Command::parse("!on0;"), Command::QueryPosition);
    }

    #[test]
    fn should_parse_relative_move() {
        assert_eq!(
            Command::parse("PR5000,-250;"),
            Command::MoveRelative { dx: 5000, dy: -250 }
        );
    }

    #[test]
    fn should_default_missing_relative_y_to_zero() {
        assert_eq!(
            Command::parse("PR1200;"),
            Command::MoveRelative { dx: 1200, dy: 0 }
        );
    }

    #[test]
    fn should_parse_absolute_move() {
        assert_eq!(
            Command::parse("pa 100, 200;"),
            Command::MoveAbsolute { x: 100, y: 200 }
        );
    }

    #[test]
    fn should_keep_malformed_moves_as_raw() {
        assert_eq!(Command::parse("PRx,1;"), Command::Raw("PRx,1;".to_string()));
        assert_eq!(Command::parse("PA5;"), Command::Raw("PA5;".to_string()));
        assert_eq!(Command::parse("PR1,2,3"), Command::Raw("PR1,2,3;".to_string()));
    }

    #[test]
    fn should_normalize_unknown_statements() {
        assert_eq!(Command::parse("!TS500"), Command::Raw("!TS500;".to_string()));
        assert_eq!(Command::parse("!TS500").encode(), "!TS500;");
    }

    #[test]
    fn should_append_semicolon_when_missing() {
        assert_eq!(normalize("PU"), "PU;");
        assert_eq!(normalize(" PD; "), "PD;");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn should_split_program_in_wire_order() {
        let commands = Command::parse_program(DEFAULT_FLOW);
        assert_eq!(
            commands,
            vec![
                Command::Raw("!TS500;".to_string()),
                Command::PenDown,
                Command::MoveRelative { dx: 5000, dy: 0 },
                Command::MoveRelative { dx: 0, dy: 5000 },
                Command::MoveRelative { dx: -5000, dy: 0 },
                Command::MoveRelative { dx: 0, dy: -5000 },
                Command::PenUp,
                Command::Raw("!TS0;".to_string()),
            ]
        );
    }

    #[test]
    fn should_skip_empty_statements() {
        assert_eq!(Command::parse_program(";;PU;;"), vec![Command::PenUp]);
        assert!(Command::parse_program("").is_empty());
    }
}
