//! Console line parsing.
//!
//! Lines starting with `:` are console commands; anything else is raw HPGL
//! sent as typed. Lengths are millimeters.

use plotter_app::intent::{Intent, JogDirection};
use plotter_domain::command::{Command, DEFAULT_FLOW};

const DEFAULT_JOG_STEP_MM: i64 = 10;

pub const HELP: &str = "\
:connect [port]        connect (port `virtual` is the simulated plotter)
:disconnect            close the connection
:emulate on|off        toggle emulation mode
:move <dx> <dy>        relative move in mm
:abs <x|-> <y|->       absolute move in mm, `-` keeps an axis
:jog up|down|left|right [step]
:ws <max_x> <max_y>    set the workspace in mm
:init :pu :pd :query   quick commands
:motor on|off          enable or disable the motors
:flow [program]        run a command flow (default: test square)
:state                 show the tracked device state
:ports                 list serial ports
:help :quit
anything else          sent to the plotter as typed";

/// One parsed console line.
#[derive(Debug, PartialEq, Eq)]
pub enum Line {
    Empty,
    Intent(Intent),
    /// Connect, optionally overriding the configured port.
    Connect(Option<String>),
    State,
    Ports,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConsoleError {
    #[error("unknown command :{0}, try :help")]
    UnknownCommand(String),

    #[error("missing argument <{0}>")]
    MissingArgument(&'static str),

    #[error("expected a whole number of millimeters, got {0:?}")]
    InvalidNumber(String),

    #[error("expected one of {expected}, got {got:?}")]
    InvalidChoice { expected: &'static str, got: String },
}

/// Parse one line typed at the console.
///
/// # Errors
///
/// Returns [`ConsoleError`] for unknown commands or malformed arguments.
pub fn parse(line: &str) -> Result<Line, ConsoleError> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix(':') else {
        if line.is_empty() {
            return Ok(Line::Empty);
        }
        return Ok(Line::Intent(Intent::SendRaw(line.to_string())));
    };

    let rest = rest.trim_start();
    let mut words = rest.split_whitespace();
    let Some(verb) = words.next() else {
        return Err(ConsoleError::UnknownCommand(String::new()));
    };

    let parsed = match verb.to_ascii_lowercase().as_str() {
        "connect" => Line::Connect(words.next().map(str::to_string)),
        "disconnect" => Line::Intent(Intent::Disconnect),
        "emulate" => Line::Intent(Intent::SetEmulation(on_off(words.next())?)),
        "move" => Line::Intent(Intent::MoveRelative {
            dx_mm: number(words.next(), "dx")?,
            dy_mm: number(words.next(), "dy")?,
        }),
        "abs" => Line::Intent(Intent::MoveAbsolute {
            x_mm: axis(words.next(), "x")?,
            y_mm: axis(words.next(), "y")?,
        }),
        "jog" => Line::Intent(Intent::Jog {
            direction: direction(words.next())?,
            step_mm: words
                .next()
                .map_or(Ok(DEFAULT_JOG_STEP_MM), |w| number(Some(w), "step"))?,
        }),
        "ws" => Line::Intent(Intent::SetWorkspace {
            max_x_mm: number(words.next(), "max_x")?,
            max_y_mm: number(words.next(), "max_y")?,
        }),
        "init" => Line::Intent(Intent::Command(Command::Initialize)),
        "pu" => Line::Intent(Intent::Command(Command::PenUp)),
        "pd" => Line::Intent(Intent::Command(Command::PenDown)),
        "query" => Line::Intent(Intent::Command(Command::QueryPosition)),
        "motor" => Line::Intent(Intent::Command(Command::Motor(on_off(words.next())?))),
        "flow" => {
            let program = rest[verb.len()..].trim();
            let program = if program.is_empty() { DEFAULT_FLOW } else { program };
            Line::Intent(Intent::ExecuteFlow(program.to_string()))
        }
        "state" => Line::State,
        "ports" => Line::Ports,
        "help" => Line::Help,
        "quit" | "exit" => Line::Quit,
        other => return Err(ConsoleError::UnknownCommand(other.to_string())),
    };
    Ok(parsed)
}

fn number(word: Option<&str>, name: &'static str) -> Result<i64, ConsoleError> {
    let word = word.ok_or(ConsoleError::MissingArgument(name))?;
    word.parse()
        .map_err(|_| ConsoleError::InvalidNumber(word.to_string()))
}

fn axis(word: Option<&str>, name: &'static str) -> Result<Option<i64>, ConsoleError> {
    match word {
        Some("-") => Ok(None),
        other => number(other, name).map(Some),
    }
}

fn on_off(word: Option<&str>) -> Result<bool, ConsoleError> {
    let word = word.ok_or(ConsoleError::MissingArgument("on|off"))?;
    match word.to_ascii_lowercase().as_str() {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err(ConsoleError::InvalidChoice {
            expected: "on, off",
            got: word.to_string(),
        }),
    }
}

fn direction(word: Option<&str>) -> Result<JogDirection, ConsoleError> {
    let word = word.ok_or(ConsoleError::MissingArgument("direction"))?;
    match word.to_ascii_lowercase().as_str() {
        "up" => Ok(JogDirection::Up),
        "down" => Ok(JogDirection::Down),
        "left" => Ok(JogDirection::Left),
        "right" => Ok(JogDirection::Right),
        _ => Err(ConsoleError::InvalidChoice {
            expected: "up, down, left, right",
            got: word.to_string(),
        }),
    }
}
