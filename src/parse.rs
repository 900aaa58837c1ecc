use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

/// How the tool's output lines are shaped for this search. Picked once
/// per invocation, never re-derived mid-parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentationMode {
    /// Exactly one concrete file target: the tool omits the filename and
    /// prints `LINE:body`.
    SingleTarget { file: String },
    /// `file:line:column:body`; the column is parsed and discarded.
    Vimgrep,
    /// `file:line:body`, the default multi-file shape.
    MultiFile,
}

/// One parsed match. Immutable once built; `raw` keeps the original
/// output line for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultLine {
    pub file: String,
    pub line_number: u64,
    pub body: String,
    pub raw: String,
}

lazy_static! {
    // `[:-]` also accepts context lines from -A/-B style output.
    static ref SINGLE_RE: Regex = Regex::new(r"^(\d+)[:-](.*)$").expect("valid single-target regex");
    static ref VIMGREP_RE: Regex =
        Regex::new(r"^([^:]+):(\d+):(\d+):(.*)$").expect("valid vimgrep regex");
    static ref MULTI_RE: Regex =
        Regex::new(r"^([^:]+):(\d+)[:-](.*)$").expect("valid multi-file regex");
}

/// Parse one output line, or drop it. Warnings, blank separators and
/// group delimiters simply do not match the active pattern; a line number
/// of zero violates the 1-based contract and is dropped the same way.
pub fn parse_line(mode: &PresentationMode, line: &str) -> Option<ResultLine> {
    let (file, number, body) = match mode {
        PresentationMode::SingleTarget { file } => {
            let caps = SINGLE_RE.captures(line)?;
            (
                file.clone(),
                caps.get(1)?.as_str(),
                caps.get(2)?.as_str().to_string(),
            )
        }
        PresentationMode::Vimgrep => {
            let caps = VIMGREP_RE.captures(line)?;
            (
                caps.get(1)?.as_str().to_string(),
                caps.get(2)?.as_str(),
                caps.get(4)?.as_str().to_string(),
            )
        }
        PresentationMode::MultiFile => {
            let caps = MULTI_RE.captures(line)?;
            (
                caps.get(1)?.as_str().to_string(),
                caps.get(2)?.as_str(),
                caps.get(3)?.as_str().to_string(),
            )
        }
    };

    let line_number: u64 = number.parse().ok()?;
    if line_number == 0 {
        return None;
    }

    Some(ResultLine {
        file,
        line_number,
        body,
        raw: line.to_string(),
    })
}

/// Parse a whole captured batch. No streaming: the process has already
/// finished by the time this runs.
pub fn parse_output(mode: &PresentationMode, output: &str) -> Vec<ResultLine> {
    output
        .lines()
        .filter_map(|line| parse_line(mode, line))
        .collect()
}

/// Home-relative abbreviation for display. Never used for file I/O.
pub fn abbreviate_home(path: &str) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = Path::new(path).strip_prefix(&home) {
            return format!("~/{}", rest.display());
        }
    }
    path.to_string()
}
