use std::io::ErrorKind;
use std::process::Command;

use crate::error::SearchError;

/// What exit status counts as success for the active tool. `rg` and `ag`
/// exit 1 on "no match", but a no-match run also produces empty output,
/// which is classified first, so `Zero` remains a safe default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitPredicate {
    Zero,
    Exact(i32),
    AnyOf(Vec<i32>),
}

impl ExitPredicate {
    pub fn accepts(&self, code: i32) -> bool {
        match self {
            ExitPredicate::Zero => code == 0,
            ExitPredicate::Exact(expected) => code == *expected,
            ExitPredicate::AnyOf(codes) => codes.contains(&code),
        }
    }
}

/// A fully assembled tool invocation: program plus ordered argument list.
#[derive(Debug, Clone)]
pub struct SearchCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl SearchCommand {
    /// Shell-ish rendering for verbose diagnostics.
    pub fn render(&self) -> String {
        let mut out = self.program.clone();
        for arg in &self.args {
            out.push(' ');
            if arg.contains(' ') || arg.is_empty() {
                out.push('\'');
                out.push_str(arg);
                out.push('\'');
            } else {
                out.push_str(arg);
            }
        }
        out
    }
}

/// Run the tool to completion and hand back its entire stdout as one
/// batch. Classification order matters: a missing binary is "not
/// installed", empty output is "no results" regardless of exit status
/// (no-match exits 1 on most tools), and only then does a rejected exit
/// status become "search failed" with the tool's stderr attached.
pub fn run_search(
    cmd: &SearchCommand,
    predicate: &ExitPredicate,
    query: &str,
    verbose: u8,
) -> Result<String, SearchError> {
    if verbose > 1 {
        eprintln!("spawn: {}", cmd.render());
    }

    let output = match Command::new(&cmd.program).args(&cmd.args).output() {
        Ok(output) => output,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(SearchError::ToolNotInstalled {
                tool: cmd.program.clone(),
            });
        }
        Err(err) => {
            return Err(SearchError::SearchFailed {
                query: query.to_string(),
                detail: err.to_string(),
            });
        }
    };

    // Some tools emit CRLF on Windows; strip before any parsing.
    let stdout = String::from_utf8_lossy(&output.stdout).replace('\r', "");

    if stdout.trim().is_empty() {
        return Err(SearchError::NoResults {
            query: query.to_string(),
        });
    }

    let code = output.status.code().unwrap_or(-1);
    if !predicate.accepts(code) {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SearchError::SearchFailed {
            query: query.to_string(),
            detail: format!("exit {}: {}", code, stderr.trim()),
        });
    }

    Ok(stdout)
}
