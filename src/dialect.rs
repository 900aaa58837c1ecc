use std::path::Path;

/// Pattern semantics of the active search tool. Decided once per search
/// from the executable identity plus the flags it is invoked with, and
/// immutable for the lifetime of that search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Fixed-string matching, no metacharacters.
    Fixed,
    /// PCRE-style regex (ag, ack, rg --pcre2). Lookaheads available.
    Pcre,
    /// RE2-style regex (rg default, pt -e). No lookaround.
    Re2,
    /// Unrecognized tool: pass the query through untouched, no negation,
    /// literal highlighting only.
    Unknown,
}

impl Dialect {
    /// Only PCRE can express `!token` inversion (negative lookahead).
    pub fn supports_negation(self) -> bool {
        matches!(self, Dialect::Pcre)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Fixed => "fixed",
            Dialect::Pcre => "pcre",
            Dialect::Re2 => "re2",
            Dialect::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn has_any(flags: &[String], names: &[&str]) -> bool {
    flags.iter().any(|f| names.contains(&f.as_str()))
}

/// Fixed lookup by executable identity. `tool` may be a bare name or a
/// path; only the basename matters.
pub fn classify(tool: &str, flags: &[String]) -> Dialect {
    let name = Path::new(tool)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(tool);

    match name {
        "ag" => {
            if has_any(flags, &["-Q", "--literal", "-F", "--fixed-strings"]) {
                Dialect::Fixed
            } else {
                Dialect::Pcre
            }
        }
        "rg" => {
            if has_any(flags, &["-F", "--fixed-strings"]) {
                Dialect::Fixed
            } else if has_any(flags, &["-P", "--pcre2"]) {
                Dialect::Pcre
            } else {
                Dialect::Re2
            }
        }
        "pt" => {
            if has_any(flags, &["-e"]) {
                Dialect::Re2
            } else {
                Dialect::Fixed
            }
        }
        "ack" => {
            if has_any(flags, &["-Q", "--literal"]) {
                Dialect::Fixed
            } else {
                Dialect::Pcre
            }
        }
        _ => Dialect::Unknown,
    }
}
