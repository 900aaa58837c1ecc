use crate::bridge;
use crate::dialect::Dialect;

/// One token of the user query, host (BRE) convention, negation already
/// stripped off the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryToken {
    pub text: String,
    pub negated: bool,
}

/// The decomposed query plus the single pattern string actually handed to
/// the external tool. Owned by one search invocation, read-only after
/// construction.
#[derive(Debug, Clone)]
pub struct PatternSet {
    /// Literal query as typed (after the option split).
    pub raw: String,
    pub tokens: Vec<QueryToken>,
    /// Joined pattern transmitted to the tool (PCRE/RE2 convention for
    /// regex dialects, verbatim for fixed/unknown).
    pub pattern: String,
}

/// Split leading `-flag` tokens off a raw input. Flags run up to an
/// optional standalone `--`; everything after it is literal query even if
/// it starts with `-`. Returns (flags in discovery order, query).
pub fn split_options(input: &str) -> (Vec<String>, String) {
    let mut flags = Vec::new();
    let mut rest = input.trim_start();

    loop {
        let token_end = rest.find(' ').unwrap_or(rest.len());
        let token = &rest[..token_end];

        if token == "--" {
            rest = rest[token_end..].trim_start();
            break;
        }
        if token.len() > 1 && token.starts_with('-') {
            flags.push(token.to_string());
            rest = rest[token_end..].trim_start();
            if rest.is_empty() {
                break;
            }
            continue;
        }
        break;
    }

    (flags, rest.to_string())
}

/// Split on spaces, except `\ ` which joins tokens and unescapes to a
/// literal space.
pub fn tokenize(query: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = query.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&' ') => {
                current.push(' ');
                chars.next();
            }
            ' ' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// `!x` (length > 1) marks an inverted token when the dialect can express
/// it; everywhere else it stays a literal `!x`.
fn to_token(raw: &str, dialect: Dialect) -> QueryToken {
    if dialect.supports_negation() && raw.len() > 1 && raw.starts_with('!') {
        QueryToken {
            text: raw[1..].to_string(),
            negated: true,
        }
    } else {
        QueryToken {
            text: raw.to_string(),
            negated: false,
        }
    }
}

/// A negated PCRE token matches a whole line that does not contain it.
fn pcre_negate(token: &str) -> String {
    format!("^(?!.*{}).+$", token)
}

/// Translate the literal query into the transmitted pattern for the
/// active dialect.
///
/// Fixed and unknown dialects pass the raw query through untokenized:
/// fixed tools treat spaces literally, and an unknown tool's syntax is
/// nobody's guess. PCRE chains every token as a positive lookahead
/// (logical AND, order-independent); RE2 has no lookaround, so tokens are
/// joined with `.*` as an ordered approximation and negation degrades to
/// a literal token. A single plain token is always passed through as
/// itself.
pub fn translate(raw_query: &str, dialect: Dialect) -> PatternSet {
    match dialect {
        Dialect::Fixed | Dialect::Unknown => PatternSet {
            raw: raw_query.to_string(),
            tokens: vec![QueryToken {
                text: raw_query.to_string(),
                negated: false,
            }],
            pattern: raw_query.to_string(),
        },
        Dialect::Pcre => {
            let tokens: Vec<QueryToken> = tokenize(raw_query)
                .iter()
                .map(|t| to_token(t, dialect))
                .collect();
            let converted: Vec<String> = tokens
                .iter()
                .map(|t| {
                    let pcre = bridge::bre_to_pcre(&t.text);
                    if t.negated {
                        pcre_negate(&pcre)
                    } else {
                        pcre
                    }
                })
                .collect();
            let pattern = match converted.len() {
                0 => String::new(),
                1 => converted.into_iter().next().unwrap(),
                _ => converted
                    .iter()
                    .map(|p| format!("(?={}{})", if p.starts_with('^') { "" } else { ".*" }, p))
                    .collect(),
            };
            PatternSet {
                raw: raw_query.to_string(),
                tokens,
                pattern,
            }
        }
        Dialect::Re2 => {
            let tokens: Vec<QueryToken> = tokenize(raw_query)
                .iter()
                .map(|t| to_token(t, dialect))
                .collect();
            let converted: Vec<String> = tokens
                .iter()
                .map(|t| bridge::bre_to_pcre(&t.text))
                .collect();
            PatternSet {
                raw: raw_query.to_string(),
                tokens,
                pattern: converted.join(".*"),
            }
        }
    }
}

/// Conventional grep case folding: explicit flags win, otherwise fold
/// exactly when the query has no uppercase letter.
pub fn fold_case(query: &str, flags: &[String]) -> bool {
    if flags.iter().any(|f| f == "-i" || f == "--ignore-case") {
        return true;
    }
    if flags.iter().any(|f| f == "-s" || f == "--case-sensitive") {
        return false;
    }
    !query.chars().any(|c| c.is_uppercase())
}
