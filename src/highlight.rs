use aho_corasick::AhoCorasick;
use colored::Colorize;
use regex::Regex;
use serde::Serialize;

use crate::bridge;
use crate::dialect::Dialect;
use crate::query::PatternSet;

/// Byte range of a match inside a result body. Never zero-width, never
/// past the end of the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HighlightSpan {
    pub start: usize,
    pub end: usize,
}

/// Compiled highlighting for one search. Regex dialects get one compiled
/// sub-pattern per display token (invalid ones silently dropped); fixed
/// and unknown dialects get a single literal scan of the transmitted
/// pattern.
pub struct Highlighter {
    regexes: Vec<Regex>,
    literal: Option<AhoCorasick>,
}

impl Highlighter {
    pub fn new(patterns: &PatternSet, dialect: Dialect, ignore_case: bool) -> Self {
        match dialect {
            Dialect::Pcre | Dialect::Re2 => {
                // Display tokens, not the transmitted join: lookahead
                // plumbing would never compile here anyway. Negated
                // tokens assert absence, so there is nothing to mark.
                let regexes = patterns
                    .tokens
                    .iter()
                    .filter(|t| !t.negated && !t.text.is_empty())
                    .filter_map(|t| {
                        let converted = bridge::bre_to_pcre(&t.text);
                        let pattern = if ignore_case {
                            format!("(?i){}", converted)
                        } else {
                            converted
                        };
                        bridge::validated(&pattern)
                    })
                    .collect();
                Self {
                    regexes,
                    literal: None,
                }
            }
            Dialect::Fixed | Dialect::Unknown => {
                let literal = if patterns.pattern.is_empty() {
                    None
                } else {
                    AhoCorasick::builder()
                        .ascii_case_insensitive(ignore_case)
                        .build([patterns.pattern.as_str()])
                        .ok()
                };
                Self {
                    regexes: Vec::new(),
                    literal,
                }
            }
        }
    }

    /// All match spans in `body`: leftmost, repeated, non-overlapping per
    /// sub-pattern. Zero-width matches are skipped by advancing one
    /// character so the scan always makes progress. Spans from different
    /// sub-patterns may overlap each other.
    pub fn spans(&self, body: &str) -> Vec<HighlightSpan> {
        let mut spans = Vec::new();

        for re in &self.regexes {
            let mut at = 0;
            while at <= body.len() {
                let Some(m) = re.find_at(body, at) else {
                    break;
                };
                if m.start() == m.end() {
                    match next_boundary(body, m.end()) {
                        Some(next) => at = next,
                        None => break,
                    }
                    continue;
                }
                spans.push(HighlightSpan {
                    start: m.start(),
                    end: m.end(),
                });
                at = m.end();
            }
        }

        if let Some(ac) = &self.literal {
            for m in ac.find_iter(body) {
                spans.push(HighlightSpan {
                    start: m.start(),
                    end: m.end(),
                });
            }
        }

        spans
    }

    /// Body with every span rendered bold red. Overlaps collapse into one
    /// run, which makes span precedence a non-issue.
    pub fn render(&self, body: &str, color: bool) -> String {
        let spans = self.spans(body);
        if spans.is_empty() || !color {
            return body.to_string();
        }

        let mut mask = vec![false; body.len()];
        for span in &spans {
            for flag in &mut mask[span.start..span.end] {
                *flag = true;
            }
        }

        let mut out = String::with_capacity(body.len());
        let mut run_start = 0;
        let mut run_marked = mask.first().copied().unwrap_or(false);
        let flush = |out: &mut String, text: &str, marked: bool| {
            if text.is_empty() {
                return;
            }
            if marked {
                out.push_str(&text.red().bold().to_string());
            } else {
                out.push_str(text);
            }
        };
        for (i, _) in body.char_indices() {
            let marked = mask[i];
            if marked != run_marked {
                flush(&mut out, &body[run_start..i], run_marked);
                run_start = i;
                run_marked = marked;
            }
        }
        flush(&mut out, &body[run_start..], run_marked);
        out
    }
}

fn next_boundary(body: &str, at: usize) -> Option<usize> {
    body[at..].chars().next().map(|c| at + c.len_utf8())
}
