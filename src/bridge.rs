use regex::Regex;

/// BRE <-> PCRE escape bridging for the metacharacter set `( ) { } |`.
///
/// On the BRE side (what shell users type at a grep prompt) these five
/// characters are literal when bare and metacharacters when escaped; PCRE
/// is the other way around. Converting is a single left-to-right pass that
/// toggles the backslash, treating `\\` as a literal backslash rather than
/// an escape. The whitespace classes also differ: BRE-side `\s-`/`\S-`
/// drop the trailing `-` going to PCRE and regain it coming back.
///
/// This is a textual transform, not a parser: metacharacters inside
/// character classes get toggled too. Accepted limitation; anything meant
/// for highlighting is validated afterwards and dropped when it no longer
/// compiles.

const BRIDGED: &[char] = &['(', ')', '{', '}', '|'];

fn is_bridged(c: char) -> bool {
    BRIDGED.contains(&c)
}

/// BRE-style -> PCRE-style: `\(` becomes `(` (group stays a group), bare
/// `(` becomes `\(` (literal stays literal), `\s-` becomes `\s`.
pub fn bre_to_pcre(pattern: &str) -> String {
    let mut result = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek().copied() {
                Some('\\') => {
                    result.push('\\');
                    result.push('\\');
                    chars.next();
                }
                Some(next) if is_bridged(next) => {
                    result.push(next);
                    chars.next();
                }
                Some('s') | Some('S') => {
                    result.push('\\');
                    result.push(chars.next().unwrap());
                    if chars.peek() == Some(&'-') {
                        chars.next();
                    }
                }
                // Any other escape (\d, \b, \., ...) means the same thing
                // on both sides; keep the backslash and let the next
                // iteration emit the char.
                _ => result.push('\\'),
            }
        } else if is_bridged(c) {
            result.push('\\');
            result.push(c);
        } else {
            result.push(c);
        }
    }
    result
}

/// PCRE-style -> BRE-style: the exact inverse of [`bre_to_pcre`].
pub fn pcre_to_bre(pattern: &str) -> String {
    let mut result = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek().copied() {
                Some('\\') => {
                    result.push('\\');
                    result.push('\\');
                    chars.next();
                }
                Some(next) if is_bridged(next) => {
                    result.push(next);
                    chars.next();
                }
                Some('s') => {
                    chars.next();
                    result.push_str("\\s-");
                }
                Some('S') => {
                    chars.next();
                    result.push_str("\\S-");
                }
                _ => result.push('\\'),
            }
        } else if is_bridged(c) {
            result.push('\\');
            result.push(c);
        } else {
            result.push(c);
        }
    }
    result
}

/// Compile a converted pattern, or reject it. Conversion is best-effort,
/// so everything destined for highlighting goes through here; a `None`
/// disables highlighting for that sub-pattern without failing the search.
pub fn validated(pattern: &str) -> Option<Regex> {
    Regex::new(pattern).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escaped_bre_group_becomes_bare_pcre_group() {
        assert_eq!(bre_to_pcre(r"foo\(bar\)"), "foo(bar)");
        assert_eq!(bre_to_pcre(r"a\|b"), "a|b");
        assert_eq!(bre_to_pcre(r"x\{2\}"), "x{2}");
    }

    #[test]
    fn bare_bre_literal_becomes_escaped_pcre_literal() {
        assert_eq!(bre_to_pcre("f(x)"), r"f\(x\)");
        assert_eq!(bre_to_pcre("a|b"), r"a\|b");
    }

    #[test]
    fn whitespace_class_loses_dash_going_to_pcre() {
        assert_eq!(bre_to_pcre(r"\s-+foo"), r"\s+foo");
        assert_eq!(bre_to_pcre(r"\S-+"), r"\S+");
        // already dash-less stays as-is
        assert_eq!(bre_to_pcre(r"\s+"), r"\s+");
    }

    #[test]
    fn double_backslash_is_a_literal_backslash_not_an_escape() {
        assert_eq!(bre_to_pcre(r"a\\(b"), r"a\\\(b");
        assert_eq!(pcre_to_bre(r"a\\(b"), r"a\\\(b");
    }

    #[test]
    fn common_escapes_pass_through_unchanged() {
        assert_eq!(bre_to_pcre(r"\d+\.\w+"), r"\d+\.\w+");
        assert_eq!(pcre_to_bre(r"\d+\.\w+"), r"\d+\.\w+");
        assert_eq!(bre_to_pcre(r"\bword\b"), r"\bword\b");
    }

    #[test]
    fn pcre_to_bre_inverts_groups_and_literals() {
        assert_eq!(pcre_to_bre("(foo|bar)"), r"\(foo\|bar\)");
        assert_eq!(pcre_to_bre(r"f\(x\)"), "f(x)");
        assert_eq!(pcre_to_bre(r"\s+"), r"\s-+");
    }

    #[test]
    fn round_trip_restores_original() {
        for input in [
            r"foo\(bar\|baz\)",
            "plain text",
            "f(x) = y",
            r"x\{1\}|y",
            r"\s-*end",
            r"lit\\eral",
        ] {
            assert_eq!(pcre_to_bre(&bre_to_pcre(input)), input, "input: {input}");
        }
    }

    #[test]
    fn trailing_backslash_survives() {
        assert_eq!(bre_to_pcre(r"foo\"), r"foo\");
        assert_eq!(pcre_to_bre(r"foo\"), r"foo\");
    }

    #[test]
    fn validation_rejects_broken_output() {
        assert!(validated("(unclosed").is_none());
        assert!(validated(r"fo+o").is_some());
        // lookaheads do not compile in the display engine; they get dropped
        assert!(validated(r"^(?!.*bar).+$").is_none());
    }
}
