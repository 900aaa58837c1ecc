use anyhow::Result;
use std::path::Path;

use crate::bridge;
use crate::config::Config;
use crate::dialect::{self, Dialect};
use crate::error::SearchError;
use crate::parse::{self, PresentationMode, ResultLine};
use crate::process::{self, ExitPredicate, SearchCommand};
use crate::query::{self, PatternSet};

/// Per-subcommand search knobs from the CLI.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub tool: Option<String>,
    pub vimgrep: bool,
    pub ignore_case: bool,
    pub case_sensitive: bool,
}

/// Everything one search invocation decided: tool, dialect, translated
/// patterns, presentation mode, case folding. Built once, read-only
/// afterwards, and threaded through rendering and the edit builder
/// instead of living in globals.
#[derive(Debug, Clone)]
pub struct SearchSession {
    pub tool: String,
    pub dialect: Dialect,
    pub patterns: PatternSet,
    pub mode: PresentationMode,
    pub ignore_case: bool,
    pub command: SearchCommand,
}

/// A finished search: the session that produced it plus the materialized
/// match records.
#[derive(Debug)]
pub struct ResultSet {
    pub session: SearchSession,
    pub lines: Vec<ResultLine>,
}

/// Run one search to completion. The query may carry leading `-flags`
/// (terminated by `--`) which pass straight through to the tool.
pub fn search(
    raw_input: &str,
    targets: &[String],
    opts: &SearchOptions,
    config: &Config,
    verbose: u8,
) -> Result<ResultSet> {
    let trimmed = raw_input.trim();
    if trimmed.is_empty() {
        return Err(SearchError::EmptyQuery.into());
    }

    let (mut flags, query) = query::split_options(trimmed);
    if query.trim().is_empty() {
        return Err(SearchError::EmptyQuery.into());
    }

    if opts.ignore_case {
        flags.push("--ignore-case".to_string());
    }
    if opts.case_sensitive {
        flags.push("--case-sensitive".to_string());
    }
    let mut all_flags = config.tool.base_flags.clone();
    all_flags.extend(flags);

    let tool = resolve_tool(opts.tool.as_deref(), config)?;
    let dialect = dialect::classify(&tool, &all_flags);
    let patterns = query::translate(&query, dialect);
    let ignore_case = query::fold_case(&query, &all_flags);
    let mode = presentation_mode(opts.vimgrep, targets);

    let command = build_command(&tool, opts.vimgrep, &all_flags, &patterns.pattern, targets, ignore_case);

    if verbose > 0 {
        eprintln!(
            "{}: '{}' as {} ({})",
            tool, query, patterns.pattern, dialect
        );
        if matches!(dialect, Dialect::Pcre | Dialect::Re2) {
            // grep-equivalent echo, host convention
            eprintln!(
                "equivalent: grep -rn '{}' {}",
                bridge::pcre_to_bre(&patterns.pattern),
                if targets.is_empty() { "." } else { targets[0].as_str() }
            );
        }
    }

    let predicate = match &config.tool.success_codes {
        Some(codes) => ExitPredicate::AnyOf(codes.clone()),
        None => ExitPredicate::Zero,
    };

    let stdout = process::run_search(&command, &predicate, &query, verbose)?;
    let lines = parse::parse_output(&mode, &stdout);

    if lines.is_empty() {
        return Err(SearchError::NoResults { query }.into());
    }

    Ok(ResultSet {
        session: SearchSession {
            tool,
            dialect,
            patterns,
            mode,
            ignore_case,
            command,
        },
        lines,
    })
}

fn resolve_tool(requested: Option<&str>, config: &Config) -> Result<String> {
    if let Some(tool) = requested {
        return Ok(tool.to_string());
    }
    if let Some(tool) = &config.tool.default {
        return Ok(tool.clone());
    }
    for candidate in &config.tool.search_order {
        if which::which(candidate).is_ok() {
            return Ok(candidate.clone());
        }
    }
    anyhow::bail!(
        "no search tool found (tried: {}); install ripgrep or set tool.default",
        config.tool.search_order.join(", ")
    )
}

/// SingleTarget needs exactly one concrete non-directory target and a
/// non-vimgrep invocation; those are the only runs where tools omit the
/// filename column.
fn presentation_mode(vimgrep: bool, targets: &[String]) -> PresentationMode {
    if vimgrep {
        return PresentationMode::Vimgrep;
    }
    if targets.len() == 1 && Path::new(&targets[0]).is_file() {
        return PresentationMode::SingleTarget {
            file: targets[0].clone(),
        };
    }
    PresentationMode::MultiFile
}

fn tool_args(tool: &str, vimgrep: bool) -> Vec<String> {
    let args: &[&str] = match (tool, vimgrep) {
        ("rg", false) => &["--color", "never", "--no-heading", "--line-number"],
        ("rg", true) => &["--color", "never", "--vimgrep"],
        ("ag", false) => &["--nocolor", "--nogroup"],
        ("ag", true) => &["--nocolor", "--vimgrep"],
        ("pt", false) => &["--nocolor", "--nogroup"],
        ("pt", true) => &["--nocolor", "--nogroup", "--column"],
        ("ack", false) => &["--nocolor", "--nogroup"],
        ("ack", true) => &["--nocolor", "--nogroup", "--column"],
        _ => &[],
    };
    args.iter().map(|s| s.to_string()).collect()
}

fn build_command(
    tool: &str,
    vimgrep: bool,
    flags: &[String],
    pattern: &str,
    targets: &[String],
    ignore_case: bool,
) -> SearchCommand {
    let known = matches!(tool, "rg" | "ag" | "pt" | "ack");
    let mut args = tool_args(tool, vimgrep);

    if ignore_case
        && !flags
            .iter()
            .any(|f| f == "-i" || f == "--ignore-case")
        && known
    {
        args.push("-i".to_string());
    }
    args.extend(flags.iter().cloned());
    if known {
        // stop flag parsing so patterns like "-foo" survive
        args.push("--".to_string());
    }
    args.push(pattern.to_string());
    args.extend(targets.iter().cloned());

    SearchCommand {
        program: tool.to_string(),
        args,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn empty_query_is_rejected_before_spawn() {
        let config = Config::default();
        let err = search("   ", &[], &SearchOptions::default(), &config, 0).unwrap_err();
        let search_err = err.downcast_ref::<SearchError>().expect("SearchError");
        assert!(matches!(search_err, SearchError::EmptyQuery));

        // flags with no query are just as empty
        let err = search("-i --hidden", &[], &SearchOptions::default(), &config, 0).unwrap_err();
        let search_err = err.downcast_ref::<SearchError>().expect("SearchError");
        assert!(matches!(search_err, SearchError::EmptyQuery));
    }

    #[test]
    fn explicit_tool_is_not_availability_checked() {
        let mut config = Config::default();
        config.tool.default = None;
        let tool = resolve_tool(Some("no-such-tool"), &config).unwrap();
        assert_eq!(tool, "no-such-tool");
    }

    #[test]
    fn vimgrep_mode_wins_over_single_target() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let target = tmp.path().to_str().unwrap().to_string();
        assert_eq!(
            presentation_mode(true, std::slice::from_ref(&target)),
            PresentationMode::Vimgrep
        );
        assert_eq!(
            presentation_mode(false, std::slice::from_ref(&target)),
            PresentationMode::SingleTarget { file: target }
        );
    }

    #[test]
    fn directories_never_select_single_target() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().to_str().unwrap().to_string();
        assert_eq!(
            presentation_mode(false, &[target]),
            PresentationMode::MultiFile
        );
        assert_eq!(presentation_mode(false, &[]), PresentationMode::MultiFile);
    }

    #[test]
    fn command_gets_case_flag_only_when_folding() {
        let cmd = build_command("rg", false, &[], "foo", &[], true);
        assert!(cmd.args.contains(&"-i".to_string()));

        let cmd = build_command("rg", false, &[], "Foo", &[], false);
        assert!(!cmd.args.contains(&"-i".to_string()));

        // explicit user flag is not duplicated
        let flags = vec!["--ignore-case".to_string()];
        let cmd = build_command("rg", false, &flags, "foo", &[], true);
        assert_eq!(
            cmd.args.iter().filter(|a| *a == "-i" || *a == "--ignore-case").count(),
            1
        );
    }

    #[test]
    fn command_separates_pattern_from_flags() {
        let cmd = build_command("rg", false, &[], "-foo", &["src".into()], false);
        let sep = cmd.args.iter().position(|a| a == "--").unwrap();
        let pat = cmd.args.iter().position(|a| a == "-foo").unwrap();
        assert!(sep < pat);
        assert_eq!(cmd.args.last().unwrap(), "src");
    }

    #[test]
    fn unknown_tool_gets_no_invented_flags() {
        let cmd = build_command("customgrep", false, &[], "foo", &[], true);
        assert_eq!(cmd.args, vec!["foo"]);
    }
}
