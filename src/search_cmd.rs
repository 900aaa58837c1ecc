use anyhow::Result;
use serde_json::json;

use crate::config::Config;
use crate::error::SearchError;
use crate::highlight::Highlighter;
use crate::parse::{self, PresentationMode, ResultLine};
use crate::session::{self, ResultSet, SearchOptions};

pub fn run(
    query: &str,
    targets: &[String],
    opts: &SearchOptions,
    max_results: usize,
    json_output: bool,
    verbose: u8,
) -> Result<()> {
    let config = Config::load()?;
    if !config.display.colors {
        colored::control::set_override(false);
    }

    let set = match session::search(query, targets, opts, &config, verbose) {
        Ok(set) => set,
        Err(err) => {
            if let Some(SearchError::NoResults { query }) = err.downcast_ref::<SearchError>() {
                println!("{}0 for '{}'", glass(&config), query);
                return Ok(());
            }
            return Err(err);
        }
    };

    let cap = if max_results == 0 {
        usize::MAX
    } else {
        max_results
    };
    let highlighter = Highlighter::new(
        &set.session.patterns,
        set.session.dialect,
        set.session.ignore_case,
    );

    if json_output {
        print_json(&set, &highlighter, cap);
        return Ok(());
    }

    match &set.session.mode {
        PresentationMode::SingleTarget { file } => {
            println!(
                "{}{} for '{}' in {}",
                glass(&config),
                set.lines.len(),
                set.session.patterns.raw,
                display_path(&config, file)
            );
            for line in set.lines.iter().take(cap) {
                println!(
                    "  {:>4}: {}",
                    line.line_number,
                    highlighter.render(&line.body, config.display.colors)
                );
            }
            if set.lines.len() > cap {
                println!("... +{}", set.lines.len() - cap);
            }
        }
        _ => print_grouped(&config, &set, &highlighter, cap),
    }

    Ok(())
}

fn print_grouped(config: &Config, set: &ResultSet, highlighter: &Highlighter, cap: usize) {
    let mut order: Vec<&str> = Vec::new();
    let mut by_file: std::collections::HashMap<&str, Vec<&ResultLine>> =
        std::collections::HashMap::new();
    for line in &set.lines {
        by_file
            .entry(line.file.as_str())
            .or_insert_with(|| {
                order.push(line.file.as_str());
                Vec::new()
            })
            .push(line);
    }

    println!(
        "{}{} in {}F for '{}'\n",
        glass(config),
        set.lines.len(),
        order.len(),
        set.session.patterns.raw
    );

    let mut shown = 0;
    for file in &order {
        if shown >= cap {
            break;
        }
        let matches = &by_file[file];
        println!(
            "{}{} ({}):",
            if config.display.emoji { "📄 " } else { "" },
            display_path(config, file),
            matches.len()
        );
        for line in matches {
            if shown >= cap {
                break;
            }
            println!(
                "  {:>4}: {}",
                line.line_number,
                highlighter.render(&line.body, config.display.colors)
            );
            shown += 1;
        }
        println!();
    }

    if set.lines.len() > shown {
        println!("... +{}", set.lines.len() - shown);
    }
}

fn print_json(set: &ResultSet, highlighter: &Highlighter, cap: usize) {
    let lines: Vec<_> = set
        .lines
        .iter()
        .take(cap)
        .map(|line| {
            json!({
                "file": line.file,
                "line": line.line_number,
                "body": line.body,
                "spans": highlighter.spans(&line.body),
            })
        })
        .collect();

    let doc = json!({
        "query": set.session.patterns.raw,
        "pattern": set.session.patterns.pattern,
        "tool": set.session.tool,
        "dialect": set.session.dialect.as_str(),
        "total": set.lines.len(),
        "shown": lines.len(),
        "lines": lines,
    });
    // always serializable: built from strings and numbers
    println!("{}", serde_json::to_string_pretty(&doc).unwrap());
}

fn glass(config: &Config) -> &'static str {
    if config.display.emoji {
        "🔍 "
    } else {
        ""
    }
}

fn display_path(config: &Config, path: &str) -> String {
    if config.display.abbreviate_home {
        parse::abbreviate_home(path)
    } else {
        path.to_string()
    }
}
