use thiserror::Error;

/// Search failures a caller must be able to tell apart: a missing binary
/// wants an install hint, an empty result set wants a calm one-liner, and
/// a real failure wants the tool's own diagnostics.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query is empty")]
    EmptyQuery,

    #[error("search tool not installed: {tool}")]
    ToolNotInstalled { tool: String },

    #[error("search failed for '{query}': {detail}")]
    SearchFailed { query: String, detail: String },

    #[error("no results for '{query}'")]
    NoResults { query: String },
}

impl SearchError {
    /// Exit code 1 for "nothing found", 2 for everything that went wrong.
    pub fn exit_code(&self) -> i32 {
        match self {
            SearchError::NoResults { .. } => 1,
            _ => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_results_is_distinguishable_by_downcast() {
        let err = anyhow::Error::new(SearchError::NoResults {
            query: "foo".into(),
        });
        let search_err = err.downcast_ref::<SearchError>().expect("SearchError");
        assert!(matches!(search_err, SearchError::NoResults { .. }));
        assert_eq!(search_err.exit_code(), 1);
    }

    #[test]
    fn messages_name_the_query() {
        let err = SearchError::SearchFailed {
            query: "foo".into(),
            detail: "regex parse error".into(),
        };
        assert!(err.to_string().contains("'foo'"));
        assert!(err.to_string().contains("regex parse error"));
    }
}
