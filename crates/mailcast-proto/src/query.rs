//! Search-query construction from the two free-text filter fields.

use std::fmt;

/// The values currently typed into the filter form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub from: String,
    pub title: String,
}

impl Filter {
    pub fn new(from: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            title: title.into(),
        }
    }

    pub fn query(&self) -> SearchQuery {
        build_query(&self.from, &self.title)
    }
}

/// A percent-encoded search string, ready to be used as the `q` parameter.
/// Empty when the filter produced no clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the encoded query for a `from` / `title` pair.
///
/// `from` becomes a single `from:<value>` clause (inner whitespace kept).
/// `title` is split on whitespace runs into one `subject:<token>` clause per
/// word. Clauses are joined with a single space before encoding.
pub fn build_query(from: &str, title: &str) -> SearchQuery {
    let mut clauses = Vec::new();

    let from = from.trim();
    if !from.is_empty() {
        clauses.push(format!("from:{}", from));
    }
    clauses.extend(title.split_whitespace().map(|t| format!("subject:{}", t)));

    if clauses.is_empty() {
        return SearchQuery::default();
    }
    SearchQuery(urlencoding::encode(&clauses.join(" ")).into_owned())
}
