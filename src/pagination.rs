//! This modules defines the common functionality for paging data.

use serde::Deserialize;

use crate::validation::{Constraint, Field, Validate};

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of results per page when not specified in a request.
    pub default_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 10,
        }
    }
}

/// The largest page number and page size a client may ask for.
pub const MAX_PAGE_SIZE: u64 = 50;
/// The longest search string a client may send.
pub const MAX_SEARCH_LENGTH: usize = 50;

const PAGE_CONSTRAINTS: &[Constraint] =
    &[Constraint::Min(1.0), Constraint::Max(MAX_PAGE_SIZE as f64)];
const SEARCH_CONSTRAINTS: &[Constraint] = &[Constraint::MaxChars(MAX_SEARCH_LENGTH)];

/// The paging and search parameters shared by the list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
}

impl Validate for PageQuery {
    fn fields(&self) -> Vec<Field<'_>> {
        page_fields(self.page, self.limit, self.search.as_deref())
    }
}

/// The fields of a page request, for query types that add their own fields to
/// those of [PageQuery].
pub fn page_fields(page: Option<u64>, limit: Option<u64>, search: Option<&str>) -> Vec<Field<'_>> {
    vec![
        Field::optional_number("page", page.map(|page| page as f64), PAGE_CONSTRAINTS),
        Field::optional_number("limit", limit.map(|limit| limit as f64), PAGE_CONSTRAINTS),
        Field::optional_text("search", search, SEARCH_CONSTRAINTS),
    ]
}

impl PageQuery {
    /// Resolve the page and page size, falling back to `config` for missing values.
    pub fn pagination(&self, config: &PaginationConfig) -> Pagination {
        Pagination {
            page: self.page.unwrap_or(config.default_page),
            limit: self.limit.unwrap_or(config.default_page_size),
        }
    }

    /// The search string, or `None` if it is missing or blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|search| !search.is_empty())
    }
}

/// A resolved page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// The 1-based page number.
    pub page: u64,
    /// The maximum number of results on a page.
    pub limit: u64,
}

impl Pagination {
    /// The number of rows to skip to get to the first row of the page.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1) * self.limit
    }
}

/// Wrap `search` in `%` so it can be used with `LIKE` for a substring match.
///
/// `%`, `_` and `\` in the search string are escaped so they match literally.
/// Use `ESCAPE '\'` in the SQL.
pub fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');

    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }

    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use crate::{
        pagination::{PageQuery, Pagination, PaginationConfig, like_pattern},
        validation::validate,
    };

    #[test]
    fn falls_back_to_config_defaults() {
        let config = PaginationConfig::default();

        let pagination = PageQuery::default().pagination(&config);

        assert_eq!(pagination, Pagination { page: 1, limit: 10 });
        assert_eq!(pagination.offset(), 0);
    }

    #[test]
    fn offset_skips_previous_pages() {
        let pagination = Pagination { page: 3, limit: 20 };

        assert_eq!(pagination.offset(), 40);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let query = PageQuery {
            page: Some(0),
            limit: Some(51),
            search: Some("x".repeat(51)),
        };

        let errors = validate(&query).unwrap_err();

        let fields: Vec<&str> = errors
            .violations()
            .iter()
            .map(|violation| violation.field.as_str())
            .collect();
        assert_eq!(fields, ["page", "limit", "search"]);
    }

    #[test]
    fn blank_search_is_ignored() {
        let query = PageQuery {
            search: Some("   ".to_owned()),
            ..Default::default()
        };

        assert_eq!(query.search_term(), None);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("food"), "%food%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }
}
