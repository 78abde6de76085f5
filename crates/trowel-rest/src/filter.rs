//! Resource paths with PostgREST horizontal filters.
//!
//! Values are appended as written, except for the handful of characters that
//! would terminate or corrupt the query component.

use std::fmt::{self, Display, Formatter};

/// A single PostgREST filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `column=eq.value`
    Eq {
        /// Column name.
        column: String,
        /// Compared value.
        value: String,
    },
    /// `column=ilike.pattern`
    ILike {
        /// Column name.
        column: String,
        /// Pattern (`*` is the PostgREST wildcard).
        pattern: String,
    },
    /// `column=cs.{a,b}` (array or range contains)
    Contains {
        /// Column name.
        column: String,
        /// Contained values.
        values: Vec<String>,
    },
    /// `or=(f1,f2,...)`
    Or(Vec<Filter>),
}

impl Filter {
    /// Equality filter.
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Case-insensitive pattern filter.
    #[must_use]
    pub fn ilike(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::ILike {
            column: column.into(),
            pattern: pattern.into(),
        }
    }

    /// Contains filter.
    #[must_use]
    pub fn contains<I, S>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Contains {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Disjunction of filters.
    #[must_use]
    pub const fn or(filters: Vec<Self>) -> Self {
        Self::Or(filters)
    }

    /// The `key=value` pair this filter contributes to the query string.
    #[must_use]
    pub fn query_pair(&self) -> (String, String) {
        match self {
            Self::Eq { column, .. } | Self::ILike { column, .. } | Self::Contains { column, .. } => {
                (column.clone(), self.operand())
            }
            Self::Or(filters) => ("or".to_string(), group(filters)),
        }
    }

    fn operand(&self) -> String {
        match self {
            Self::Eq { value, .. } => format!("eq.{}", escape(value)),
            Self::ILike { pattern, .. } => format!("ilike.{}", escape(pattern)),
            Self::Contains { values, .. } => {
                let joined = values.iter().map(|v| escape(v)).collect::<Vec<_>>().join(",");
                format!("cs.{{{joined}}}")
            }
            Self::Or(filters) => group(filters),
        }
    }

    fn nested(&self) -> String {
        match self {
            Self::Eq { column, .. } | Self::ILike { column, .. } | Self::Contains { column, .. } => {
                format!("{column}.{}", self.operand())
            }
            Self::Or(filters) => format!("or{}", group(filters)),
        }
    }
}

fn group(filters: &[Filter]) -> String {
    let inner = filters.iter().map(Filter::nested).collect::<Vec<_>>().join(",");
    format!("({inner})")
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '%' => escaped.push_str("%25"),
            '&' => escaped.push_str("%26"),
            '#' => escaped.push_str("%23"),
            '+' => escaped.push_str("%2B"),
            ' ' => escaped.push_str("%20"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// A resource path plus filters, rendered as `path?k=v&k=v`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    path: String,
    filters: Vec<Filter>,
}

impl ResourcePath {
    /// Wrap a resource path, which may already carry a query string.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            filters: Vec::new(),
        }
    }

    /// Append a filter.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Shorthand for the `uuid=eq.<id>` filter used by the record screens.
    #[must_use]
    pub fn by_uuid(path: impl Into<String>, uuid: &str) -> Self {
        Self::new(path).filter(Filter::eq("uuid", uuid))
    }
}

impl Display for ResourcePath {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.path)?;
        let mut separator = if self.path.contains('?') { '&' } else { '?' };
        for filter in &self.filters {
            let (key, value) = filter.query_pair();
            write!(formatter, "{separator}{key}={value}")?;
            separator = '&';
        }
        Ok(())
    }
}

impl From<ResourcePath> for String {
    fn from(path: ResourcePath) -> Self {
        path.to_string()
    }
}
