//! Parameterized SQL fragments.
//!
//! A fragment is a SQL template using `?` placeholders together with the
//! ordered list of values bound to them. Fragments compose by concatenating
//! templates and parameter lists in the same order, so parameter positions
//! always stay aligned with the placeholders. Only trusted tokens derived
//! from validated options (function names, operators, configuration names) are
//! interpolated into templates; user data is always a parameter.

/// A SQL fragment with associated parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    /// The SQL template with `?` placeholders.
    pub sql: String,
    /// The parameter values, in placeholder order.
    pub params: Vec<SqlParam>,
}

/// A SQL parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// Text parameter.
    Text(String),
    /// Floating point parameter.
    Float(f64),
    /// Integer parameter.
    Integer(i64),
    /// Boolean parameter.
    Bool(bool),
    /// Dense vector, bound as its pgvector text form.
    Vector(Vec<f32>),
    /// Bit string, bound as its `0`/`1` text form.
    Bits(Vec<bool>),
}

impl SqlParam {
    /// Creates a text parameter.
    pub fn text(s: impl Into<String>) -> Self {
        SqlParam::Text(s.into())
    }

    /// Returns the pgvector input literal for a dense vector, e.g. `[1,0.5]`.
    pub fn vector_literal(values: &[f32]) -> String {
        let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        format!("[{}]", items.join(","))
    }

    /// Returns the bit string literal for a binary vector, e.g. `0110`.
    pub fn bits_literal(bits: &[bool]) -> String {
        bits.iter().map(|b| if *b { '1' } else { '0' }).collect()
    }
}

impl SqlFragment {
    /// Creates a new fragment with no parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Creates a fragment with parameters.
    pub fn with_params(sql: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Creates a single bound placeholder, `?`.
    pub fn param(param: SqlParam) -> Self {
        Self::with_params("?", vec![param])
    }

    /// The SQL `false` literal, the base case of an OR chain.
    pub fn falsy() -> Self {
        Self::new("false")
    }

    /// Combines two fragments with AND.
    pub fn and(self, other: SqlFragment) -> SqlFragment {
        SqlFragment {
            sql: format!("({}) AND ({})", self.sql, other.sql),
            params: [self.params, other.params].concat(),
        }
    }

    /// Combines two fragments with OR.
    pub fn or(self, other: SqlFragment) -> SqlFragment {
        SqlFragment {
            sql: format!("({}) OR ({})", self.sql, other.sql),
            params: [self.params, other.params].concat(),
        }
    }

    /// Appends another fragment verbatim.
    pub fn concat(mut self, other: SqlFragment) -> SqlFragment {
        self.sql.push_str(&other.sql);
        self.params.extend(other.params);
        self
    }

    /// Appends trusted SQL text with no parameters.
    pub fn push_sql(mut self, sql: &str) -> SqlFragment {
        self.sql.push_str(sql);
        self
    }

    /// Surrounds the fragment with trusted prefix and suffix text.
    pub fn wrap(self, prefix: &str, suffix: &str) -> SqlFragment {
        SqlFragment {
            sql: format!("{}{}{}", prefix, self.sql, suffix),
            params: self.params,
        }
    }

    /// Joins fragments with a trusted separator.
    pub fn join<I>(fragments: I, separator: &str) -> SqlFragment
    where
        I: IntoIterator<Item = SqlFragment>,
    {
        let mut joined = SqlFragment::new("");
        for (i, fragment) in fragments.into_iter().enumerate() {
            if i > 0 {
                joined.sql.push_str(separator);
            }
            joined = joined.concat(fragment);
        }
        joined
    }

    /// Calls a SQL function with the given argument fragments.
    pub fn call<I>(function: &str, args: I) -> SqlFragment
    where
        I: IntoIterator<Item = SqlFragment>,
    {
        Self::join(args, ", ").wrap(&format!("{}(", function), ")")
    }

    /// Returns the number of `?` placeholders in the template.
    pub fn placeholder_count(&self) -> usize {
        count_placeholders(&self.sql)
    }

    /// Returns true if every placeholder has exactly one bound parameter.
    pub fn is_aligned(&self) -> bool {
        self.placeholder_count() == self.params.len()
    }

    /// Returns true if this fragment is empty.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Tracks whether the scanner is inside a quoted literal or identifier.
///
/// A doubled quote closes and reopens the same quote, so `''` and `""`
/// escapes need no special case.
#[derive(Default)]
struct QuoteState {
    open: Option<char>,
}

impl QuoteState {
    /// Feeds one character and returns true if it is a live placeholder.
    fn is_placeholder(&mut self, c: char) -> bool {
        match (self.open, c) {
            (None, '\'' | '"') => self.open = Some(c),
            (Some(quote), c) if c == quote => self.open = None,
            (None, '?') => return true,
            _ => {}
        }
        false
    }
}

/// Counts `?` placeholders outside quoted literals and identifiers.
pub(crate) fn count_placeholders(sql: &str) -> usize {
    let mut quotes = QuoteState::default();
    sql.chars().filter(|c| quotes.is_placeholder(*c)).count()
}

/// Rewrites `?` placeholders as `$N`, starting after `offset`.
///
/// Returns the rewritten SQL and the last placeholder number used.
pub(crate) fn number_placeholders(sql: &str, offset: usize) -> (String, usize) {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut quotes = QuoteState::default();
    let mut current = offset;
    for c in sql.chars() {
        if quotes.is_placeholder(c) {
            current += 1;
            out.push('$');
            out.push_str(&current.to_string());
        } else {
            out.push(c);
        }
    }
    (out, current)
}
