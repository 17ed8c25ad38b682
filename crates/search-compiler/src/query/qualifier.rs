//! Column references scoped to query bindings.
//!
//! A [`Qualifier`] names a column, or a computed expression, on one bound
//! table alias. [`Qualifiers`] normalizes one or many of them into an ordered
//! sequence so every search builder works over a list.

use super::fragment::SqlFragment;

/// Quotes an SQL identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// What a qualifier points at.
#[derive(Debug, Clone, PartialEq)]
enum Target {
    /// A plain column on the alias.
    Column(String),
    /// A computed expression; `{alias}` in the template is replaced by the
    /// quoted alias.
    Expression { name: String, template: SqlFragment },
}

/// A column or expression reference scoped to one bound alias.
#[derive(Debug, Clone, PartialEq)]
pub struct Qualifier {
    alias: String,
    target: Target,
}

impl Qualifier {
    /// References `alias.column`.
    pub fn column(alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            target: Target::Column(column.into()),
        }
    }

    /// References a computed expression on `alias`.
    ///
    /// `name` identifies the expression in options such as
    /// `nullable_columns`.
    pub fn expression(
        alias: impl Into<String>,
        name: impl Into<String>,
        template: SqlFragment,
    ) -> Self {
        Self {
            alias: alias.into(),
            target: Target::Expression {
                name: name.into(),
                template,
            },
        }
    }

    /// The binding alias this qualifier is scoped to.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// The column name, or the expression's name.
    pub fn name(&self) -> &str {
        match &self.target {
            Target::Column(column) => column,
            Target::Expression { name, .. } => name,
        }
    }

    /// Renders the qualifier as a SQL fragment.
    pub fn to_fragment(&self) -> SqlFragment {
        let alias = quote_ident(&self.alias);
        match &self.target {
            Target::Column(column) => {
                SqlFragment::new(format!("{}.{}", alias, quote_ident(column)))
            }
            Target::Expression { template, .. } => SqlFragment::with_params(
                template.sql.replace("{alias}", &alias),
                template.params.clone(),
            ),
        }
    }
}

/// An ordered, normalized list of qualifiers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Qualifiers(Vec<Qualifier>);

impl Qualifiers {
    /// Creates a qualifier list.
    pub fn new(qualifiers: Vec<Qualifier>) -> Self {
        Self(qualifiers)
    }

    /// Number of qualifiers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no qualifiers.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates qualifiers in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Qualifier> {
        self.0.iter()
    }

    /// Renders every qualifier as a fragment, in order.
    pub fn fragments(&self) -> Vec<SqlFragment> {
        self.0.iter().map(Qualifier::to_fragment).collect()
    }

    /// The single qualifier when exactly one is present.
    pub fn single(&self) -> Option<&Qualifier> {
        match self.0.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

impl From<Qualifier> for Qualifiers {
    fn from(qualifier: Qualifier) -> Self {
        Self(vec![qualifier])
    }
}

impl From<Vec<Qualifier>> for Qualifiers {
    fn from(qualifiers: Vec<Qualifier>) -> Self {
        Self(qualifiers)
    }
}

impl FromIterator<Qualifier> for Qualifiers {
    fn from_iter<I: IntoIterator<Item = Qualifier>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Qualifiers {
    type Item = &'a Qualifier;
    type IntoIter = std::slice::Iter<'a, Qualifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SqlParam;

    #[test]
    fn test_column_fragment() {
        let q = Qualifier::column("p", "title");
        assert_eq!(q.to_fragment().sql, "\"p\".\"title\"");
        assert_eq!(q.alias(), "p");
        assert_eq!(q.name(), "title");
    }

    #[test]
    fn test_quote_ident_escapes() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_expression_substitutes_alias() {
        let q = Qualifier::expression(
            "p",
            "title_prefix",
            SqlFragment::with_params("left({alias}.\"title\", ?)", vec![SqlParam::Integer(3)]),
        );
        let frag = q.to_fragment();
        assert_eq!(frag.sql, "left(\"p\".\"title\", ?)");
        assert_eq!(frag.params, vec![SqlParam::Integer(3)]);
        assert_eq!(q.name(), "title_prefix");
    }

    #[test]
    fn test_single_and_list_normalize() {
        let one: Qualifiers = Qualifier::column("p", "title").into();
        assert_eq!(one.len(), 1);
        assert!(one.single().is_some());

        let many: Qualifiers = vec![
            Qualifier::column("p", "title"),
            Qualifier::column("p", "body"),
        ]
        .into();
        assert_eq!(many.len(), 2);
        assert!(many.single().is_none());
        let names: Vec<&str> = many.iter().map(Qualifier::name).collect();
        assert_eq!(names, vec!["title", "body"]);
    }
}
