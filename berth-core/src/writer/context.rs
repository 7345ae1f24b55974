#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    #[default]
    None,
    SqlSelect,
    SqlSelectFrom,
    SqlSelectWhere,
    SqlSelectOrderBy,
    SqlInsertInto,
    SqlInsertIntoValues,
    SqlUpdate,
    SqlUpdateSet,
    SqlUpdateWhere,
    SqlDeleteFrom,
    SqlDeleteFromWhere,
}

/// Rendering state threaded through the SQL writers.
///
/// Placeholder numbering lives in the [`SqlBuffer`](crate::SqlBuffer), so the
/// context is a plain copyable value describing where in the statement the
/// writer currently is and how it should treat values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub fragment: Fragment,
    pub qualify_columns: bool,
    /// Bind values as numbered parameters. Lowered to render inline literals.
    pub parameterize: bool,
    /// Criteria level switch disabling case folding on text comparisons.
    pub case_sensitive: bool,
}

impl Context {
    pub fn new(fragment: Fragment, qualify_columns: bool) -> Self {
        Self {
            fragment,
            qualify_columns,
            parameterize: true,
            case_sensitive: false,
        }
    }

    /// Same context rendering inline literals instead of binding parameters.
    pub fn literal(fragment: Fragment, qualify_columns: bool) -> Self {
        Self {
            parameterize: false,
            ..Self::new(fragment, qualify_columns)
        }
    }

    pub fn switch_fragment(&self, fragment: Fragment) -> Context {
        Context { fragment, ..*self }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new(Fragment::None, true)
    }
}
