//! Inserted row.
use crate::expr::{Expr, IntoExpr};

/// Ordered values of a single inserted row.
///
/// Values are positionally aligned to the insert column list, or to the
/// target table column order when no column list is given.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    values: Vec<Expr>,
}

impl Row {
    pub fn new() -> Row {
        Row { values: vec![] }
    }

    /// Append a value.
    pub fn push(&mut self, value: impl IntoExpr) {
        self.values.push(value.into_expr());
    }

    /// Append a value, builder style.
    pub fn with(mut self, value: impl IntoExpr) -> Row {
        self.push(value);
        self
    }

    /// Returns the number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if row contains no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Expr] {
        &self.values
    }
}

impl From<Vec<Expr>> for Row {
    fn from(values: Vec<Expr>) -> Self {
        Row { values }
    }
}

impl<V: IntoExpr> FromIterator<V> for Row {
    fn from_iter<T: IntoIterator<Item = V>>(iter: T) -> Self {
        Row { values: iter.into_iter().map(IntoExpr::into_expr).collect() }
    }
}

/// Type that can be converted into [`Row`].
pub trait IntoRow {
    fn into_row(self) -> Row;
}

impl IntoRow for Row {
    fn into_row(self) -> Row {
        self
    }
}

impl<V: IntoExpr> IntoRow for Vec<V> {
    fn into_row(self) -> Row {
        self.into_iter().collect()
    }
}

macro_rules! into_row_tuple {
    ($($t:ident $i:tt),*) => {
        impl<$($t),*> IntoRow for ($($t),*,)
        where
            $($t: IntoExpr),*
        {
            fn into_row(self) -> Row {
                Row { values: vec![$(self.$i.into_expr()),*] }
            }
        }
    };
}

into_row_tuple!(T0 0);
into_row_tuple!(T0 0, T1 1);
into_row_tuple!(T0 0, T1 1, T2 2);
into_row_tuple!(T0 0, T1 1, T2 2, T3 3);
into_row_tuple!(T0 0, T1 1, T2 2, T3 3, T4 4);
into_row_tuple!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5);
