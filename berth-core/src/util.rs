use crate::SqlBuffer;

/// Print `values` through `f` separating consecutive emissions.
///
/// The separator is only inserted between items that actually wrote something,
/// an item printing nothing does not produce a dangling separator.
pub fn separated_by<T, F>(
    out: &mut SqlBuffer,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut SqlBuffer, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Largest index no greater than `index` that falls on a character boundary.
pub fn floor_char_boundary(s: &str, index: usize) -> usize {
    let mut index = index.min(s.len());
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}",
            &$query[..$crate::floor_char_boundary(&$query, 497)].trim_end(),
            if $query.len() > 497 { "..." } else { "" },
        )
    };
}
