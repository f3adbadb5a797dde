use crate::lookup::LookupTable;

/// Ingredients for `code`, or `None` when the table has no such code.
///
/// Exact string equality. When several entries share the code, the first in
/// table order is returned; see [`LookupTable::from_rows`].
pub fn find_ingredients<'t>(table: &'t LookupTable, code: &str) -> Option<&'t str> {
    table.get(code).map(|entry| entry.ingredients.as_str())
}
