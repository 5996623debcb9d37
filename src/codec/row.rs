use serde::Serialize;

/// One data line of an invoice, as ordered `(column, value)` pairs.
///
/// The schema is whatever the input header declared. Duplicate column names
/// are kept in place; name lookups resolve to the first occurrence unless an
/// occurrence index is given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvoiceRow {
    fields: Vec<(String, String)>,
}

impl InvoiceRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair each header with the field in the same position.
    pub fn from_record(headers: &[String], record: Vec<String>) -> Self {
        headers.iter().cloned().zip(record).collect()
    }

    /// Value of the first column called `column`.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.get_nth(column, 0)
    }

    /// Value of the `n`-th (zero based) column called `column`.
    pub fn get_nth(&self, column: &str, n: usize) -> Option<&str> {
        self.fields
            .iter()
            .filter(|(name, _)| name == column)
            .nth(n)
            .map(|(_, value)| value.as_str())
    }

    /// Overwrite the first `column`, or append it when the row has none.
    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| name == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column.to_string(), value)),
        }
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for InvoiceRow
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        InvoiceRow {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_columns_resolve_by_occurrence() {
        let row: InvoiceRow = [("메모", "first"), ("관리코드", "A1"), ("메모", "second")]
            .into_iter()
            .collect();

        assert_eq!(row.get("메모"), Some("first"));
        assert_eq!(row.get_nth("메모", 1), Some("second"));
        assert_eq!(row.get_nth("메모", 2), None);
        assert_eq!(row.get("없음"), None);
    }

    #[test]
    fn set_replaces_in_place_or_appends() {
        let mut row: InvoiceRow = [("a", "1"), ("b", "2")].into_iter().collect();
        row.set("a", "10");
        row.set("c", "3");

        assert_eq!(
            row.fields(),
            &[
                ("a".to_string(), "10".to_string()),
                ("b".to_string(), "2".to_string()),
                ("c".to_string(), "3".to_string()),
            ]
        );
    }
}
