//! Recipient table — ordered recipient records ingested from CSV.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Header names (compared lowercased) that mark a per-recipient override
/// column: a non-empty value in this column supersedes the shared body
/// template for that recipient.
const OVERRIDE_COLUMNS: &[&str] = &[
    "customemail",
    "custom_email",
    "custom-email",
    "customcopy",
    "custom_copy",
];

/// One addressable target of a campaign, represented as named fields.
///
/// The field set is arbitrary and determined by the input source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recipient {
    fields: HashMap<String, String>,
}

impl Recipient {
    /// Create an empty recipient.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a field value. Field names are matched case-sensitively.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Set a field value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    /// The recipient's identity key: the first present, non-empty field among
    /// `id`, then `email`. Used for deduplication and outcome lookup.
    pub fn identity_key(&self) -> Option<&str> {
        self.get("id")
            .filter(|v| !v.is_empty())
            .or_else(|| self.get("email").filter(|v| !v.is_empty()))
    }
}

impl FromIterator<(String, String)> for Recipient {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Ordered collection of recipients plus the source header list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientTable {
    headers: Vec<String>,
    rows: Vec<Recipient>,
}

impl RecipientTable {
    /// Build a table from explicit headers and rows.
    pub fn new(headers: Vec<String>, rows: Vec<Recipient>) -> Self {
        Self { headers, rows }
    }

    /// Parse comma-separated input: first row is the header, values may be
    /// double-quote-wrapped, fields are trimmed. Rows shorter than the header
    /// are padded with empty strings; surplus values are ignored.
    pub fn from_csv(input: &str) -> Result<Self, IngestError> {
        if input.trim().is_empty() {
            return Err(IngestError::EmptyInput);
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(input.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut recipient = Recipient::new();
            for (i, header) in headers.iter().enumerate() {
                recipient.insert(header.clone(), record.get(i).unwrap_or_default());
            }
            rows.push(recipient);
        }

        Ok(Self { headers, rows })
    }

    /// Source header names, in input order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Iterate recipients in table order.
    pub fn iter(&self) -> std::slice::Iter<'_, Recipient> {
        self.rows.iter()
    }

    /// First recipient, if any.
    pub fn first(&self) -> Option<&Recipient> {
        self.rows.first()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The header carrying per-recipient override content, if any.
    pub fn override_column(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| OVERRIDE_COLUMNS.contains(&h.to_lowercase().as_str()))
            .map(String::as_str)
    }

    /// Non-empty override content for one recipient.
    pub fn override_content<'a>(&self, recipient: &'a Recipient) -> Option<&'a str> {
        self.override_column()
            .and_then(|column| recipient.get(column))
            .filter(|v| !v.is_empty())
    }

    /// Header names usable as template placeholders (the override column is
    /// content, not a variable).
    pub fn variables(&self) -> Vec<&str> {
        let override_column = self.override_column();
        self.headers
            .iter()
            .map(String::as_str)
            .filter(|h| Some(*h) != override_column)
            .collect()
    }
}

impl<'a> IntoIterator for &'a RecipientTable {
    type Item = &'a Recipient;
    type IntoIter = std::slice::Iter<'a, Recipient>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_rows_in_order() {
        let table =
            RecipientTable::from_csv("id,firstName,email\n1,Ana,a@x.com\n2,Bo,b@x.com").unwrap();

        assert_eq!(table.headers(), ["id", "firstName", "email"]);
        assert_eq!(table.len(), 2);
        let rows: Vec<_> = table.iter().collect();
        assert_eq!(rows[0].get("firstName"), Some("Ana"));
        assert_eq!(rows[1].get("email"), Some("b@x.com"));
    }

    #[test]
    fn strips_quotes_and_whitespace() {
        let table = RecipientTable::from_csv("id,name\n\"1\",\"Ana Lopez\"\n2, Bo ").unwrap();
        let rows: Vec<_> = table.iter().collect();
        assert_eq!(rows[0].get("id"), Some("1"));
        assert_eq!(rows[0].get("name"), Some("Ana Lopez"));
        assert_eq!(rows[1].get("name"), Some("Bo"));
    }

    #[test]
    fn short_rows_pad_missing_fields_with_empty_strings() {
        let table = RecipientTable::from_csv("id,name,email\n1,Ana").unwrap();
        let first = table.first().unwrap();
        assert_eq!(first.get("email"), Some(""));
    }

    #[test]
    fn surplus_values_are_ignored() {
        let table = RecipientTable::from_csv("id,name\n1,Ana,extra,junk").unwrap();
        let first = table.first().unwrap();
        assert_eq!(first.get("name"), Some("Ana"));
        assert_eq!(first.get("extra"), None);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            RecipientTable::from_csv("   \n  "),
            Err(IngestError::EmptyInput)
        ));
    }

    #[test]
    fn identity_key_prefers_id_then_email() {
        let table =
            RecipientTable::from_csv("id,email\n7,a@x.com\n,b@x.com\n,").unwrap();
        let rows: Vec<_> = table.iter().collect();
        assert_eq!(rows[0].identity_key(), Some("7"));
        assert_eq!(rows[1].identity_key(), Some("b@x.com"));
        assert_eq!(rows[2].identity_key(), None);
    }

    #[test]
    fn override_column_matches_case_insensitively() {
        for header in ["customEmail", "CUSTOM_COPY", "custom-email"] {
            let table = RecipientTable::from_csv(&format!("id,{header}\n1,hi")).unwrap();
            assert_eq!(table.override_column(), Some(header));
        }

        let table = RecipientTable::from_csv("id,email\n1,a@x.com").unwrap();
        assert_eq!(table.override_column(), None);
    }

    #[test]
    fn override_content_requires_non_empty_value() {
        let table = RecipientTable::from_csv("id,customEmail\n1,Special offer\n2,").unwrap();
        let rows: Vec<_> = table.iter().collect();
        assert_eq!(table.override_content(rows[0]), Some("Special offer"));
        assert_eq!(table.override_content(rows[1]), None);
    }

    #[test]
    fn variables_exclude_the_override_column() {
        let table = RecipientTable::from_csv("id,firstName,customEmail\n1,Ana,hi").unwrap();
        assert_eq!(table.variables(), ["id", "firstName"]);
    }

    #[test]
    fn parses_a_file_written_to_disk() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "id,name\n1,Ana\n2,Bo\n").unwrap();

        let input = std::fs::read_to_string(file.path()).unwrap();
        let table = RecipientTable::from_csv(&input).unwrap();
        assert_eq!(table.len(), 2);
    }
}
