//! Template rendering — placeholder substitution and the body signature.

use std::sync::OnceLock;

use regex::Regex;

use crate::recipients::{Recipient, RecipientTable};

/// Signature block appended to every rendered body.
pub const SIGNATURE: &str = "\n\n---\nBest regards,\nThe Maildrip Team\n";

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([^{}]+)\}").unwrap())
}

/// Replace every `{field}` placeholder with the recipient's value for that
/// field, or the empty string when the field is absent.
///
/// Substitution is a single pass: substituted values are inserted literally
/// and never re-scanned for placeholders. Pure and deterministic for a given
/// (template, recipient) pair.
pub fn render(template: &str, recipient: &Recipient) -> String {
    placeholder_pattern()
        .replace_all(template, |caps: &regex::Captures| {
            recipient.get(&caps[1]).unwrap_or_default().to_string()
        })
        .into_owned()
}

/// Render a campaign body for one recipient.
///
/// A non-empty per-recipient override supersedes the shared body template;
/// either way the override or shared text is rendered against the recipient's
/// own fields and the signature block is appended after substitution.
pub fn render_body(shared_body: &str, table: &RecipientTable, recipient: &Recipient) -> String {
    let source = table.override_content(recipient).unwrap_or(shared_body);
    let mut body = render(source, recipient);
    body.push_str(SIGNATURE);
    body
}

/// A rendered subject and body for one recipient, without sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePreview {
    pub subject: String,
    pub body: String,
}

/// Render both parts of the message exactly as an activation would.
pub fn preview(
    subject_template: &str,
    body_template: &str,
    table: &RecipientTable,
    recipient: &Recipient,
) -> MessagePreview {
    MessagePreview {
        subject: render(subject_template, recipient),
        body: render_body(body_template, table, recipient),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient(pairs: &[(&str, &str)]) -> Recipient {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_known_fields() {
        let r = recipient(&[("firstName", "Ana"), ("email", "a@x.com")]);
        assert_eq!(render("Hi {firstName} <{email}>", &r), "Hi Ana <a@x.com>");
    }

    #[test]
    fn absent_fields_become_empty_strings() {
        let r = recipient(&[("firstName", "Ana")]);
        assert_eq!(render("Hi {firstName}{nickname}!", &r), "Hi Ana!");
    }

    #[test]
    fn repeated_placeholders_are_all_replaced() {
        let r = recipient(&[("name", "Bo")]);
        assert_eq!(render("{name}, {name}, {name}", &r), "Bo, Bo, Bo");
    }

    #[test]
    fn substitution_is_not_recursive() {
        let r = recipient(&[("a", "{b}"), ("b", "nope")]);
        assert_eq!(render("{a}", &r), "{b}");
    }

    #[test]
    fn unclosed_braces_stay_literal() {
        let r = recipient(&[("name", "Bo")]);
        assert_eq!(render("{name and {name}", &r), "{name and Bo");
    }

    #[test]
    fn round_trips_recipient_field_values() {
        let r = recipient(&[("a", "x"), ("b", "y")]);
        let table = RecipientTable::default();
        assert_eq!(
            render_body("{a}{b}", &table, &r),
            format!("xy{SIGNATURE}")
        );
    }

    #[test]
    fn override_supersedes_shared_body() {
        let table = RecipientTable::from_csv(
            "id,firstName,customEmail\n1,Ana,Just for {firstName}",
        )
        .unwrap();
        let r = table.first().unwrap();

        let body = render_body("Shared copy for {firstName}", &table, r);
        assert_eq!(body, format!("Just for Ana{SIGNATURE}"));
    }

    #[test]
    fn empty_override_falls_back_to_shared_body() {
        let table = RecipientTable::from_csv("id,firstName,customEmail\n1,Ana,").unwrap();
        let r = table.first().unwrap();

        let body = render_body("Hello {firstName}!", &table, r);
        assert_eq!(body, format!("Hello Ana!{SIGNATURE}"));
    }

    #[test]
    fn preview_matches_activation_rendering() {
        let table = RecipientTable::from_csv("id,firstName\n1,Ana").unwrap();
        let r = table.first().unwrap();

        let preview = preview("Hi {firstName}", "Hello {firstName}!", &table, r);
        assert_eq!(preview.subject, "Hi Ana");
        assert_eq!(preview.body, format!("Hello Ana!{SIGNATURE}"));
    }
}
