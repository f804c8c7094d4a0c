//! Compose session — the explicit working state a campaign is created from.
//!
//! A session is a plain value owned by the caller. Creating a campaign
//! snapshots it; editing the session afterwards cannot affect a campaign
//! that is already dispatching.

use crate::campaign::model::{CampaignConfig, DripInterval, SendMode};
use crate::error::ValidationError;
use crate::recipients::{Recipient, RecipientTable};
use crate::template::{self, MessagePreview};

/// Working compose state: message templates, send-mode settings, recipients.
#[derive(Debug, Clone)]
pub struct ComposeSession {
    /// Subject template.
    pub subject: String,
    /// Shared body template.
    pub body: String,
    /// Delivery policy.
    pub mode: SendMode,
    /// Recipients per activation in batch mode.
    pub batch_size: usize,
    /// Recipients per activation in drip mode.
    pub drip_rate: usize,
    /// Drip activation spacing unit.
    pub drip_interval: DripInterval,
    /// Recipient list; snapshot-copied into a campaign at creation.
    pub recipients: RecipientTable,
}

impl ComposeSession {
    /// Fresh session over a recipient table, with default send settings.
    pub fn new(recipients: RecipientTable) -> Self {
        Self {
            subject: String::new(),
            body: String::new(),
            mode: SendMode::Bulk,
            batch_size: 1000,
            drip_rate: 1000,
            drip_interval: DripInterval::Daily,
            recipients,
        }
    }

    /// Configuration snapshot for campaign creation.
    pub fn config(&self) -> CampaignConfig {
        CampaignConfig {
            subject: self.subject.clone(),
            body: self.body.clone(),
            mode: self.mode,
            batch_size: self.batch_size,
            drip_rate: self.drip_rate,
            drip_interval: self.drip_interval,
        }
    }

    /// Check the start preconditions without side effects.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate(&self.subject, &self.body, &self.recipients)
    }

    /// Preview the rendered message for the first recipient.
    pub fn preview(&self) -> Option<MessagePreview> {
        self.recipients.first().map(|r| self.preview_for(r))
    }

    /// Preview the rendered message for one recipient.
    pub fn preview_for(&self, recipient: &Recipient) -> MessagePreview {
        template::preview(&self.subject, &self.body, &self.recipients, recipient)
    }
}

/// Campaign start preconditions, shared by session checks and engine start.
///
/// - the recipient table must be non-empty;
/// - the subject template must be non-empty;
/// - the body template must be non-empty, unless every recipient carries
///   non-empty override content;
/// - every recipient must resolve an identity key (rows are numbered from 1).
pub fn validate(
    subject: &str,
    body: &str,
    recipients: &RecipientTable,
) -> Result<(), ValidationError> {
    if recipients.is_empty() {
        return Err(ValidationError::NoRecipients);
    }
    if subject.trim().is_empty() {
        return Err(ValidationError::EmptySubject);
    }
    if body.trim().is_empty()
        && !recipients
            .iter()
            .all(|r| recipients.override_content(r).is_some())
    {
        return Err(ValidationError::EmptyBody);
    }
    for (index, recipient) in recipients.iter().enumerate() {
        if recipient.identity_key().is_none() {
            return Err(ValidationError::MissingIdentityKey { row: index + 1 });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RecipientTable {
        RecipientTable::from_csv("id,firstName,email\n1,Ana,a@x.com\n2,Bo,b@x.com").unwrap()
    }

    fn session() -> ComposeSession {
        let mut session = ComposeSession::new(table());
        session.subject = "Hi {firstName}".to_string();
        session.body = "Hello {firstName}!".to_string();
        session
    }

    #[test]
    fn valid_session_passes() {
        assert!(session().validate().is_ok());
    }

    #[test]
    fn empty_recipients_fail() {
        let mut s = session();
        s.recipients = RecipientTable::default();
        assert_eq!(s.validate(), Err(ValidationError::NoRecipients));
    }

    #[test]
    fn blank_subject_fails() {
        let mut s = session();
        s.subject = "   ".to_string();
        assert_eq!(s.validate(), Err(ValidationError::EmptySubject));
    }

    #[test]
    fn blank_body_without_overrides_fails() {
        let mut s = session();
        s.body = String::new();
        assert_eq!(s.validate(), Err(ValidationError::EmptyBody));
    }

    #[test]
    fn blank_body_with_full_override_coverage_passes() {
        let mut s = session();
        s.body = String::new();
        s.recipients =
            RecipientTable::from_csv("id,customEmail\n1,Offer one\n2,Offer two").unwrap();
        assert!(s.validate().is_ok());
    }

    #[test]
    fn blank_body_with_partial_override_coverage_fails() {
        let mut s = session();
        s.body = String::new();
        s.recipients = RecipientTable::from_csv("id,customEmail\n1,Offer one\n2,").unwrap();
        assert_eq!(s.validate(), Err(ValidationError::EmptyBody));
    }

    #[test]
    fn recipient_without_identity_key_fails_with_row_number() {
        let mut s = session();
        s.recipients = RecipientTable::from_csv("id,name\n1,Ana\n,Bo").unwrap();
        assert_eq!(
            s.validate(),
            Err(ValidationError::MissingIdentityKey { row: 2 })
        );
    }

    #[test]
    fn preview_uses_first_recipient() {
        let preview = session().preview().unwrap();
        assert_eq!(preview.subject, "Hi Ana");
    }

    #[test]
    fn preview_of_empty_table_is_none() {
        assert!(ComposeSession::new(RecipientTable::default()).preview().is_none());
    }
}
