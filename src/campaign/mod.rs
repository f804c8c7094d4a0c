//! Campaign aggregate — data model, outcome ledger, and store.

pub mod ledger;
pub mod model;
pub mod store;

pub use ledger::{LedgerCounts, Outcome, OutcomeLedger, OutcomeRecord};
pub use model::{
    Campaign, CampaignConfig, CampaignStatus, CampaignSummary, DripInterval, SendMode,
};
pub use store::CampaignStore;
