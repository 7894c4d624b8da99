// Application layer: services, policies and the transaction write path.

pub mod error;
mod goals;
mod maintainer;
pub mod movements;
pub mod policy;
pub mod postings;
mod reminders;
pub mod reporting;
pub mod service;

pub use error::*;
pub use movements::{GoalDepositResult, IncentivePosting, TransferResult, installment_description};
pub use policy::*;
pub use postings::PairedPosting;
pub use reminders::TodayOverview;
pub use reporting::{AccountBalance, Dashboard};
pub use service::LedgerService;
