//! Multi-account GitHub notification aggregation and enrichment.
//!
//! The crate fetches notification threads for every configured account,
//! enriches them with subject details (mostly through a single merged
//! GraphQL request per account), filters them against user settings and
//! exposes mutations such as mark-as-read, mark-as-done and unsubscribe
//! through [`store::NotificationsStore`].

pub mod account;
pub mod aggregator;
pub mod config;
pub mod errors;
pub mod notifications;
pub mod providers;
pub mod store;

pub use account::Account;
pub use config::Settings;
pub use errors::{ApiError, GitifyError};
pub use notifications::{AccountNotifications, Notification};
pub use store::NotificationsStore;
