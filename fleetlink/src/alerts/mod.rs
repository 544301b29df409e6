//! Alerts Module
//!
//! Accident and SOS alerts, the in-process notification channel that
//! announces them, and the local fallback store that keeps them across
//! sessions.
//!
//! - [`model`] - `Alert`, `Severity`, `AlertKind`, `SosRequest`, `SosReport`
//! - [`notify`] - `AlertNotification` (`sosEmergency`, `newAlert`) and `Notifier`
//! - [`store`] - `KeyValueStore`, `FileStore`, `MemoryStore` and `FallbackStore`

mod model;
mod notify;
mod store;

pub use model::{
    Alert, AlertKind, Severity, SosOutcome, SosReport, SosRequest, DEFAULT_SOS_DESCRIPTION,
};
pub use notify::{AlertNotification, Notifier, NOTIFICATION_CAPACITY};
pub use store::{
    FallbackStore, FileStore, KeyValueStore, MemoryStore, StoreError, ACCIDENTS_KEY, POSITION_KEY,
};
