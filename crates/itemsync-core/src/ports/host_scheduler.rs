//! HostScheduler port - OS level job / retry facility.
//!
//! Network constraints are enforced by the host, not by this crate.

use serde::{Deserialize, Serialize};

use crate::domain::{ItemId, JobExtras};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkType {
    Any,
    Unmetered,
}

/// A keyed, network-triggered job for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Key of the host job; a new request for the same id replaces the old one.
    pub id: ItemId,
    pub network: NetworkType,
    /// Run as soon as possible instead of waiting for a matching network.
    pub run_immediately: bool,
    pub extras: JobExtras,
}

/// An unkeyed, manually requested sync (used for flush requests).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub manual: bool,
    pub extras: JobExtras,
}

pub trait HostScheduler: Send + Sync {
    fn schedule_job(&self, request: JobRequest) -> Result<()>;

    fn request_sync(&self, request: SyncRequest) -> Result<()>;
}
