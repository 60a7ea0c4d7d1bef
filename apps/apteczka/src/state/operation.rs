//! # Operation State
//!
//! Tracks the one long-running settings operation (export, import,
//! registry download, wipe) so the shell can show progress and a result.
//!
//! ## State Machine
//! ```text
//! ┌────────┐  begin()   ┌───────────────────┐  finish()  ┌──────────────────────────────┐
//! │  Idle  │ ─────────► │ Running{message}  │ ─────────► │ Finished{outcome, message}   │
//! └────────┘            └───────────────────┘            └──────────────────────────────┘
//!      ▲                   │  ▲  set_message()                       │
//!      │                   └──┘                                      │
//!      └─────────────────────────── dismiss() ───────────────────────┘
//! ```
//!
//! `begin()` while Running is rejected; from Finished it starts over.
//! There is no automatic retry.
//!
//! The slot is wrapped in `Arc<Mutex<T>>` so a running task and the shell
//! (polling `status()` or calling `cancel()`) can share it. Locks are held
//! only for the duration of a field update.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use apteczka_transfer::{abort_pair, AbortHandle, AbortSignal};

/// Which settings operation is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Export,
    Import,
    RegistryDownload,
    Wipe,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Export => write!(f, "export"),
            OperationKind::Import => write!(f, "import"),
            OperationKind::RegistryDownload => write!(f, "registry download"),
            OperationKind::Wipe => write!(f, "wipe"),
        }
    }
}

/// How a finished operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationOutcome {
    Success,
    Cancelled,
    Error,
}

/// Snapshot of the operation slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OperationStatus {
    Idle,
    Running {
        kind: OperationKind,
        message: String,
    },
    Finished {
        kind: OperationKind,
        outcome: OperationOutcome,
        message: String,
    },
}

impl OperationStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, OperationStatus::Running { .. })
    }
}

#[derive(Debug)]
struct Slot {
    status: OperationStatus,
    abort: Option<AbortHandle>,
}

/// Shared operation slot.
#[derive(Debug, Clone)]
pub struct OperationState {
    slot: Arc<Mutex<Slot>>,
}

impl OperationState {
    /// Creates an idle slot.
    pub fn new() -> Self {
        OperationState {
            slot: Arc::new(Mutex::new(Slot {
                status: OperationStatus::Idle,
                abort: None,
            })),
        }
    }

    // A panic mid-update leaves a plain value behind; keep using it.
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current status.
    pub fn status(&self) -> OperationStatus {
        self.lock().status.clone()
    }

    /// Moves to Running and returns the signal the operation should watch.
    ///
    /// ## Errors
    /// `OPERATION_IN_PROGRESS` when another operation is running.
    pub fn begin(&self, kind: OperationKind, message: impl Into<String>) -> ApiResult<AbortSignal> {
        let mut slot = self.lock();

        if let OperationStatus::Running { kind: running, .. } = &slot.status {
            return Err(ApiError::busy(&running.to_string()));
        }

        let (handle, signal) = abort_pair();
        let message = message.into();
        info!(%kind, message = %message, "Operation started");

        slot.status = OperationStatus::Running { kind, message };
        slot.abort = Some(handle);
        Ok(signal)
    }

    /// Replaces the progress message of the running operation.
    pub fn set_message(&self, message: impl Into<String>) {
        let mut slot = self.lock();
        if let OperationStatus::Running { message: current, .. } = &mut slot.status {
            *current = message.into();
        }
    }

    /// Moves the running operation to Finished. No effect when idle.
    pub fn finish(&self, outcome: OperationOutcome, message: impl Into<String>) {
        let mut slot = self.lock();
        let kind = match &slot.status {
            OperationStatus::Running { kind, .. } => *kind,
            _ => return,
        };

        let message = message.into();
        info!(%kind, ?outcome, message = %message, "Operation finished");

        slot.status = OperationStatus::Finished {
            kind,
            outcome,
            message,
        };
        slot.abort = None;
    }

    /// Requests cancellation of the running operation.
    ///
    /// Returns false when nothing is running. The operation itself decides
    /// when it stops and reports `Cancelled` through `finish`.
    pub fn cancel(&self) -> bool {
        let slot = self.lock();
        match (&slot.status, &slot.abort) {
            (OperationStatus::Running { kind, .. }, Some(handle)) => {
                debug!(%kind, "Cancellation requested");
                handle.abort();
                true
            }
            _ => false,
        }
    }

    /// Acknowledges a finished operation and returns to Idle.
    ///
    /// ## Errors
    /// `OPERATION_IN_PROGRESS` while an operation is running.
    pub fn dismiss(&self) -> ApiResult<()> {
        let mut slot = self.lock();
        if let OperationStatus::Running { kind, .. } = &slot.status {
            return Err(ApiError::busy(&kind.to_string()));
        }
        slot.status = OperationStatus::Idle;
        Ok(())
    }
}

impl Default for OperationState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_full_cycle() {
        let ops = OperationState::new();
        assert_eq!(ops.status(), OperationStatus::Idle);

        let _signal = ops.begin(OperationKind::Export, "Exporting").unwrap();
        ops.set_message("Writing sheets");
        assert_eq!(
            ops.status(),
            OperationStatus::Running {
                kind: OperationKind::Export,
                message: "Writing sheets".into()
            }
        );

        ops.finish(OperationOutcome::Success, "Done");
        assert!(matches!(
            ops.status(),
            OperationStatus::Finished {
                outcome: OperationOutcome::Success,
                ..
            }
        ));

        ops.dismiss().unwrap();
        assert_eq!(ops.status(), OperationStatus::Idle);
    }

    #[test]
    fn test_begin_while_running_is_rejected() {
        let ops = OperationState::new();
        ops.begin(OperationKind::Import, "Importing").unwrap();

        let err = ops.begin(OperationKind::Wipe, "Wiping").unwrap_err();
        assert_eq!(err.code, ErrorCode::OperationInProgress);
        assert!(ops.dismiss().is_err());

        // Still the first operation
        assert!(matches!(
            ops.status(),
            OperationStatus::Running {
                kind: OperationKind::Import,
                ..
            }
        ));
    }

    #[test]
    fn test_begin_after_finish_starts_over() {
        let ops = OperationState::new();
        ops.begin(OperationKind::Wipe, "Wiping").unwrap();
        ops.finish(OperationOutcome::Error, "disk full");

        assert!(ops.begin(OperationKind::Export, "Exporting").is_ok());
    }

    #[test]
    fn test_cancel_reaches_signal() {
        let ops = OperationState::new();
        assert!(!ops.cancel());

        let signal = ops.begin(OperationKind::RegistryDownload, "Downloading").unwrap();
        assert!(!signal.is_aborted());
        assert!(ops.cancel());
        assert!(signal.is_aborted());
    }

    #[test]
    fn test_status_serializes_with_state_tag() {
        let json = serde_json::to_value(OperationStatus::Finished {
            kind: OperationKind::RegistryDownload,
            outcome: OperationOutcome::Cancelled,
            message: "Cancelled".into(),
        })
        .unwrap();
        assert_eq!(json["state"], "finished");
        assert_eq!(json["kind"], "registry_download");
        assert_eq!(json["outcome"], "cancelled");
    }
}
