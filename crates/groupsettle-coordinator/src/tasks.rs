//! Background work owned by a group session.
//!
//! Tasks never touch session state. They push tagged results onto the
//! coordinator's update channel and the coordinator applies them on its
//! next operation. Each task has its own cancel channel; dropping the
//! handle cancels too.

use std::sync::Arc;
use std::time::Duration;

use groupsettle_types::{BalanceMap, GroupId, ProposalRecord};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::collaborators::GroupDirectory;

/// Result produced by a background task.
#[derive(Debug)]
pub(crate) enum SessionUpdate {
    Balances(BalanceMap),
    Proposal(Option<ProposalRecord>),
}

/// A [`SessionUpdate`] tagged with the session that asked for it.
#[derive(Debug)]
pub(crate) struct TaggedUpdate {
    pub group_id: GroupId,
    pub generation: u64,
    pub update: SessionUpdate,
}

pub(crate) type UpdateSender = mpsc::UnboundedSender<TaggedUpdate>;

/// Cancel handle for one spawned task.
#[derive(Debug)]
pub(crate) struct TaskHandle {
    cancel: watch::Sender<bool>,
    _join: JoinHandle<()>,
}

impl TaskHandle {
    /// Signal the task to stop. Anything still in flight is discarded.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }
}

/// Poll the authoritative balances every `period` until cancelled.
///
/// The first poll happens one full period after spawning. Failures are
/// logged and the loop carries on.
pub(crate) fn spawn_balance_refresh(
    directory: Arc<dyn GroupDirectory>,
    group_id: GroupId,
    generation: u64,
    period: Duration,
    updates: UpdateSender,
) -> TaskHandle {
    let (cancel, mut cancelled) = watch::channel(false);

    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancelled.changed() => break,
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                _ = cancelled.changed() => break,
                result = directory.get_balances(group_id) => result,
            };

            match result {
                Ok(balances) => {
                    let update = TaggedUpdate {
                        group_id,
                        generation,
                        update: SessionUpdate::Balances(balances),
                    };
                    if updates.send(update).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        group_id = %group_id,
                        error = %err,
                        "balance refresh failed; retrying next interval"
                    );
                }
            }
        }

        tracing::debug!(group_id = %group_id, generation, "balance refresh stopped");
    });

    TaskHandle {
        cancel,
        _join: join,
    }
}

/// Fetch the authoritative proposal once.
pub(crate) fn spawn_proposal_fetch(
    directory: Arc<dyn GroupDirectory>,
    group_id: GroupId,
    generation: u64,
    updates: UpdateSender,
) -> TaskHandle {
    let (cancel, mut cancelled) = watch::channel(false);

    let join = tokio::spawn(async move {
        let result = tokio::select! {
            _ = cancelled.changed() => return,
            result = directory.get_settlement_proposal(group_id) => result,
        };

        match result {
            Ok(record) => {
                let _ = updates.send(TaggedUpdate {
                    group_id,
                    generation,
                    update: SessionUpdate::Proposal(record),
                });
            }
            Err(err) => {
                tracing::warn!(
                    group_id = %group_id,
                    error = %err,
                    "proposal fetch failed"
                );
            }
        }
    });

    TaskHandle {
        cancel,
        _join: join,
    }
}
