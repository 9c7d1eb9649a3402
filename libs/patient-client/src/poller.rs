use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::entities::{ApprovalStatus, Booking};

use crate::gateway::BookingGateway;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalChange {
    pub booking_id: Uuid,
    pub previous: ApprovalStatus,
    pub current: ApprovalStatus,
}

/// Edge detector over the newest booking's approval status.
///
/// The first observation of a booking only records a baseline; a change is
/// reported once, on the poll where it is first seen.
#[derive(Debug, Default)]
pub struct ApprovalTracker {
    baseline: Option<(Uuid, ApprovalStatus)>,
}

impl ApprovalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, bookings: &[Booking]) -> Option<ApprovalChange> {
        let latest = bookings.iter().max_by_key(|b| b.created_at)?;
        let observed = (latest.id, latest.approval_status);

        match self.baseline.replace(observed) {
            Some((booking_id, previous)) if booking_id == latest.id && previous != latest.approval_status => {
                Some(ApprovalChange {
                    booking_id,
                    previous,
                    current: latest.approval_status,
                })
            }
            _ => None,
        }
    }
}

pub struct StatusPoller {
    gateway: Arc<dyn BookingGateway>,
    token: String,
    user_id: Uuid,
    interval: Duration,
}

impl StatusPoller {
    pub fn new(gateway: Arc<dyn BookingGateway>, token: String, user_id: Uuid) -> Self {
        Self {
            gateway,
            token,
            user_id,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Start polling on the current runtime. Polling stops when the handle is
    /// cancelled or dropped.
    pub fn spawn(self) -> PollerHandle {
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(self.run(change_tx, shutdown_rx));

        PollerHandle {
            changes: change_rx,
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(self, changes: mpsc::UnboundedSender<ApprovalChange>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tracker = ApprovalTracker::new();

        info!("Polling bookings for user {} every {:?}", self.user_id, self.interval);
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }

            match self.gateway.list_bookings_for_user(&self.token, self.user_id).await {
                Ok(bookings) => {
                    if let Some(change) = tracker.observe(&bookings) {
                        info!(
                            "Booking {} approval changed {} -> {}",
                            change.booking_id, change.previous, change.current
                        );
                        if changes.send(change).is_err() {
                            debug!("No listener for approval changes, stopping poller");
                            break;
                        }
                    }
                }
                Err(e) => warn!("Polling bookings failed: {}", e),
            }
        }
        debug!("Poller for user {} stopped", self.user_id);
    }
}

pub struct PollerHandle {
    changes: mpsc::UnboundedReceiver<ApprovalChange>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Wait for the next approval change. `None` once the poller has stopped.
    pub async fn next_change(&mut self) -> Option<ApprovalChange> {
        self.changes.recv().await
    }

    pub fn cancel(&self) {
        let _ = self.shutdown.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel();
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use shared_models::entities::{BookingStatus, PatientDetails, PaymentStatus};

    fn booking(id: Uuid, minutes_ago: i64, approval: ApprovalStatus) -> Booking {
        let created_at = Utc::now() - ChronoDuration::minutes(minutes_ago);
        Booking {
            id,
            user_id: Uuid::nil(),
            appointment_id: Uuid::new_v4(),
            practice_id: Uuid::new_v4(),
            dentist_id: Uuid::new_v4(),
            treatment_id: Uuid::new_v4(),
            appointment_date: created_at + ChronoDuration::days(3),
            status: BookingStatus::Confirmed,
            payment_status: PaymentStatus::Pending,
            approval_status: approval,
            patient: PatientDetails::default(),
            cancellation_reason: None,
            cancelled_by: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn first_observation_is_baseline() {
        let mut tracker = ApprovalTracker::new();
        let id = Uuid::new_v4();

        assert_eq!(tracker.observe(&[booking(id, 5, ApprovalStatus::Approved)]), None);
        assert_eq!(tracker.observe(&[]), None);
    }

    #[test]
    fn change_fires_exactly_once() {
        let mut tracker = ApprovalTracker::new();
        let id = Uuid::new_v4();

        tracker.observe(&[booking(id, 5, ApprovalStatus::Pending)]);
        let change = tracker.observe(&[booking(id, 5, ApprovalStatus::Approved)]);
        assert_eq!(
            change,
            Some(ApprovalChange {
                booking_id: id,
                previous: ApprovalStatus::Pending,
                current: ApprovalStatus::Approved,
            })
        );
        assert_eq!(tracker.observe(&[booking(id, 5, ApprovalStatus::Approved)]), None);
    }

    #[test]
    fn newer_booking_resets_baseline() {
        let mut tracker = ApprovalTracker::new();
        let old = Uuid::new_v4();
        let new = Uuid::new_v4();

        tracker.observe(&[booking(old, 60, ApprovalStatus::Approved)]);
        let both = [
            booking(old, 60, ApprovalStatus::Approved),
            booking(new, 1, ApprovalStatus::Pending),
        ];
        assert_eq!(tracker.observe(&both), None);

        let approved = [
            booking(old, 60, ApprovalStatus::Approved),
            booking(new, 1, ApprovalStatus::Rejected),
        ];
        assert_eq!(tracker.observe(&approved).map(|c| c.current), Some(ApprovalStatus::Rejected));
    }
}
