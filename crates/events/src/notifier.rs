//! Turns assignment and reopen events into notices for the assignee.
//!
//! Delivery failures are logged and dropped; they never reach the
//! transition that raised the event.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::bus::{ReviewEvent, ReviewEventKind};
use crate::delivery::email::{EmailDelivery, EmailError, Notice};

/// Outbound channel for notices.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, notice: &Notice) -> Result<(), EmailError>;
}

#[async_trait]
impl Mailer for EmailDelivery {
    async fn send(&self, notice: &Notice) -> Result<(), EmailError> {
        self.deliver(notice).await
    }
}

/// Render the notice for an event, if the event warrants one.
pub fn notice_for(event: &ReviewEvent) -> Option<Notice> {
    let to = event.recipient_email.clone()?;
    let due = event
        .due_date
        .map(|d| format!("Due: {}\n", d.format("%Y-%m-%d")))
        .unwrap_or_default();
    let actor = event
        .actor_user_id
        .map(|id| format!("user {id}"))
        .unwrap_or_else(|| "the system".to_string());

    let (subject, lead) = match event.kind {
        ReviewEventKind::CaseAssigned => (
            format!("Case {} assigned to you", event.case_id),
            format!("Case {} was assigned to you by {actor}.", event.case_id),
        ),
        ReviewEventKind::CaseReopened => {
            let reason = event.payload["reason"].as_str().unwrap_or("-");
            (
                format!("Case {} reopened", event.case_id),
                format!(
                    "Case {} was reopened by {actor}.\nReason: {reason}",
                    event.case_id
                ),
            )
        }
        _ => return None,
    };

    Some(Notice {
        to,
        subject,
        body: format!("{lead}\n{due}"),
    })
}

/// Background subscriber that sends assignment/reopen notices.
pub struct AssignmentNotifier {
    mailer: Arc<dyn Mailer>,
}

impl AssignmentNotifier {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Consume events until the bus closes or `cancel` fires.
    pub async fn run(self, mut rx: broadcast::Receiver<ReviewEvent>, cancel: CancellationToken) {
        loop {
            let event = tokio::select! {
                () = cancel.cancelled() => break,
                received = rx.recv() => match received {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Notifier lagged; some notices were not sent");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };
            self.handle(&event).await;
        }
        tracing::info!("Assignment notifier stopped");
    }

    async fn handle(&self, event: &ReviewEvent) {
        let Some(notice) = notice_for(event) else {
            return;
        };
        if let Err(e) = self.mailer.send(&notice).await {
            tracing::warn!(
                case_id = event.case_id,
                event = event.kind.as_str(),
                error = %e,
                "Failed to send notice",
            );
        }
    }
}
