//! Strictly sequential batch runner shared by sweep, burn and refuel.
//!
//! Items run one at a time through `pending → signing → submitting →
//! {confirmed | failed}`. The first failure ends the batch; items after it
//! are never attempted.

use std::ops::ControlFlow;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wallet_health_types::{BatchItemEvent, BatchItemState};

use crate::error::{HubError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedItem {
    pub index: usize,
    pub label: String,
    pub signature: String,
}

#[derive(Debug)]
pub struct FailedItem {
    pub index: usize,
    pub label: String,
    pub error: HubError,
}

pub type ItemOutcome = std::result::Result<ConfirmedItem, FailedItem>;

#[derive(Debug)]
pub struct BatchReport {
    pub total: usize,
    pub confirmed: Vec<ConfirmedItem>,
    pub failure: Option<FailedItem>,
}

impl BatchReport {
    /// Folds item outcomes in order, keeping every confirmation up to the
    /// first failure and ignoring anything after it.
    pub fn reduce<I>(total: usize, outcomes: I) -> Self
    where
        I: IntoIterator<Item = ItemOutcome>,
    {
        let folded = outcomes
            .into_iter()
            .try_fold(Vec::new(), |mut confirmed, outcome| match outcome {
                Ok(item) => {
                    confirmed.push(item);
                    ControlFlow::Continue(confirmed)
                }
                Err(failed) => ControlFlow::Break((confirmed, failed)),
            });

        match folded {
            ControlFlow::Continue(confirmed) => Self {
                total,
                confirmed,
                failure: None,
            },
            ControlFlow::Break((confirmed, failed)) => Self {
                total,
                confirmed,
                failure: Some(failed),
            },
        }
    }

    pub fn succeeded(&self) -> usize {
        self.confirmed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.succeeded() == self.total
    }

    pub fn last_signature(&self) -> Option<&str> {
        self.confirmed.last().map(|item| item.signature.as_str())
    }

    /// Items left in the working set: everything from the first
    /// unconfirmed one onward.
    pub fn remaining<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items.get(self.succeeded()..).map(<[T]>::to_vec).unwrap_or_default()
    }

    pub fn summary(&self) -> String {
        format!("{} of {}", self.succeeded(), self.total)
    }
}

/// Publishes per-item progress to the log and, optionally, to a channel.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    batch_id: Uuid,
    total: usize,
    sender: Option<UnboundedSender<BatchItemEvent>>,
}

impl ProgressReporter {
    pub fn new(total: usize, sender: Option<UnboundedSender<BatchItemEvent>>) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            total,
            sender,
        }
    }

    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }

    fn emit(&self, index: usize, label: &str, state: BatchItemState, signature: Option<String>, details: Option<String>) {
        let event = BatchItemEvent {
            batch_id: self.batch_id,
            index,
            total: self.total,
            label: label.to_string(),
            state,
            signature,
            details,
            timestamp: Utc::now(),
        };
        debug!(batch = %self.batch_id, "{}", event.status_line());

        if let Some(sender) = &self.sender {
            // A dropped receiver just means nobody is watching anymore.
            let _ = sender.send(event);
        }
    }
}

/// Handle a processor uses to mark the signing and submitting steps of the
/// item it is working on.
pub struct ItemStep<'a> {
    reporter: &'a ProgressReporter,
    index: usize,
    label: &'a str,
}

impl ItemStep<'_> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn signing(&self) {
        self.reporter
            .emit(self.index, self.label, BatchItemState::Signing, None, None);
    }

    pub fn submitting(&self) {
        self.reporter
            .emit(self.index, self.label, BatchItemState::Submitting, None, None);
    }
}

#[async_trait]
pub trait ItemProcessor<T: Sync>: Send + Sync {
    fn label(&self, item: &T) -> String;

    /// Runs one item to confirmation and returns its signature.
    async fn process(&self, item: &T, step: &ItemStep<'_>) -> Result<String>;
}

/// Runs `items` one after another, stopping at the first failure.
pub async fn run_sequential<T, P>(
    kind: &'static str,
    items: &[T],
    processor: &P,
    events: Option<UnboundedSender<BatchItemEvent>>,
) -> BatchReport
where
    T: Sync,
    P: ItemProcessor<T> + ?Sized,
{
    let total = items.len();
    let reporter = ProgressReporter::new(total, events);
    let labels: Vec<String> = items.iter().map(|item| processor.label(item)).collect();
    info!(batch = %reporter.batch_id(), kind, total, "Starting batch");

    for (index, label) in labels.iter().enumerate() {
        reporter.emit(index, label, BatchItemState::Pending, None, None);
    }

    let mut outcomes: Vec<ItemOutcome> = Vec::with_capacity(total);
    for (index, (item, label)) in items.iter().zip(labels.iter()).enumerate() {
        let step = ItemStep {
            reporter: &reporter,
            index,
            label,
        };

        match processor.process(item, &step).await {
            Ok(signature) => {
                reporter.emit(index, label, BatchItemState::Confirmed, Some(signature.clone()), None);
                metrics::increment_counter!("wallet_health_batch_items_confirmed", "kind" => kind);
                outcomes.push(Ok(ConfirmedItem {
                    index,
                    label: label.clone(),
                    signature,
                }));
            }
            Err(error) => {
                warn!(batch = %reporter.batch_id(), kind, index, label = %label, error = %error, "Batch item failed, aborting remaining items");
                reporter.emit(index, label, BatchItemState::Failed, None, Some(error.user_message()));
                metrics::increment_counter!("wallet_health_batch_items_failed", "kind" => kind);
                outcomes.push(Err(FailedItem {
                    index,
                    label: label.clone(),
                    error,
                }));
                break;
            }
        }
    }

    let report = BatchReport::reduce(total, outcomes);
    info!(
        batch = %reporter.batch_id(),
        kind,
        succeeded = report.succeeded(),
        total,
        "Batch finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    fn confirmed(index: usize) -> ItemOutcome {
        Ok(ConfirmedItem {
            index,
            label: format!("item-{}", index),
            signature: format!("sig-{}", index),
        })
    }

    fn failed(index: usize) -> ItemOutcome {
        Err(FailedItem {
            index,
            label: format!("item-{}", index),
            error: HubError::api("Jupiter", "Route not found", Some(400)),
        })
    }

    #[test]
    fn test_reduce_all_confirmed() {
        let report = BatchReport::reduce(3, vec![confirmed(0), confirmed(1), confirmed(2)]);
        assert!(report.is_complete());
        assert_eq!(report.succeeded(), 3);
        assert_eq!(report.last_signature(), Some("sig-2"));
    }

    #[test]
    fn test_reduce_stops_at_first_failure() {
        let report = BatchReport::reduce(5, vec![confirmed(0), confirmed(1), failed(2), confirmed(3)]);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.summary(), "2 of 5");
        assert_eq!(report.last_signature(), Some("sig-1"));
        assert_eq!(report.failure.as_ref().map(|f| f.index), Some(2));
        assert!(!report.is_complete());
        assert_eq!(report.remaining(&["a", "b", "c", "d", "e"]), vec!["c", "d", "e"]);
    }

    #[test]
    fn test_reduce_empty() {
        let report = BatchReport::reduce(0, Vec::new());
        assert!(report.is_complete());
        assert_eq!(report.last_signature(), None);
    }

    struct FailAt {
        fail_at: usize,
        attempted: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl ItemProcessor<usize> for FailAt {
        fn label(&self, item: &usize) -> String {
            format!("item-{}", item)
        }

        async fn process(&self, item: &usize, step: &ItemStep<'_>) -> Result<String> {
            self.attempted.lock().push(*item);
            step.signing();
            if *item == self.fail_at {
                return Err(HubError::api("Jupiter", "No route", None));
            }
            step.submitting();
            Ok(format!("sig-{}", item))
        }
    }

    #[tokio::test]
    async fn test_run_sequential_never_attempts_after_failure() {
        let processor = FailAt {
            fail_at: 2,
            attempted: Mutex::new(Vec::new()),
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let items = vec![0usize, 1, 2, 3, 4];

        let report = run_sequential("test", &items, &processor, Some(tx)).await;

        assert_eq!(*processor.attempted.lock(), vec![0, 1, 2]);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failure.as_ref().unwrap().error.user_message(), "No route");

        let mut states = Vec::new();
        while let Ok(event) = rx.try_recv() {
            states.push((event.index, event.state));
        }
        // Five pendings, then the per-item progression.
        assert_eq!(states.iter().filter(|(_, s)| *s == BatchItemState::Pending).count(), 5);
        assert_eq!(
            states[5..].to_vec(),
            vec![
                (0, BatchItemState::Signing),
                (0, BatchItemState::Submitting),
                (0, BatchItemState::Confirmed),
                (1, BatchItemState::Signing),
                (1, BatchItemState::Submitting),
                (1, BatchItemState::Confirmed),
                (2, BatchItemState::Signing),
                (2, BatchItemState::Failed),
            ]
        );
    }
}
