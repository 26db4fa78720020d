//! Typewriter-style reveal of assistant replies.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{self, AbortHandle};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::Instrument;

use crate::render::{BubbleId, Renderer};

/// How a reveal ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RevealOutcome {
    /// Every unit was written.
    Completed,
    /// The reveal was cancelled, or its bubble disappeared.
    Cancelled,
}

/// Handle to a running reveal.
///
/// Cloning the handle is cheap. Dropping it doesn't stop the reveal.
#[derive(Clone, Debug)]
pub struct RevealHandle {
    bubble: BubbleId,
    abort: Option<AbortHandle>,
    outcome_rx: watch::Receiver<Option<RevealOutcome>>,
}

impl RevealHandle {
    /// Returns the bubble being typed into.
    #[inline]
    pub fn bubble(&self) -> BubbleId {
        self.bubble
    }

    /// Stops the reveal. No unit is written after this returns.
    #[inline]
    pub fn cancel(&self) {
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }

    /// Returns `true` if the reveal has ended.
    pub fn is_finished(&self) -> bool {
        self.outcome_rx.borrow().is_some()
            || self.abort.as_ref().is_none_or(AbortHandle::is_finished)
    }

    /// Waits for the reveal to end.
    pub async fn finished(&self) -> RevealOutcome {
        let mut outcome_rx = self.outcome_rx.clone();
        match outcome_rx.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).unwrap_or(RevealOutcome::Cancelled),
            // The task was aborted before it could report.
            Err(_) => RevealOutcome::Cancelled,
        }
    }
}

/// Types `text` into `bubble`, one character per `interval`.
///
/// The first character appears one interval after the call, so the bubble
/// holds exactly the first `n` characters after `n` ticks. An empty text
/// completes immediately. A zero interval writes one character per
/// scheduler turn.
///
/// Must be called from within a tokio runtime.
pub fn reveal_incrementally<R>(
    renderer: Arc<R>,
    bubble: BubbleId,
    text: &str,
    interval: Duration,
) -> RevealHandle
where
    R: Renderer + ?Sized,
{
    if text.is_empty() {
        renderer.close_bubble(bubble);
        let (_, outcome_rx) = watch::channel(Some(RevealOutcome::Completed));
        return RevealHandle {
            bubble,
            abort: None,
            outcome_rx,
        };
    }

    let (outcome_tx, outcome_rx) = watch::channel(None);
    let text = text.to_owned();
    let start = Instant::now() + interval;
    let task = tokio::spawn(
        async move {
            let outcome =
                type_units(&*renderer, bubble, &text, start, interval).await;
            trace!("reveal ended: {outcome:?}");
            outcome_tx.send_replace(Some(outcome));
        }
        .instrument(trace_span!("reveal", bubble = bubble.get())),
    );
    RevealHandle {
        bubble,
        abort: Some(task.abort_handle()),
        outcome_rx,
    }
}

async fn type_units<R: Renderer + ?Sized>(
    renderer: &R,
    bubble: BubbleId,
    text: &str,
    start: Instant,
    interval: Duration,
) -> RevealOutcome {
    let mut ticker = (!interval.is_zero()).then(|| {
        let mut ticker = time::interval_at(start, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });
    for unit in text.chars() {
        match &mut ticker {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => task::yield_now().await,
        }
        if !renderer.write_unit(bubble, unit) {
            debug!("bubble is gone, stop typing");
            return RevealOutcome::Cancelled;
        }
    }
    renderer.close_bubble(bubble);
    RevealOutcome::Completed
}
