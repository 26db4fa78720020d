use std::sync::Weak;

use tokio::select;
use tokio::sync::{mpsc, watch};

use crate::mailbox::Mailbox;
use crate::{Actor, Message};

/// Drives the actor: pulls messages in order and handles them one by one
/// until the actor is stopped or every handle has been dropped.
pub async fn run_actor<S: Send + 'static>(
    mailbox: Weak<Mailbox<S>>,
    mut state: S,
    mut msg_rx: mpsc::UnboundedReceiver<Box<dyn Message<S>>>,
    mut stop_rx: watch::Receiver<bool>,
) {
    debug!("started");
    loop {
        let msg = select! {
            biased;

            _ = stop_rx.changed() => {
                break;
            }
            msg = msg_rx.recv() => {
                let Some(msg) = msg else {
                    break;
                };
                msg
            }
        };
        trace!("received message: {msg:?}");

        let Some(mailbox) = mailbox.upgrade() else {
            debug!("all handles are gone, dropping the message");
            break;
        };
        let handle = Actor::from_mailbox(mailbox);
        trace_span!("handle msg").in_scope(|| {
            msg.handle(&mut state, &handle);
        });
    }
    debug!("stopped");
}
