//! A tiny single-threaded actor.
//!
//! Every actor owns its state exclusively and processes messages in the
//! order they were sent, one at a time. This is how the chat session keeps
//! the log, the transcript and the cache consistent without locks: all
//! mutations happen on the actor's loop, while slow work (network calls,
//! timers) runs on separate tasks and reports back with messages.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod error;
mod handle;
mod mailbox;
mod scheduler;

pub use error::ActorDeadError;
pub use handle::Actor;
pub use mailbox::Message;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::sleep;

    use super::*;

    #[derive(Default)]
    struct Log {
        lines: Vec<String>,
    }

    #[derive(Debug)]
    struct Append(&'static str);

    impl Message<Log> for Append {
        fn handle(self, state: &mut Log, _handle: &Actor<Log>) {
            state.lines.push(self.0.to_owned());
        }
    }

    #[derive(Debug)]
    struct AppendLater(&'static str);

    impl Message<Log> for AppendLater {
        fn handle(self, _state: &mut Log, handle: &Actor<Log>) {
            let handle = handle.clone();
            tokio::spawn(async move {
                sleep(Duration::from_millis(5)).await;
                handle.send(Append(self.0)).ok();
            });
        }
    }

    #[tokio::test]
    async fn test_messages_are_ordered() {
        let actor = Actor::spawn(Log::default(), None);
        actor.send(Append("user")).unwrap();
        actor.send(Append("assistant")).unwrap();

        let lines = actor.ask(|log, _| log.lines.clone()).await.unwrap();
        assert_eq!(lines, ["user", "assistant"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_back_from_task() {
        let actor = Actor::spawn(Log::default(), Some("log"));
        actor.send(AppendLater("late")).unwrap();
        actor.send(Append("early")).unwrap();

        sleep(Duration::from_millis(10)).await;
        let lines = actor.ask(|log, _| log.lines.clone()).await.unwrap();
        assert_eq!(lines, ["early", "late"]);
    }

    #[tokio::test]
    async fn test_stopped_actor() {
        let actor = Actor::spawn(Log::default(), None);
        actor.stop();

        let result = actor.ask(|log, _| log.lines.len()).await;
        assert!(result.is_err());
        assert!(actor.is_dead());
    }
}
