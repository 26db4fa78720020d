//! The visible chat log.
//!
//! A [`Renderer`] owns the bubbles on screen. The session only appends,
//! types into and clears them; it never reads them back, the transcript is
//! the source of truth for what was said.

use std::borrow::Cow;
use std::sync::{Mutex, MutexGuard, PoisonError};

use little_chat_model::{Message, Role};

/// Identifies a bubble in a renderer's log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BubbleId(u64);

impl BubbleId {
    /// Creates an id from a renderer-specific number.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the renderer-specific number.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// A display surface for the chat log.
///
/// Text passed to a renderer is literal content. Implementations must
/// never interpret it as markup or terminal control sequences.
pub trait Renderer: Send + Sync + 'static {
    /// Appends a bubble with `text` at the end of the log and keeps the
    /// newest content in view.
    fn append_message(&self, role: Role, text: &str) -> BubbleId;

    /// Appends one unit of text to an existing bubble.
    ///
    /// Returns `false` if the bubble is no longer part of the log.
    fn write_unit(&self, bubble: BubbleId, unit: char) -> bool;

    /// Called once a bubble has received all of its text.
    fn close_bubble(&self, _bubble: BubbleId) {}

    /// Shows the "assistant is typing" indicator.
    fn show_pending_indicator(&self);

    /// Removes the "assistant is typing" indicator, if shown.
    fn clear_pending_indicator(&self);

    /// Removes every bubble and the pending indicator.
    fn clear(&self);
}

/// Removes control characters from `text`, except line breaks and tabs.
/// Bidirectional formatting characters are removed too.
///
/// Renderers that write to a terminal use this to keep message text from
/// being interpreted as escape sequences, and from reordering what is
/// shown.
pub fn sanitize(text: &str) -> Cow<'_, str> {
    let is_unsafe = |c: char| {
        (c.is_control() && c != '\n' && c != '\t') || is_bidi_control(c)
    };
    if !text.contains(is_unsafe) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.chars().filter(|&c| !is_unsafe(c)).collect())
}

fn is_bidi_control(c: char) -> bool {
    matches!(
        c,
        '\u{061C}'
            | '\u{200E}'
            | '\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2066}'..='\u{2069}'
    )
}

/// A bubble recorded by [`MemoryLog`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bubble {
    /// The id handed out when the bubble was appended.
    pub id: BubbleId,
    /// The author.
    pub role: Role,
    /// The text typed so far.
    pub text: String,
}

#[derive(Default)]
struct LogState {
    bubbles: Vec<Bubble>,
    next_id: u64,
    pending: bool,
    scrolls: usize,
    unit_writes: usize,
}

/// An in-memory renderer.
///
/// Useful for headless sessions and for checking what a session shows.
#[derive(Default)]
pub struct MemoryLog {
    state: Mutex<LogState>,
}

impl MemoryLog {
    /// Creates an empty log.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bubbles in display order.
    pub fn snapshot(&self) -> Vec<Bubble> {
        self.lock().bubbles.clone()
    }

    /// Returns the bubbles as messages, in display order.
    pub fn messages(&self) -> Vec<Message> {
        self.lock()
            .bubbles
            .iter()
            .map(|b| Message {
                role: b.role,
                text: b.text.clone(),
            })
            .collect()
    }

    /// Returns the current text of a bubble.
    pub fn text_of(&self, bubble: BubbleId) -> Option<String> {
        let state = self.lock();
        let bubble = state.bubbles.iter().find(|b| b.id == bubble)?;
        Some(bubble.text.clone())
    }

    /// Returns `true` if the pending indicator is shown.
    #[inline]
    pub fn has_pending_indicator(&self) -> bool {
        self.lock().pending
    }

    /// Returns how many times the log was scrolled to its end.
    #[inline]
    pub fn scroll_count(&self) -> usize {
        self.lock().scrolls
    }

    /// Returns how many units were written, including the ones rejected
    /// because their bubble was gone.
    #[inline]
    pub fn unit_writes(&self) -> usize {
        self.lock().unit_writes
    }

    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Renderer for MemoryLog {
    fn append_message(&self, role: Role, text: &str) -> BubbleId {
        let mut state = self.lock();
        let id = BubbleId(state.next_id);
        state.next_id += 1;
        state.bubbles.push(Bubble {
            id,
            role,
            text: text.to_owned(),
        });
        state.scrolls += 1;
        id
    }

    fn write_unit(&self, bubble: BubbleId, unit: char) -> bool {
        let mut state = self.lock();
        state.unit_writes += 1;
        let Some(target) = state.bubbles.iter_mut().find(|b| b.id == bubble)
        else {
            return false;
        };
        target.text.push(unit);
        state.scrolls += 1;
        true
    }

    fn show_pending_indicator(&self) {
        let mut state = self.lock();
        state.pending = true;
        state.scrolls += 1;
    }

    #[inline]
    fn clear_pending_indicator(&self) {
        self.lock().pending = false;
    }

    fn clear(&self) {
        let mut state = self.lock();
        state.bubbles.clear();
        state.pending = false;
    }
}
