use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use little_chat_core::render::{BubbleId, Renderer, sanitize};
use little_chat_model::Role;
use owo_colors::OwoColorize;

const BAR_CHAR: &str = "▎";
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

struct TerminalState {
    out: Box<dyn Write + Send>,
    next_id: u64,
    /// Bubbles with a smaller id were removed by a clear.
    first_live_id: u64,
    /// The bubble whose line is still open for typing.
    open: Option<BubbleId>,
    spinner: Option<ProgressBar>,
}

impl TerminalState {
    fn print(&mut self, args: std::fmt::Arguments<'_>) {
        let result = self.out.write_fmt(args).and_then(|_| self.out.flush());
        if let Err(err) = result {
            debug!("failed to write to terminal: {err}");
        }
    }

    fn end_open_line(&mut self) {
        if self.open.take().is_some() {
            self.print(format_args!("\n"));
        }
    }

    fn print_prefix(&mut self, role: Role) {
        match role {
            Role::User => {
                self.print(format_args!("{}🧑 ", BAR_CHAR.bright_green()))
            }
            Role::Assistant => {
                self.print(format_args!("{}🤖 ", BAR_CHAR.bright_cyan()))
            }
        }
    }

    fn is_live(&self, bubble: BubbleId) -> bool {
        (self.first_live_id..self.next_id).contains(&bubble.get())
    }

    fn finish_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

/// A renderer printing the chat log to a terminal.
///
/// Each message is printed as one block, prefixed with a colored bar.
/// Replies being revealed are typed at the end of their line. A terminal
/// can't take back printed lines, so clearing wipes the whole screen.
///
/// Control characters in message text are dropped before printing.
pub struct TerminalRenderer {
    state: Mutex<TerminalState>,
}

impl TerminalRenderer {
    /// Creates a renderer printing to stdout.
    #[inline]
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    /// Creates a renderer printing to `out`.
    pub fn with_writer<W: Write + Send + 'static>(out: W) -> Self {
        Self {
            state: Mutex::new(TerminalState {
                out: Box::new(out),
                next_id: 0,
                first_live_id: 0,
                open: None,
                spinner: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TerminalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TerminalRenderer {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for TerminalRenderer {
    fn append_message(&self, role: Role, text: &str) -> BubbleId {
        let mut state = self.lock();
        let id = BubbleId::new(state.next_id);
        state.next_id += 1;

        state.finish_spinner();
        state.end_open_line();
        state.print_prefix(role);
        if text.is_empty() {
            // Left open for a reveal.
            state.open = Some(id);
            return id;
        }
        let text = sanitize(text);
        match role {
            Role::User => state.print(format_args!("{}\n", text.bold())),
            Role::Assistant => {
                state.print(format_args!("{}\n", text.bright_white()))
            }
        }
        id
    }

    fn write_unit(&self, bubble: BubbleId, unit: char) -> bool {
        let mut state = self.lock();
        if !state.is_live(bubble) {
            return false;
        }
        if state.open != Some(bubble) {
            // Another bubble was printed in between, continue on a fresh
            // line.
            state.end_open_line();
            state.print_prefix(Role::Assistant);
            state.open = Some(bubble);
        }
        let mut buf = [0; 4];
        let unit = sanitize(unit.encode_utf8(&mut buf));
        if !unit.is_empty() {
            state.print(format_args!("{unit}"));
        }
        true
    }

    fn close_bubble(&self, bubble: BubbleId) {
        let mut state = self.lock();
        if state.open == Some(bubble) {
            state.end_open_line();
        }
    }

    fn show_pending_indicator(&self) {
        let mut state = self.lock();
        if state.spinner.is_some() {
            return;
        }
        let style = ProgressStyle::with_template("{spinner} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.set_message("🤔 Thinking...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        state.spinner = Some(spinner);
    }

    #[inline]
    fn clear_pending_indicator(&self) {
        self.lock().finish_spinner();
    }

    fn clear(&self) {
        let mut state = self.lock();
        state.finish_spinner();
        state.open = None;
        state.first_live_id = state.next_id;
        state.print(format_args!("{CLEAR_SCREEN}"));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn take(&self) -> String {
            let mut buf = self.0.lock().unwrap();
            String::from_utf8(std::mem::take(&mut *buf)).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_reveal_on_one_line() {
        let buf = SharedBuf::default();
        let renderer = TerminalRenderer::with_writer(buf.clone());

        renderer.append_message(Role::User, "Hello");
        let bubble = renderer.append_message(Role::Assistant, "");
        buf.take();

        for unit in "Hi there".chars() {
            assert!(renderer.write_unit(bubble, unit));
        }
        renderer.close_bubble(bubble);
        assert_eq!(buf.take(), "Hi there\n");
    }

    #[test]
    fn test_strip_escape_sequences() {
        let buf = SharedBuf::default();
        let renderer = TerminalRenderer::with_writer(buf.clone());

        renderer.append_message(Role::Assistant, "\x1b[31mred\x1b[0m");
        let out = buf.take();
        assert!(out.contains("[31mred[0m"));
        assert!(!out.contains("\x1b[31m"));

        let bubble = renderer.append_message(Role::Assistant, "");
        buf.take();
        assert!(renderer.write_unit(bubble, '\x07'));
        assert_eq!(buf.take(), "");
    }

    #[test]
    fn test_clear() {
        let buf = SharedBuf::default();
        let renderer = TerminalRenderer::with_writer(buf.clone());

        let bubble = renderer.append_message(Role::Assistant, "");
        renderer.clear();
        assert!(buf.take().ends_with(CLEAR_SCREEN));
        assert!(!renderer.write_unit(bubble, 'x'));
        assert_eq!(buf.take(), "");

        let bubble = renderer.append_message(Role::Assistant, "");
        assert!(renderer.write_unit(bubble, 'x'));
    }
}
