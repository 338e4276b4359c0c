//! Output rendering for the chat log.
//!
//! This module turns message text into presentational markup and defines the
//! [`Renderer`] trait through which the chat components mount and update
//! entries in a scrollable message log.  Two implementations are provided:
//! [`BufferRenderer`] keeps the log in memory, and [`PlainTextRenderer`]
//! writes it to a terminal.

use std::io::{self, Stdout, Write};

use pulldown_cmark::{Event, Options, Parser, html};

use crate::types::Role;

/// ANSI escape code for dim text (used for placeholders).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for italic text (used for placeholders).
const ANSI_ITALIC: &str = "\x1b[3m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the user label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for the assistant label).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Text shown in place of an empty reply.
pub const EMPTY_RESPONSE: &str = "(empty response)";

/// Text shown for a user message with no content.
pub const EMPTY_MESSAGE: &str = "(empty message)";

/// Prefix of every failed-send message.
pub const SEND_FAILURE_PREFIX: &str = "Sorry, something went wrong";

///////////////////////////////////////// Markup /////////////////////////////////////////

/// Convert raw message text to display markup.
///
/// Markdown is rendered to HTML.  Missing or blank input produces the fixed
/// empty-response paragraph, never empty output.  Raw HTML in the input is
/// escaped rather than passed through.
pub fn render_text(raw: Option<&str>) -> String {
    let raw = raw.unwrap_or_default();
    if raw.trim().is_empty() {
        return format!("<p>{EMPTY_RESPONSE}</p>\n");
    }

    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(raw, options).map(|event| match event {
        Event::Html(text) | Event::InlineHtml(text) => Event::Text(text),
        e => e,
    });
    let mut html_output = String::with_capacity(raw.len() * 3 / 2);
    html::push_html(&mut html_output, parser);
    html_output
}

///////////////////////////////////////// Messages /////////////////////////////////////////

/// Fixed informational messages.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// Greeting shown when a new session starts.
    Greeting,
    /// Shown while a session's history is being fetched.
    LoadingHistory,
    /// Shown for a session with no messages yet.
    EmptySession,
    /// Shown when a session's history could not be loaded.
    HistoryUnavailable,
}

impl Placeholder {
    /// The text of this placeholder.
    pub fn text(&self) -> &'static str {
        match self {
            Placeholder::Greeting => "Hello! I'm your chat assistant. How can I help you today?",
            Placeholder::LoadingHistory => "Loading history...",
            Placeholder::EmptySession => "This chat is empty. Start the conversation!",
            Placeholder::HistoryUnavailable => "Could not load this chat.",
        }
    }
}

/// Content of one entry in the message log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// Text shown verbatim, without formatting.
    Text(String),
    /// Formatted content: the source text and the markup rendered from it.
    Markup {
        /// Text the markup was rendered from.
        source: String,
        /// Output of [`render_text`].
        html: String,
    },
    /// A fixed informational message.
    Placeholder(Placeholder),
    /// A failure shown in place of content.
    Error(String),
}

impl MessageBody {
    /// Format `raw` through [`render_text`].
    pub fn formatted(raw: &str) -> Self {
        MessageBody::Markup {
            source: raw.to_string(),
            html: render_text(Some(raw)),
        }
    }

    /// Body for a failed send with the given reason.
    pub fn send_failure(reason: impl std::fmt::Display) -> Self {
        MessageBody::Error(format!("{SEND_FAILURE_PREFIX}: {reason}"))
    }

    /// The text a reader sees for this body, ignoring styling.
    pub fn display_text(&self) -> &str {
        match self {
            MessageBody::Text(text) => text,
            MessageBody::Markup { source, .. } => {
                if source.trim().is_empty() {
                    EMPTY_RESPONSE
                } else {
                    source
                }
            }
            MessageBody::Placeholder(placeholder) => placeholder.text(),
            MessageBody::Error(message) => message,
        }
    }
}

/// Handle to a mounted message entry.
///
/// Handles are invalidated by [`Renderer::clear`]; updates through a stale
/// handle are ignored.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    generation: u64,
    index: usize,
}

impl MessageHandle {
    /// Create a handle for entry `index` of log generation `generation`.
    pub fn new(generation: u64, index: usize) -> Self {
        Self { generation, index }
    }

    /// Position of the entry in the log.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Log generation this handle belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

///////////////////////////////////////// Renderer /////////////////////////////////////////

/// A scrollable message log.
///
/// Implementors provide mount/update/clear/scroll primitives.  Components use
/// [`append_message`](Renderer::append_message) and
/// [`update_message`](Renderer::update_message), which keep the newest entry
/// in view after every change.
pub trait Renderer: Send {
    /// Remove every entry.
    fn clear(&mut self);

    /// Add an entry at the end of the log.
    fn mount(&mut self, role: Role, body: MessageBody) -> MessageHandle;

    /// Replace the content of an existing entry.
    fn update(&mut self, handle: MessageHandle, body: MessageBody);

    /// Bring the newest entry into view.
    fn scroll_to_latest(&mut self);

    /// Mount an entry and scroll to it.
    fn append_message(&mut self, role: Role, body: MessageBody) -> MessageHandle {
        let handle = self.mount(role, body);
        self.scroll_to_latest();
        handle
    }

    /// Update an entry and scroll to the newest one.
    fn update_message(&mut self, handle: MessageHandle, body: MessageBody) {
        self.update(handle, body);
        self.scroll_to_latest();
    }
}

/// Blocking user interactions.
pub trait Dialog: Send {
    /// Ask a yes/no question and wait for the answer.
    fn confirm(&mut self, question: &str) -> bool;

    /// Show a notification and wait for it to be acknowledged.
    fn alert(&mut self, message: &str);
}

/// One entry of a [`BufferRenderer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    /// The author.
    pub role: Role,
    /// Every body this entry has shown, oldest first.  Never empty.
    pub revisions: Vec<MessageBody>,
}

impl RenderedMessage {
    /// The body currently shown.
    pub fn body(&self) -> &MessageBody {
        // mount always pushes the first revision
        &self.revisions[self.revisions.len() - 1]
    }
}

/// In-memory message log.
///
/// Keeps every revision of every entry so callers can inspect how content
/// evolved, e.g. the growth of a streamed reply.
#[derive(Debug, Default)]
pub struct BufferRenderer {
    generation: u64,
    entries: Vec<RenderedMessage>,
    scrolled_to: Option<usize>,
    scroll_count: usize,
}

impl BufferRenderer {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries currently in the log.
    pub fn entries(&self) -> &[RenderedMessage] {
        &self.entries
    }

    /// The newest entry, if any.
    pub fn last(&self) -> Option<&RenderedMessage> {
        self.entries.last()
    }

    /// Index of the entry the log was last scrolled to.
    pub fn scrolled_to(&self) -> Option<usize> {
        self.scrolled_to
    }

    /// Number of times the log has been scrolled.
    pub fn scroll_count(&self) -> usize {
        self.scroll_count
    }

    /// Current entries as displayed text, in order.
    pub fn transcript(&self) -> Vec<(Role, String)> {
        self.entries
            .iter()
            .map(|entry| (entry.role, entry.body().display_text().to_string()))
            .collect()
    }
}

impl Renderer for BufferRenderer {
    fn clear(&mut self) {
        self.entries.clear();
        self.generation += 1;
        self.scrolled_to = None;
    }

    fn mount(&mut self, role: Role, body: MessageBody) -> MessageHandle {
        self.entries.push(RenderedMessage {
            role,
            revisions: vec![body],
        });
        MessageHandle::new(self.generation, self.entries.len() - 1)
    }

    fn update(&mut self, handle: MessageHandle, body: MessageBody) {
        if handle.generation != self.generation {
            return;
        }
        if let Some(entry) = self.entries.get_mut(handle.index) {
            entry.revisions.push(body);
        }
    }

    fn scroll_to_latest(&mut self) {
        self.scrolled_to = self.entries.len().checked_sub(1);
        self.scroll_count += 1;
    }
}

/// Terminal renderer with optional ANSI styling.
///
/// A terminal cannot rewrite earlier output, so updates to the entry being
/// streamed print only the newly arrived suffix.  Formatted content is shown
/// as its markdown source.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    generation: u64,
    mounted: usize,
    live: Option<LiveEntry>,
}

struct LiveEntry {
    handle: MessageHandle,
    printed: String,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            generation: 0,
            mounted: 0,
            live: None,
        }
    }

    /// Prints an informational message outside the log.
    pub fn print_info(&mut self, message: &str) {
        self.finish_live();
        if self.use_color {
            println!("{ANSI_DIM}{message}{ANSI_RESET}");
        } else {
            println!("{message}");
        }
    }

    /// Prints an error message outside the log.
    pub fn print_error(&mut self, message: &str) {
        self.finish_live();
        if self.use_color {
            eprintln!("{ANSI_RED}error:{ANSI_RESET} {message}");
        } else {
            eprintln!("error: {message}");
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn label(&self, role: Role) -> String {
        let (name, color) = match role {
            Role::User => ("you", ANSI_CYAN),
            Role::Assistant => ("assistant", ANSI_GREEN),
        };
        if self.use_color {
            format!("{color}{name}>{ANSI_RESET} ")
        } else {
            format!("{name}> ")
        }
    }

    fn styled(&self, body: &MessageBody) -> String {
        let text = body.display_text();
        match body {
            MessageBody::Placeholder(_) if self.use_color => {
                format!("{ANSI_DIM}{ANSI_ITALIC}{text}{ANSI_RESET}")
            }
            MessageBody::Error(_) if self.use_color => format!("{ANSI_RED}{text}{ANSI_RESET}"),
            MessageBody::Text(text) if text.is_empty() => String::new(),
            MessageBody::Text(_) | MessageBody::Markup { .. } | MessageBody::Error(_) => {
                text.to_string()
            }
            MessageBody::Placeholder(_) => format!("[{text}]"),
        }
    }

    fn finish_live(&mut self) {
        if let Some(live) = self.live.take()
            && !live.printed.ends_with('\n')
        {
            println!();
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn clear(&mut self) {
        self.finish_live();
        self.generation += 1;
        self.mounted = 0;
        let rule = "-".repeat(40);
        if self.use_color {
            println!("{ANSI_DIM}{rule}{ANSI_RESET}");
        } else {
            println!("{rule}");
        }
    }

    fn mount(&mut self, role: Role, body: MessageBody) -> MessageHandle {
        self.finish_live();
        let handle = MessageHandle::new(self.generation, self.mounted);
        self.mounted += 1;
        let label = self.label(role);
        match &body {
            MessageBody::Text(text) if role == Role::Assistant => {
                // live entry: later updates append to this line
                print!("{label}{text}");
                self.live = Some(LiveEntry {
                    handle,
                    printed: text.clone(),
                });
            }
            MessageBody::Text(text) if text.is_empty() => {
                println!("{label}{EMPTY_MESSAGE}");
            }
            _ => println!("{label}{}", self.styled(&body)),
        }
        handle
    }

    fn update(&mut self, handle: MessageHandle, body: MessageBody) {
        let Some(live) = self.live.as_mut().filter(|live| live.handle == handle) else {
            if handle.generation == self.generation {
                self.finish_live();
                let label = self.label(Role::Assistant);
                println!("{label}{}", self.styled(&body));
            }
            return;
        };
        match &body {
            MessageBody::Text(text) if text.starts_with(&live.printed) => {
                print!("{}", &text[live.printed.len()..]);
                live.printed = text.clone();
            }
            MessageBody::Markup { source, .. } if source == &live.printed => {
                self.finish_live();
            }
            _ => {
                // only the line under the cursor can be erased; earlier lines
                // of a multi-line partial reply stay above the error
                let replaced = replace_current_line(&self.styled(&body));
                self.live = None;
                println!("{replaced}");
            }
        }
    }

    fn scroll_to_latest(&mut self) {
        self.flush();
    }
}

/// Move to the start of the line, erase it, and write `text` in its place.
fn replace_current_line(text: &str) -> String {
    format!("\r\x1b[2K{text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_renders_placeholder() {
        let expected = "<p>(empty response)</p>\n";
        assert_eq!(render_text(Some("")), expected);
        assert_eq!(render_text(None), expected);
        assert_eq!(render_text(Some("  \n ")), expected);
    }

    #[test]
    fn bold_markup_is_structured() {
        let html = render_text(Some("**x**"));
        assert!(html.contains("<strong>x</strong>"), "{html}");
    }

    #[test]
    fn raw_html_is_escaped() {
        let html = render_text(Some("<script>alert(1)</script>"));
        assert!(!html.contains("<script>"), "{html}");
        assert!(html.contains("&lt;script&gt;"), "{html}");
    }

    #[test]
    fn render_text_is_deterministic() {
        let source = "# Title\n\n- one\n- ~~two~~\n\n```rust\nfn main() {}\n```\n";
        assert_eq!(render_text(Some(source)), render_text(Some(source)));
        assert!(render_text(Some(source)).contains("<del>two</del>"));
    }

    #[test]
    fn buffer_renderer_scrolls_after_mount_and_update() {
        let mut renderer = BufferRenderer::new();
        let first = renderer.append_message(Role::User, MessageBody::Text("hi".to_string()));
        assert_eq!(renderer.scrolled_to(), Some(0));
        renderer.append_message(Role::Assistant, MessageBody::Text(String::new()));
        assert_eq!(renderer.scrolled_to(), Some(1));
        renderer.update_message(first, MessageBody::Text("hello".to_string()));
        assert_eq!(renderer.scroll_count(), 3);
        assert_eq!(renderer.entries()[0].revisions.len(), 2);
    }

    #[test]
    fn stale_handles_are_ignored_after_clear() {
        let mut renderer = BufferRenderer::new();
        let stale = renderer.append_message(Role::User, MessageBody::Text("old".to_string()));
        renderer.clear();
        renderer.append_message(Role::User, MessageBody::Text("new".to_string()));
        renderer.update_message(stale, MessageBody::Text("changed".to_string()));
        assert_eq!(renderer.transcript(), vec![(Role::User, "new".to_string())]);
    }

    #[test]
    fn send_failure_includes_reason() {
        let body = MessageBody::send_failure("rate limited");
        assert_eq!(
            body.display_text(),
            "Sorry, something went wrong: rate limited"
        );
    }

    #[test]
    fn failed_reply_overwrites_the_partial_line() {
        let line = replace_current_line("Sorry, something went wrong: reset");
        assert!(line.starts_with("\r\x1b[2K"), "{line:?}");
        assert!(line.ends_with("Sorry, something went wrong: reset"));
    }

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
    }
}
