//! Chat session controller: message list, one-shot PDF attachment and
//! prompt assembly on send.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::client::CompletionClient;
use crate::models::{Message, Sender, Theme};
use crate::pdf::{self, PdfLoader};

pub const THINKING_PLACEHOLDER: &str = "Gemini is thinking...";
pub const EMPTY_REPLY_TEXT: &str = "No response from Gemini.";
pub const UNREACHABLE_TEXT: &str = "⚠ Could not reach Gemini.";
pub const FILE_UPLOADED_TEXT: &str = "📎 1 file uploaded";
pub const PDF_EMPTY_TEXT: &str = "⚠ The PDF was parsed, but no readable text was found.";
pub const PDF_FAILED_TEXT: &str = "⚠ Failed to parse the uploaded PDF.";

/// Result of a send attempt
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Input was blank; nothing happened
    Ignored,
    /// Another send is still in flight; nothing happened
    Busy,
    /// The bot message appended for this send
    Replied(Message),
}

/// Result of a file selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// Declared type was not PDF
    Ignored,
    Attached { chars: usize },
    Empty,
    Failed,
}

/// A user-selected file
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct SessionState {
    messages: Vec<Message>,
    next_id: u64,
    pending_pdf_text: Option<String>,
    attached_file: Option<String>,
    loading: bool,
    theme: Theme,
}

impl SessionState {
    fn push(&mut self, sender: Sender, text: impl Into<String>) -> Message {
        let message = Message::new(self.next_id, sender, text);
        self.next_id += 1;
        self.messages.push(message.clone());
        message
    }
}

// No method leaves the state half-written, so a poisoned lock is recovered.
fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Holds the in-flight slot for one send. Dropping it before `finish`
/// (timeout, abort, `select!`) frees the slot and records the unreachable reply.
struct InFlight<'a> {
    state: &'a Mutex<SessionState>,
    finished: bool,
}

impl InFlight<'_> {
    fn finish(mut self, reply: String) -> Message {
        self.finished = true;
        let mut state = lock(self.state);
        state.loading = false;
        state.push(Sender::Bot, reply)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::warn!("Send dropped before a reply arrived");
        let mut state = lock(self.state);
        state.loading = false;
        state.push(Sender::Bot, UNREACHABLE_TEXT);
    }
}

/// User text, a blank line, then any extracted PDF text
pub fn assemble_prompt(text: &str, pdf_text: &str) -> String {
    format!("{text}\n\n{pdf_text}")
}

pub struct ChatSession {
    client: Arc<dyn CompletionClient>,
    pdf_loader: Arc<dyn PdfLoader>,
    state: Mutex<SessionState>,
}

impl ChatSession {
    pub fn new(client: Arc<dyn CompletionClient>, pdf_loader: Arc<dyn PdfLoader>) -> Self {
        Self {
            client,
            pdf_loader,
            state: Mutex::new(SessionState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.state)
    }

    /// Send typed input. At most one send is in flight per session.
    pub async fn send(&self, input: &str) -> SendOutcome {
        let text = input.trim();
        if text.is_empty() {
            return SendOutcome::Ignored;
        }

        let prompt = {
            let mut state = self.state();
            if state.loading {
                tracing::debug!("Send rejected while a request is in flight");
                return SendOutcome::Busy;
            }
            state.loading = true;
            state.push(Sender::User, text);
            let pdf_text = state.pending_pdf_text.take().unwrap_or_default();
            assemble_prompt(text, &pdf_text)
        };
        let in_flight = InFlight {
            state: &self.state,
            finished: false,
        };

        let reply = match self.client.complete(&prompt).await {
            Ok(reply) if reply.is_empty() => EMPTY_REPLY_TEXT.to_string(),
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Chat request failed: {}", e);
                UNREACHABLE_TEXT.to_string()
            }
        };

        SendOutcome::Replied(in_flight.finish(reply))
    }

    /// Handle a file selection. Non-PDF types are ignored without a message.
    pub async fn attach(&self, upload: Upload) -> AttachOutcome {
        if !pdf::is_pdf(&upload.content_type) {
            tracing::debug!(
                name = %upload.name,
                content_type = %upload.content_type,
                "Ignoring non-PDF upload"
            );
            return AttachOutcome::Ignored;
        }

        {
            let mut state = self.state();
            state.attached_file = Some(upload.name.clone());
            state.push(Sender::User, FILE_UPLOADED_TEXT);
        }

        let extracted = match self.pdf_loader.load(upload.bytes).await {
            Ok(doc) => pdf::extract_text(doc.as_ref()).await,
            Err(e) => Err(e),
        };

        let mut state = self.state();
        match extracted {
            Ok(text) if !text.trim().is_empty() => {
                let chars = text.chars().count();
                tracing::info!(name = %upload.name, chars, "Parsed PDF content");
                state.pending_pdf_text = Some(text);
                AttachOutcome::Attached { chars }
            }
            Ok(_) => {
                state.pending_pdf_text = None;
                state.push(Sender::Bot, PDF_EMPTY_TEXT);
                AttachOutcome::Empty
            }
            Err(e) => {
                tracing::error!("Error parsing PDF: {}", e);
                state.push(Sender::Bot, PDF_FAILED_TEXT);
                AttachOutcome::Failed
            }
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state().messages.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    /// Transient text to show while a reply is pending
    pub fn thinking_placeholder(&self) -> Option<&'static str> {
        self.is_loading().then_some(THINKING_PLACEHOLDER)
    }

    pub fn pending_pdf_text(&self) -> Option<String> {
        self.state().pending_pdf_text.clone()
    }

    pub fn attached_file(&self) -> Option<String> {
        self.state().attached_file.clone()
    }

    pub fn theme(&self) -> Theme {
        self.state().theme
    }

    pub fn toggle_theme(&self) -> Theme {
        let mut state = self.state();
        state.theme = state.theme.toggled();
        state.theme
    }
}
