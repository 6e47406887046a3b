use std::path::PathBuf;
use anyhow::Result;
use easyleet_core::{HttpRemote, Pipeline, Rejection, RemoteError, RemoteRequest, Settings};
use ratatui::layout::Rect;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Single-line text field with a character-based cursor.
#[derive(Debug, Default, Clone)]
pub struct LineInput {
    pub text: String,
    pub cursor: usize,
}

impl LineInput {
    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, s: &str) {
        // Newlines would break a single-line field
        for c in s.chars().filter(|c| !c.is_control()) {
            self.insert(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.char_count() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.char_count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Question input
    pub query_input: LineInput,

    // Upload prompt
    pub show_file_prompt: bool,
    pub file_input: LineInput,

    // Conversation
    pub pipeline: Pipeline<HttpRemote>,
    pub request_task: Option<JoinHandle<Result<String, RemoteError>>>,

    // Chat scrolling (updated during render)
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub total_chat_lines: u16,
    pub follow_tail: bool,
    pub chat_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(settings: &Settings) -> Result<Self> {
        let remote = HttpRemote::new(settings.endpoint.clone(), settings.timeout)?;
        let pipeline = Pipeline::new(remote).with_max_upload_bytes(settings.max_upload_bytes);

        Ok(Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            query_input: LineInput::default(),

            show_file_prompt: false,
            file_input: LineInput::default(),

            pipeline,
            request_task: None,

            chat_scroll: 0,
            chat_height: 0,
            total_chat_lines: 0,
            follow_tail: true,
            chat_area: None,

            animation_frame: 0,
        })
    }

    /// Input controls are disabled while a request is in flight.
    pub fn controls_enabled(&self) -> bool {
        !self.pipeline.is_pending()
    }

    /// Submit the question box. The box is cleared only once the request is dispatched.
    pub fn submit_query(&mut self) {
        match self.pipeline.begin_text(&self.query_input.text) {
            Ok(request) => {
                self.dispatch(request);
                self.query_input.clear();
            }
            Err(rejection) => debug!(%rejection, "question not submitted"),
        }
    }

    pub fn open_file_prompt(&mut self) {
        if self.controls_enabled() {
            self.show_file_prompt = true;
        }
    }

    pub fn close_file_prompt(&mut self) {
        self.show_file_prompt = false;
        self.file_input.clear();
    }

    /// Upload the file named in the prompt.
    pub async fn submit_file(&mut self) {
        if self.file_input.is_blank() {
            return;
        }
        let path = expand_path(&self.file_input.text);

        match self.pipeline.begin_file(&path).await {
            Ok(request) => {
                self.dispatch(request);
                self.close_file_prompt();
            }
            // The pipeline already logged the refusal as a conversation entry
            Err(Rejection::Invalid) => {
                self.close_file_prompt();
                self.follow_tail = true;
            }
            Err(rejection) => debug!(%rejection, "file not submitted"),
        }
    }

    fn dispatch(&mut self, request: RemoteRequest) {
        self.request_task = Some(tokio::spawn(self.pipeline.dispatch(request)));
        self.animation_frame = 0;
        self.follow_tail = true;
    }

    /// Settle the in-flight request if its task has finished.
    pub async fn poll_request(&mut self) {
        let finished = self
            .request_task
            .as_ref()
            .is_some_and(|task| task.is_finished());
        if !finished {
            return;
        }

        if let Some(task) = self.request_task.take() {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(err) => Err(RemoteError::Interrupted(err.to_string())),
            };
            self.pipeline.settle(outcome);
            self.follow_tail = true;
        }
    }

    /// Abort any in-flight request (on quit).
    pub fn shutdown(&mut self) {
        if let Some(task) = self.request_task.take() {
            task.abort();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.pipeline.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    fn max_scroll(&self) -> u16 {
        self.total_chat_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_scroll());
        self.follow_tail = self.chat_scroll >= self.max_scroll();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_tail = self.chat_scroll >= self.max_scroll();
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    pub fn scroll_to_top(&mut self) {
        self.chat_scroll = 0;
        self.follow_tail = self.max_scroll() == 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow_tail = true;
        self.chat_scroll = self.max_scroll();
    }

    /// Record the chat geometry computed during render, keeping the tail in view
    /// when following.
    pub fn update_chat_geometry(&mut self, total_lines: u16, height: u16) {
        self.total_chat_lines = total_lines;
        self.chat_height = height;
        if self.follow_tail {
            self.chat_scroll = self.max_scroll();
        } else {
            self.chat_scroll = self.chat_scroll.min(self.max_scroll());
        }
    }

    pub fn endpoint_label(&self) -> String {
        let endpoint = self.pipeline.remote().endpoint();
        match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => endpoint.to_string(),
        }
    }
}

/// Interpret a typed path: strip surrounding quotes (terminals add them on
/// drag-and-drop) and expand a leading `~`.
pub fn expand_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
        .unwrap_or(trimmed);

    if let Some(rest) = unquoted.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(unquoted)
}
