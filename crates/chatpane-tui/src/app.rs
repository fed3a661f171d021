//! Application state and input handling.
//!
//! [`App`] owns the [`Session`] plus the view state that only matters to the
//! terminal: focus, list cursor, input buffers and the last error. Every
//! change to conversations or messages goes through the session.

use chatpane_engine::{
    ClientConfig, Completion, CompletionOutcome, Conversation, ConversationId, CoreError, LoadState,
    MessageStatus, Session,
};
use crossterm::event::{KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::{debug, warn};

use crate::event::{key_to_action, Action};
use crate::input::TextInputState;
use crate::layout::{self, RegionId, Regions};
use crate::theme::{BorderSet, IconMode, IconSet, Theme};
use crate::widgets::conversation_list::{list_offset, visible_rows, ROW_HEIGHT};
use crate::widgets::ThreadView;

/// Which input region receives key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    Search,
    #[default]
    Conversations,
    Composer,
}

impl Focus {
    /// Next focus in Tab order.
    pub fn next(self) -> Self {
        match self {
            Self::Search => Self::Conversations,
            Self::Conversations => Self::Composer,
            Self::Composer => Self::Search,
        }
    }

    /// Previous focus in Tab order.
    pub fn prev(self) -> Self {
        match self {
            Self::Search => Self::Composer,
            Self::Conversations => Self::Search,
            Self::Composer => Self::Conversations,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Search => "Search",
            Self::Conversations => "Conversations",
            Self::Composer => "Composer",
        }
    }

    /// Region that owns this focus.
    pub fn region(self) -> RegionId {
        match self {
            Self::Search => RegionId::Search,
            Self::Conversations => RegionId::Conversations,
            Self::Composer => RegionId::MessageInput,
        }
    }
}

/// Main application state.
pub struct App {
    pub session: Session,
    pub focus: Focus,
    /// Index into the filtered conversation list.
    pub list_cursor: usize,
    pub search_input: TextInputState,
    pub composer_input: TextInputState,
    /// Shown in the footer until the next successful action.
    pub last_error: Option<String>,
    pub theme: Theme,
    pub icons: IconSet,
    pub borders: BorderSet,
    pub sidebar_percent: u16,
    /// Full terminal area, used for mouse hit-testing.
    pub terminal_size: Rect,
    pub should_quit: bool,
    view_dirty: bool,
}

impl App {
    /// Create the app around a session.
    pub fn new(session: Session, config: &ClientConfig) -> Self {
        let mode = IconMode::from(config.ui.effective_icons());
        Self {
            session,
            focus: Focus::default(),
            list_cursor: 0,
            search_input: TextInputState::new(),
            composer_input: TextInputState::new(),
            last_error: None,
            theme: Theme::from_env(),
            icons: IconSet::new(mode),
            borders: BorderSet::new(mode),
            sidebar_percent: config.ui.sidebar_percent,
            terminal_size: Rect::default(),
            should_quit: false,
            view_dirty: true,
        }
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.terminal_size = Rect::new(0, 0, width, height);
        self.view_dirty = true;
    }

    pub fn regions(&self) -> Option<Regions> {
        Regions::compute(self.terminal_size, self.sidebar_percent)
    }

    /// Whether anything visible changed since the last frame.
    pub fn needs_redraw(&self) -> bool {
        self.view_dirty || self.session.state().render_signal().is_pending()
    }

    pub fn mark_rendered(&mut self) {
        self.view_dirty = false;
        self.session.state_mut().render_signal_mut().mark_rendered();
    }

    /// Conversations after the search filter, in list order.
    pub fn visible_conversations(&self) -> Vec<&Conversation> {
        self.session.state().filtered_conversations().collect()
    }

    fn conversation_at_cursor(&self) -> Option<ConversationId> {
        self.session
            .state()
            .filtered_conversations()
            .nth(self.list_cursor)
            .map(|c| c.id.clone())
    }

    /// What the thread pane should show for the current selection.
    pub fn thread_view(&self) -> ThreadView<'_> {
        let state = self.session.state();
        let Some(id) = state.selected_conversation_id() else {
            return ThreadView::NoSelection;
        };
        let thread = state.get_thread(id).unwrap_or_default();
        let loading = matches!(state.messages.load_state(id), Some(LoadState::Loading { .. }));
        if thread.is_empty() && loading {
            ThreadView::Loading
        } else {
            ThreadView::Messages(thread)
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let action = key_to_action(key, self.focus);
        self.handle_action(action);
    }

    /// Handle an action.
    pub fn handle_action(&mut self, action: Action) {
        match action {
            Action::None => return,
            Action::Quit => self.should_quit = true,
            Action::FocusNext => self.focus = self.focus.next(),
            Action::FocusPrev => self.focus = self.focus.prev(),
            Action::Back => self.focus = Focus::Conversations,
            Action::Resend => self.resend(),
            _ => match self.focus {
                Focus::Search => self.handle_search_action(action),
                Focus::Conversations => self.handle_list_action(action),
                Focus::Composer => self.handle_composer_action(action),
            },
        }
        self.view_dirty = true;
    }

    fn handle_search_action(&mut self, action: Action) {
        let input = &mut self.search_input;
        let edited = match action {
            Action::Insert(c) => {
                input.insert(c);
                true
            }
            Action::Backspace => {
                input.backspace();
                true
            }
            Action::Delete => {
                input.delete();
                true
            }
            Action::Left => {
                input.move_left();
                false
            }
            Action::Right => {
                input.move_right();
                false
            }
            Action::Home => {
                input.move_home();
                false
            }
            Action::End => {
                input.move_end();
                false
            }
            Action::Confirm | Action::Down => {
                self.focus = Focus::Conversations;
                false
            }
            _ => false,
        };
        // Live filtering: the query follows every edit.
        if edited {
            self.session.set_query(self.search_input.content());
            self.list_cursor = 0;
        }
    }

    fn handle_list_action(&mut self, action: Action) {
        let len = self.session.state().filtered_conversations().count();
        match action {
            Action::Up => self.list_cursor = self.list_cursor.saturating_sub(1),
            Action::Down => {
                if self.list_cursor + 1 < len {
                    self.list_cursor += 1;
                }
            }
            Action::Home => self.list_cursor = 0,
            Action::End => self.list_cursor = len.saturating_sub(1),
            Action::Confirm => self.open_at_cursor(),
            _ => {}
        }
    }

    fn handle_composer_action(&mut self, action: Action) {
        let input = &mut self.composer_input;
        match action {
            Action::Insert(c) => input.insert(c),
            Action::Newline => input.insert('\n'),
            Action::Backspace => input.backspace(),
            Action::Delete => input.delete(),
            Action::Left => input.move_left(),
            Action::Right => input.move_right(),
            Action::Home => input.move_home(),
            Action::End => input.move_end(),
            Action::Up => input.history_prev(),
            Action::Down => input.history_next(),
            Action::Confirm => self.submit_draft(),
            _ => {}
        }
    }

    /// Select the conversation under the list cursor.
    pub fn open_at_cursor(&mut self) {
        let Some(id) = self.conversation_at_cursor() else {
            return;
        };
        match self.session.select_conversation(&id) {
            Ok(_) => {
                self.focus = Focus::Composer;
                self.last_error = None;
            }
            Err(err) => self.set_error(err.to_string()),
        }
    }

    /// Submit the composer draft to the selected conversation.
    ///
    /// The draft is only cleared when the submission is accepted.
    pub fn submit_draft(&mut self) {
        let Some(id) = self.session.state().selected_conversation_id().cloned() else {
            self.set_error("Select a conversation first");
            return;
        };
        match self.session.submit(&id, self.composer_input.content()) {
            Ok(pending) => {
                debug!(conversation_id = %id, message_id = %pending.message_id, "Draft submitted");
                self.composer_input.submit();
                self.last_error = None;
            }
            Err(err) => self.set_error(err.to_string()),
        }
        self.view_dirty = true;
    }

    /// Resend the newest failed message in the selected thread.
    pub fn resend(&mut self) {
        match self.session.resend_latest_failed() {
            Ok(Some(_)) => self.last_error = None,
            Ok(None) => self.set_error("No failed message to resend"),
            Err(err) => self.set_error(err.to_string()),
        }
    }

    /// Handle a mouse event using the same regions the renderer draws.
    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let Some(regions) = self.regions() else {
            return;
        };
        let Some(region) = regions.hit_test(mouse.column, mouse.row) else {
            return;
        };
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.click(region, &regions, mouse.row),
            MouseEventKind::ScrollUp if region == RegionId::Conversations => {
                self.handle_list_action(Action::Up);
            }
            MouseEventKind::ScrollDown if region == RegionId::Conversations => {
                self.handle_list_action(Action::Down);
            }
            _ => return,
        }
        self.view_dirty = true;
    }

    fn click(&mut self, region: RegionId, regions: &Regions, row: u16) {
        match region {
            RegionId::Search => self.focus = Focus::Search,
            RegionId::Conversations => {
                self.focus = Focus::Conversations;
                if let Some(index) = self.row_at(regions.conversations, row) {
                    self.list_cursor = index;
                    self.open_at_cursor();
                }
            }
            RegionId::MessageInput => self.focus = Focus::Composer,
            RegionId::SendButton => {
                self.focus = Focus::Composer;
                self.submit_draft();
            }
            RegionId::ChatHeader | RegionId::Messages | RegionId::Footer => {}
        }
    }

    /// List index of the conversation row drawn at terminal `row`.
    fn row_at(&self, area: Rect, row: u16) -> Option<usize> {
        let inner = layout::inner(area);
        if row < inner.y || row >= inner.bottom() {
            return None;
        }
        let rows = visible_rows(inner.height);
        let offset = list_offset(self.list_cursor, rows);
        let index = offset + usize::from((row - inner.y) / ROW_HEIGHT);
        let len = self.session.state().filtered_conversations().count();
        (index < len && index < offset + rows).then_some(index)
    }

    /// Apply one completion from the session channel.
    pub fn apply_completion(&mut self, completion: Completion) {
        let keep = self.conversation_at_cursor();
        let outcome = self.session.handle_completion(completion);
        self.report(outcome);
        self.restore_cursor(keep.as_ref());
    }

    /// Apply every completion that is ready.
    pub fn process_completions(&mut self) {
        let keep = self.conversation_at_cursor();
        let outcomes = self.session.drain_completions();
        if outcomes.is_empty() {
            return;
        }
        for outcome in outcomes {
            self.report(outcome);
        }
        self.restore_cursor(keep.as_ref());
    }

    fn report(&mut self, outcome: Result<CompletionOutcome, CoreError>) {
        match outcome {
            Ok(CompletionOutcome::Sent {
                status: MessageStatus::Failed,
                error: Some(error),
                ..
            }) => self.set_error(format!("Send failed: {error}")),
            Ok(CompletionOutcome::ThreadFailed {
                conversation_id,
                error,
            }) => self.set_error(format!("Could not load {conversation_id}: {error}")),
            Ok(CompletionOutcome::ConversationsFailed(error)) => {
                self.set_error(format!("Could not load conversations: {error}"));
            }
            Ok(_) => {}
            Err(err) => {
                warn!(%err, "Completion rejected");
                self.set_error(err.to_string());
            }
        }
    }

    /// Keep the cursor on the same conversation when the list reorders.
    fn restore_cursor(&mut self, keep: Option<&ConversationId>) {
        let list = self.visible_conversations();
        let position = keep.and_then(|id| list.iter().position(|c| &c.id == id));
        let len = list.len();
        self.list_cursor = match position {
            Some(index) => index,
            None => self.list_cursor.min(len.saturating_sub(1)),
        };
    }

    fn set_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!(error = %message, "Showing error");
        self.last_error = Some(message);
        self.view_dirty = true;
    }
}
