use ratatui::widgets::ListState;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::api::HealthApi;
use crate::lifecycle::{self, Dashboard, FollowUp, PendingOperation};
use crate::reminders::ReminderDraft;
use crate::session::SessionContext;
use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Chat,
    Reminders,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Which popup, if any, owns the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    None,
    UploadPrompt,
    ConfirmDelete,
    InteractionWarning,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,

    pub dashboard: Dashboard,
    pub session: SessionContext,
    api: Arc<dyn HealthApi>,
    events: UnboundedSender<AppEvent>,

    // Chat state
    pub chat_input: String,
    pub chat_cursor: usize, // cursor position in chat_input
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Upload prompt state
    pub show_upload_prompt: bool,
    pub upload_input: String,
    pub upload_cursor: usize,

    // Reminder tab state
    pub form_field: usize,
    pub form_cursor: usize,
    pub reminder_state: ListState,

    // Animation state
    pub animation_frame: u8, // 0-2 for spinner animation
}

impl App {
    pub fn new(
        api: Arc<dyn HealthApi>,
        session: SessionContext,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            screen: Screen::Chat,
            input_mode: InputMode::Editing,

            dashboard: Dashboard::new(),
            session,
            api,
            events,

            chat_input: String::new(),
            chat_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            show_upload_prompt: false,
            upload_input: String::new(),
            upload_cursor: 0,

            form_field: 0,
            form_cursor: 0,
            reminder_state: ListState::default(),

            animation_frame: 0,
        }
    }

    /// Popup that currently owns the keyboard
    pub fn overlay(&self) -> Overlay {
        if self.dashboard.warning.is_some() {
            Overlay::InteractionWarning
        } else if self.dashboard.pending_delete.is_some() {
            Overlay::ConfirmDelete
        } else if self.show_upload_prompt {
            Overlay::UploadPrompt
        } else {
            Overlay::None
        }
    }

    /// Run `op` on a background task; its completion comes back as `AppEvent::Settled`.
    pub fn launch(&self, op: PendingOperation) {
        let api = Arc::clone(&self.api);
        let session = self.session.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let completion = lifecycle::execute(api, session, op).await;
            // Receiver is gone only when the app is shutting down
            let _ = tx.send(AppEvent::Settled(completion));
        });
    }

    pub fn launch_all(&mut self, follow_ups: Vec<FollowUp>) {
        for follow_up in follow_ups {
            let op = self.dashboard.follow_up(follow_up);
            self.launch(op);
        }
    }

    pub fn reload_reminders(&mut self) {
        let op = self.dashboard.load_reminders();
        self.launch(op);
    }

    pub fn switch_screen(&mut self, screen: Screen) {
        if self.screen == screen {
            return;
        }
        self.screen = screen;
        self.input_mode = InputMode::Normal;
        if screen == Screen::Reminders {
            self.reload_reminders();
        }
    }

    /// Tick animation frame and expire alerts (called by Tick event)
    pub fn tick(&mut self) {
        if self.dashboard.in_flight() > 0 {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.dashboard.tick(std::time::Instant::now());
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    // Reminder form helpers
    pub fn current_field(&self) -> &str {
        self.dashboard.draft.field(self.form_field)
    }

    pub fn focus_field(&mut self, idx: usize) {
        self.form_field = idx % ReminderDraft::FIELD_LABELS.len();
        self.form_cursor = self.current_field().chars().count();
    }

    pub fn next_field(&mut self) {
        self.focus_field(self.form_field + 1);
    }

    pub fn prev_field(&mut self) {
        let len = ReminderDraft::FIELD_LABELS.len();
        self.focus_field(self.form_field + len - 1);
    }

    // Reminder list navigation
    pub fn reminder_nav_down(&mut self) {
        let len = self.dashboard.reminders.len();
        if len > 0 {
            let i = self.reminder_state.selected().map(|i| i + 1).unwrap_or(0);
            self.reminder_state.select(Some(i.min(len - 1)));
        }
    }

    pub fn reminder_nav_up(&mut self) {
        let i = self.reminder_state.selected().unwrap_or(0);
        self.reminder_state.select(Some(i.saturating_sub(1)));
    }

    pub fn selected_reminder_id(&self) -> Option<i64> {
        self.reminder_state
            .selected()
            .and_then(|i| self.dashboard.reminders.get(i))
            .map(|r| r.id)
    }

    /// Keep the list selection inside the (possibly reloaded) reminder cache
    pub fn clamp_reminder_selection(&mut self) {
        let len = self.dashboard.reminders.len();
        match self.reminder_state.selected() {
            _ if len == 0 => self.reminder_state.select(None),
            Some(i) if i >= len => self.reminder_state.select(Some(len - 1)),
            None => self.reminder_state.select(Some(0)),
            _ => {}
        }
    }
}
