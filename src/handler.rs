use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;
use crate::api::UploadFile;
use crate::app::{App, InputMode, Overlay, Screen};
use crate::lifecycle::AlertLevel;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Apply a line-editing key to `buf`. Returns false if the key isn't an edit.
fn edit_text(buf: &mut String, cursor: &mut usize, key: KeyEvent) -> bool {
    let char_count = buf.chars().count();
    *cursor = (*cursor).min(char_count);
    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(buf, *cursor);
                buf.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < char_count {
                let byte_pos = char_to_byte_index(buf, *cursor);
                buf.remove(byte_pos);
            }
        }
        KeyCode::Left => *cursor = cursor.saturating_sub(1),
        KeyCode::Right => *cursor = (*cursor + 1).min(char_count),
        KeyCode::Home => *cursor = 0,
        KeyCode::End => *cursor = char_count,
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(buf, *cursor);
            buf.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => return false,
    }
    true
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key).await?,
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick(),
        AppEvent::Settled(completion) => {
            let follow_ups = app.dashboard.settle(completion.op, completion.result);
            app.launch_all(follow_ups);
            app.clamp_reminder_selection();
        }
    }
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    match app.overlay() {
        Overlay::InteractionWarning => handle_warning(app, key),
        Overlay::ConfirmDelete => handle_confirm_delete(app, key),
        Overlay::UploadPrompt => handle_upload_prompt(app, key).await,
        Overlay::None => match (app.screen, app.input_mode) {
            (Screen::Chat, InputMode::Normal) => handle_chat_normal(app, key),
            (Screen::Chat, InputMode::Editing) => handle_chat_editing(app, key),
            (Screen::Reminders, InputMode::Normal) => handle_reminders_normal(app, key),
            (Screen::Reminders, InputMode::Editing) => handle_form_editing(app, key),
        },
    }

    Ok(())
}

fn handle_warning(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('f') => {
            if let Some(op) = app.dashboard.force_add() {
                app.launch(op);
            }
        }
        KeyCode::Char('p') => {
            app.dashboard.defer_warning();
        }
        KeyCode::Char('c') | KeyCode::Esc => {
            app.dashboard.cancel_warning();
        }
        _ => {}
    }
}

fn handle_confirm_delete(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => {
            if let Some(op) = app.dashboard.confirm_delete() {
                app.launch(op);
            }
        }
        KeyCode::Char('n') | KeyCode::Esc => app.dashboard.cancel_delete(),
        _ => {}
    }
}

async fn handle_upload_prompt(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.show_upload_prompt = false;
        }
        KeyCode::Enter => {
            let raw = std::mem::take(&mut app.upload_input);
            app.upload_cursor = 0;
            app.show_upload_prompt = false;

            let path = PathBuf::from(raw.trim());
            if path.as_os_str().is_empty() {
                return;
            }
            match UploadFile::from_path(&path).await {
                Ok(file) => {
                    if let Some(op) = app.dashboard.submit_upload(file) {
                        app.launch(op);
                    }
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "could not read upload");
                    app.dashboard
                        .alert(format!("Could not read {}", path.display()), AlertLevel::Danger);
                }
            }
        }
        _ => {
            edit_text(&mut app.upload_input, &mut app.upload_cursor, key);
        }
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    let half_page = (app.chat_height / 2).max(1);
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('i') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
            app.chat_cursor = app.chat_input.chars().count();
        }
        KeyCode::Tab | KeyCode::Char('2') => app.switch_screen(Screen::Reminders),
        KeyCode::Char('u') => {
            app.show_upload_prompt = true;
            app.upload_input.clear();
            app.upload_cursor = 0;
        }

        // Half-page scroll
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_chat_down(half_page);
        }
        KeyCode::Char('b') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_chat_up(half_page);
        }
        KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.dashboard.log.clear();
            app.chat_scroll = 0;
        }
        KeyCode::Char('j') | KeyCode::Down => app.scroll_chat_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_chat_up(1),
        KeyCode::Char('g') => app.chat_scroll = 0,
        // Clamped to the real bottom during render
        KeyCode::Char('G') => app.chat_scroll = u16::MAX,
        _ => {}
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Tab => app.switch_screen(Screen::Reminders),
        KeyCode::Enter => {
            let text = std::mem::take(&mut app.chat_input);
            app.chat_cursor = 0;
            if let Some(op) = app.dashboard.submit_chat(&text) {
                app.launch(op);
            }
        }
        _ => {
            edit_text(&mut app.chat_input, &mut app.chat_cursor, key);
        }
    }
}

fn handle_reminders_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Tab | KeyCode::Char('1') => app.switch_screen(Screen::Chat),
        KeyCode::Char('a') | KeyCode::Char('i') => {
            app.input_mode = InputMode::Editing;
            app.focus_field(app.form_field);
        }
        KeyCode::Char('j') | KeyCode::Down => app.reminder_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.reminder_nav_up(),
        KeyCode::Char('d') => {
            if let Some(id) = app.selected_reminder_id() {
                app.dashboard.request_delete(id);
            }
        }
        KeyCode::Char('r') => app.reload_reminders(),
        _ => {}
    }
}

fn handle_form_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Tab | KeyCode::Down => app.next_field(),
        KeyCode::BackTab | KeyCode::Up => app.prev_field(),
        KeyCode::Enter => {
            if let Some(op) = app.dashboard.submit_reminder() {
                app.launch(op);
            }
        }
        _ => {
            let field = app.dashboard.draft.field_mut(app.form_field);
            edit_text(field, &mut app.form_cursor, key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AddReminderOutcome;
    use crate::lifecycle::ApiResponse;
    use crate::messages::Sender;
    use crate::test_support::{reminder, session, StubApi};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn setup() -> (App, Arc<StubApi>, mpsc::UnboundedReceiver<AppEvent>) {
        let stub = Arc::new(StubApi::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(stub.clone(), session(), tx);
        (app, stub, rx)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, AppEvent::Key(press(KeyCode::Char(c)))).await.unwrap();
        }
    }

    async fn key(app: &mut App, code: KeyCode) {
        handle_event(app, AppEvent::Key(press(code))).await.unwrap();
    }

    /// Deliver the next background completion to the app
    async fn settle_next(app: &mut App, rx: &mut mpsc::UnboundedReceiver<AppEvent>) {
        let event = rx.recv().await.expect("completion");
        handle_event(app, event).await.unwrap();
    }

    #[test]
    fn test_edit_text_utf8() {
        let mut buf = String::new();
        let mut cursor = 0;
        for c in "héllo".chars() {
            edit_text(&mut buf, &mut cursor, press(KeyCode::Char(c)));
        }
        edit_text(&mut buf, &mut cursor, press(KeyCode::Left));
        edit_text(&mut buf, &mut cursor, press(KeyCode::Backspace));
        assert_eq!(buf, "hélo");
        edit_text(&mut buf, &mut cursor, press(KeyCode::Home));
        edit_text(&mut buf, &mut cursor, press(KeyCode::Delete));
        assert_eq!(buf, "élo");
        assert!(!edit_text(&mut buf, &mut cursor, press(KeyCode::F(1))));
    }

    #[tokio::test]
    async fn test_chat_round_trip_through_event_loop() {
        let (mut app, stub, mut rx) = setup();
        stub.push(Ok(ApiResponse::Chat(crate::api::ChatReply {
            response: "Drink water".to_string(),
            agent: None,
            action: None,
        })));

        type_text(&mut app, "thirsty").await;
        key(&mut app, KeyCode::Enter).await;
        assert!(app.chat_input.is_empty());
        assert_eq!(app.dashboard.log.loading_count(), 1);

        settle_next(&mut app, &mut rx).await;

        assert_eq!(stub.calls(), vec!["chat:thirsty"]);
        assert_eq!(app.dashboard.log.loading_count(), 0);
        let last = app.dashboard.log.last().unwrap();
        assert_eq!(last.sender, Sender::Assistant);
        assert_eq!(last.content, "Drink water");
    }

    #[tokio::test]
    async fn test_switching_to_reminders_loads_list() {
        let (mut app, stub, mut rx) = setup();
        stub.push(Ok(ApiResponse::Reminders(vec![reminder(1, "Aspirin"), reminder(2, "Zinc")])));

        key(&mut app, KeyCode::Esc).await;
        key(&mut app, KeyCode::Tab).await;
        assert_eq!(app.screen, Screen::Reminders);
        settle_next(&mut app, &mut rx).await;

        assert_eq!(stub.calls(), vec!["list_reminders"]);
        assert_eq!(app.dashboard.reminders.len(), 2);
        assert_eq!(app.reminder_state.selected(), Some(0));
    }

    #[tokio::test]
    async fn test_delete_needs_confirmation_key() {
        let (mut app, stub, mut rx) = setup();
        stub.push(Ok(ApiResponse::Reminders(vec![reminder(7, "Aspirin")])));
        app.switch_screen(Screen::Reminders);
        settle_next(&mut app, &mut rx).await;

        key(&mut app, KeyCode::Char('d')).await;
        assert_eq!(app.overlay(), Overlay::ConfirmDelete);
        key(&mut app, KeyCode::Char('n')).await;
        assert_eq!(app.overlay(), Overlay::None);
        assert_eq!(stub.calls(), vec!["list_reminders"]);

        stub.push(Ok(ApiResponse::Deleted));
        stub.push(Ok(ApiResponse::Reminders(Vec::new())));
        key(&mut app, KeyCode::Char('d')).await;
        key(&mut app, KeyCode::Char('y')).await;
        settle_next(&mut app, &mut rx).await;
        settle_next(&mut app, &mut rx).await;

        assert_eq!(
            stub.calls(),
            vec!["list_reminders", "delete_reminder:7", "list_reminders"]
        );
        assert!(app.dashboard.reminders.is_empty());
        assert_eq!(app.reminder_state.selected(), None);
    }

    #[tokio::test]
    async fn test_form_submission_with_warning_then_force() {
        let (mut app, stub, mut rx) = setup();
        stub.push(Ok(ApiResponse::Reminders(vec![reminder(1, "aspirin")])));
        app.switch_screen(Screen::Reminders);
        settle_next(&mut app, &mut rx).await;

        key(&mut app, KeyCode::Char('a')).await;
        for value in ["warfarin", "5mg", "daily", "20:00"] {
            type_text(&mut app, value).await;
            key(&mut app, KeyCode::Tab).await;
        }
        assert_eq!(app.dashboard.draft.time, "20:00");

        stub.push(Ok(ApiResponse::AddReminder(AddReminderOutcome::InteractionWarning {
            conflicting_drugs: vec!["aspirin".to_string()],
            interaction_details: "**Warning**\n• bleeding risk".to_string(),
        })));
        key(&mut app, KeyCode::Enter).await;
        settle_next(&mut app, &mut rx).await;
        assert_eq!(app.overlay(), Overlay::InteractionWarning);
        assert_eq!(app.dashboard.draft.medicine_name, "warfarin");

        stub.push(Ok(ApiResponse::ForceAdded));
        stub.push(Ok(ApiResponse::Reminders(vec![
            reminder(1, "aspirin"),
            reminder(2, "warfarin"),
        ])));
        key(&mut app, KeyCode::Char('f')).await;
        settle_next(&mut app, &mut rx).await;
        settle_next(&mut app, &mut rx).await;

        assert_eq!(app.overlay(), Overlay::None);
        assert_eq!(app.dashboard.reminders.len(), 2);
        assert!(app.dashboard.draft.medicine_name.is_empty());
        assert_eq!(
            stub.calls(),
            vec![
                "list_reminders",
                "add_reminder:warfarin",
                "force_add_reminder:warfarin",
                "list_reminders"
            ]
        );
    }

    #[tokio::test]
    async fn test_upload_prompt_rejects_non_image() {
        let (mut app, stub, _rx) = setup();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        key(&mut app, KeyCode::Esc).await;
        key(&mut app, KeyCode::Char('u')).await;
        assert_eq!(app.overlay(), Overlay::UploadPrompt);
        type_text(&mut app, &path.display().to_string()).await;
        key(&mut app, KeyCode::Enter).await;

        assert_eq!(app.overlay(), Overlay::None);
        assert!(stub.calls().is_empty());
        assert_eq!(
            app.dashboard.log.last().unwrap().content,
            crate::lifecycle::NOT_AN_IMAGE
        );
    }

    #[tokio::test]
    async fn test_upload_prompt_missing_file_alerts() {
        let (mut app, stub, _rx) = setup();
        key(&mut app, KeyCode::Esc).await;
        key(&mut app, KeyCode::Char('u')).await;
        type_text(&mut app, "/definitely/not/here.png").await;
        key(&mut app, KeyCode::Enter).await;

        assert!(stub.calls().is_empty());
        assert_eq!(app.dashboard.alerts.last().unwrap().level, AlertLevel::Danger);
        assert!(app.dashboard.log.is_empty());
    }

    #[tokio::test]
    async fn test_ctrl_l_resets_conversation() {
        let (mut app, stub, mut rx) = setup();
        stub.push(Ok(ApiResponse::Chat(crate::api::ChatReply {
            response: "Hello".to_string(),
            agent: None,
            action: None,
        })));
        type_text(&mut app, "hi").await;
        key(&mut app, KeyCode::Enter).await;
        settle_next(&mut app, &mut rx).await;
        let first = app.dashboard.log.last().unwrap().id;

        key(&mut app, KeyCode::Esc).await;
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('l'), KeyModifiers::CONTROL)),
        )
        .await
        .unwrap();
        assert!(app.dashboard.log.is_empty());

        key(&mut app, KeyCode::Char('i')).await;
        stub.push(Ok(ApiResponse::Chat(crate::api::ChatReply {
            response: "Again".to_string(),
            agent: None,
            action: None,
        })));
        type_text(&mut app, "again").await;
        key(&mut app, KeyCode::Enter).await;
        assert!(app.dashboard.log.iter().all(|m| m.id > first));
        settle_next(&mut app, &mut rx).await;
        assert_eq!(app.dashboard.log.len(), 2);
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_from_popup() {
        let (mut app, _stub, _rx) = setup();
        app.show_upload_prompt = true;
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        )
        .await
        .unwrap();
        assert!(app.should_quit);
    }
}
