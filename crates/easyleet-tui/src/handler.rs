use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, InputMode, LineInput};
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key).await?,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        // The next draw picks up the new size
        AppEvent::Resize => {}
        AppEvent::Tick => {
            app.tick_animation();
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

    if app.show_file_prompt {
        handle_file_prompt(app, key).await;
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }

    Ok(())
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        // Scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_down();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_up();
        }
        KeyCode::PageDown => app.scroll_half_page_down(),
        KeyCode::PageUp => app.scroll_half_page_up(),
        KeyCode::Char('g') | KeyCode::Home => app.scroll_to_top(),
        KeyCode::Char('G') | KeyCode::End => app.scroll_to_bottom(),

        // Start typing
        KeyCode::Char('i') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
        }

        // Upload a file
        KeyCode::Char('u') => app.open_file_prompt(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Char('o') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.open_file_prompt();
        }
        // Scroll the chat without leaving the input box
        KeyCode::PageDown => app.scroll_half_page_down(),
        KeyCode::PageUp => app.scroll_half_page_up(),
        // The question box is disabled while a request is in flight
        _ if !app.controls_enabled() => {}
        KeyCode::Enter => app.submit_query(),
        _ => edit_line(&mut app.query_input, key),
    }
}

async fn handle_file_prompt(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_file_prompt(),
        KeyCode::Enter => app.submit_file().await,
        _ => edit_line(&mut app.file_input, key),
    }
}

/// Apply a cursor-movement or typing key to a text field
fn edit_line(input: &mut LineInput, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.left(),
        KeyCode::Right => input.right(),
        KeyCode::Home => input.home(),
        KeyCode::End => input.end(),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => input.clear(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => input.insert(c),
        _ => {}
    }
}

fn handle_paste(app: &mut App, text: &str) {
    if app.show_file_prompt {
        app.file_input.insert_str(text);
    } else if app.input_mode == InputMode::Editing && app.controls_enabled() {
        app.query_input.insert_str(text);
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState};
    use easyleet_core::Settings;
    use std::time::Duration;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(c: char) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn app() -> App {
        let settings = Settings {
            endpoint: "http://127.0.0.1:9/solve".parse().unwrap(),
            timeout: Duration::from_secs(1),
            max_upload_bytes: 1024,
        };
        App::new(&settings).unwrap()
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c))).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_typing_and_editing_question() {
        let mut app = app();
        type_text(&mut app, "What is 2+3?").await;
        handle_event(&mut app, key(KeyCode::Left)).await.unwrap();
        handle_event(&mut app, key(KeyCode::Backspace)).await.unwrap();
        type_text(&mut app, "2").await;

        assert_eq!(app.query_input.text, "What is 2+2?");
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_from_anywhere() {
        let mut app = app();
        handle_event(&mut app, ctrl('o')).await.unwrap();
        assert!(app.show_file_prompt);

        handle_event(&mut app, ctrl('c')).await.unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_file_prompt_captures_keys() {
        let mut app = app();
        handle_event(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.input_mode, InputMode::Normal);

        handle_event(&mut app, key(KeyCode::Char('u'))).await.unwrap();
        assert!(app.show_file_prompt);

        // 'q' is typed into the path, not treated as quit
        type_text(&mut app, "q.png").await;
        assert_eq!(app.file_input.text, "q.png");
        assert!(!app.should_quit);

        handle_event(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert!(!app.show_file_prompt);
        assert!(app.file_input.text.is_empty());
    }

    #[tokio::test]
    async fn test_paste_goes_to_active_field() {
        let mut app = app();
        handle_event(&mut app, AppEvent::Paste("reverse a list".to_string()))
            .await
            .unwrap();
        assert_eq!(app.query_input.text, "reverse a list");

        app.open_file_prompt();
        handle_event(&mut app, AppEvent::Paste("/tmp/x.pdf".to_string()))
            .await
            .unwrap();
        assert_eq!(app.file_input.text, "/tmp/x.pdf");
    }

    #[tokio::test]
    async fn test_question_box_locked_while_pending() {
        let mut app = app();
        app.pipeline.begin_text("first").unwrap();
        assert!(!app.controls_enabled());

        type_text(&mut app, "second").await;
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();

        assert!(app.query_input.text.is_empty());
        assert_eq!(app.pipeline.conversation().len(), 1);

        // Upload prompt stays closed too
        handle_event(&mut app, ctrl('o')).await.unwrap();
        assert!(!app.show_file_prompt);
    }
}
