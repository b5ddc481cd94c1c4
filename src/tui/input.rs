use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use std::time::Duration;

use super::app::{App, Focus, Mode};
use crate::assistant::Step;

/// Everything a key press can do to the app.
#[derive(Debug, Clone, PartialEq)]
enum Action {
    Quit,
    Ask,
    Schema,
    Prompt(&'static str),
    RunCommand,
    CancelCommand,
    CommandBackspace,
    CommandChar(char),
    Insert,
    InsertAtStart,
    Append,
    AppendAtEnd,
    Normal,
    ToggleFocus,
    Type(char),
    Backspace,
    DeleteForward,
    DeleteWordBack,
    DeleteToStart,
    DeleteToEnd,
    ClearQuestion,
    CursorLeft,
    CursorRight,
    CursorStart,
    CursorEnd,
    WordForward,
    WordBack,
    HistoryUp,
    HistoryDown,
    ScrollUp,
    ScrollDown,
    ScrollLeft,
    ScrollRight,
    PageUp,
    PageDown,
    Top,
    Bottom,
}

pub fn handle_events(app: &mut App) -> std::io::Result<bool> {
    if event::poll(Duration::from_millis(100))? {
        if let Event::Key(key) = event::read()? {
            handle_key_event(app, key);
        }
    }
    Ok(app.should_quit)
}

fn handle_key_event(app: &mut App, key: KeyEvent) {
    if let Some(action) = action_for(app.mode, app.focus, app.step(), key) {
        apply(app, action);
    }
}

fn action_for(mode: Mode, focus: Focus, step: Step, key: KeyEvent) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if ctrl && key.code == KeyCode::Char('c') {
        return Some(match mode {
            Mode::Insert => Action::Normal,
            _ => Action::Quit,
        });
    }

    match mode {
        Mode::Command => command_action(key),
        Mode::Insert if ctrl => insert_ctrl_action(key),
        Mode::Insert => insert_action(key),
        Mode::Normal if ctrl => normal_ctrl_action(key),
        Mode::Normal => normal_action(focus, step, key),
    }
}

fn command_action(key: KeyEvent) -> Option<Action> {
    Some(match key.code {
        KeyCode::Esc => Action::CancelCommand,
        KeyCode::Enter => Action::RunCommand,
        KeyCode::Backspace => Action::CommandBackspace,
        KeyCode::Char(c) => Action::CommandChar(c),
        _ => return None,
    })
}

fn insert_ctrl_action(key: KeyEvent) -> Option<Action> {
    Some(match key.code {
        KeyCode::Char('w') => Action::DeleteWordBack,
        KeyCode::Char('u') => Action::DeleteToStart,
        KeyCode::Char('k') => Action::DeleteToEnd,
        KeyCode::Char('a') => Action::CursorStart,
        KeyCode::Char('e') => Action::CursorEnd,
        _ => return None,
    })
}

fn insert_action(key: KeyEvent) -> Option<Action> {
    Some(match key.code {
        KeyCode::Esc => Action::Normal,
        KeyCode::Enter => Action::Ask,
        KeyCode::Backspace => Action::Backspace,
        KeyCode::Delete => Action::DeleteForward,
        KeyCode::Left => Action::CursorLeft,
        KeyCode::Right => Action::CursorRight,
        KeyCode::Home => Action::CursorStart,
        KeyCode::End => Action::CursorEnd,
        KeyCode::Up => Action::HistoryUp,
        KeyCode::Down => Action::HistoryDown,
        KeyCode::Char(c) => Action::Type(c),
        _ => return None,
    })
}

fn normal_ctrl_action(key: KeyEvent) -> Option<Action> {
    Some(match key.code {
        KeyCode::Char('d') => Action::PageDown,
        KeyCode::Char('u') => Action::PageUp,
        KeyCode::Char('l') => Action::ClearQuestion,
        _ => return None,
    })
}

fn normal_action(focus: Focus, step: Step, key: KeyEvent) -> Option<Action> {
    let action = match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char(':') => Action::Prompt(""),
        KeyCode::Char('L') => Action::Prompt("load "),
        KeyCode::Char('v') => Action::Prompt("view "),
        KeyCode::Char('K') => Action::Prompt("key "),
        KeyCode::Char('s') => Action::Schema,
        KeyCode::Tab => Action::ToggleFocus,
        // Nothing to ask about yet: Enter starts an upload instead.
        KeyCode::Enter if step == Step::Upload => Action::Prompt("load "),
        KeyCode::Enter => Action::Ask,
        _ => match focus {
            Focus::Question => question_motion(key)?,
            Focus::Results => results_motion(key)?,
        },
    };
    Some(action)
}

fn question_motion(key: KeyEvent) -> Option<Action> {
    Some(match key.code {
        KeyCode::Char('i') => Action::Insert,
        KeyCode::Char('I') => Action::InsertAtStart,
        KeyCode::Char('a') => Action::Append,
        KeyCode::Char('A') => Action::AppendAtEnd,
        KeyCode::Char('h') | KeyCode::Left => Action::CursorLeft,
        KeyCode::Char('l') | KeyCode::Right => Action::CursorRight,
        KeyCode::Char('k') | KeyCode::Up => Action::HistoryUp,
        KeyCode::Char('j') | KeyCode::Down => Action::HistoryDown,
        KeyCode::Char('0') => Action::CursorStart,
        KeyCode::Char('$') => Action::CursorEnd,
        KeyCode::Char('w') => Action::WordForward,
        KeyCode::Char('b') => Action::WordBack,
        KeyCode::Char('x') => Action::DeleteForward,
        KeyCode::Char('D') => Action::DeleteToEnd,
        _ => return None,
    })
}

fn results_motion(key: KeyEvent) -> Option<Action> {
    Some(match key.code {
        KeyCode::Char('i') => Action::Insert,
        KeyCode::Char('h') | KeyCode::Left => Action::ScrollLeft,
        KeyCode::Char('l') | KeyCode::Right => Action::ScrollRight,
        KeyCode::Char('k') | KeyCode::Up => Action::ScrollUp,
        KeyCode::Char('j') | KeyCode::Down => Action::ScrollDown,
        KeyCode::Char('g') => Action::Top,
        KeyCode::Char('G') => Action::Bottom,
        _ => return None,
    })
}

fn apply(app: &mut App, action: Action) {
    match action {
        Action::Quit => app.should_quit = true,
        Action::Ask => {
            app.ask_question();
            app.enter_normal_mode();
        }
        Action::Schema => app.show_schema(),
        Action::Prompt(prefill) => {
            app.enter_command_mode();
            app.command_buffer.push_str(prefill);
        }
        Action::RunCommand => app.execute_command(),
        Action::CancelCommand => {
            app.command_buffer.clear();
            app.enter_normal_mode();
        }
        Action::CommandBackspace => {
            app.command_buffer.pop();
            if app.command_buffer.is_empty() {
                app.enter_normal_mode();
            }
        }
        Action::CommandChar(c) => app.command_buffer.push(c),
        Action::Insert => app.enter_insert_mode(),
        Action::InsertAtStart => {
            app.move_cursor_start();
            app.enter_insert_mode();
        }
        Action::Append => {
            app.move_cursor_right();
            app.enter_insert_mode();
        }
        Action::AppendAtEnd => {
            app.move_cursor_end();
            app.enter_insert_mode();
        }
        Action::Normal => app.enter_normal_mode(),
        Action::ToggleFocus => app.toggle_focus(),
        Action::Type(c) => app.insert_char(c),
        Action::Backspace => app.delete_char(),
        Action::DeleteForward => app.delete_char_forward(),
        Action::DeleteWordBack => app.delete_word_backward(),
        Action::DeleteToStart => app.delete_to_start(),
        Action::DeleteToEnd => app.delete_to_end(),
        Action::ClearQuestion => app.clear_question(),
        Action::CursorLeft => app.move_cursor_left(),
        Action::CursorRight => app.move_cursor_right(),
        Action::CursorStart => app.move_cursor_start(),
        Action::CursorEnd => app.move_cursor_end(),
        Action::WordForward => app.move_cursor_word_forward(),
        Action::WordBack => app.move_cursor_word_backward(),
        Action::HistoryUp => app.history_up(),
        Action::HistoryDown => app.history_down(),
        Action::ScrollUp => app.scroll_results_up(),
        Action::ScrollDown => app.scroll_results_down(),
        Action::ScrollLeft => app.scroll_results_left(),
        Action::ScrollRight => app.scroll_results_right(),
        Action::PageUp => app.page_up(),
        Action::PageDown => app.page_down(),
        Action::Top => app.scroll_to_top(),
        Action::Bottom => app.scroll_to_bottom(),
    }
}
