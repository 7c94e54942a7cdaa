//! Keyboard input handling and command dispatch.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::remote::Entry;

use super::app::{App, AppState, Overlay};
use super::tasks::{
    ExternalAction, TransferRequest, show_current_folder, start_action, start_fetch,
    start_transfer,
};

/// Logical commands the key map produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    Retry,
    Open,
    Back,
    Up,
    Down,
    Top,
    Bottom,
    Mark,
    Download,
    CopyLink,
    OpenPlayer,
    Toggle(Overlay),
}

/// Maps a key press to a command.
#[must_use]
pub fn command_for(key: KeyEvent) -> Option<Command> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return (key.code == KeyCode::Char('c')).then_some(Command::Quit);
    }

    let command = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Command::Quit,
        KeyCode::Char('r') => Command::Retry,
        KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => Command::Open,
        KeyCode::Backspace | KeyCode::Left | KeyCode::Char('h') => Command::Back,
        KeyCode::Up | KeyCode::Char('k') => Command::Up,
        KeyCode::Down | KeyCode::Char('j') => Command::Down,
        KeyCode::Home | KeyCode::Char('g') => Command::Top,
        KeyCode::End | KeyCode::Char('G') => Command::Bottom,
        KeyCode::Char('m' | ' ') => Command::Mark,
        KeyCode::Char('d') => Command::Download,
        KeyCode::Char('c') => Command::CopyLink,
        KeyCode::Char('o') => Command::OpenPlayer,
        KeyCode::Char('s') => Command::Toggle(Overlay::Spinner),
        KeyCode::Char('T') => Command::Toggle(Overlay::Title),
        KeyCode::Char('S') => Command::Toggle(Overlay::Status),
        KeyCode::Char('P') => Command::Toggle(Overlay::Path),
        KeyCode::Char('H') => Command::Toggle(Overlay::Help),
        _ => return None,
    };
    Some(command)
}

pub fn handle_input(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }
    if let Some(command) = command_for(key) {
        apply_command(app, command);
    }
}

pub fn apply_command(app: &mut App, command: Command) {
    if let Command::Toggle(overlay) = command {
        app.overlays.toggle(overlay);
        return;
    }
    app.notice = None;

    match command {
        Command::Quit => {
            app.cancel.cancel();
            app.should_quit = true;
        }
        Command::Retry => {
            if matches!(app.state, AppState::Error | AppState::Empty) {
                let folder = app.stack.current().clone();
                app.cache.invalidate(&folder);
                app.last_error = None;
                start_fetch(app, folder);
            }
        }
        Command::Back => {
            if matches!(
                app.state,
                AppState::Ready | AppState::Empty | AppState::Error
            ) && app.stack.pop().is_some()
            {
                app.last_error = None;
                show_current_folder(app);
            }
        }
        Command::Up if app.state == AppState::Ready => app.select_previous(),
        Command::Down if app.state == AppState::Ready => app.select_next(),
        Command::Top if app.state == AppState::Ready => app.select_first(),
        Command::Bottom if app.state == AppState::Ready => app.select_last(),
        Command::Open if app.state == AppState::Ready => open_selected(app),
        Command::Mark if app.state == AppState::Ready => mark_selected(app),
        Command::Download if app.state == AppState::Ready => download(app),
        Command::CopyLink if app.state == AppState::Ready => {
            external_action(app, ExternalAction::CopyLink);
        }
        Command::OpenPlayer if app.state == AppState::Ready => {
            external_action(app, ExternalAction::OpenPlayer);
        }
        _ => {}
    }
}

fn open_selected(app: &mut App) {
    match app.selected_entry().cloned() {
        Some(Entry::Folder(folder)) => {
            app.stack.push(folder.id, folder.name);
            show_current_folder(app);
        }
        Some(Entry::File(file)) => {
            app.notice = Some(format!(
                "{}: d to download, c to copy link, o to play",
                file.name
            ));
        }
        Some(Entry::Torrent(torrent)) => {
            app.notice = Some(format!(
                "{} is still downloading on the server ({}%)",
                torrent.name, torrent.progress
            ));
        }
        None => {}
    }
}

fn mark_selected(app: &mut App) {
    match app.selected_entry().and_then(Entry::file_descriptor) {
        Some(descriptor) => {
            app.selection.toggle(descriptor);
            app.refresh_marks();
        }
        None => app.notice = Some("Only files can be marked".to_string()),
    }
}

fn download(app: &mut App) {
    if !app.selection.is_empty() {
        let files = app.selection.to_vec();
        start_transfer(app, TransferRequest::Batch(files));
    } else if let Some(descriptor) = app.selected_entry().and_then(Entry::file_descriptor) {
        start_transfer(app, TransferRequest::Single(descriptor));
    } else {
        app.notice = Some("Select a file or mark files to download".to_string());
    }
}

fn external_action(app: &mut App, action: ExternalAction) {
    if !app.selection.is_empty() {
        app.notice = Some("Unmark all files first: this works on a single file".to_string());
    } else if let Some(descriptor) = app.selected_entry().and_then(Entry::file_descriptor) {
        start_action(app, action, descriptor);
    } else {
        app.notice = Some("Select a file first".to_string());
    }
}
