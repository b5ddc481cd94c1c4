use std::path::{Path, PathBuf};

use crate::assistant::session::{NOTHING_UPLOADED, NO_RESULTS};
use crate::assistant::{AskOutcome, Session, SessionError, Step, UploadOutcome};
use crate::storage::table::Table;
use crate::store::{collect_csv_files, QueryResult};

const LOAD_HINT: &str = "Load CSV files with :load <file or folder>...";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Normal,
    Insert,
    Command,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Focus {
    Question,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Level {
    Info,
    Warning,
    Error,
}

/// What the results panel is showing.
#[derive(Debug, Clone)]
pub enum Output {
    Rows(Table),
    Text(String),
    Message(Level, String),
}

pub struct App {
    pub session: Session,
    pub question: String,
    pub cursor_pos: usize,
    pub generated_sql: Option<String>,
    pub output: Output,
    pub mode: Mode,
    pub focus: Focus,
    pub should_quit: bool,
    pub command_buffer: String,
    pub result_scroll: usize,
    pub result_horizontal_scroll: usize,
    pub history: Vec<String>,
    pub history_index: Option<usize>,
    pub column_widths: Vec<usize>,
    pub tables: Vec<String>,
}

impl App {
    pub fn new(session: Session) -> Self {
        let mut app = Self {
            session,
            question: String::new(),
            cursor_pos: 0,
            generated_sql: None,
            output: Output::Message(Level::Info, LOAD_HINT.to_string()),
            mode: Mode::Normal,
            focus: Focus::Question,
            should_quit: false,
            command_buffer: String::new(),
            result_scroll: 0,
            result_horizontal_scroll: 0,
            history: Vec::new(),
            history_index: None,
            column_widths: Vec::new(),
            tables: Vec::new(),
        };
        app.refresh_tables();
        if app.session.has_data() {
            app.set_message(Level::Info, "Type a question and press Enter to ask it");
        }
        app
    }

    pub fn step(&self) -> Step {
        self.session.step()
    }

    pub fn ask_question(&mut self) {
        if self.question.trim().is_empty() {
            return;
        }

        // Add to history
        if self.history.last() != Some(&self.question) {
            self.history.push(self.question.clone());
        }
        self.history_index = None;
        self.generated_sql = None;

        match self.session.ask(&self.question) {
            Ok(AskOutcome::Answered { sql, result }) => {
                self.generated_sql = Some(sql);
                match result {
                    QueryResult::Rows(table) => self.show_table(table),
                    QueryResult::Empty => self.set_message(Level::Info, NO_RESULTS),
                }
            }
            Ok(outcome) => {
                let level = match outcome {
                    AskOutcome::MissingCredential => Level::Error,
                    _ => Level::Warning,
                };
                let message = outcome.warning().unwrap_or_default();
                self.set_message(level, message);
            }
            Err(SessionError::NoData) => self.set_message(Level::Warning, NOTHING_UPLOADED),
            Err(e) => self.set_message(Level::Error, e.to_string()),
        }
    }

    /// Loads a new batch from the `:load` arguments, replacing the current
    /// tables.
    pub fn load(&mut self, args: &str) {
        let paths = split_paths(args);

        let result = collect_csv_files(&paths)
            .map_err(SessionError::from)
            .and_then(|files| self.session.upload(&files));

        match result {
            Ok(UploadOutcome::Loaded(tables)) => {
                self.generated_sql = None;
                self.set_message(Level::Info, format!("Loaded tables: {}", tables.join(", ")));
            }
            Ok(outcome) => {
                let message = outcome.warning().unwrap_or_default();
                self.set_message(Level::Warning, message);
            }
            Err(e) => self.set_message(Level::Error, e.to_string()),
        }
        self.refresh_tables();
    }

    /// Shows an uploaded table in the results panel.
    pub fn view_table(&mut self, name: &str) {
        let name = match name.trim() {
            "" => match self.tables.first() {
                Some(first) => first.clone(),
                None => return self.set_message(Level::Warning, NOTHING_UPLOADED),
            },
            name => name.to_string(),
        };

        let table = match self.session.store() {
            Some(store) => store.table(&name),
            None => return self.set_message(Level::Warning, NOTHING_UPLOADED),
        };
        match table {
            Ok(table) => self.show_table(table),
            Err(e) => self.set_message(Level::Error, e.to_string()),
        }
    }

    pub fn show_schema(&mut self) {
        match self.session.describe() {
            Ok(description) => {
                self.output = Output::Text(description);
                self.result_scroll = 0;
            }
            Err(SessionError::NoData) => self.set_message(Level::Warning, NOTHING_UPLOADED),
            Err(e) => self.set_message(Level::Error, e.to_string()),
        }
    }

    pub fn reset(&mut self) {
        match self.session.reset() {
            Ok(()) => {
                self.generated_sql = None;
                self.set_message(Level::Info, LOAD_HINT);
            }
            Err(e) => self.set_message(Level::Error, e.to_string()),
        }
        self.refresh_tables();
    }

    pub fn set_api_key(&mut self, key: &str) {
        let key = key.trim();
        if key.is_empty() {
            self.session.set_api_key(None);
            self.set_message(Level::Warning, "API key cleared");
        } else {
            self.session.set_api_key(Some(key.to_string()));
            self.set_message(Level::Info, "API key set for this session");
        }
    }

    fn refresh_tables(&mut self) {
        self.tables = self
            .session
            .store()
            .and_then(|store| store.table_names().ok())
            .unwrap_or_default();
    }

    fn show_table(&mut self, table: Table) {
        self.calculate_column_widths(&table);
        self.output = Output::Rows(table);
        self.result_scroll = 0;
        self.result_horizontal_scroll = 0;
    }

    fn set_message(&mut self, level: Level, message: impl Into<String>) {
        self.output = Output::Message(level, message.into());
        self.result_scroll = 0;
    }

    fn calculate_column_widths(&mut self, table: &Table) {
        self.column_widths = table
            .schema
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let header_width = col.name.chars().count();
                let max_value_width = table
                    .rows
                    .iter()
                    .map(|row| row.values.get(i).map(|v| v.to_string().chars().count()).unwrap_or(0))
                    .max()
                    .unwrap_or(0);
                header_width.max(max_value_width).clamp(4, 40)
            })
            .collect();
    }

    fn output_len(&self) -> usize {
        match &self.output {
            Output::Rows(table) => table.row_count(),
            Output::Text(text) => text.lines().count(),
            Output::Message(..) => 0,
        }
    }

    fn prev_boundary(&self) -> usize {
        self.question[..self.cursor_pos]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    fn next_boundary(&self) -> usize {
        self.question[self.cursor_pos..]
            .chars()
            .next()
            .map(|c| self.cursor_pos + c.len_utf8())
            .unwrap_or(self.question.len())
    }

    pub fn insert_char(&mut self, c: char) {
        self.question.insert(self.cursor_pos, c);
        self.cursor_pos += c.len_utf8();
    }

    pub fn delete_char(&mut self) {
        if self.cursor_pos > 0 {
            self.cursor_pos = self.prev_boundary();
            self.question.remove(self.cursor_pos);
        }
    }

    pub fn delete_char_forward(&mut self) {
        if self.cursor_pos < self.question.len() {
            self.question.remove(self.cursor_pos);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor_pos = self.prev_boundary();
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor_pos = self.next_boundary();
    }

    pub fn move_cursor_start(&mut self) {
        self.cursor_pos = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor_pos = self.question.len();
    }

    pub fn move_cursor_word_forward(&mut self) {
        let rest = &self.question[self.cursor_pos..];
        let mut offset = rest.len();
        let mut seen_space = false;

        // Skip the current word, then the whitespace after it
        for (i, c) in rest.char_indices() {
            if c.is_whitespace() {
                seen_space = true;
            } else if seen_space {
                offset = i;
                break;
            }
        }

        self.cursor_pos += offset;
    }

    pub fn move_cursor_word_backward(&mut self) {
        let before = self.question[..self.cursor_pos].trim_end();
        self.cursor_pos = before
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
    }

    pub fn delete_word_backward(&mut self) {
        let end = self.cursor_pos;
        self.move_cursor_word_backward();
        self.question.drain(self.cursor_pos..end);
    }

    pub fn delete_to_end(&mut self) {
        self.question.truncate(self.cursor_pos);
    }

    pub fn delete_to_start(&mut self) {
        self.question = self.question[self.cursor_pos..].to_string();
        self.cursor_pos = 0;
    }

    pub fn clear_question(&mut self) {
        self.question.clear();
        self.cursor_pos = 0;
    }

    pub fn history_up(&mut self) {
        if self.history.is_empty() {
            return;
        }

        let new_index = match self.history_index {
            None => self.history.len() - 1,
            Some(0) => 0,
            Some(i) => i - 1,
        };

        self.history_index = Some(new_index);
        self.question = self.history[new_index].clone();
        self.cursor_pos = self.question.len();
    }

    pub fn history_down(&mut self) {
        if self.history.is_empty() {
            return;
        }

        match self.history_index {
            None => {}
            Some(i) if i >= self.history.len() - 1 => {
                self.history_index = None;
                self.clear_question();
            }
            Some(i) => {
                self.history_index = Some(i + 1);
                self.question = self.history[i + 1].clone();
                self.cursor_pos = self.question.len();
            }
        }
    }

    pub fn scroll_results_up(&mut self) {
        self.result_scroll = self.result_scroll.saturating_sub(1);
    }

    pub fn scroll_results_down(&mut self) {
        if self.result_scroll < self.output_len().saturating_sub(1) {
            self.result_scroll += 1;
        }
    }

    pub fn scroll_results_left(&mut self) {
        self.result_horizontal_scroll = self.result_horizontal_scroll.saturating_sub(1);
    }

    pub fn scroll_results_right(&mut self) {
        if self.result_horizontal_scroll + 1 < self.column_widths.len() {
            self.result_horizontal_scroll += 1;
        }
    }

    pub fn page_up(&mut self) {
        self.result_scroll = self.result_scroll.saturating_sub(10);
    }

    pub fn page_down(&mut self) {
        self.result_scroll = (self.result_scroll + 10).min(self.output_len().saturating_sub(1));
    }

    pub fn scroll_to_top(&mut self) {
        self.result_scroll = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.result_scroll = self.output_len().saturating_sub(1);
    }

    pub fn enter_insert_mode(&mut self) {
        self.mode = Mode::Insert;
        self.focus = Focus::Question;
    }

    pub fn enter_normal_mode(&mut self) {
        self.mode = Mode::Normal;
    }

    pub fn enter_command_mode(&mut self) {
        self.mode = Mode::Command;
        self.command_buffer.clear();
    }

    pub fn execute_command(&mut self) {
        let buffer = std::mem::take(&mut self.command_buffer);
        let (cmd, args) = match buffer.trim().split_once(char::is_whitespace) {
            Some((cmd, args)) => (cmd, args.trim()),
            None => (buffer.trim(), ""),
        };

        match cmd {
            "q" | "quit" => self.should_quit = true,
            "e" | "ask" => self.ask_question(),
            "l" | "load" => self.load(args),
            "v" | "view" => self.view_table(args),
            "s" | "schema" => self.show_schema(),
            "key" => self.set_api_key(args),
            "reset" => self.reset(),
            "clear" => {
                self.clear_question();
                self.generated_sql = None;
                self.set_message(Level::Info, "");
            }
            "" => {}
            other => self.set_message(Level::Warning, format!("Unknown command: {}", other)),
        }
        self.mode = Mode::Normal;
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Question => Focus::Results,
            Focus::Results => Focus::Question,
        };
    }
}

/// Splits `:load` arguments into paths. An argument naming an existing
/// path is taken whole; otherwise paths are separated by whitespace and may
/// be quoted with `"` or `'`.
fn split_paths(args: &str) -> Vec<PathBuf> {
    let args = args.trim();
    if args.is_empty() {
        return Vec::new();
    }
    if Path::new(args).exists() {
        return vec![PathBuf::from(args)];
    }

    let mut paths = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in args.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    paths.push(PathBuf::from(std::mem::take(&mut current)));
                }
            }
            None => current.push(c),
        }
    }
    if !current.is_empty() {
        paths.push(PathBuf::from(current));
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::UploadedFile;
    use std::fs::write;
    use tempfile::tempdir;

    fn no_sql(_question: &str, _schema: &str) -> Option<String> {
        None
    }

    fn app_with_sales(translator: impl crate::assistant::Translator + 'static) -> App {
        let mut session = Session::new(translator).with_api_key(Some("sk-test".to_string()));
        session
            .upload(&[UploadedFile::new(
                "sales.csv",
                b"Region,Amount\nWest,10\nEast,20\n".to_vec(),
            )])
            .unwrap();
        App::new(session)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.insert_char(c);
        }
    }

    fn message(app: &App) -> Option<(Level, &str)> {
        match &app.output {
            Output::Message(level, text) => Some((*level, text.as_str())),
            _ => None,
        }
    }

    #[test]
    fn test_editing_multibyte_text() {
        let mut app = App::new(Session::new(no_sql));
        type_text(&mut app, "café où");

        app.move_cursor_left();
        app.move_cursor_left();
        app.delete_char();
        assert_eq!(app.question, "caféoù");

        app.move_cursor_start();
        app.move_cursor_right();
        app.delete_char_forward();
        assert_eq!(app.question, "cféoù");
    }

    #[test]
    fn test_word_movement() {
        let mut app = App::new(Session::new(no_sql));
        type_text(&mut app, "total sales  by region");

        app.move_cursor_word_backward();
        assert_eq!(&app.question[app.cursor_pos..], "region");
        app.move_cursor_word_backward();
        assert_eq!(&app.question[app.cursor_pos..], "by region");

        app.move_cursor_start();
        app.move_cursor_word_forward();
        assert_eq!(&app.question[app.cursor_pos..], "sales  by region");

        app.move_cursor_end();
        app.delete_word_backward();
        assert_eq!(app.question, "total sales  by ");
    }

    #[test]
    fn test_history() {
        let mut app = app_with_sales(|_: &str, _: &str| Some("SELECT 1 AS one".to_string()));
        type_text(&mut app, "first");
        app.ask_question();
        app.clear_question();
        type_text(&mut app, "second");
        app.ask_question();

        app.history_up();
        assert_eq!(app.question, "second");
        app.history_up();
        assert_eq!(app.question, "first");
        app.history_down();
        assert_eq!(app.question, "second");
        app.history_down();
        assert_eq!(app.question, "");
    }

    #[test]
    fn test_ask_shows_rows_and_sql() {
        let mut app =
            app_with_sales(|_: &str, _: &str| Some("SELECT * FROM sales WHERE Amount > 15".to_string()));
        assert_eq!(app.step(), Step::Ask);
        assert_eq!(app.tables, vec!["sales"]);

        type_text(&mut app, "big sales?");
        app.ask_question();

        assert_eq!(app.generated_sql.as_deref(), Some("SELECT * FROM sales WHERE Amount > 15"));
        match &app.output {
            Output::Rows(table) => assert_eq!(table.row_count(), 1),
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[test]
    fn test_ask_without_rows() {
        let mut app = app_with_sales(|_: &str, _: &str| Some("SELECT * FROM nowhere".to_string()));
        type_text(&mut app, "anything");
        app.ask_question();

        assert_eq!(message(&app), Some((Level::Info, NO_RESULTS)));
        assert!(app.generated_sql.is_some());
    }

    #[test]
    fn test_missing_key_and_key_command() {
        let mut app = app_with_sales(|_: &str, _: &str| Some("SELECT 1 AS one".to_string()));
        app.command_buffer = "key".to_string();
        app.execute_command();
        type_text(&mut app, "anything");
        app.ask_question();

        assert_eq!(
            message(&app),
            Some((Level::Error, crate::assistant::session::MISSING_CREDENTIAL))
        );
        assert!(app.generated_sql.is_none());

        app.command_buffer = "key sk-other".to_string();
        app.execute_command();
        app.ask_question();
        assert!(matches!(app.output, Output::Rows(_)));
    }

    #[test]
    fn test_ask_before_loading() {
        let mut app = App::new(Session::new(no_sql).with_api_key(Some("k".to_string())));
        assert_eq!(app.step(), Step::Upload);
        type_text(&mut app, "anything");
        app.ask_question();

        assert_eq!(message(&app), Some((Level::Warning, NOTHING_UPLOADED)));
    }

    #[test]
    fn test_load_view_and_reset_commands() {
        let dir = tempdir().unwrap();
        write(dir.path().join("people.csv"), "name,age\nAda,36\nAlan,41\n").unwrap();

        let mut app = App::new(Session::new(no_sql));
        app.command_buffer = format!("load {}", dir.path().display());
        app.execute_command();

        assert_eq!(app.tables, vec!["people"]);
        assert_eq!(app.step(), Step::Ask);
        assert_eq!(message(&app), Some((Level::Info, "Loaded tables: people")));

        app.command_buffer = "view people".to_string();
        app.execute_command();
        match &app.output {
            Output::Rows(table) => assert_eq!(table.row_count(), 2),
            other => panic!("unexpected output {:?}", other),
        }

        app.command_buffer = "schema".to_string();
        app.execute_command();
        match &app.output {
            Output::Text(text) => assert!(text.contains("First Row Data: ('Ada', 36)")),
            other => panic!("unexpected output {:?}", other),
        }

        app.command_buffer = "reset".to_string();
        app.execute_command();
        assert!(app.tables.is_empty());
        assert_eq!(app.step(), Step::Upload);
    }

    #[test]
    fn test_split_paths() {
        assert_eq!(
            split_paths(r#"a.csv "team members.csv" 'q 3'"#),
            vec![
                PathBuf::from("a.csv"),
                PathBuf::from("team members.csv"),
                PathBuf::from("q 3"),
            ]
        );
        assert!(split_paths("   ").is_empty());
    }

    #[test]
    fn test_load_path_with_spaces() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("team members.csv");
        write(&path, "name\nAda\n").unwrap();

        let mut app = App::new(Session::new(no_sql));
        app.load(&path.display().to_string());
        assert_eq!(app.tables, vec!["team members"]);

        app.load(&format!("\"{}\"", path.display()));
        assert_eq!(app.tables, vec!["team members"]);
    }

    #[test]
    fn test_load_with_no_files() {
        let dir = tempdir().unwrap();
        let mut app = App::new(Session::new(no_sql));
        app.load(&dir.path().display().to_string());

        assert_eq!(message(&app), Some((Level::Warning, NOTHING_UPLOADED)));
    }

    #[test]
    fn test_unknown_command() {
        let mut app = App::new(Session::new(no_sql));
        app.command_buffer = "frobnicate now".to_string();
        app.execute_command();

        assert_eq!(message(&app), Some((Level::Warning, "Unknown command: frobnicate")));
        assert_eq!(app.mode, Mode::Normal);
    }
}
