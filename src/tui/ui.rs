use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

use super::app::{App, Focus, Level, Mode, Output};
use crate::assistant::Step;

const SQL_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "AND", "OR", "NOT", "JOIN", "INNER", "LEFT", "RIGHT", "OUTER",
    "ON", "GROUP", "BY", "HAVING", "ORDER", "ASC", "DESC", "LIMIT", "OFFSET", "AS", "DISTINCT",
    "COUNT", "SUM", "AVG", "MIN", "MAX", "NULL", "IS", "IN", "LIKE", "BETWEEN", "CASE", "WHEN",
    "THEN", "ELSE", "END", "TRUE", "FALSE", "CROSS", "WITH", "UNION", "ALL", "EXISTS", "CAST",
    "CREATE", "TABLE", "INTEGER", "REAL", "VARCHAR", "TEXT",
];

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Length(1), // Loaded tables
            Constraint::Length(3), // Question editor
            Constraint::Length(5), // Generated SQL
            Constraint::Min(8),    // Results
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0]);
    draw_tables(frame, app, chunks[1]);
    draw_question_editor(frame, app, chunks[2]);
    draw_generated_sql(frame, app, chunks[3]);
    draw_results(frame, app, chunks[4]);
    draw_status_bar(frame, app, chunks[5]);

    if app.mode == Mode::Command {
        draw_command_line(frame, app);
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let step = match app.step() {
        Step::Upload => "Step 1/2: Upload CSV Files",
        Step::Ask => "Step 2/2: Ask a Question",
    };

    let header = Line::from(vec![
        Span::styled("  ", Style::default()),
        Span::styled("?", Style::default().fg(Color::Yellow)),
        Span::styled(" askcsv", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(step, Style::default().fg(Color::White)),
    ]);

    let paragraph = Paragraph::new(header).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

fn draw_tables(frame: &mut Frame, app: &App, area: Rect) {
    let line = if app.tables.is_empty() {
        Line::from(Span::styled(
            "  No tables loaded",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut spans = vec![Span::styled("  Tables: ", Style::default().fg(Color::DarkGray))];
        for (i, name) in app.tables.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(", ", Style::default().fg(Color::DarkGray)));
            }
            spans.push(Span::styled(name.clone(), Style::default().fg(Color::Green)));
        }
        Line::from(spans)
    };

    frame.render_widget(Paragraph::new(line), area);
}

fn draw_question_editor(frame: &mut Frame, app: &App, area: Rect) {
    let is_focused = app.focus == Focus::Question;
    let border_color = if is_focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let block = Block::default()
        .title(" Question (i: insert, Enter: ask) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Keep the cursor visible on long questions
    let before_cursor = app.question[..app.cursor_pos.min(app.question.len())].chars().count();
    let width = inner.width.saturating_sub(1) as usize;
    let offset = before_cursor.saturating_sub(width);
    let visible: String = app.question.chars().skip(offset).collect();

    frame.render_widget(Paragraph::new(visible), inner);

    if app.mode == Mode::Insert && is_focused {
        let cursor_x = inner.x + (before_cursor - offset) as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }
}

fn draw_generated_sql(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Generated SQL Query ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line> = match &app.generated_sql {
        Some(sql) => sql.lines().map(highlight_sql_line).collect(),
        None => vec![Line::from(Span::styled(
            "Nothing generated yet",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn highlight_sql_line(line: &str) -> Line<'static> {
    let mut spans = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut string_char = ' ';

    for c in line.chars() {
        if in_string {
            current.push(c);
            if c == string_char {
                spans.push(Span::styled(current.clone(), Style::default().fg(Color::Green)));
                current.clear();
                in_string = false;
            }
        } else if c == '\'' || c == '"' {
            if !current.is_empty() {
                spans.push(colorize_word(&current));
                current.clear();
            }
            current.push(c);
            in_string = true;
            string_char = c;
        } else if c.is_alphanumeric() || c == '_' {
            current.push(c);
        } else {
            if !current.is_empty() {
                spans.push(colorize_word(&current));
                current.clear();
            }
            let style = match c {
                '(' | ')' | ',' => Style::default().fg(Color::Yellow),
                '=' | '<' | '>' | '!' | '+' | '-' | '*' | '/' | '%' => {
                    Style::default().fg(Color::Magenta)
                }
                _ => Style::default(),
            };
            spans.push(Span::styled(c.to_string(), style));
        }
    }

    if !current.is_empty() {
        if in_string {
            spans.push(Span::styled(current, Style::default().fg(Color::Green)));
        } else {
            spans.push(colorize_word(&current));
        }
    }

    Line::from(spans)
}

fn colorize_word(word: &str) -> Span<'static> {
    let upper = word.to_uppercase();
    if SQL_KEYWORDS.contains(&upper.as_str()) {
        Span::styled(
            word.to_string(),
            Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
        )
    } else if word.chars().all(|c| c.is_ascii_digit() || c == '.') {
        Span::styled(word.to_string(), Style::default().fg(Color::Cyan))
    } else {
        Span::styled(word.to_string(), Style::default())
    }
}

fn draw_results(frame: &mut Frame, app: &App, area: Rect) {
    let is_focused = app.focus == Focus::Results;
    let border_color = if is_focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let title = match &app.output {
        Output::Rows(table) => format!(" Results ({} rows) ", table.row_count()),
        Output::Text(_) => " Schema ".to_string(),
        Output::Message(..) => " Results ".to_string(),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    match &app.output {
        Output::Message(level, message) => {
            let color = match level {
                Level::Info => Color::DarkGray,
                Level::Warning => Color::Yellow,
                Level::Error => Color::Red,
            };
            let paragraph = Paragraph::new(message.as_str())
                .style(Style::default().fg(color))
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, inner);
        }
        Output::Text(text) => {
            let lines: Vec<Line> = text
                .lines()
                .skip(app.result_scroll)
                .map(highlight_sql_line)
                .collect();
            frame.render_widget(Paragraph::new(lines), inner);
        }
        Output::Rows(table) => {
            let header_cells: Vec<Cell> = table
                .schema
                .columns
                .iter()
                .enumerate()
                .skip(app.result_horizontal_scroll)
                .map(|(i, col)| {
                    let width = app.column_widths.get(i).copied().unwrap_or(10);
                    Cell::from(truncate_string(&col.name, width))
                        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
                })
                .collect();

            let header = Row::new(header_cells).height(1);

            let visible_height = inner.height.saturating_sub(2) as usize;
            let rows: Vec<Row> = table
                .rows
                .iter()
                .skip(app.result_scroll)
                .take(visible_height)
                .map(|row| {
                    let cells: Vec<Cell> = row
                        .values
                        .iter()
                        .enumerate()
                        .skip(app.result_horizontal_scroll)
                        .map(|(i, val)| {
                            let width = app.column_widths.get(i).copied().unwrap_or(10);
                            Cell::from(truncate_string(&val.to_string(), width))
                        })
                        .collect();
                    Row::new(cells)
                })
                .collect();

            let widths: Vec<Constraint> = app
                .column_widths
                .iter()
                .skip(app.result_horizontal_scroll)
                .map(|&w| Constraint::Length(w as u16 + 2))
                .collect();

            let table_widget = Table::new(rows, &widths).header(header);
            frame.render_widget(table_widget, inner);
        }
    }
}

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    } else {
        s.chars().take(max_len).collect()
    }
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mode_str = match app.mode {
        Mode::Normal => "NORMAL",
        Mode::Insert => "INSERT",
        Mode::Command => "COMMAND",
    };

    let mode_color = match app.mode {
        Mode::Normal => Color::Blue,
        Mode::Insert => Color::Green,
        Mode::Command => Color::Yellow,
    };

    let focus_str = match app.focus {
        Focus::Question => "Question",
        Focus::Results => "Results",
    };

    let help = match app.mode {
        Mode::Normal => "i:insert  Enter:ask  Tab:focus  L:load  v:view  s:schema  K:key  q:quit",
        Mode::Insert => "Esc:normal  Enter:ask  Up/Down:history",
        Mode::Command => "load <paths>  view <table>  schema  key <value>  reset  q  Esc:cancel",
    };

    let status = Line::from(vec![
        Span::styled(
            format!(" {} ", mode_str),
            Style::default().fg(Color::Black).bg(mode_color),
        ),
        Span::raw(" "),
        Span::styled(format!("[{}]", focus_str), Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(help, Style::default().fg(Color::DarkGray)),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}

fn draw_command_line(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let popup_area = Rect {
        x: 0,
        y: area.height.saturating_sub(1),
        width: area.width,
        height: 1,
    };

    frame.render_widget(Clear, popup_area);

    let command_line = Paragraph::new(format!(":{}", app.command_buffer))
        .style(Style::default().fg(Color::White));

    frame.render_widget(command_line, popup_area);

    frame.set_cursor_position((
        1 + app.command_buffer.chars().count() as u16,
        popup_area.y,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::Session;
    use ratatui::{backend::TestBackend, Terminal};

    fn no_sql(_question: &str, _schema: &str) -> Option<String> {
        None
    }

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        terminal.draw(|frame| draw(frame, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer.content.iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_truncate_string_multibyte() {
        assert_eq!(truncate_string("héllo wörld", 8), "héllo...");
        assert_eq!(truncate_string("short", 8), "short");
        assert_eq!(truncate_string("ñandú", 2), "ña");
    }

    #[test]
    fn test_highlight_keeps_text() {
        let line = highlight_sql_line("SELECT 'a b' FROM t");
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "SELECT 'a b' FROM t");
    }

    #[test]
    fn test_render_upload_step() {
        let app = App::new(Session::new(no_sql));
        let screen = render(&app);

        assert!(screen.contains("Step 1/2: Upload CSV Files"));
        assert!(screen.contains("No tables loaded"));
    }
}
