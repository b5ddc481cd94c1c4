use std::io::stdout;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use env_logger::Env;
use log::info;
use ratatui::prelude::*;

use askcsv::assistant::session::{NOTHING_UPLOADED, NO_RESULTS};
use askcsv::assistant::{AskOutcome, ChatTranslator, LogTelemetry, Session};
use askcsv::cli::{Cli, OutputFormat};
use askcsv::output::{format_csv, format_json, format_table};
use askcsv::storage::csv::CsvReader;
use askcsv::store::{collect_csv_files, QueryResult};
use askcsv::tui::{app::App, input::handle_events, ui::draw};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse_args();

    // The TUI owns the terminal, so it only logs when RUST_LOG asks for it.
    let default_filter = if cli.is_interactive() { "off" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    let mut session = build_session(&cli)?;
    info!("Starting session {}", session.id());

    let files = collect_csv_files(&cli.paths)?;
    if !files.is_empty() {
        session.upload(&files)?;
    }

    if cli.schema {
        print!("{}", session.describe()?);
    } else if let Some(question) = &cli.question {
        run_question(&mut session, question, cli.format)?;
    } else {
        run_tui(session)?;
    }

    Ok(())
}

fn build_session(cli: &Cli) -> Result<Session, Box<dyn std::error::Error>> {
    let translator = ChatTranslator::new(cli.translator_config())?;
    let reader = CsvReader::new().with_delimiter(cli.delimiter);

    Ok(Session::new(translator)
        .with_reader(reader)
        .with_api_key(cli.api_key.clone())
        .with_telemetry(LogTelemetry))
}

fn run_question(
    session: &mut Session,
    question: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    if !session.has_data() {
        eprintln!("{}", NOTHING_UPLOADED);
        return Ok(());
    }

    match session.ask(question)? {
        AskOutcome::Answered { sql, result } => {
            // Keep stdout machine-readable for csv/json.
            if format == OutputFormat::Table {
                println!("Generated SQL Query:\n{}\n", sql);
            } else {
                eprintln!("Generated SQL Query:\n{}\n", sql);
            }

            match result {
                QueryResult::Rows(table) => match format {
                    OutputFormat::Table => print!("{}", format_table(&table)),
                    OutputFormat::Csv => print!("{}", format_csv(&table)?),
                    OutputFormat::Json => println!("{}", format_json(&table)),
                },
                QueryResult::Empty => eprintln!("{}", NO_RESULTS),
            }
        }
        outcome => {
            if let Some(warning) = outcome.warning() {
                eprintln!("{}", warning);
            }
        }
    }

    Ok(())
}

fn run_tui(session: Session) -> Result<(), Box<dyn std::error::Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(session);

    loop {
        terminal.draw(|frame| draw(frame, &app))?;

        if handle_events(&mut app)? {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}
