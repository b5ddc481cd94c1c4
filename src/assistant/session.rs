use std::process;

use chrono::Utc;
use log::{debug, info, warn};
use serde_json::Value as JsonValue;

use crate::storage::csv::CsvReader;
use crate::store::{describe, execute, QueryResult, Store, UploadedFile};

use super::error::{Result, SessionError};
use super::telemetry::{NoopTelemetry, Properties, Telemetry};
use super::translator::Translator;

/// Page name attached to every telemetry event.
pub const PAGE_NAME: &str = "Ask Your Database";

pub const UPLOAD_EVENT: &str = "Upload CSV files";
pub const QUERY_EVENT: &str = "Run SQL Query";

pub const MISSING_CREDENTIAL: &str = "Please enter an OpenAI API key to proceed.";
pub const GENERATION_FAILED: &str = "Failed to generate SQL statement.";
pub const NO_RESULTS: &str = "No results or unable to execute the query.";
pub const NOTHING_UPLOADED: &str = "Please upload at least one CSV file to proceed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Upload,
    Ask,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Loaded(Vec<String>),
    NothingUploaded,
}

impl UploadOutcome {
    pub fn warning(&self) -> Option<&'static str> {
        match self {
            UploadOutcome::Loaded(_) => None,
            UploadOutcome::NothingUploaded => Some(NOTHING_UPLOADED),
        }
    }
}

#[derive(Debug, Clone)]
pub enum AskOutcome {
    MissingCredential,
    GenerationFailed,
    Answered { sql: String, result: QueryResult },
}

impl AskOutcome {
    /// User-facing warning for outcomes that did not produce rows.
    pub fn warning(&self) -> Option<&'static str> {
        match self {
            AskOutcome::MissingCredential => Some(MISSING_CREDENTIAL),
            AskOutcome::GenerationFailed => Some(GENERATION_FAILED),
            AskOutcome::Answered { result, .. } if result.is_empty() => Some(NO_RESULTS),
            AskOutcome::Answered { .. } => None,
        }
    }
}

/// Everything one user's interaction carries between actions: the store,
/// where they are in the upload/ask flow, and the collaborators used to
/// answer questions.
///
/// The store is created on the first upload and reset by [`Session::reset`]
/// or the next upload; it is released when the session is dropped.
pub struct Session {
    id: String,
    store: Option<Store>,
    reader: CsvReader,
    step: Step,
    uploaded: bool,
    api_key: Option<String>,
    translator: Box<dyn Translator>,
    telemetry: Box<dyn Telemetry>,
}

impl Session {
    pub fn new(translator: impl Translator + 'static) -> Self {
        Self {
            id: format!("{}-{}", process::id(), Utc::now().timestamp_millis()),
            store: None,
            reader: CsvReader::new(),
            step: Step::Upload,
            uploaded: false,
            api_key: None,
            translator: Box::new(translator),
            telemetry: Box::new(NoopTelemetry),
        }
    }

    pub fn with_telemetry(mut self, telemetry: impl Telemetry + 'static) -> Self {
        self.telemetry = Box::new(telemetry);
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.set_api_key(api_key);
        self
    }

    pub fn with_reader(mut self, reader: CsvReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn has_data(&self) -> bool {
        self.uploaded
    }

    pub fn store(&self) -> Option<&Store> {
        self.store.as_ref().filter(|_| self.uploaded)
    }

    pub fn set_api_key(&mut self, api_key: Option<String>) {
        self.translator.set_api_key(api_key.as_deref().unwrap_or(""));
        self.api_key = api_key;
    }

    fn has_credential(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }

    /// Loads a new batch of files, replacing whatever was loaded before.
    pub fn upload(&mut self, files: &[UploadedFile]) -> Result<UploadOutcome> {
        if files.is_empty() {
            warn!("Upload requested with no files");
            return Ok(UploadOutcome::NothingUploaded);
        }

        self.uploaded = false;
        self.step = Step::Upload;

        let tables = self.store_mut()?.load_batch(files)?;
        self.uploaded = true;
        self.step = Step::Ask;

        let mut properties = Properties::new();
        properties.insert(
            "Number of CSV files uploaded".to_string(),
            JsonValue::from(files.len()),
        );
        properties.insert("Page Name".to_string(), JsonValue::from(PAGE_NAME));
        self.telemetry.track(&self.id, UPLOAD_EVENT, properties);

        Ok(UploadOutcome::Loaded(tables))
    }

    /// Answers a question: describe the store, translate, execute.
    ///
    /// Without a credential nothing is described, translated or executed.
    pub fn ask(&mut self, question: &str) -> Result<AskOutcome> {
        if !self.has_credential() {
            warn!("No API key configured; not asking");
            return Ok(AskOutcome::MissingCredential);
        }

        let store = self.store().ok_or(SessionError::NoData)?;
        let schema = describe(store)?;
        debug!("Translating question with schema:\n{}", schema);

        let sql = match self.translator.translate(question, &schema) {
            Some(sql) if !sql.trim().is_empty() => sql.trim().to_string(),
            _ => {
                warn!("Translator produced no SQL");
                return Ok(AskOutcome::GenerationFailed);
            }
        };
        info!("Generated SQL: {}", sql);

        let result = execute(store, &sql);

        let mut properties = Properties::new();
        properties.insert("Rows Returned".to_string(), JsonValue::from(!result.is_empty()));
        properties.insert("Page Name".to_string(), JsonValue::from(PAGE_NAME));
        self.telemetry.track(&self.id, QUERY_EVENT, properties);

        Ok(AskOutcome::Answered { sql, result })
    }

    /// Schema description of the current batch.
    pub fn describe(&self) -> Result<String> {
        let store = self.store().ok_or(SessionError::NoData)?;
        Ok(describe(store)?)
    }

    /// Drops every table and returns to the upload step.
    pub fn reset(&mut self) -> Result<()> {
        if let Some(store) = self.store.as_mut() {
            store.drop_all_tables()?;
        }
        self.uploaded = false;
        self.step = Step::Upload;
        debug!("Session {} reset", self.id);
        Ok(())
    }

    fn store_mut(&mut self) -> Result<&mut Store> {
        if self.store.is_none() {
            debug!("Creating in-memory store for session {}", self.id);
            self.store = Some(Store::with_reader(self.reader.clone())?);
        }
        self.store.as_mut().ok_or(SessionError::NoData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Recorder {
        events: Rc<RefCell<Vec<(String, Properties)>>>,
    }

    impl Telemetry for Recorder {
        fn track(&self, _session_id: &str, event: &str, properties: Properties) {
            self.events.borrow_mut().push((event.to_string(), properties));
        }
    }

    fn sales() -> Vec<UploadedFile> {
        vec![UploadedFile::new(
            "sales.csv",
            b"Region,Amount\nWest,10\nEast,20\n".to_vec(),
        )]
    }

    fn no_sql(_question: &str, _schema: &str) -> Option<String> {
        None
    }

    fn key() -> Option<String> {
        Some("sk-test".to_string())
    }

    #[test]
    fn test_upload_moves_to_ask_step() {
        let recorder = Recorder::default();
        let mut session = Session::new(no_sql).with_telemetry(recorder.clone());
        assert_eq!(session.step(), Step::Upload);
        assert!(session.store().is_none());

        let outcome = session.upload(&sales()).unwrap();

        assert_eq!(outcome, UploadOutcome::Loaded(vec!["sales".to_string()]));
        assert_eq!(session.step(), Step::Ask);
        assert!(session.has_data());

        let events = recorder.events.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, UPLOAD_EVENT);
        assert_eq!(events[0].1["Number of CSV files uploaded"], 1);
        assert_eq!(events[0].1["Page Name"], PAGE_NAME);
    }

    #[test]
    fn test_empty_upload_is_a_warning() {
        let mut session = Session::new(no_sql);
        assert_eq!(session.upload(&[]).unwrap(), UploadOutcome::NothingUploaded);
        assert_eq!(session.step(), Step::Upload);
    }

    #[test]
    fn test_missing_credential_short_circuits() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let recorder = Recorder::default();
        let mut session = Session::new(move |_: &str, _: &str| {
            counter.set(counter.get() + 1);
            Some("SELECT * FROM sales".to_string())
        })
        .with_telemetry(recorder.clone());
        session.upload(&sales()).unwrap();

        let outcome = session.ask("everything").unwrap();

        assert!(matches!(outcome, AskOutcome::MissingCredential));
        assert_eq!(calls.get(), 0);
        assert_eq!(recorder.events.borrow().len(), 1);

        session.set_api_key(Some("   ".to_string()));
        assert!(matches!(session.ask("everything").unwrap(), AskOutcome::MissingCredential));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_generation_failure() {
        let mut session = Session::new(|_: &str, _: &str| Some("  ".to_string())).with_api_key(key());
        session.upload(&sales()).unwrap();

        assert!(matches!(session.ask("anything").unwrap(), AskOutcome::GenerationFailed));
    }

    #[test]
    fn test_answered_question() {
        let seen_schema = Rc::new(RefCell::new(String::new()));
        let captured = seen_schema.clone();
        let recorder = Recorder::default();
        let mut session = Session::new(move |_: &str, schema: &str| {
            *captured.borrow_mut() = schema.to_string();
            Some("SELECT * FROM sales WHERE Amount > 15\n".to_string())
        })
        .with_api_key(key())
        .with_telemetry(recorder.clone());
        session.upload(&sales()).unwrap();

        let outcome = session.ask("which regions sold more than 15?").unwrap();

        let AskOutcome::Answered { sql, result } = outcome else {
            panic!("expected an answer");
        };
        assert_eq!(sql, "SELECT * FROM sales WHERE Amount > 15");
        assert_eq!(result.row_count(), 1);
        assert!(seen_schema.borrow().contains("First Row Data: ('West', 10)"));

        let events = recorder.events.borrow();
        assert_eq!(events.last().unwrap().0, QUERY_EVENT);
        assert_eq!(events.last().unwrap().1["Rows Returned"], true);
    }

    #[test]
    fn test_failed_sql_is_reported_as_no_rows() {
        let recorder = Recorder::default();
        let mut session = Session::new(|_: &str, _: &str| Some("SELECT nope FROM".to_string()))
            .with_api_key(key())
            .with_telemetry(recorder.clone());
        session.upload(&sales()).unwrap();

        let AskOutcome::Answered { result, .. } = session.ask("?").unwrap() else {
            panic!("expected an answer");
        };
        assert!(result.is_empty());
        assert_eq!(recorder.events.borrow().last().unwrap().1["Rows Returned"], false);
    }

    #[test]
    fn test_ask_before_upload() {
        let mut session = Session::new(|_: &str, _: &str| Some("SELECT 1".to_string())).with_api_key(key());
        assert!(matches!(session.ask("?"), Err(SessionError::NoData)));
    }

    #[test]
    fn test_reset() {
        let mut session = Session::new(no_sql);
        session.upload(&sales()).unwrap();
        session.reset().unwrap();

        assert_eq!(session.step(), Step::Upload);
        assert!(!session.has_data());
        assert!(matches!(session.describe(), Err(SessionError::NoData)));
    }

    #[test]
    fn test_failed_upload_leaves_session_without_data() {
        let mut session = Session::new(no_sql);
        session.upload(&sales()).unwrap();

        let bad = vec![UploadedFile::new("bad.csv", b"a\n1,2\n".to_vec())];
        assert!(session.upload(&bad).is_err());
        assert_eq!(session.step(), Step::Upload);
        assert!(!session.has_data());
    }
}
