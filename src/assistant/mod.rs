mod error;
pub mod session;
pub mod telemetry;
pub mod translator;

pub use error::{Result, SessionError};
pub use session::{AskOutcome, Session, Step, UploadOutcome, PAGE_NAME};
pub use telemetry::{LogTelemetry, NoopTelemetry, Properties, Telemetry};
pub use translator::{ChatTranslator, Translator, TranslatorConfig, TranslatorError};
