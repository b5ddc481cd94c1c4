use clap::Parser;
use std::path::PathBuf;

use crate::assistant::translator::{TranslatorConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};

#[derive(Parser, Debug)]
#[command(name = "askcsv")]
#[command(author, version, about = "Ask questions about CSV files in plain English")]
pub struct Cli {
    /// CSV files or folders containing CSV files
    pub paths: Vec<PathBuf>,

    /// Ask a single question and print the answer (non-interactive mode)
    #[arg(short, long, conflicts_with = "schema")]
    pub question: Option<String>,

    /// Print the schema description sent to the model and exit
    #[arg(long)]
    pub schema: bool,

    /// Output format for non-interactive mode
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,

    /// CSV delimiter
    #[arg(short, long, default_value = ",")]
    pub delimiter: char,

    /// API key for the SQL generation service
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Chat model used to generate SQL
    #[arg(long, env = "ASKCSV_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "ASKCSV_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    pub fn is_interactive(&self) -> bool {
        self.question.is_none() && !self.schema
    }

    pub fn translator_config(&self) -> TranslatorConfig {
        TranslatorConfig {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_question_mode() {
        let cli = Cli::try_parse_from([
            "askcsv",
            "sales.csv",
            "--question",
            "total?",
            "--format",
            "json",
            "--api-key",
            "sk-1",
        ])
        .unwrap();

        assert_eq!(cli.paths, vec![PathBuf::from("sales.csv")]);
        assert_eq!(cli.question.as_deref(), Some("total?"));
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(!cli.is_interactive());
        assert_eq!(cli.translator_config().api_key, "sk-1");
    }

    #[test]
    fn test_question_conflicts_with_schema() {
        let result = Cli::try_parse_from(["askcsv", "a.csv", "-q", "x", "--schema"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_interactive_without_paths() {
        let cli = Cli::try_parse_from(["askcsv"]).unwrap();
        assert!(cli.paths.is_empty());
        assert!(cli.is_interactive());
        assert_eq!(cli.delimiter, ',');
    }
}
