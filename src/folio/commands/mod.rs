use crate::config::FolioConfig;
use crate::model::ReadingStateRecord;
use crate::reconcile::{LibraryEntry, MergePrompt, SweepReport};
use std::path::PathBuf;

pub mod config;
pub mod doctor;
pub mod forget;
pub mod list;
pub mod prefs;
pub mod read;
pub mod show;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub documents: Vec<LibraryEntry>,
    pub record: Option<ReadingStateRecord>,
    pub location: Option<PathBuf>,
    pub prompt: Option<MergePrompt>,
    pub report: Option<SweepReport>,
    pub config: Option<FolioConfig>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_documents(mut self, documents: Vec<LibraryEntry>) -> Self {
        self.documents = documents;
        self
    }

    pub fn with_record(mut self, record: ReadingStateRecord, location: PathBuf) -> Self {
        self.record = Some(record);
        self.location = Some(location);
        self
    }

    pub fn with_report(mut self, report: SweepReport) -> Self {
        self.report = Some(report);
        self
    }

    pub fn with_config(mut self, config: FolioConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn has_errors(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.level == MessageLevel::Error)
    }
}
