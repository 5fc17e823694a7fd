use std::sync::Arc;

use clap::ValueEnum;
use indexmap::map::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::ports::{FailureSinkPort, FailureStage, RecordFailure};
use crate::common::constants::MISSING_DESCRIPTION;
use crate::common::error::{PrepError, Result};
use crate::domain::{GeneratedResponseRow, MetadataCollection, QaOutput};
use crate::observability::metrics;
use crate::pipeline::qa_extract::{process_row, QaScanner};

/// What happens when the input repeats an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Later rows replace earlier ones; the key keeps its first position.
    #[default]
    LastWriteWins,
    /// Later rows are reported and dropped.
    KeepFirst,
    /// The first repeat aborts the run.
    Reject,
}

pub struct QaExtractUseCase {
    scanner: QaScanner,
    missing_description: String,
    duplicate_policy: DuplicatePolicy,
    failures: Arc<dyn FailureSinkPort>,
}

impl QaExtractUseCase {
    pub fn new(failures: Arc<dyn FailureSinkPort>) -> Self {
        Self {
            scanner: QaScanner::default(),
            missing_description: MISSING_DESCRIPTION.to_string(),
            duplicate_policy: DuplicatePolicy::default(),
            failures,
        }
    }

    pub fn with_scanner(mut self, scanner: QaScanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn with_missing_description(mut self, sentinel: impl Into<String>) -> Self {
        self.missing_description = sentinel.into();
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    fn report(&self, id: &str, stage: FailureStage, reason: impl std::fmt::Display) {
        metrics::record_failure(stage.as_str());
        self.failures.report(RecordFailure::new(id, stage, reason));
    }

    /// Single pass over the rows in input order. Rows that cannot be processed
    /// are reported and left out; rows whose text has no question or answer
    /// are kept with `null` fields.
    pub fn run<I>(&self, rows: I, metadata: &MetadataCollection) -> Result<QaOutput>
    where
        I: IntoIterator<Item = Result<GeneratedResponseRow>>,
    {
        let mut output = QaOutput::new();
        for (index, row) in rows.into_iter().enumerate() {
            // Row numbers are 1-based data lines, for messages only
            let row_label = format!("<row {}>", index + 1);
            let row = match row {
                Ok(row) => row,
                Err(err) => {
                    self.report(&row_label, FailureStage::QaRow, err);
                    continue;
                }
            };

            let (id, record) = match process_row(&row, metadata, &self.scanner, &self.missing_description) {
                Ok(processed) => processed,
                Err(err) => {
                    let id = row.id.clone().filter(|id| !id.trim().is_empty()).unwrap_or(row_label);
                    self.report(&id, FailureStage::QaRow, err);
                    continue;
                }
            };

            metrics::qa::row_processed();
            if record.question.is_none() {
                metrics::qa::extraction_miss("question");
            }
            if record.answer.is_none() {
                metrics::qa::extraction_miss("answer");
            }

            match output.entry(id) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                Entry::Occupied(mut slot) => match self.duplicate_policy {
                    DuplicatePolicy::LastWriteWins => {
                        debug!(id = %slot.key(), "duplicate id, overwriting earlier row");
                        slot.insert(record);
                    }
                    DuplicatePolicy::KeepFirst => {
                        let id = slot.key().clone();
                        self.report(&id, FailureStage::QaDuplicate, "duplicate ID, keeping the first row");
                    }
                    DuplicatePolicy::Reject => {
                        return Err(PrepError::DuplicateIdentifier(slot.key().clone()));
                    }
                },
            }
        }
        info!("Extracted {} question/answer records", output.len());
        Ok(output)
    }
}
