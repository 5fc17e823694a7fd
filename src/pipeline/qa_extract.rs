//! Question/answer extraction from generated model output.
//!
//! Generated text looks like `<preamble> assistant Question: ...\nAnswer: ...`.
//! The scanner walks three phases: it first isolates the content after the
//! marker token, then captures the question, then the answer. A missing label
//! is not an error; the corresponding field is simply `None`.

use crate::common::constants::{ANSWER_LABEL, DEFAULT_MARKER_TOKEN, QUESTION_LABEL};
use crate::common::error::{PrepError, Result};
use crate::domain::{GeneratedResponseRow, MetadataCollection, QaPair, QaRecord};

enum Phase<'t> {
    PreMarker,
    QuestionCapture { content: &'t str },
    AnswerCapture { content: &'t str, question: Option<String> },
}

#[derive(Debug, Clone)]
pub struct QaScanner {
    marker: String,
}

impl Default for QaScanner {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_TOKEN)
    }
}

impl QaScanner {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn extract(&self, raw: &str) -> QaPair {
        let mut phase = Phase::PreMarker;
        loop {
            phase = match phase {
                Phase::PreMarker => match self.isolate_content(raw) {
                    Some(content) => Phase::QuestionCapture { content },
                    None => return QaPair::default(),
                },
                Phase::QuestionCapture { content } => Phase::AnswerCapture {
                    content,
                    question: capture_question(content),
                },
                Phase::AnswerCapture { content, question } => {
                    return QaPair {
                        question,
                        answer: capture_answer(content),
                    }
                }
            };
        }
    }

    /// Everything after the first marker occurrence, trimmed. Empty content
    /// counts as no content.
    fn isolate_content<'t>(&self, raw: &'t str) -> Option<&'t str> {
        let start = raw.find(&self.marker)? + self.marker.len();
        let content = raw[start..].trim();
        if content.is_empty() {
            None
        } else {
            Some(content)
        }
    }
}

/// Extract with the default `assistant` marker.
pub fn extract_one(raw: &str) -> QaPair {
    QaScanner::default().extract(raw)
}

/// Text between `Question:` and the first following newline or `Answer:`,
/// whichever comes first. Whitespace right after the label (line breaks
/// included) is skipped before capture starts.
fn capture_question(content: &str) -> Option<String> {
    let mut search_from = 0;
    while let Some(offset) = content[search_from..].find(QUESTION_LABEL) {
        let body_start = search_from + offset + QUESTION_LABEL.len();
        let body = &content[body_start..];
        let text = body.trim_start();

        let newline = text.find('\n');
        let answer = text.find(ANSWER_LABEL);
        let end = match (newline, answer) {
            (Some(n), Some(a)) => Some(n.min(a)),
            (n, a) => n.or(a),
        };
        if let Some(end) = end {
            return Some(text[..end].trim().to_string());
        }

        // A line break inside the skipped whitespace still terminates an
        // empty question.
        let skipped = &body[..body.len() - text.len()];
        if skipped.contains('\n') {
            return Some(String::new());
        }

        search_from = body_start;
    }
    None
}

/// Everything after the first `Answer:` to the end of the content.
fn capture_answer(content: &str) -> Option<String> {
    let start = content.find(ANSWER_LABEL)? + ANSWER_LABEL.len();
    Some(content[start..].trim().to_string())
}

/// Turn one CSV row into an output entry. Fails when the row has no id or no
/// generated text; extraction misses are not failures.
pub fn process_row(
    row: &GeneratedResponseRow,
    metadata: &MetadataCollection,
    scanner: &QaScanner,
    missing_description: &str,
) -> Result<(String, QaRecord)> {
    let id = row
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| PrepError::missing_field("<unknown>", "ID"))?
        .to_string();
    let generated = row
        .generated_question
        .as_deref()
        .ok_or_else(|| PrepError::missing_field(id.clone(), "generated_question"))?;

    let QaPair { question, answer } = scanner.extract(generated);

    let image_description = metadata
        .get(&id)
        .and_then(|record| record.image_description.clone())
        .unwrap_or_else(|| missing_description.to_string());

    Ok((
        id,
        QaRecord {
            attribute: row.attribute.clone(),
            image_description,
            question,
            answer,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::constants::MISSING_DESCRIPTION;
    use crate::domain::MetadataRecord;

    fn pair(question: Option<&str>, answer: Option<&str>) -> QaPair {
        QaPair {
            question: question.map(str::to_string),
            answer: answer.map(str::to_string),
        }
    }

    #[test]
    fn extracts_question_and_answer_after_marker() {
        let got = extract_one("system prompt... assistant Question: What color?\nAnswer: Red");
        assert_eq!(got, pair(Some("What color?"), Some("Red")));
    }

    #[test]
    fn text_without_markers_yields_nothing() {
        assert_eq!(extract_one("no markers here"), QaPair::default());
    }

    #[test]
    fn marker_followed_only_by_whitespace_yields_nothing() {
        assert_eq!(extract_one("preamble assistant   \n "), QaPair::default());
    }

    #[test]
    fn labels_before_the_marker_are_ignored() {
        let got = extract_one("Question: old?\nAnswer: old assistant nothing useful");
        assert_eq!(got, QaPair::default());
    }

    #[test]
    fn question_stops_at_first_line_break() {
        let got = extract_one("assistant\nQuestion: first line\nsecond line\nAnswer:  the answer\nmore ");
        assert_eq!(got, pair(Some("first line"), Some("the answer\nmore")));
    }

    #[test]
    fn question_stops_at_inline_answer_label() {
        let got = extract_one("assistant Question: Is it red? Answer: yes");
        assert_eq!(got, pair(Some("Is it red?"), Some("yes")));
    }

    #[test]
    fn question_without_terminator_is_none() {
        let got = extract_one("assistant Question: dangling question");
        assert_eq!(got, pair(None, None));
    }

    #[test]
    fn missing_answer_section_keeps_question() {
        let got = extract_one("assistant Question: what now?\nthat is all");
        assert_eq!(got, pair(Some("what now?"), None));
    }

    #[test]
    fn answer_without_question() {
        let got = extract_one("assistant Answer: only this");
        assert_eq!(got, pair(None, Some("only this")));
    }

    #[test]
    fn whitespace_after_question_label_spans_lines() {
        let got = extract_one("assistant Question:\n\n  Which one?\nAnswer: left");
        assert_eq!(got, pair(Some("Which one?"), Some("left")));
    }

    #[test]
    fn line_break_in_skipped_whitespace_gives_empty_question() {
        let got = extract_one("assistant Question:\n   trailing text");
        assert_eq!(got, pair(Some(""), None));
    }

    #[test]
    fn custom_marker_token() {
        let scanner = QaScanner::new("<|model|>");
        let got = scanner.extract("user: hi <|model|> Question: q?\nAnswer: a");
        assert_eq!(got, pair(Some("q?"), Some("a")));
        assert_eq!(scanner.extract("assistant Question: q?\nAnswer: a"), QaPair::default());
    }

    fn metadata() -> MetadataCollection {
        [MetadataRecord {
            id: "1".to_string(),
            image_description: Some("a photo".to_string()),
            attributes: None,
            attribute: None,
        }]
        .into_iter()
        .collect()
    }

    fn row(id: Option<&str>, text: Option<&str>) -> GeneratedResponseRow {
        GeneratedResponseRow {
            id: id.map(str::to_string),
            attribute: Some("color".to_string()),
            generated_question: text.map(str::to_string),
        }
    }

    #[test]
    fn process_row_joins_description() {
        let (id, record) = process_row(
            &row(Some("1"), Some("preamble assistant Question: hue?\nAnswer: blue")),
            &metadata(),
            &QaScanner::default(),
            MISSING_DESCRIPTION,
        )
        .unwrap();

        assert_eq!(id, "1");
        assert_eq!(record.attribute.as_deref(), Some("color"));
        assert_eq!(record.image_description, "a photo");
        assert_eq!(record.question.as_deref(), Some("hue?"));
        assert_eq!(record.answer.as_deref(), Some("blue"));
    }

    #[test]
    fn process_row_uses_sentinel_for_unknown_id() {
        let (_, record) = process_row(
            &row(Some("404"), Some("nothing")),
            &metadata(),
            &QaScanner::default(),
            MISSING_DESCRIPTION,
        )
        .unwrap();

        assert_eq!(record.image_description, "No description provided");
        assert_eq!(record.question, None);
        assert_eq!(record.answer, None);
    }

    #[test]
    fn process_row_requires_id_and_text() {
        let scanner = QaScanner::default();
        let missing_id = process_row(&row(None, Some("x")), &metadata(), &scanner, MISSING_DESCRIPTION);
        assert!(matches!(missing_id, Err(PrepError::MissingField { ref field, .. }) if field == "ID"));

        let missing_text = process_row(&row(Some("1"), None), &metadata(), &scanner, MISSING_DESCRIPTION);
        assert!(matches!(
            missing_text,
            Err(PrepError::MissingField { ref id, ref field }) if id == "1" && field == "generated_question"
        ));
    }
}
