//! Core data models shared by the chunker, index builder, and query engine.

use serde::{Deserialize, Serialize};

/// The two kinds of source document in a past-paper corpus.
///
/// Mark schemes are always retrievable; question papers are opt-in
/// (`include_qp`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    MarkScheme,
    QuestionPaper,
}

impl DocType {
    /// Short code used in past-paper file names (`ms` / `qp`).
    pub fn code(&self) -> &'static str {
        match self {
            DocType::MarkScheme => "ms",
            DocType::QuestionPaper => "qp",
        }
    }

    /// Parse a paper-type code. Anything that is not `ms` counts as a
    /// question paper, so unknown material stays opt-in.
    pub fn from_code(code: &str) -> Self {
        if code.trim().eq_ignore_ascii_case("ms") {
            DocType::MarkScheme
        } else {
            DocType::QuestionPaper
        }
    }

    /// Whether a chunk of this type is eligible under the `include_qp` flag.
    pub fn is_included(&self, include_qp: bool) -> bool {
        match self {
            DocType::MarkScheme => true,
            DocType::QuestionPaper => include_qp,
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A raw document handed over by a document source before chunking.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub source_document_id: String,
    pub doc_type: DocType,
    pub text: String,
}

/// A retrievable unit of exam text: one question part or one paragraph block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier, `"{source_document_id}#{position}"`.
    pub chunk_id: String,
    pub source_document_id: String,
    pub doc_type: DocType,
    /// Zero-based order within the source document.
    pub position: usize,
    /// Detected question label such as `"2 (a) (ii)"`, if any.
    #[serde(default)]
    pub question_id: Option<String>,
    pub text: String,
}

impl Chunk {
    pub fn new(
        source_document_id: &str,
        doc_type: DocType,
        position: usize,
        question_id: Option<String>,
        text: &str,
    ) -> Self {
        Self {
            chunk_id: chunk_id_for(source_document_id, position),
            source_document_id: source_document_id.to_string(),
            doc_type,
            position,
            question_id,
            text: text.to_string(),
        }
    }

    /// Whether this chunk carries the given question label (case-insensitive,
    /// surrounding whitespace ignored).
    pub fn matches_question_id(&self, question_id: &str) -> bool {
        let wanted = question_id.trim();
        self.question_id
            .as_deref()
            .is_some_and(|qid| qid.trim().eq_ignore_ascii_case(wanted))
    }
}

/// Build the stable chunk identifier for a document position.
pub fn chunk_id_for(source_document_id: &str, position: usize) -> String {
    format!("{}#{}", source_document_id, position)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_type_from_code() {
        assert_eq!(DocType::from_code("ms"), DocType::MarkScheme);
        assert_eq!(DocType::from_code(" MS "), DocType::MarkScheme);
        assert_eq!(DocType::from_code("qp"), DocType::QuestionPaper);
        assert_eq!(DocType::from_code("in"), DocType::QuestionPaper);
    }

    #[test]
    fn test_question_id_match_is_case_insensitive() {
        let chunk = Chunk::new("doc", DocType::MarkScheme, 0, Some("2 (a)".into()), "x");
        assert!(chunk.matches_question_id(" 2 (A) "));
        assert!(!chunk.matches_question_id("2 (b)"));

        let unlabelled = Chunk::new("doc", DocType::MarkScheme, 1, None, "x");
        assert!(!unlabelled.matches_question_id("2 (a)"));
    }

    #[test]
    fn test_chunk_id_is_stable() {
        let a = Chunk::new("9618_s23_ms_12", DocType::MarkScheme, 3, None, "a");
        let b = Chunk::new("9618_s23_ms_12", DocType::MarkScheme, 3, None, "b");
        assert_eq!(a.chunk_id, "9618_s23_ms_12#3");
        assert_eq!(a.chunk_id, b.chunk_id);
    }
}
