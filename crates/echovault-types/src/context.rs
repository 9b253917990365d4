//! Documents held in the vector index and their search results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Where an indexed document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentSource {
    /// A conversation summary, keyed by the conversation row id.
    Summary,
    /// An ad-hoc text snippet with a freshly generated id.
    Snippet,
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Summary => write!(f, "summary"),
            DocumentSource::Snippet => write!(f, "snippet"),
        }
    }
}

impl FromStr for DocumentSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summary" => Ok(DocumentSource::Summary),
            "snippet" => Ok(DocumentSource::Snippet),
            other => Err(format!("invalid document source: '{other}'")),
        }
    }
}

/// A document stored in the vector index alongside its embedding.
///
/// For summaries, `conversation_id` is the back-reference to the relational
/// row; no foreign key enforces it, the two stores are eventually consistent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextDocument {
    pub id: String,
    pub text: String,
    pub source: DocumentSource,
    pub conversation_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl ContextDocument {
    /// Document for a stored conversation summary.
    ///
    /// The id is derived from the conversation row id, so reprocessing the
    /// same row overwrites its entry instead of duplicating it. SQLite
    /// AUTOINCREMENT never reuses row ids, keeping the namespace unique.
    pub fn summary(conversation_id: i64, text: impl Into<String>) -> Self {
        Self {
            id: format!("summary_{conversation_id}"),
            text: text.into(),
            source: DocumentSource::Summary,
            conversation_id: Some(conversation_id),
            created_at: Utc::now(),
        }
    }

    /// Ad-hoc snippet with a freshly generated id.
    pub fn snippet(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            text: text.into(),
            source: DocumentSource::Snippet,
            conversation_id: None,
            created_at: Utc::now(),
        }
    }
}

/// A search hit: the document plus its cosine distance to the query.
///
/// Lower distance means closer; results are returned ascending.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredDocument {
    pub document: ContextDocument,
    pub distance: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_document_id_is_deterministic() {
        let doc = ContextDocument::summary(42, "greeting call");
        assert_eq!(doc.id, "summary_42");
        assert_eq!(doc.source, DocumentSource::Summary);
        assert_eq!(doc.conversation_id, Some(42));

        let again = ContextDocument::summary(42, "greeting call");
        assert_eq!(doc.id, again.id);
    }

    #[test]
    fn test_snippet_documents_get_unique_ids() {
        let a = ContextDocument::snippet("note one");
        let b = ContextDocument::snippet("note one");
        assert_ne!(a.id, b.id);
        assert_eq!(a.source, DocumentSource::Snippet);
        assert!(a.conversation_id.is_none());
    }

    #[test]
    fn test_document_source_round_trip() {
        for source in [DocumentSource::Summary, DocumentSource::Snippet] {
            let parsed: DocumentSource = source.to_string().parse().unwrap();
            assert_eq!(parsed, source);
        }
        assert!("transcript".parse::<DocumentSource>().is_err());
    }
}
