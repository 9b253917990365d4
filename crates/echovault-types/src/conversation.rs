//! Conversation records and the inbound end-of-call report payload.
//!
//! The report schema mirrors what the voice platform actually sends: a
//! `message` object with `artifact` and `analysis` sub-objects and camelCase
//! field names. Validation happens once, at the boundary, in
//! [`EndOfCallReport::into_new_conversation`]; everything downstream works
//! with typed optional fields.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// The `message.type` value that marks a payload as an end-of-call report.
pub const END_OF_CALL_REPORT_TYPE: &str = "end-of-call-report";

/// A persisted conversation row.
///
/// Created exactly once per valid ingestion request; never updated or
/// deleted. The id is SQLite's auto-incrementing rowid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: i64,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub recording_url: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Field values for a conversation that has not been written yet.
///
/// Produced only by [`EndOfCallReport::into_new_conversation`], so the
/// transcript is guaranteed non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct NewConversation {
    pub transcript: String,
    pub summary: Option<String>,
    pub recording_url: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// The webhook payload as delivered by the voice platform.
#[derive(Debug, Clone, Deserialize)]
pub struct EndOfCallReport {
    pub message: Option<ReportMessage>,
}

/// The `message` object of an end-of-call report.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMessage {
    #[serde(rename = "type", default)]
    pub message_type: String,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub artifact: Option<ReportArtifact>,
    #[serde(default)]
    pub analysis: Option<ReportAnalysis>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub ended_at: Option<String>,
}

/// Call artifacts: the pre-formatted transcript and the recording location.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportArtifact {
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub recording_url: Option<String>,
}

/// Post-call analysis produced by the platform.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportAnalysis {
    #[serde(default)]
    pub summary: Option<String>,
}

impl EndOfCallReport {
    /// Validate the report and map it into insertable conversation fields.
    ///
    /// Rules:
    /// - `message.type` must equal `"end-of-call-report"`.
    /// - The transcript comes from `artifact.transcript` when that field is
    ///   present, otherwise from the top-level `transcript`; the resolved
    ///   value must be non-empty.
    /// - The summary prefers `analysis.summary` over the top-level field.
    /// - Timestamps are RFC-3339; a trailing `Z` means UTC, and offset-less
    ///   strings are assumed UTC. Absent timestamps map to `None`.
    ///
    /// All rejections happen here, before anything is written.
    pub fn into_new_conversation(self) -> Result<NewConversation, IngestError> {
        let message = self.message.ok_or(IngestError::NotEndOfCallReport)?;
        if message.message_type != END_OF_CALL_REPORT_TYPE {
            return Err(IngestError::NotEndOfCallReport);
        }

        let transcript = message
            .artifact
            .as_ref()
            .and_then(|a| a.transcript.clone())
            .or(message.transcript)
            .filter(|t| !t.is_empty())
            .ok_or(IngestError::MissingTranscript)?;

        let summary = message
            .analysis
            .as_ref()
            .and_then(|a| a.summary.clone())
            .or(message.summary);

        let recording_url = message.artifact.and_then(|a| a.recording_url);

        let started_at = parse_report_timestamp("startedAt", message.started_at.as_deref())?;
        let ended_at = parse_report_timestamp("endedAt", message.ended_at.as_deref())?;

        Ok(NewConversation {
            transcript,
            summary,
            recording_url,
            started_at,
            ended_at,
        })
    }
}

/// Parse an optional ISO-8601 timestamp from a report.
///
/// `parse_from_rfc3339` already treats a trailing `Z` as `+00:00`. Strings
/// without any offset are parsed as naive datetimes and assumed UTC.
fn parse_report_timestamp(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, IngestError> {
    let Some(raw) = value else {
        return Ok(None);
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(|e| IngestError::InvalidTimestamp {
            field,
            message: e.to_string(),
        })
}
