//! # Core Types
//!
//! This module defines the core types for semantic memory storage.
//!
//! ## MemoryType
//!
//! Classifies a memory entry. The type determines which analytics view
//! (notes, facts, tasks, ...) an entry surfaces in.
//!
//! ## MemoryMetadata
//!
//! Metadata associated with a memory entry.
//!
//! ### Fields
//!
//! | Field | Type | Description |
//! |-------|------|-------------|
//! | `speaker` | `String` | Who produced the text |
//! | `timestamp` | `DateTime<Utc>` | Creation time |
//! | `memory_type` | `MemoryType` | Classification (serialized as `type`) |
//! | `persona` | `String` | Persona the memory belongs to |
//! | `importance` | `i32` | Advisory ranking field, conventionally 1-10 |
//! | `extra` | `HashMap<String, Value>` | Consumer-defined keys (flattened) |
//!
//! Common `extra` keys (`tags`, `priority`, `reminder_date`, `task_status`,
//! `completed_at`, `due_date`) have typed accessors.
//!
//! ## Memory
//!
//! A single memory entry: id, raw text, optional embedding vector, metadata.
//! Ids are assigned once at creation and never reused. An entry whose
//! `embedding` is `None` can be stored and listed but cannot participate in
//! similarity search.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Classification of a memory entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    Conversation,
    Note,
    Reminder,
    Preference,
    Fact,
    Task,
    SystemStatus,
}

impl MemoryType {
    /// Returns the snake_case wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Conversation => "conversation",
            MemoryType::Note => "note",
            MemoryType::Reminder => "reminder",
            MemoryType::Preference => "preference",
            MemoryType::Fact => "fact",
            MemoryType::Task => "task",
            MemoryType::SystemStatus => "system_status",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "conversation" => Ok(MemoryType::Conversation),
            "note" => Ok(MemoryType::Note),
            "reminder" => Ok(MemoryType::Reminder),
            "preference" => Ok(MemoryType::Preference),
            "fact" => Ok(MemoryType::Fact),
            "task" => Ok(MemoryType::Task),
            "system_status" => Ok(MemoryType::SystemStatus),
            other => Err(format!("unknown memory type: {}", other)),
        }
    }
}

/// Metadata associated with a memory entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryMetadata {
    /// Who produced the text
    pub speaker: String,
    /// When the memory was created
    pub timestamp: DateTime<Utc>,
    /// Classification of the entry
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    /// Persona the memory belongs to
    pub persona: String,
    /// Advisory importance, conventionally 1-10
    pub importance: i32,
    /// Consumer-defined keys (tags, priority, reminder_date, ...)
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl MemoryMetadata {
    /// Creates metadata stamped with the current time and no extra keys.
    pub fn new(
        speaker: impl Into<String>,
        memory_type: MemoryType,
        persona: impl Into<String>,
        importance: i32,
    ) -> Self {
        Self {
            speaker: speaker.into(),
            timestamp: Utc::now(),
            memory_type,
            persona: persona.into(),
            importance,
            extra: HashMap::new(),
        }
    }

    /// Tags attached to this entry, if any (`extra["tags"]` as a string array).
    pub fn tags(&self) -> Vec<String> {
        self.extra
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|t| t.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Task priority (`extra["priority"]`), used instead of importance when
    /// ranking tasks.
    pub fn priority(&self) -> Option<i64> {
        self.extra.get("priority").and_then(|v| v.as_i64())
    }

    /// Task status string (`extra["task_status"]`).
    pub fn task_status(&self) -> Option<&str> {
        self.extra.get("task_status").and_then(|v| v.as_str())
    }

    /// Reminder fire time (`extra["reminder_date"]`, RFC 3339).
    pub fn reminder_date(&self) -> Option<DateTime<Utc>> {
        self.extra
            .get("reminder_date")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Due date for tasks (`extra["due_date"]`, RFC 3339).
    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.extra
            .get("due_date")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// A single memory entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Memory {
    /// Unique identifier, assigned once at creation
    pub id: String,
    /// The raw content
    pub text: String,
    /// Vector embedding; `None` when the backend does not return vectors
    pub embedding: Option<Vec<f32>>,
    /// Associated metadata
    pub metadata: MemoryMetadata,
}

impl Memory {
    /// Creates a new `Memory` with a generated id.
    pub fn new(text: String, embedding: Option<Vec<f32>>, metadata: MemoryMetadata) -> Self {
        Self {
            id: Self::generate_id(),
            text,
            embedding,
            metadata,
        }
    }

    /// Generates a unique id: millisecond timestamp plus a random suffix.
    pub fn generate_id() -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
    }
}

/// Options for a similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Restrict to one speaker (case-insensitive match)
    pub speaker: Option<String>,
    /// Restrict to one persona (exact match)
    pub persona: Option<String>,
    /// Restrict to one memory type (exact match)
    pub memory_type: Option<MemoryType>,
    /// Maximum number of results
    pub limit: usize,
    /// Minimum similarity score; results scoring exactly this value are kept
    pub threshold: f32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            speaker: None,
            persona: None,
            memory_type: None,
            limit: 10,
            threshold: 0.7,
        }
    }
}

/// A memory paired with its relevance score (higher = more relevant).
#[derive(Debug, Clone)]
pub struct ScoredMemory {
    pub memory: Memory,
    pub score: f32,
}
