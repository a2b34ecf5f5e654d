//! # Memory Analytics
//!
//! Derived queries layered on top of [`RagMemoryManager`]: type-partitioned
//! listings, speaker statistics, calendar-aware date queries, tag search, and
//! recency-boosted re-ranking. Everything here reads through the same backend
//! as the engine; there is no separate index.

use std::collections::BTreeMap;
use std::ops::Deref;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use tracing::debug;

use memory_core::{Memory, MemoryError, MemoryType, ScoredMemory, SearchOptions};

use crate::engine::RagMemoryManager;

/// Narrowing options for listing queries. All fields are conjunctive;
/// `limit` applies after sorting.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub speaker: Option<String>,
    pub persona: Option<String>,
    pub memory_type: Option<MemoryType>,
    pub limit: Option<usize>,
}

/// Aggregate statistics for a single speaker.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerStats {
    /// Speaker name as stored (first occurrence wins on case differences).
    pub speaker: String,
    pub memory_count: usize,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub average_importance: f64,
}

/// Options for [`EnhancedRagMemoryManager::search_with_time_boost`].
#[derive(Debug, Clone, Default)]
pub struct TimeBoostOptions {
    /// First-stage similarity search options.
    pub search: SearchOptions,
    /// Drop results below this importance before boosting.
    pub importance_threshold: Option<i32>,
    /// Inclusive lower timestamp bound.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper timestamp bound.
    pub end: Option<DateTime<Utc>>,
}

/// Recency boost as a fixed step function of age in whole days.
fn recency_boost(age_days: i64) -> f32 {
    match age_days {
        d if d < 1 => 1.0,
        d if d < 2 => 0.9,
        d if d < 7 => 0.8,
        d if d < 30 => 0.7,
        d if d < 90 => 0.6,
        _ => 0.5,
    }
}

/// Resolves a local wall-clock time to an instant, taking the earlier
/// interpretation across DST transitions.
fn local_instant(naive: NaiveDateTime) -> DateTime<Utc> {
    let local = match Local.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => dt,
        chrono::LocalResult::None => Local.from_utc_datetime(&naive),
    };
    local.with_timezone(&Utc)
}

/// Inclusive [00:00:00, 23:59:59] bounds of a local calendar day.
fn local_day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(NaiveTime::MIN);
    let end = start + Duration::seconds(86_399);
    (local_instant(start), local_instant(end))
}

fn matches_list(memory: &Memory, options: &ListOptions) -> bool {
    if let Some(speaker) = &options.speaker {
        if !memory.metadata.speaker.eq_ignore_ascii_case(speaker) {
            return false;
        }
    }
    if let Some(persona) = &options.persona {
        if &memory.metadata.persona != persona {
            return false;
        }
    }
    if let Some(memory_type) = options.memory_type {
        if memory.metadata.memory_type != memory_type {
            return false;
        }
    }
    true
}

/// Sort by importance descending, then recency descending.
fn sort_by_importance_then_time(memories: &mut [Memory]) {
    memories.sort_by(|a, b| {
        b.metadata
            .importance
            .cmp(&a.metadata.importance)
            .then(b.metadata.timestamp.cmp(&a.metadata.timestamp))
    });
}

fn apply_limit(mut memories: Vec<Memory>, limit: Option<usize>) -> Vec<Memory> {
    if let Some(limit) = limit {
        memories.truncate(limit);
    }
    memories
}

/// Analytics-enabled memory engine. Derefs to [`RagMemoryManager`], so the
/// core operations (`add_memory`, `retrieve_relevant_memories`, ...) remain
/// directly callable.
pub struct EnhancedRagMemoryManager {
    inner: RagMemoryManager,
}

impl Deref for EnhancedRagMemoryManager {
    type Target = RagMemoryManager;

    fn deref(&self) -> &RagMemoryManager {
        &self.inner
    }
}

impl EnhancedRagMemoryManager {
    pub fn new(inner: RagMemoryManager) -> Self {
        Self { inner }
    }

    async fn filtered(&self, options: &ListOptions) -> Result<Vec<Memory>, MemoryError> {
        let all = self.inner.get_all_memories().await?;
        Ok(all.into_iter().filter(|m| matches_list(m, options)).collect())
    }

    async fn by_type(
        &self,
        memory_type: MemoryType,
        options: &ListOptions,
    ) -> Result<Vec<Memory>, MemoryError> {
        let narrowed = ListOptions {
            memory_type: Some(memory_type),
            ..options.clone()
        };
        let mut memories = self.filtered(&narrowed).await?;
        sort_by_importance_then_time(&mut memories);
        Ok(apply_limit(memories, options.limit))
    }

    /// Notes, most important first.
    pub async fn get_notes(&self, options: &ListOptions) -> Result<Vec<Memory>, MemoryError> {
        self.by_type(MemoryType::Note, options).await
    }

    /// Facts, most important first.
    pub async fn get_facts(&self, options: &ListOptions) -> Result<Vec<Memory>, MemoryError> {
        self.by_type(MemoryType::Fact, options).await
    }

    /// Preferences, most important first.
    pub async fn get_preferences(&self, options: &ListOptions) -> Result<Vec<Memory>, MemoryError> {
        self.by_type(MemoryType::Preference, options).await
    }

    /// Tasks, ranked by `priority` (falling back to importance) descending,
    /// then recency descending.
    pub async fn get_tasks(&self, options: &ListOptions) -> Result<Vec<Memory>, MemoryError> {
        let narrowed = ListOptions {
            memory_type: Some(MemoryType::Task),
            ..options.clone()
        };
        let mut tasks = self.filtered(&narrowed).await?;
        tasks.sort_by(|a, b| {
            let pa = a.metadata.priority().unwrap_or(a.metadata.importance as i64);
            let pb = b.metadata.priority().unwrap_or(b.metadata.importance as i64);
            pb.cmp(&pa)
                .then(b.metadata.timestamp.cmp(&a.metadata.timestamp))
        });
        Ok(apply_limit(tasks, options.limit))
    }

    /// Reminders, most important first. With `active_only`, reminders whose
    /// fire time has already passed are excluded; entries without a fire
    /// time are kept.
    pub async fn get_reminders(
        &self,
        active_only: bool,
        options: &ListOptions,
    ) -> Result<Vec<Memory>, MemoryError> {
        let mut reminders = self.by_type(MemoryType::Reminder, options).await?;
        if active_only {
            let now = Utc::now();
            reminders.retain(|m| match m.metadata.reminder_date() {
                Some(when) => when >= now,
                None => true,
            });
        }
        Ok(reminders)
    }

    /// Distinct speakers, sorted.
    pub async fn get_speakers(&self) -> Result<Vec<String>, MemoryError> {
        let all = self.inner.get_all_memories().await?;
        let mut speakers: Vec<String> = Vec::new();
        for memory in &all {
            if !speakers
                .iter()
                .any(|s| s.eq_ignore_ascii_case(&memory.metadata.speaker))
            {
                speakers.push(memory.metadata.speaker.clone());
            }
        }
        speakers.sort();
        Ok(speakers)
    }

    /// Aggregate statistics for one speaker, matched case-insensitively.
    /// A speaker with zero memories is a hard error: an all-zero stats
    /// object would be indistinguishable from real data.
    pub async fn get_speaker_stats(&self, speaker: &str) -> Result<SpeakerStats, MemoryError> {
        let all = self.inner.get_all_memories().await?;
        let matched: Vec<&Memory> = all
            .iter()
            .filter(|m| m.metadata.speaker.eq_ignore_ascii_case(speaker))
            .collect();

        let (Some(first), Some(last)) = (
            matched.iter().map(|m| m.metadata.timestamp).min(),
            matched.iter().map(|m| m.metadata.timestamp).max(),
        ) else {
            return Err(MemoryError::UnknownSpeaker(speaker.to_string()));
        };

        let total_importance: i64 = matched.iter().map(|m| m.metadata.importance as i64).sum();
        Ok(SpeakerStats {
            speaker: matched[0].metadata.speaker.clone(),
            memory_count: matched.len(),
            first_seen: first,
            last_seen: last,
            average_importance: total_importance as f64 / matched.len() as f64,
        })
    }

    /// Chronological replay of two speakers' memories, oldest first.
    pub async fn get_conversation_between(
        &self,
        a: &str,
        b: &str,
    ) -> Result<Vec<Memory>, MemoryError> {
        let all = self.inner.get_all_memories().await?;
        let mut conversation: Vec<Memory> = all
            .into_iter()
            .filter(|m| {
                m.metadata.speaker.eq_ignore_ascii_case(a)
                    || m.metadata.speaker.eq_ignore_ascii_case(b)
            })
            .collect();
        conversation.sort_by_key(|m| m.metadata.timestamp);
        Ok(conversation)
    }

    /// Memories with `start <= timestamp <= end`, newest first.
    pub async fn get_memories_in_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        options: &ListOptions,
    ) -> Result<Vec<Memory>, MemoryError> {
        let mut memories = self.filtered(options).await?;
        memories.retain(|m| m.metadata.timestamp >= start && m.metadata.timestamp <= end);
        memories.sort_by(|a, b| b.metadata.timestamp.cmp(&a.metadata.timestamp));
        Ok(apply_limit(memories, options.limit))
    }

    /// Memories from the current local calendar day.
    pub async fn get_memories_today(
        &self,
        options: &ListOptions,
    ) -> Result<Vec<Memory>, MemoryError> {
        let (start, end) = local_day_bounds(Local::now().date_naive());
        self.get_memories_in_date_range(start, end, options).await
    }

    /// Memories from the previous local calendar day.
    pub async fn get_memories_yesterday(
        &self,
        options: &ListOptions,
    ) -> Result<Vec<Memory>, MemoryError> {
        let (start, end) = local_day_bounds(Local::now().date_naive() - Duration::days(1));
        self.get_memories_in_date_range(start, end, options).await
    }

    /// Memories from the last seven local calendar days, today included.
    pub async fn get_memories_last_week(
        &self,
        options: &ListOptions,
    ) -> Result<Vec<Memory>, MemoryError> {
        let today = Local::now().date_naive();
        let (start, _) = local_day_bounds(today - Duration::days(6));
        let (_, end) = local_day_bounds(today);
        self.get_memories_in_date_range(start, end, options).await
    }

    /// Groups all memories into local-day buckets keyed `YYYY-MM-DD`, each
    /// bucket sorted oldest first.
    pub async fn get_memories_by_day(
        &self,
    ) -> Result<BTreeMap<String, Vec<Memory>>, MemoryError> {
        let all = self.inner.get_all_memories().await?;
        let mut buckets: BTreeMap<String, Vec<Memory>> = BTreeMap::new();
        for memory in all {
            let key = memory
                .metadata
                .timestamp
                .with_timezone(&Local)
                .format("%Y-%m-%d")
                .to_string();
            buckets.entry(key).or_default().push(memory);
        }
        for bucket in buckets.values_mut() {
            bucket.sort_by_key(|m| m.metadata.timestamp);
        }
        Ok(buckets)
    }

    /// Memories whose tag set intersects `tags` (OR semantics), narrowed by
    /// `options` and sorted by importance then recency.
    pub async fn search_by_tags(
        &self,
        tags: &[String],
        options: &ListOptions,
    ) -> Result<Vec<Memory>, MemoryError> {
        let mut memories = self.filtered(options).await?;
        memories.retain(|m| {
            let own = m.metadata.tags();
            tags.iter().any(|t| own.iter().any(|o| o == t))
        });
        sort_by_importance_then_time(&mut memories);
        Ok(apply_limit(memories, options.limit))
    }

    /// Two-stage ranking: semantic similarity first, then each score is
    /// multiplied by a recency step function of the memory's age, with
    /// optional importance and date-range cuts, and the list is re-sorted by
    /// the boosted score.
    pub async fn search_with_time_boost(
        &self,
        query: &str,
        options: TimeBoostOptions,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        let mut results = self
            .inner
            .retrieve_relevant_memories(query, options.search)
            .await?;
        let now = Utc::now();

        results.retain(|r| {
            if let Some(threshold) = options.importance_threshold {
                if r.memory.metadata.importance < threshold {
                    return false;
                }
            }
            if let Some(start) = options.start {
                if r.memory.metadata.timestamp < start {
                    return false;
                }
            }
            if let Some(end) = options.end {
                if r.memory.metadata.timestamp > end {
                    return false;
                }
            }
            true
        });

        for result in &mut results {
            let age_days = (now - result.memory.metadata.timestamp).num_days();
            result.score *= recency_boost(age_days);
        }
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        debug!(count = results.len(), "time-boosted search complete");
        Ok(results)
    }

    /// Marks a task as completed, stamping `task_status` and `completed_at`.
    /// Returns `false` when the id is absent.
    pub async fn complete_task(&self, id: &str) -> Result<bool, MemoryError> {
        let Some(mut task) = self.inner.get_memory_by_id(id).await? else {
            return Ok(false);
        };
        task.metadata
            .extra
            .insert("task_status".to_string(), "completed".into());
        task.metadata
            .extra
            .insert("completed_at".to_string(), Utc::now().to_rfc3339().into());
        self.inner.update_memory(id, task).await
    }
}
