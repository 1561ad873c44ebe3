//! Execution Timeline
//!
//! Records when each step starts, finishes, fails or is skipped, for the
//! summary printed at the end of a run and for the run log.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Type of timeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// Step started executing
    Started,
    /// Step completed successfully
    Completed,
    /// Step failed
    Failed,
    /// Step was already complete in the progress file
    Skipped,
}

/// A single event in the execution timeline.
#[derive(Debug, Clone)]
pub struct TimelineEvent {
    /// Name of the step
    pub step_name: String,
    /// Type of event
    pub event_type: EventType,
    /// When the event occurred
    pub timestamp: Instant,
}

/// Tracks the execution timeline of a workflow run.
#[derive(Debug, Clone)]
pub struct ExecutionTimeline {
    events: Vec<TimelineEvent>,
    start_time: Instant,
}

impl ExecutionTimeline {
    /// Creates a new timeline starting now.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            start_time: Instant::now(),
        }
    }

    /// Records an event for a step.
    pub fn add_event(&mut self, step_name: impl Into<String>, event_type: EventType) {
        self.events.push(TimelineEvent {
            step_name: step_name.into(),
            event_type,
            timestamp: Instant::now(),
        });
    }

    /// Returns all recorded events.
    pub fn get_events(&self) -> &[TimelineEvent] {
        &self.events
    }

    /// Returns the total elapsed time since timeline creation.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Names of steps with at least one event of the given type, in order.
    pub fn steps_with(&self, event_type: EventType) -> Vec<&str> {
        self.events
            .iter()
            .filter(|event| event.event_type == event_type)
            .map(|event| event.step_name.as_str())
            .collect()
    }

    /// Returns how long each finished step ran (completed or failed).
    pub fn get_durations(&self) -> HashMap<String, Duration> {
        let mut starts: HashMap<&str, Instant> = HashMap::new();
        let mut durations = HashMap::new();

        for event in &self.events {
            match event.event_type {
                EventType::Started => {
                    starts.insert(&event.step_name, event.timestamp);
                }
                EventType::Completed | EventType::Failed => {
                    if let Some(start) = starts.get(event.step_name.as_str()) {
                        durations.insert(
                            event.step_name.clone(),
                            event.timestamp.duration_since(*start),
                        );
                    }
                }
                EventType::Skipped => {}
            }
        }

        durations
    }

    /// Renders one line per step in the order steps were first seen.
    pub fn summary(&self) -> String {
        let durations = self.get_durations();
        let mut output = String::from("Run summary:\n");

        let mut order: Vec<&str> = Vec::new();
        let mut last: HashMap<&str, EventType> = HashMap::new();
        for event in &self.events {
            if !last.contains_key(event.step_name.as_str()) {
                order.push(&event.step_name);
            }
            last.insert(&event.step_name, event.event_type);
        }

        for name in order {
            let label = match last.get(name) {
                Some(EventType::Completed) => "done",
                Some(EventType::Failed) => "FAILED",
                Some(EventType::Skipped) => "skipped",
                Some(EventType::Started) | None => "interrupted",
            };
            let timing = durations
                .get(name)
                .map(|d| format!(" ({:.1?})", d))
                .unwrap_or_default();

            output.push_str(&format!("  {:24} {}{}\n", truncate(name, 24), label, timing));
        }

        output.push_str(&format!(
            "Executed: {}, skipped: {}, failed: {}, total time: {:.1?}\n",
            self.steps_with(EventType::Completed).len(),
            self.steps_with(EventType::Skipped).len(),
            self.steps_with(EventType::Failed).len(),
            self.elapsed()
        ));
        output
    }
}

impl Default for ExecutionTimeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Shortens a name to at most `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
