//! Progress Store
//!
//! Reads and writes the progress file: a pretty-printed JSON document that an
//! operator can open in an editor to skip a step, redo one, or change a
//! captured value between runs.
//!
//! ```json
//! {
//!   "comments": [["This file stores the progress of ..."], ["Step names:", "0: check_access"]],
//!   "workflow": "Release",
//!   "saved_at": "2026-10-18T09:30:00+01:00",
//!   "completed_steps": ["check_access"],
//!   "values": { "version": "1.4.0" }
//! }
//! ```
//!
//! Only `completed_steps` and `values` are read back; everything else is
//! informational and ignored on load. Extra top-level keys added by hand are
//! carried over unchanged when the file is saved again.
//!
//! Before anything touches the disk, the rendered document is parsed back and
//! must yield the state being saved; a state that would not load again is
//! refused. The bytes then go to a temporary file in the same directory which
//! is flushed, synced, read back and renamed over the target, so a crash
//! mid-write never leaves a torn file behind.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::StoreError;

use super::state::{is_scalar, WorkflowState};

/// Extension used for progress files.
pub const PROGRESS_EXTENSION: &str = "json";

/// Extension used for the run log written next to a progress file.
pub const LOG_EXTENSION: &str = "log";

/// Top-level keys the store writes itself.
const MANAGED_KEYS: [&str; 5] = ["comments", "workflow", "saved_at", "completed_steps", "values"];

/// Descriptive data written alongside the state to help a human editor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    /// Workflow name shown in the header comment
    pub workflow: String,

    /// Step names in declared order
    pub step_names: Vec<String>,
}

impl Annotations {
    pub fn new(workflow: impl Into<String>, step_names: Vec<String>) -> Self {
        Self {
            workflow: workflow.into(),
            step_names,
        }
    }

    /// Comment blocks; each block is a list of lines so the JSON stays readable.
    fn comments(&self) -> Vec<Vec<String>> {
        let header = vec![
            format!(
                "This file stores the progress of the {} do-nothing workflow.",
                self.workflow
            ),
            "It can be loaded to resume progress, and edited to skip or redo".to_string(),
            "steps (`completed_steps`) or use alternative values (`values`).".to_string(),
        ];

        let mut names = vec!["Step names:".to_string()];
        names.extend(
            self.step_names
                .iter()
                .enumerate()
                .map(|(index, name)| format!("{}: {}", index, name)),
        );

        vec![header, names]
    }
}

#[derive(Serialize)]
struct ProgressDocument<'a> {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    comments: Vec<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    workflow: Option<&'a str>,

    saved_at: String,

    #[serde(flatten)]
    state: &'a WorkflowState,

    #[serde(flatten)]
    extra: &'a Map<String, Value>,
}

/// Handle on one progress file.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
    annotations: Option<Annotations>,
}

impl ProgressStore {
    /// Creates a store for the given progress file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            annotations: None,
        }
    }

    /// Attaches the header comments written on every save.
    pub fn with_annotations(mut self, annotations: Annotations) -> Self {
        self.annotations = Some(annotations);
        self
    }

    /// Returns the progress file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if a progress file already exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Loads the state, or a fresh one if the file does not exist yet.
    pub fn load(&self) -> Result<WorkflowState, StoreError> {
        load(&self.path)
    }

    /// Atomically writes the state.
    ///
    /// Nothing is written unless the rendered document loads back to exactly
    /// `state`; on any error the previous file is left in place.
    pub fn save(&self, state: &WorkflowState) -> Result<(), StoreError> {
        let extra = preserved_keys(&self.path);
        let json = render(state, self.annotations.as_ref(), &extra)?;
        verify_rendered(&self.path, &json, state)?;
        write_atomic(&self.path, json.as_bytes())?;

        debug!("Saved progress to {}", self.path.display());
        Ok(())
    }
}

/// Loads workflow state from `path`.
///
/// A missing file yields a fresh empty state. Unknown keys are ignored;
/// missing `completed_steps` or `values` keys load as empty.
pub fn load(path: &Path) -> Result<WorkflowState, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No progress file at {} - starting fresh", path.display());
            return Ok(WorkflowState::new());
        }
        Err(e) => return Err(StoreError::persistence("read", path, e)),
    };

    let document: Value = serde_json::from_str(&content).map_err(|e| {
        StoreError::corrupt(
            path,
            format!(
                "invalid JSON at line {}, column {}: {}",
                e.line(),
                e.column(),
                e
            ),
        )
    })?;

    let mut state = parse_state(&document).map_err(|reason| StoreError::corrupt(path, reason))?;

    let duplicates = state.dedup_completed();
    if !duplicates.is_empty() {
        warn!(
            "Progress file {} lists {:?} more than once in completed_steps; keeping the first entry",
            path.display(),
            duplicates
        );
    }

    debug!("Loaded progress from {}", path.display());
    Ok(state)
}

/// Atomically writes `state` to `path` without header comments.
pub fn save(path: &Path, state: &WorkflowState) -> Result<(), StoreError> {
    ProgressStore::new(path).save(state)
}

/// Checks the document shape and extracts the state.
fn parse_state(document: &Value) -> Result<WorkflowState, String> {
    let object = document
        .as_object()
        .ok_or_else(|| format!("top level must be an object, found {}", kind(document)))?;

    let mut state = WorkflowState::new();

    match object.get("completed_steps") {
        None => {}
        Some(Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                match item {
                    Value::String(name) => state.completed_steps.push(name.clone()),
                    other => {
                        return Err(format!(
                            "`completed_steps[{}]` must be a step name (string), found {}",
                            index,
                            kind(other)
                        ))
                    }
                }
            }
        }
        Some(other) => {
            return Err(format!(
                "`completed_steps` must be a list of step names, found {}",
                kind(other)
            ))
        }
    }

    match object.get("values") {
        None => {}
        Some(Value::Object(entries)) => {
            for (key, value) in entries {
                if !is_scalar(value) {
                    return Err(format!(
                        "`values.{}` must be a string, number, boolean or null, found {}",
                        key,
                        kind(value)
                    ));
                }
                state.values.insert(key.clone(), value.clone());
            }
        }
        Some(other) => {
            return Err(format!(
                "`values` must be an object of key/value pairs, found {}",
                kind(other)
            ))
        }
    }

    Ok(state)
}

/// Human name for a JSON value's type.
fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Serializes the state with its annotations and any carried-over keys.
fn render(
    state: &WorkflowState,
    annotations: Option<&Annotations>,
    extra: &Map<String, Value>,
) -> Result<String, StoreError> {
    let document = ProgressDocument {
        comments: annotations.map(Annotations::comments).unwrap_or_default(),
        workflow: annotations.map(|a| a.workflow.as_str()),
        saved_at: Local::now().to_rfc3339(),
        state,
        extra,
    };

    let mut json = serde_json::to_string_pretty(&document).map_err(|e| {
        StoreError::persistence("serialize", "<memory>", io::Error::new(io::ErrorKind::InvalidData, e))
    })?;
    json.push('\n');
    Ok(json)
}

/// Checks that `json` parses back to `state` under the rules [`load`] applies.
fn verify_rendered(path: &Path, json: &str, state: &WorkflowState) -> Result<(), StoreError> {
    let refuse = |reason: String| {
        StoreError::persistence(
            "verify",
            path,
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("state would not load back: {}", reason),
            ),
        )
    };

    let document: Value = serde_json::from_str(json).map_err(|e| refuse(e.to_string()))?;
    let parsed = parse_state(&document).map_err(|reason| refuse(reason))?;
    if &parsed != state {
        return Err(refuse("values change when read back".to_string()));
    }
    Ok(())
}

/// Hand-added top-level keys of the existing file, if it can be read.
fn preserved_keys(path: &Path) -> Map<String, Value> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return Map::new(),
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(object)) => object
            .into_iter()
            .filter(|(key, _)| !MANAGED_KEYS.contains(&key.as_str()))
            .collect(),
        _ => Map::new(),
    }
}

/// A temporary file that is removed on drop unless committed.
struct PendingWrite {
    temp_path: PathBuf,
    committed: bool,
}

impl PendingWrite {
    fn new(target: &Path) -> Self {
        let file_name = target
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("progress");
        let temp_path = target.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()));

        Self {
            temp_path,
            committed: false,
        }
    }

    fn commit(mut self, target: &Path) -> io::Result<()> {
        fs::rename(&self.temp_path, target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PendingWrite {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = fs::remove_file(&self.temp_path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(
                        "Failed to clean up temporary file {}: {}",
                        self.temp_path.display(),
                        e
                    );
                }
            }
        }
    }
}

/// Writes `bytes` to `path` via temp file and rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::persistence("create directory for", path, e))?;
    }

    let pending = PendingWrite::new(path);

    let mut file = File::create(&pending.temp_path)
        .map_err(|e| StoreError::persistence("create temporary file for", path, e))?;
    file.write_all(bytes)
        .and_then(|()| file.flush())
        .and_then(|()| file.sync_all())
        .map_err(|e| StoreError::persistence("write", path, e))?;
    drop(file);

    let written = fs::read(&pending.temp_path)
        .map_err(|e| StoreError::persistence("verify", path, e))?;
    if written != bytes {
        return Err(StoreError::persistence(
            "verify",
            path,
            io::Error::new(
                io::ErrorKind::InvalidData,
                "temporary file does not match the rendered progress",
            ),
        ));
    }

    pending
        .commit(path)
        .map_err(|e| StoreError::persistence("replace", path, e))?;

    sync_parent(path);
    Ok(())
}

/// Flushes the directory entry for the rename where the platform allows it.
fn sync_parent(path: &Path) {
    #[cfg(unix)]
    {
        let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent,
            None => Path::new("."),
        };
        if let Err(e) = File::open(parent).and_then(|dir| dir.sync_all()) {
            debug!("Could not sync directory {}: {}", parent.display(), e);
        }
    }
    #[cfg(not(unix))]
    let _ = path;
}

/// Ensures the progress directory exists and is a directory.
pub fn prepare_dir(dir: &Path) -> Result<(), StoreError> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(StoreError::persistence(
                "use directory for",
                dir,
                io::Error::new(io::ErrorKind::AlreadyExists, "path exists but is not a directory"),
            ));
        }
        return Ok(());
    }

    fs::create_dir_all(dir).map_err(|e| StoreError::persistence("create directory for", dir, e))?;
    info!("Created progress directory {}", dir.display());
    Ok(())
}

/// Date-stamped progress path for a fresh run: `<dir>/<Name>_<YYYYmmdd-HHMMSS>.json`.
pub fn timestamped_path(dir: &Path, workflow_name: &str) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    dir.join(format!("{}_{}.{}", file_stem(workflow_name), stamp, PROGRESS_EXTENSION))
}

/// Path of the editable template: `<dir>/<Name>_template.json`.
pub fn template_path(dir: &Path, workflow_name: &str) -> PathBuf {
    dir.join(format!("{}_template.{}", file_stem(workflow_name), PROGRESS_EXTENSION))
}

/// Log file written next to a progress file.
pub fn log_path(progress_path: &Path) -> PathBuf {
    progress_path.with_extension(LOG_EXTENSION)
}

/// Makes a workflow name safe to use in a file name.
fn file_stem(workflow_name: &str) -> String {
    let stem: String = workflow_name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    if stem.is_empty() {
        "workflow".to_string()
    } else {
        stem
    }
}
