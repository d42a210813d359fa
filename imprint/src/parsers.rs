//! Session-log parsers for Claude Code and Augment transcript formats.
//!
//! Claude Code stores one JSONL file per session under
//! `~/.claude/projects/{encoded-project-path}/{uuid}.jsonl`; Augment exports
//! conversations as JSON files carrying a `chatHistory` array, either at the
//! root or nested under `conversation`. Both parse into normalized
//! [`Session`] records. Malformed lines and entries are skipped, never fatal.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;
use walkdir::WalkDir;

use crate::models::{Message, MessageRole, Session};

/// Numeric timestamps above this are treated as milliseconds and divided
/// down (values after ~2001 when read as ms).
const MILLISECOND_TIMESTAMP_THRESHOLD: f64 = 1e12;

/// A source of normalized sessions.
pub trait LogParser {
    /// Discover parseable log files under `root`.
    fn discover(&self, root: &Path) -> Vec<PathBuf>;

    /// Parse one log file into sessions. Unreadable or empty files yield
    /// nothing.
    fn parse(&self, path: &Path) -> Vec<Session>;
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let mut ts = n.as_f64()?;
            if ts > MILLISECOND_TIMESTAMP_THRESHOLD {
                ts /= 1000.0;
            }
            let secs = ts.trunc() as i64;
            let nanos = (ts.fract() * 1e9) as u32;
            DateTime::from_timestamp(secs, nanos)
        }
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

fn update_range(
    ts: Option<DateTime<Utc>>,
    start: &mut Option<DateTime<Utc>>,
    end: &mut Option<DateTime<Utc>>,
) {
    let Some(ts) = ts else { return };
    if start.is_none_or(|s| ts < s) {
        *start = Some(ts);
    }
    if end.is_none_or(|e| ts > e) {
        *end = Some(ts);
    }
}

/// Parser for Claude Code JSONL session logs.
#[derive(Debug, Default)]
pub struct ClaudeCodeParser;

impl ClaudeCodeParser {
    /// Default log root: `~/.claude/projects`.
    pub fn default_root() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".claude").join("projects"))
    }

    fn parse_entry(entry: &Value) -> Option<Message> {
        let entry_type = entry.get("type").and_then(Value::as_str).unwrap_or("");
        let role_field = entry.get("role").and_then(Value::as_str).unwrap_or("");

        let role = if entry_type == "human" || role_field == "user" {
            MessageRole::User
        } else if entry_type == "assistant" || role_field == "assistant" {
            MessageRole::Assistant
        } else {
            return None;
        };

        let content = match entry.get("message") {
            Some(Value::Object(map)) => map
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        };

        Some(Message {
            role,
            content,
            timestamp: entry.get("timestamp").and_then(parse_timestamp),
        })
    }

    /// Decode `-Users-foo-myproject` (the directory under `projects/`) back
    /// into `/Users/foo/myproject`.
    fn extract_project_path(log_path: &Path) -> Option<String> {
        let components: Vec<&str> = log_path
            .iter()
            .filter_map(|c| c.to_str())
            .collect();
        let idx = components.iter().position(|c| *c == "projects")?;
        // The encoded directory sits between `projects` and the log file.
        if idx + 2 >= components.len() {
            return None;
        }
        let encoded = components[idx + 1];
        Some(format!("/{}", encoded.replace('-', "/").trim_start_matches('/')))
    }
}

impl LogParser for ClaudeCodeParser {
    fn discover(&self, root: &Path) -> Vec<PathBuf> {
        if !root.exists() {
            return Vec::new();
        }
        WalkDir::new(root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry.path().extension().is_some_and(|ext| ext == "jsonl")
            })
            .map(|entry| entry.into_path())
            .collect()
    }

    fn parse(&self, path: &Path) -> Vec<Session> {
        if !path.exists() || path.extension().is_none_or(|ext| ext != "jsonl") {
            return Vec::new();
        }
        let Ok(text) = std::fs::read_to_string(path) else {
            tracing::warn!(path = %path.display(), "failed to read session log");
            return Vec::new();
        };

        let mut messages = Vec::new();
        let mut start_time = None;
        let mut end_time = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Ok(entry) = serde_json::from_str::<Value>(line) else {
                continue;
            };
            if let Some(msg) = Self::parse_entry(&entry) {
                update_range(msg.timestamp, &mut start_time, &mut end_time);
                messages.push(msg);
            }
        }

        if messages.is_empty() {
            return Vec::new();
        }

        let session_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        vec![Session {
            session_id,
            messages,
            source: "claude_code".to_string(),
            project_path: Self::extract_project_path(path),
            start_time,
            end_time,
        }]
    }
}

/// Parser for Augment JSON conversation exports.
#[derive(Debug, Default)]
pub struct AugmentParser;

impl AugmentParser {
    fn is_augment_export(path: &Path) -> bool {
        let Ok(text) = std::fs::read_to_string(path) else {
            return false;
        };
        let Ok(data) = serde_json::from_str::<Value>(&text) else {
            return false;
        };
        Self::chat_history(&data).is_some()
    }

    /// chatHistory lives at the root or nested under `conversation`.
    fn chat_history(data: &Value) -> Option<&Vec<Value>> {
        if let Some(history) = data.get("chatHistory").and_then(Value::as_array) {
            return Some(history);
        }
        data.get("conversation")?
            .get("chatHistory")
            .and_then(Value::as_array)
    }

    fn extract_text_from_nodes(nodes: &[Value]) -> String {
        let texts: Vec<&str> = nodes
            .iter()
            .filter_map(|node| {
                node.get("text")
                    .and_then(Value::as_str)
                    .filter(|t| !t.is_empty())
                    .or_else(|| node.get("content").and_then(Value::as_str))
            })
            .filter(|t| !t.is_empty())
            .collect();
        texts.join("\n")
    }

    fn parse_history_entry(entry: &Value) -> Vec<Message> {
        let mut messages = Vec::new();
        let timestamp = entry.get("timestamp").and_then(parse_timestamp);

        if let Some(request) = entry
            .get("request_message")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
        {
            messages.push(Message {
                role: MessageRole::User,
                content: request.to_string(),
                timestamp,
            });
        }

        let mut response = entry
            .get("response_text")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        if response.is_empty()
            && let Some(nodes) = entry.get("structured_output_nodes").and_then(Value::as_array)
        {
            response = Self::extract_text_from_nodes(nodes);
        }
        if !response.is_empty() {
            messages.push(Message {
                role: MessageRole::Assistant,
                content: response,
                timestamp,
            });
        }

        messages
    }
}

impl LogParser for AugmentParser {
    fn discover(&self, root: &Path) -> Vec<PathBuf> {
        if !root.exists() {
            return Vec::new();
        }
        if root.is_file() {
            return if Self::is_augment_export(root) {
                vec![root.to_path_buf()]
            } else {
                Vec::new()
            };
        }

        let Ok(entries) = std::fs::read_dir(root) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter(|path| Self::is_augment_export(path))
            .collect();
        files.sort();
        files
    }

    fn parse(&self, path: &Path) -> Vec<Session> {
        if !path.exists() || path.extension().is_none_or(|ext| ext != "json") {
            return Vec::new();
        }
        let Ok(text) = std::fs::read_to_string(path) else {
            tracing::warn!(path = %path.display(), "failed to read export file");
            return Vec::new();
        };
        let Ok(data) = serde_json::from_str::<Value>(&text) else {
            return Vec::new();
        };
        let Some(history) = Self::chat_history(&data) else {
            return Vec::new();
        };

        let mut messages = Vec::new();
        let mut start_time = None;
        let mut end_time = None;

        for entry in history {
            if !entry.is_object() {
                continue;
            }
            for msg in Self::parse_history_entry(entry) {
                update_range(msg.timestamp, &mut start_time, &mut end_time);
                messages.push(msg);
            }
        }

        if messages.is_empty() {
            return Vec::new();
        }

        let session_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        vec![Session {
            session_id,
            messages,
            source: "augment".to_string(),
            project_path: path.parent().map(|p| p.display().to_string()),
            start_time,
            end_time,
        }]
    }
}
