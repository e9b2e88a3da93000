//! Mock server state management.
//!
//! Provides the in-memory data store for the mock Yeti API server. Records are
//! kept as JSON objects shaped like legacy Yeti responses so that updates,
//! searches and file uploads all see the same documents.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;

use regex::Regex;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use url::Url;

use crate::{OneshotJob, OneshotStatus};

/// A stored document.
pub type Record = Map<String, Value>;

/// How a oneshot job behaves when run.
#[derive(Debug, Clone)]
pub struct OneshotScript {
    /// Statuses returned by successive status requests. The last one repeats.
    pub statuses: Vec<OneshotStatus>,
    /// Results attached once the run reports `finished`.
    pub results: Value,
}

#[derive(Debug, Clone)]
pub(crate) struct OneshotRun {
    pub job_id: String,
    pub remaining: VecDeque<OneshotStatus>,
    pub results: Value,
}

/// Shared state for the mock server.
///
/// This struct holds all the mock data that the server will serve.
/// It's wrapped in `Arc<RwLock<_>>` for concurrent access.
#[derive(Debug, Default)]
pub struct MockState {
    /// Observables (files included) indexed by id.
    pub observables: BTreeMap<String, Record>,

    /// Raw content of file observables, indexed by observable id.
    pub file_contents: HashMap<String, Vec<u8>>,

    pub entities: BTreeMap<String, Record>,

    pub links: BTreeMap<String, Record>,

    pub investigations: BTreeMap<String, Record>,

    /// Registered oneshot analytics and how each behaves.
    pub oneshots: BTreeMap<String, (OneshotJob, OneshotScript)>,

    pub(crate) runs: HashMap<String, OneshotRun>,

    /// Last settings posted to `user/settings`.
    pub settings: Record,

    /// Optional API key. If set, requests must carry it in `X-Api-Key`.
    pub required_api_key: Option<String>,

    next_id: u64,
}

impl MockState {
    /// Create a new empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create state wrapped in Arc<RwLock> for sharing.
    pub fn shared(self) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(self))
    }

    /// Set the required API key.
    pub fn with_required_api_key(mut self, key: &str) -> Self {
        self.required_api_key = Some(key.to_string());
        self
    }

    /// Register a oneshot analytic.
    pub fn with_oneshot(mut self, job: OneshotJob, script: OneshotScript) -> Self {
        self.oneshots.insert(job.id.clone(), (job, script));
        self
    }

    /// Store an observable as if it had been added through the API.
    pub fn with_observable(mut self, value: &str, kind: Option<&str>, tags: &[&str]) -> Self {
        let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        self.add_observable(value, kind, &tags, &Record::new(), "fixture", None);
        self
    }

    /// Allocate an ObjectId-shaped identifier.
    pub fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("{:024x}", self.next_id)
    }

    /// Whether `key` grants access.
    pub fn authorized(&self, key: Option<&str>) -> bool {
        match &self.required_api_key {
            Some(required) => key == Some(required.as_str()),
            None => true,
        }
    }

    /// Get-or-create an observable by normalized value, merging tags and context.
    pub fn add_observable(
        &mut self,
        raw: &str,
        kind: Option<&str>,
        tags: &[String],
        context: &Record,
        source: &str,
        description: Option<&str>,
    ) -> Record {
        let (value, kind) = normalize(raw, kind);

        let id = match self.find_observable_by_value(&value) {
            Some(id) => id,
            None => {
                let id = self.next_id();
                let mut record = Record::new();
                record.insert("id".into(), json!(id));
                record.insert("value".into(), json!(value));
                record.insert("type".into(), json!(kind));
                record.insert("tags".into(), json!([]));
                record.insert("context".into(), json!([]));
                record.insert("sources".into(), json!([source]));
                if let Some(description) = description {
                    record.insert("description".into(), json!(description));
                }
                self.observables.insert(id.clone(), record);
                id
            }
        };

        self.change_observable(&id, tags, context, source)
            .unwrap_or_default()
    }

    /// Add tags and a context entry to an existing observable.
    pub fn change_observable(
        &mut self,
        id: &str,
        tags: &[String],
        context: &Record,
        source: &str,
    ) -> Option<Record> {
        let record = self.observables.get_mut(id)?;
        merge_tags(record, tags);
        if !context.is_empty() {
            let mut entry = context.clone();
            entry
                .entry("source")
                .or_insert_with(|| Value::String(source.to_string()));
            if let Some(Value::Array(list)) = record.get_mut("context") {
                list.push(Value::Object(entry));
            }
        }
        Some(record.clone())
    }

    /// Store an uploaded file as a `File` observable.
    pub fn add_file(&mut self, file_name: &str, sha256: String, content: Vec<u8>) -> Record {
        let value = format!("FILE:{sha256}");
        let id = match self.find_observable_by_value(&value) {
            Some(id) => id,
            None => {
                let id = self.next_id();
                let mime_type = if std::str::from_utf8(&content).is_ok() {
                    "text/plain"
                } else {
                    "application/octet-stream"
                };
                let record = json!({
                    "id": id,
                    "value": value,
                    "type": "File",
                    "tags": [],
                    "context": [],
                    "filenames": [],
                    "hashes": [{"hash": "sha256", "value": sha256}],
                    "mime_type": mime_type,
                    "human_url": format!("/observable/{id}"),
                    "created": "1970-01-01T00:00:00",
                });
                if let Value::Object(record) = record {
                    self.observables.insert(id.clone(), record);
                }
                self.file_contents.insert(id.clone(), content);
                id
            }
        };

        let Some(record) = self.observables.get_mut(&id) else {
            return Record::new();
        };
        if let Some(Value::Array(names)) = record.get_mut("filenames") {
            let name = json!(file_name);
            if !names.contains(&name) {
                names.push(name);
            }
        }
        record.clone()
    }

    /// File content by observable id or by any stored hash value.
    pub fn file_content(&self, id: Option<&str>, hash: Option<&str>) -> Option<&[u8]> {
        let id = match (id, hash) {
            (Some(id), _) => id.to_string(),
            (None, Some(hash)) => self
                .observables
                .iter()
                .find(|(_, record)| has_hash(record, hash))
                .map(|(id, _)| id.clone())?,
            (None, None) => return None,
        };
        self.file_contents.get(&id).map(Vec::as_slice)
    }

    /// One page of records matching a legacy search filter.
    ///
    /// `page` is 1-based, as on the legacy wire.
    pub fn search<'a>(
        records: &'a BTreeMap<String, Record>,
        filter: &Record,
        regex: bool,
        page: u32,
        range: u32,
    ) -> Vec<&'a Record> {
        let skip = page.saturating_sub(1) as usize * range as usize;
        records
            .values()
            .filter(|record| matches_filter(record, filter, regex))
            .skip(skip)
            .take(range as usize)
            .collect()
    }

    /// Start a run of a registered oneshot job.
    pub fn start_run(&mut self, job_id: &str) -> Option<Record> {
        let (_, script) = self.oneshots.get(job_id)?;
        let run = OneshotRun {
            job_id: job_id.to_string(),
            remaining: script.statuses.iter().copied().collect(),
            results: script.results.clone(),
        };
        let id = self.next_id();
        self.runs.insert(id.clone(), run);
        Some(run_record(&id, job_id, OneshotStatus::Pending, None))
    }

    /// Advance a run by one status request.
    pub fn poll_run(&mut self, run_id: &str) -> Option<Record> {
        let run = self.runs.get_mut(run_id)?;
        let status = if run.remaining.len() > 1 {
            run.remaining.pop_front()
        } else {
            run.remaining.front().copied()
        }
        .unwrap_or(OneshotStatus::Finished);

        let results = (status == OneshotStatus::Finished).then(|| run.results.clone());
        Some(run_record(run_id, &run.job_id, status, results))
    }

    fn find_observable_by_value(&self, value: &str) -> Option<String> {
        self.observables
            .iter()
            .find(|(_, record)| record.get("value").and_then(Value::as_str) == Some(value))
            .map(|(id, _)| id.clone())
    }
}

fn run_record(id: &str, job_id: &str, status: OneshotStatus, results: Option<Value>) -> Record {
    let mut record = Record::new();
    record.insert("_id".into(), json!({"$oid": id}));
    record.insert("analytics".into(), json!(job_id));
    record.insert("status".into(), json!(status.to_string()));
    if let Some(results) = results {
        record.insert("results".into(), results);
    }
    record
}

fn merge_tags(record: &mut Record, tags: &[String]) {
    let Some(Value::Array(existing)) = record.get_mut("tags") else {
        return;
    };
    for tag in tags {
        let known = existing
            .iter()
            .any(|t| t.get("name").and_then(Value::as_str) == Some(tag.as_str()));
        if !known {
            existing.push(json!({"name": tag, "fresh": true}));
        }
    }
}

fn has_hash(record: &Record, hash: &str) -> bool {
    record
        .get("hashes")
        .and_then(Value::as_array)
        .is_some_and(|hashes| {
            hashes
                .iter()
                .any(|h| h.get("value").and_then(Value::as_str) == Some(hash))
        })
}

fn matches_filter(record: &Record, filter: &Record, regex: bool) -> bool {
    filter.iter().all(|(key, wanted)| match key.as_str() {
        "hashes__value" => wanted.as_str().is_some_and(|hash| has_hash(record, hash)),
        "tags" => wanted.as_str().is_some_and(|tag| {
            crate::tag_names(record.get("tags").unwrap_or(&Value::Null))
                .iter()
                .any(|t| t == tag)
        }),
        _ => match (record.get(key), wanted) {
            (Some(Value::String(have)), Value::String(want)) if regex => {
                Regex::new(want).is_ok_and(|re| re.is_match(have))
            }
            (Some(have), want) => have == want,
            (None, _) => false,
        },
    })
}

/// Undo common defanging: `hxxp://`, `hxxps://`, `[.]` and `(.)`.
pub fn refang(raw: &str) -> String {
    let mut value = raw.trim().replace("[.]", ".").replace("(.)", ".");
    for (defanged, scheme) in [("hxxps://", "https://"), ("hxxp://", "http://")] {
        if let Some(rest) = value.strip_prefix(defanged) {
            value = format!("{scheme}{rest}");
        }
    }
    value
}

/// Refang and canonicalize a value the way the legacy server does, and guess
/// its type when none is given.
pub fn normalize(raw: &str, kind: Option<&str>) -> (String, String) {
    let value = refang(raw);

    if let Ok(url) = Url::parse(&value) {
        if matches!(url.scheme(), "http" | "https" | "ftp") && url.host().is_some() {
            return (url.to_string(), kind.unwrap_or("Url").to_string());
        }
    }

    let is_digest = matches!(value.len(), 32 | 40 | 64 | 128)
        && value.chars().all(|c| c.is_ascii_hexdigit());
    let guessed = if value.parse::<IpAddr>().is_ok() {
        "Ip"
    } else if value.contains('@') {
        "Email"
    } else if is_digest {
        "Hash"
    } else if value.contains('.') && !value.contains(char::is_whitespace) && !value.contains('/') {
        "Hostname"
    } else {
        "Text"
    };

    let value = if guessed == "Hostname" {
        value.to_lowercase()
    } else {
        value
    };
    (value, kind.unwrap_or(guessed).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        assert_eq!(normalize("hxxp://test.com/", None).0, "http://test.com/");
        assert_eq!(normalize("hxxps://test[.]com/", None).0, "https://test.com/");
        assert_eq!(normalize("test[.]com", None).0, "test.com");
        assert_eq!(normalize("http://test.com", None).0, "http://test.com/");
    }

    #[test]
    fn test_type_guessing() {
        assert_eq!(normalize("127.0.0.1", None).1, "Ip");
        assert_eq!(normalize("evil.example.com", None).1, "Hostname");
        assert_eq!(normalize("http://evil.example.com", None).1, "Url");
        assert_eq!(normalize("a@b.c", None).1, "Email");
        assert_eq!(normalize(&"a".repeat(64), None).1, "Hash");
        assert_eq!(normalize("just words", None).1, "Text");
        assert_eq!(normalize("asd", Some("Hostname")).1, "Hostname");
    }

    #[test]
    fn test_add_observable_merges_by_value() {
        let mut state = MockState::new();
        let first = state.add_observable("test.com", None, &["a".into()], &Record::new(), "API", None);
        let second = state.add_observable("test[.]com", None, &["b".into()], &Record::new(), "API", None);

        assert_eq!(first["id"], second["id"]);
        assert_eq!(state.observables.len(), 1);
        assert_eq!(crate::tag_names(&second["tags"]), vec!["a", "b"]);
    }

    #[test]
    fn test_search_pages_are_one_based() {
        let mut state = MockState::new();
        for i in 0..5 {
            state.add_observable(&format!("host{i}.com"), None, &[], &Record::new(), "API", None);
        }

        let filter = Record::new();
        assert_eq!(MockState::search(&state.observables, &filter, false, 1, 2).len(), 2);
        assert_eq!(MockState::search(&state.observables, &filter, false, 3, 2).len(), 1);

        let mut filter = Record::new();
        filter.insert("value".into(), json!("host1"));
        assert_eq!(MockState::search(&state.observables, &filter, true, 1, 50).len(), 1);
        assert!(MockState::search(&state.observables, &filter, false, 1, 50).is_empty());
    }

    #[test]
    fn test_regex_filter_uses_patterns() {
        let mut state = MockState::new();
        for value in ["search-one.com", "search-two.net", "http://evil.example.com/payload"] {
            state.add_observable(value, None, &[], &Record::new(), "API", None);
        }
        let hits = |pattern: &str| {
            let mut filter = Record::new();
            filter.insert("value".into(), json!(pattern));
            MockState::search(&state.observables, &filter, true, 1, 50).len()
        };

        assert_eq!(hits(r"^search-.*\.com$"), 1);
        assert_eq!(hits("^http://evil.*payload$"), 1);
        assert_eq!(hits("pay.oad"), 1);
        assert_eq!(hits("^payload"), 0);
        // Invalid patterns match nothing
        assert_eq!(hits("search-("), 0);
    }

    #[test]
    fn test_run_script_repeats_last_status() {
        let job: OneshotJob =
            serde_json::from_value(json!({"id": "j1", "name": "Job"})).unwrap();
        let mut state = MockState::new().with_oneshot(
            job,
            OneshotScript {
                statuses: vec![OneshotStatus::Running, OneshotStatus::Finished],
                results: json!({"ok": true}),
            },
        );

        let run = state.start_run("j1").unwrap();
        let id = run["_id"]["$oid"].as_str().unwrap().to_string();

        assert_eq!(state.poll_run(&id).unwrap()["status"], "running");
        let done = state.poll_run(&id).unwrap();
        assert_eq!(done["status"], "finished");
        assert_eq!(done["results"], json!({"ok": true}));
        assert_eq!(state.poll_run(&id).unwrap()["status"], "finished");
    }
}
