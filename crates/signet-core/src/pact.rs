//! Pact assembly from stub-server recordings.
//!
//! The stub server stores every matched request as a JSON file in a directory
//! named `matches`, at any depth below its data directory. Each recording is
//! turned into one pact interaction.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Number as JsonNumber, Value as JsonValue};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::contract::{Pact, Participant};

pub const MATCHES_DIR: &str = "matches";
pub const PACT_SPECIFICATION_VERSION: &str = "3.0.0";

#[derive(Debug, Error)]
pub enum PactError {
    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse recorded match {}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write pact to {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode pact")]
    Encode(#[from] serde_json::Error),
}

/// Result of [`write_pact`]; both variants are successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    NoInteractions,
}

#[derive(Debug, Deserialize)]
struct RecordedMatch {
    request: RecordedRequest,
    response: RecordedResponse,
}

#[derive(Debug, Deserialize)]
struct RecordedRequest {
    method: String,
    path: String,
    #[serde(default)]
    body: JsonValue,
    #[serde(default)]
    query: JsonValue,
    #[serde(default)]
    headers: JsonValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordedResponse {
    status_code: JsonNumber,
    #[serde(default)]
    headers: JsonValue,
    #[serde(default)]
    body: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRequest {
    pub method: String,
    pub path: String,
    pub body: JsonValue,
    pub query: JsonValue,
    pub headers: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionResponse {
    pub status: JsonNumber,
    pub headers: JsonValue,
    pub body: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub description: String,
    pub request: InteractionRequest,
    pub response: InteractionResponse,
}

impl From<RecordedMatch> for Interaction {
    fn from(recorded: RecordedMatch) -> Self {
        let RecordedMatch { request, response } = recorded;
        let status = response.status_code.as_f64().unwrap_or_default();
        Interaction {
            description: format!("{} {} {:.0}", request.method, request.path, status),
            request: InteractionRequest {
                method: request.method,
                path: request.path,
                body: request.body,
                query: request.query,
                headers: request.headers,
            },
            response: InteractionResponse {
                status: whole_status(response.status_code),
                headers: response.headers,
                body: response.body,
            },
        }
    }
}

/// Recordings may store the status as a float; `200.0` becomes `200`.
fn whole_status(status: JsonNumber) -> JsonNumber {
    match status.as_f64() {
        Some(value)
            if status.is_f64() && value.fract() == 0.0 && (0.0..=f64::from(u16::MAX)).contains(&value) =>
        {
            JsonNumber::from(value as u64)
        }
        _ => status,
    }
}

/// Every file whose parent directory is named `matches`, sorted. A missing root
/// yields nothing; unreadable entries are logged and skipped.
pub fn collect_match_paths(root: &Path) -> Vec<PathBuf> {
    if !root.exists() {
        debug!(root = %root.display(), "no recordings directory");
        return Vec::new();
    }
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry while scanning recordings");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .parent()
                .and_then(Path::file_name)
                .is_some_and(|name| name == MATCHES_DIR)
        })
        .map(|entry| entry.into_path())
        .collect();
    paths.sort();
    paths
}

pub fn build_interaction(match_file: &Path) -> Result<Interaction, PactError> {
    let raw = fs::read(match_file).map_err(|source| PactError::Io {
        path: match_file.to_path_buf(),
        source,
    })?;
    let recorded: RecordedMatch = serde_json::from_slice(&raw).map_err(|source| PactError::Json {
        path: match_file.to_path_buf(),
        source,
    })?;
    Ok(recorded.into())
}

/// Pact skeleton with no interactions yet.
pub fn default_pact(consumer: &str, provider: &str) -> Pact {
    Pact {
        consumer: Participant {
            name: consumer.to_string(),
        },
        interactions: JsonValue::Null,
        metadata: json!({
            "pactSpecification": { "version": PACT_SPECIFICATION_VERSION }
        }),
        provider: json!({ "name": provider }),
    }
}

/// Build a pact from recorded matches. The first unreadable recording aborts.
pub fn assemble_contract(
    match_paths: &[PathBuf],
    consumer: &str,
    provider: &str,
) -> Result<Pact, PactError> {
    let interactions = match_paths
        .iter()
        .map(|path| build_interaction(path))
        .collect::<Result<Vec<_>, _>>()?;
    let mut pact = default_pact(consumer, provider);
    pact.interactions = serde_json::to_value(interactions)?;
    Ok(pact)
}

/// Write `pact` to `dest`, creating parent directories. Nothing is written when
/// the pact has no interactions.
pub fn write_pact(pact: &Pact, dest: &Path) -> Result<WriteOutcome, PactError> {
    let has_interactions = matches!(&pact.interactions, JsonValue::Array(items) if !items.is_empty());
    if !has_interactions {
        return Ok(WriteOutcome::NoInteractions);
    }
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PactError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let doc = serde_json::to_vec_pretty(pact)?;
    fs::write(dest, doc).map_err(|source| PactError::Write {
        path: dest.to_path_buf(),
        source,
    })?;
    debug!(dest = %dest.display(), "pact written");
    Ok(WriteOutcome::Written)
}

/// Scan `stubs_dir` for recordings and write the resulting pact to `dest`.
pub fn create_pact(
    stubs_dir: &Path,
    dest: &Path,
    consumer: &str,
    provider: &str,
) -> Result<WriteOutcome, PactError> {
    let paths = collect_match_paths(stubs_dir);
    debug!(count = paths.len(), "recorded matches found");
    let pact = assemble_contract(&paths, consumer, provider)?;
    write_pact(&pact, dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn recording(method: &str, path: &str, status: JsonValue) -> JsonValue {
        json!({
            "timestamp": "2023-03-01T12:00:00.000Z",
            "request": {
                "method": method,
                "path": path,
                "query": {},
                "headers": {"Accept": "application/json"},
                "body": ""
            },
            "response": {
                "statusCode": status,
                "headers": {"Content-Type": "application/json"},
                "body": "{\"id\":1}"
            }
        })
    }

    fn write_recording(dir: &Path, name: &str, doc: &JsonValue) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, serde_json::to_vec(doc).unwrap()).unwrap();
        path
    }

    #[test]
    fn collects_only_files_directly_under_matches() {
        let root = tempdir().unwrap();
        let stubs = root.path().join("3000").join("stubs");
        write_recording(&stubs.join("0-a").join("matches"), "1.json", &recording("GET", "/foo", json!(200)));
        write_recording(&stubs.join("1-b").join("matches"), "2.json", &recording("GET", "/bar", json!(200)));
        write_recording(&stubs.join("0-a"), "meta.json", &json!({}));
        write_recording(&stubs.join("0-a").join("responses"), "1.json", &json!({}));

        let paths = collect_match_paths(root.path());
        assert_eq!(paths.len(), 2);
        assert!(paths.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(paths.iter().all(|p| p.parent().unwrap().ends_with("matches")));
    }

    #[test]
    fn fractional_status_is_kept() {
        let dir = tempdir().unwrap();
        let path = write_recording(dir.path(), "m.json", &recording("GET", "/foo", json!(200.5)));
        let interaction = build_interaction(&path).unwrap();
        assert_eq!(interaction.response.status.as_f64(), Some(200.5));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_sibling_does_not_hide_matches() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempdir().unwrap();
        let stubs = root.path().join("stubs");
        let kept = write_recording(&stubs.join("0-a").join("matches"), "1.json", &recording("GET", "/foo", json!(200)));
        let locked = stubs.join("1-b");
        write_recording(&locked.join("matches"), "2.json", &recording("GET", "/bar", json!(200)));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let paths = collect_match_paths(root.path());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(paths.contains(&kept));
        assert!(paths.iter().all(|p| p.parent().unwrap().ends_with("matches")));
    }

    #[test]
    fn missing_root_has_no_matches() {
        let root = tempdir().unwrap();
        assert!(collect_match_paths(&root.path().join("absent")).is_empty());
    }

    #[test]
    fn interaction_description_renders_whole_status() {
        let dir = tempdir().unwrap();
        let path = write_recording(dir.path(), "m.json", &recording("POST", "/orders", json!(201.0)));
        let interaction = build_interaction(&path).unwrap();
        assert_eq!(interaction.description, "POST /orders 201");
        assert_eq!(interaction.response.status, JsonNumber::from(201u64));
        assert_eq!(serde_json::to_value(&interaction).unwrap()["response"]["status"], json!(201));
        assert_eq!(interaction.request.method, "POST");
        assert_eq!(interaction.request.headers, json!({"Accept": "application/json"}));
        assert_eq!(interaction.response.body, json!("{\"id\":1}"));
    }

    #[test]
    fn assembles_two_interactions_with_pact_metadata() {
        let root = tempdir().unwrap();
        let matches = root.path().join("stubs").join("0").join("matches");
        write_recording(&matches, "a.json", &recording("GET", "/foo", json!(200)));
        write_recording(&matches, "b.json", &recording("GET", "/foo", json!(200)));

        let paths = collect_match_paths(root.path());
        let pact = assemble_contract(&paths, "frontend", "orders").unwrap();
        let doc = serde_json::to_value(&pact).unwrap();

        let interactions = doc["interactions"].as_array().unwrap();
        assert_eq!(interactions.len(), 2);
        assert!(interactions
            .iter()
            .all(|i| i["description"] == json!("GET /foo 200")));
        assert_eq!(interactions[0]["response"]["status"], json!(200));
        assert_eq!(doc["metadata"]["pactSpecification"]["version"], json!("3.0.0"));
        assert_eq!(doc["consumer"]["name"], json!("frontend"));
        assert_eq!(doc["provider"]["name"], json!("orders"));
    }

    #[test]
    fn malformed_recording_aborts_assembly() {
        let dir = tempdir().unwrap();
        let good = write_recording(dir.path(), "good.json", &recording("GET", "/foo", json!(200)));
        let bad = dir.path().join("bad.json");
        fs::write(&bad, r#"{"request": {}}"#).unwrap();

        let err = assemble_contract(&[good, bad.clone()], "frontend", "orders").unwrap_err();
        assert!(matches!(err, PactError::Json { path, .. } if path == bad));
    }

    #[test]
    fn create_pact_writes_nested_destination() {
        let root = tempdir().unwrap();
        let stubs = root.path().join("mbdata").join("3000").join("stubs");
        write_recording(&stubs.join("0").join("matches"), "a.json", &recording("GET", "/foo", json!(200)));
        let dest = root.path().join("pacts").join("nested").join("frontend-orders.json");

        let outcome = create_pact(&stubs, &dest, "frontend", "orders").unwrap();
        assert_eq!(outcome, WriteOutcome::Written);

        let written: JsonValue = serde_json::from_slice(&fs::read(&dest).unwrap()).unwrap();
        assert_eq!(written["interactions"][0]["description"], json!("GET /foo 200"));
        let reloaded = crate::loader::load_contract(&dest).unwrap();
        assert_eq!(reloaded.consumer.name, "frontend");
    }

    #[test]
    fn no_recordings_means_no_file() {
        let root = tempdir().unwrap();
        let dest = root.path().join("pact.json");
        let outcome = create_pact(&root.path().join("stubs"), &dest, "frontend", "orders").unwrap();
        assert_eq!(outcome, WriteOutcome::NoInteractions);
        assert!(!dest.exists());
    }
}
