//! Persists operation results and keeps a one-line-per-call operation log.
//!
//! File-system failures are not converted into records: they surface as
//! `RecorderError` and are expected to stop the calling script.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use crate::config::Config;
use crate::error::RecorderError;
use crate::types::{value_text, OperationResult};

/// Writes `{operation}_{timestamp}.json` artifacts and appends to a log file.
#[derive(Debug, Clone)]
pub struct ResponseRecorder {
    responses_dir: PathBuf,
    log_file: PathBuf,
}

impl ResponseRecorder {
    pub fn new(responses_dir: impl Into<PathBuf>, log_file: impl Into<PathBuf>) -> Self {
        Self {
            responses_dir: responses_dir.into(),
            log_file: log_file.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.responses_dir(), config.operations_log())
    }

    pub fn responses_dir(&self) -> &Path {
        &self.responses_dir
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Serialize `result` as pretty JSON to
    /// `{responses_dir}/{operation}_{YYYYmmdd_HHMMSS}.json` and return the path.
    ///
    /// A second save of the same operation within one second overwrites the
    /// first file. `operation` must be a plain file-name fragment: names that
    /// are empty or contain a path separator are rejected.
    pub fn save_response(
        &self,
        result: &OperationResult,
        operation: &str,
    ) -> Result<PathBuf, RecorderError> {
        self.save_response_at(result, operation, Local::now())
    }

    fn save_response_at(
        &self,
        result: &OperationResult,
        operation: &str,
        now: DateTime<Local>,
    ) -> Result<PathBuf, RecorderError> {
        if operation.is_empty() || operation.contains(['/', '\\']) {
            return Err(RecorderError::InvalidOperation(operation.to_string()));
        }
        create_dir(&self.responses_dir)?;

        let path = self
            .responses_dir
            .join(format!("{operation}_{}.json", now.format("%Y%m%d_%H%M%S")));
        let json = serde_json::to_string_pretty(result)?;
        fs::write(&path, json).map_err(|source| RecorderError::Io {
            path: path.clone(),
            source,
        })?;

        info!(operation, path = %path.display(), "response saved");
        Ok(path)
    }

    /// Append one summary line for `operation` to the log file.
    pub fn log_operation(
        &self,
        operation: &str,
        result: &OperationResult,
    ) -> Result<(), RecorderError> {
        if let Some(parent) = self.log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir(parent)?;
        }

        let line = log_line(operation, result, Local::now());
        let io_err = |source| RecorderError::Io {
            path: self.log_file.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .map_err(io_err)?;
        writeln!(file, "{line}").map_err(io_err)
    }

    /// Save the result, then log it. Returns the saved path.
    pub fn record(
        &self,
        operation: &str,
        result: &OperationResult,
    ) -> Result<PathBuf, RecorderError> {
        let path = self.save_response(result, operation)?;
        self.log_operation(operation, result)?;
        Ok(path)
    }
}

/// `[YYYY-mm-dd HH:MM:SS] SUCCESS | operation | summary`
pub fn log_line(operation: &str, result: &OperationResult, now: DateTime<Local>) -> String {
    let status = if result.is_error() { "ERROR" } else { "SUCCESS" };
    format!(
        "[{}] {status} | {operation} | {}",
        now.format("%Y-%m-%d %H:%M:%S"),
        summary(result)
    )
}

/// Short description of a result: the error text, else the account code,
/// else the id, else a generic completion message.
pub fn summary(result: &OperationResult) -> String {
    if let Some(message) = result.error_message() {
        return format!("Error: {message}");
    }
    if let Some(account) = result.get("account") {
        let code = account
            .get("code")
            .map(value_text)
            .unwrap_or_else(|| "none".to_string());
        return format!("Account: {code}");
    }
    if let Some(id) = result.get("id") {
        return format!("ID: {}", value_text(id));
    }
    "Completed successfully".to_string()
}

fn create_dir(dir: &Path) -> Result<(), RecorderError> {
    fs::create_dir_all(dir).map_err(|source| RecorderError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::{json, Value};

    use super::*;

    fn result(value: Value) -> OperationResult {
        OperationResult::success(value.as_object().cloned().unwrap())
    }

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn summary_prefers_account_over_id() {
        let r = result(json!({"id": "sub-1", "account": {"code": "acct-9"}}));
        assert_eq!(summary(&r), "Account: acct-9");
    }

    #[test]
    fn summary_falls_back_to_id() {
        assert_eq!(summary(&result(json!({"id": "sub-1"}))), "ID: sub-1");
        assert_eq!(summary(&result(json!({"id": 42}))), "ID: 42");
    }

    #[test]
    fn summary_without_known_keys() {
        assert_eq!(summary(&result(json!({"object": "list"}))), "Completed successfully");
    }

    #[test]
    fn summary_account_without_code() {
        assert_eq!(summary(&result(json!({"account": {}}))), "Account: none");
    }

    #[test]
    fn log_line_format_for_success() {
        let line = log_line("get_available_plans", &result(json!({"id": "p"})), fixed_time());
        assert_eq!(line, "[2024-03-09 14:05:07] SUCCESS | get_available_plans | ID: p");
    }

    #[test]
    fn log_line_format_for_error() {
        let r = OperationResult::error("HTTP error: 404 Client Error: Not Found for url: http://x/accounts/a");
        let line = log_line("get_account_info", &r, fixed_time());
        assert_eq!(
            line,
            "[2024-03-09 14:05:07] ERROR | get_account_info | Error: HTTP error: 404 Client Error: Not Found for url: http://x/accounts/a"
        );
    }

    #[test]
    fn save_response_at_names_file_by_operation_and_time() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ResponseRecorder::new(dir.path().join("responses"), dir.path().join("ops.log"));
        let path = recorder
            .save_response_at(&result(json!({"id": "x"})), "get_account_info", fixed_time())
            .unwrap();
        assert_eq!(
            path,
            dir.path().join("responses").join("get_account_info_20240309_140507.json")
        );
        assert!(path.exists());
    }

    #[test]
    fn save_response_writes_pretty_utf8_json() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ResponseRecorder::new(dir.path(), dir.path().join("ops.log"));
        let r = result(json!({"address": {"city": "Medellín"}}));
        let path = recorder.save_response(&r, "update_account_address").unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("Medellín"));
        assert!(text.contains("\n  \"address\": {"));
    }

    #[test]
    fn save_response_keeps_key_order_and_big_integers() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ResponseRecorder::new(dir.path(), dir.path().join("ops.log"));
        let r: OperationResult =
            serde_json::from_str(r#"{"zeta":1,"amount":12345678901234567890123,"alpha":2}"#).unwrap();
        let path = recorder.save_response(&r, "get_account_info").unwrap();
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "{\n  \"zeta\": 1,\n  \"amount\": 12345678901234567890123,\n  \"alpha\": 2\n}"
        );
    }

    #[test]
    fn save_response_rejects_operation_with_path_separator() {
        let dir = tempfile::tempdir().unwrap();
        let responses = dir.path().join("responses");
        let recorder = ResponseRecorder::new(&responses, dir.path().join("ops.log"));
        for operation in ["../escaped/op", "nested\\op", ""] {
            let err = recorder.save_response(&result(json!({})), operation).unwrap_err();
            assert!(matches!(err, RecorderError::InvalidOperation(_)), "{operation}");
        }
        assert!(!dir.path().join("escaped").exists());
        assert!(!responses.exists());
    }

    #[test]
    fn log_operation_creates_parent_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("logs").join("operations.log");
        let recorder = ResponseRecorder::new(dir.path().join("responses"), &log);

        recorder.log_operation("first", &result(json!({"id": "1"}))).unwrap();
        recorder.log_operation("second", &OperationResult::error("Request error: boom")).unwrap();

        let text = fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("SUCCESS | first | ID: 1"));
        assert!(lines[1].ends_with("ERROR | second | Error: Request error: boom"));
    }

    #[test]
    fn save_response_propagates_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "file").unwrap();
        let recorder = ResponseRecorder::new(&blocker, dir.path().join("ops.log"));
        let err = recorder.save_response(&result(json!({})), "op").unwrap_err();
        assert!(matches!(err, RecorderError::Io { .. }));
    }
}
