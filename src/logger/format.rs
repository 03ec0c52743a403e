//! Access log format module
//!
//! Formats:
//! - `combined` (Apache/Nginx combined format)
//! - `common` (Common Log Format - CLF)
//! - `json` (one JSON object per line)
//! - anything else is a pattern with `$variable` substitution

use chrono::{DateTime, Local};
use serde_json::json;

const CLF_TIME: &str = "%d/%b/%Y:%H:%M:%S %z";

/// One served request, filled in as the response is produced
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    pub time: DateTime<Local>,
    pub method: String,
    pub path: String,
    /// Query string without the leading `?`
    pub query: Option<String>,
    /// `1.0`, `1.1` or `2`
    pub http_version: String,
    pub status: u16,
    pub body_bytes: usize,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    /// Validator presented by the client
    pub if_none_match: Option<String>,
    /// Validator sent back with the response
    pub etag: Option<String>,
    pub request_time_us: u64,
}

impl AccessLogEntry {
    /// Start an entry stamped with the current local time
    pub fn new(remote_addr: String, method: String, path: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            path,
            query: None,
            http_version: "1.1".to_string(),
            status: 200,
            body_bytes: 0,
            referer: None,
            user_agent: None,
            if_none_match: None,
            etag: None,
            request_time_us: 0,
        }
    }

    pub fn format(&self, format: &str) -> String {
        match format {
            "combined" => format!(
                "{} \"{}\" \"{}\"",
                self.format_common(),
                dash(self.referer.as_deref()),
                dash(self.user_agent.as_deref()),
            ),
            "common" => self.format_common(),
            "json" => self.format_json(),
            pattern => self.format_pattern(pattern),
        }
    }

    fn request_uri(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    fn request_line(&self) -> String {
        format!(
            "{} {} HTTP/{}",
            self.method,
            self.request_uri(),
            self.http_version
        )
    }

    #[allow(clippy::cast_precision_loss)]
    fn request_time_secs(&self) -> f64 {
        self.request_time_us as f64 / 1_000_000.0
    }

    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent`
    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time.format(CLF_TIME),
            self.request_line(),
            self.status,
            self.body_bytes,
        )
    }

    fn format_json(&self) -> String {
        json!({
            "remote_addr": self.remote_addr,
            "time": self.time.to_rfc3339(),
            "method": self.method,
            "path": self.path,
            "query": self.query,
            "http_version": self.http_version,
            "status": self.status,
            "body_bytes": self.body_bytes,
            "referer": self.referer,
            "user_agent": self.user_agent,
            "if_none_match": self.if_none_match,
            "etag": self.etag,
            "request_time_us": self.request_time_us,
        })
        .to_string()
    }

    /// Expand `$name` variables in `pattern`
    ///
    /// Variables are matched on the longest run of `[a-z0-9_]`, so
    /// `$request_time` never expands as `$request` followed by `_time`.
    /// Unknown variables are left as written.
    fn format_pattern(&self, pattern: &str) -> String {
        let mut out = String::with_capacity(pattern.len());
        let mut rest = pattern;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            let len = after
                .find(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'))
                .unwrap_or(after.len());
            let name = &after[..len];

            match self.variable(name) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push('$');
                    out.push_str(name);
                }
            }
            rest = &after[len..];
        }
        out.push_str(rest);
        out
    }

    fn variable(&self, name: &str) -> Option<String> {
        let value = match name {
            "remote_addr" => self.remote_addr.clone(),
            "time_local" => self.time.format(CLF_TIME).to_string(),
            "time_iso8601" => self.time.to_rfc3339(),
            "request" => self.request_line(),
            "request_method" => self.method.clone(),
            "request_uri" => self.request_uri(),
            "request_time" => format!("{:.3}", self.request_time_secs()),
            "status" => self.status.to_string(),
            "body_bytes_sent" => self.body_bytes.to_string(),
            "http_referer" => dash(self.referer.as_deref()).to_string(),
            "http_user_agent" => dash(self.user_agent.as_deref()).to_string(),
            "http_if_none_match" => dash(self.if_none_match.as_deref()).to_string(),
            "sent_http_etag" => dash(self.etag.as_deref()).to_string(),
            _ => return None,
        };
        Some(value)
    }
}

fn dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revalidation_entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "192.168.1.1".to_string(),
            "GET".to_string(),
            "/hello".to_string(),
        );
        entry.query = Some("v=2".to_string());
        entry.status = 304;
        entry.referer = Some("https://example.com".to_string());
        entry.user_agent = Some("curl/8.5.0".to_string());
        entry.if_none_match = Some("W/\"HSKScZKNP54rsDdb1s5dtsbTSNk=\"".to_string());
        entry.etag = Some("W/\"HSKScZKNP54rsDdb1s5dtsbTSNk=\"".to_string());
        entry.request_time_us = 12_000;
        entry
    }

    #[test]
    fn test_format_combined() {
        let log = revalidation_entry().format("combined");
        assert!(log.starts_with("192.168.1.1 - - ["));
        assert!(log.contains("\"GET /hello?v=2 HTTP/1.1\" 304 0"));
        assert!(log.ends_with("\"https://example.com\" \"curl/8.5.0\""));
    }

    #[test]
    fn test_format_common() {
        let log = revalidation_entry().format("common");
        assert!(log.contains("\"GET /hello?v=2 HTTP/1.1\" 304 0"));
        assert!(!log.contains("curl"));
    }

    #[test]
    fn test_format_json() {
        let log = revalidation_entry().format("json");
        let value: serde_json::Value = serde_json::from_str(&log).unwrap();
        assert_eq!(value["status"], 304);
        assert_eq!(value["path"], "/hello");
        assert_eq!(value["etag"], "W/\"HSKScZKNP54rsDdb1s5dtsbTSNk=\"");
        assert!(value["query"].is_string());

        let mut bare = revalidation_entry();
        bare.query = None;
        let value: serde_json::Value = serde_json::from_str(&bare.format("json")).unwrap();
        assert!(value["query"].is_null());
    }

    #[test]
    fn test_format_pattern() {
        let log = revalidation_entry().format("$status $request_time [$request] $sent_http_etag");
        assert_eq!(
            log,
            "304 0.012 [GET /hello?v=2 HTTP/1.1] W/\"HSKScZKNP54rsDdb1s5dtsbTSNk=\""
        );
    }

    #[test]
    fn test_format_pattern_unknown_and_missing() {
        let mut entry = revalidation_entry();
        entry.etag = None;
        assert_eq!(entry.format("$nope|$sent_http_etag|$"), "$nope|-|$");
    }
}
