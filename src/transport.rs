//! Transport boundary.
//!
//! A transport executes one serialized request and hands back the raw reply.
//! The XML family returns raw text for the three-tier decoder; the JSON
//! family returns an already-decoded value that is passed through. Each call
//! is one blocking round-trip — timeouts and retries are transport policy,
//! never the toolkit's.

use anyhow::{bail, Context, Result};
use serde_json::Value;

/// Executes a serialized XMLSERVICE request.
pub trait Transport {
    /// One blocking round-trip: ship the request, return raw reply text.
    fn call(&self, request_xml: &str) -> Result<String>;

    /// One line describing the endpoint, for trace output. Never include
    /// credentials.
    fn describe(&self) -> String {
        "transport".to_string()
    }
}

/// Default response buffer size requested from the gateway, in bytes.
const DEFAULT_XMLOUT_SIZE: usize = 512_000;

/// XMLSERVICE over HTTP/REST: one form-encoded POST per call.
pub struct HttpTransport {
    url: String,
    user: String,
    password: String,
    database: String,
    ipc: String,
    ctl: String,
    size: usize,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(
        url: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        HttpTransport {
            url: url.into(),
            user: user.into(),
            password: password.into(),
            database: "*LOCAL".to_string(),
            ipc: "*NA".to_string(),
            ctl: "*here *cdata".to_string(),
            size: DEFAULT_XMLOUT_SIZE,
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// IPC key routing the call to a persistent gateway job.
    pub fn ipc(mut self, ipc: impl Into<String>) -> Self {
        self.ipc = ipc.into();
        self
    }

    pub fn ctl(mut self, ctl: impl Into<String>) -> Self {
        self.ctl = ctl.into();
        self
    }

    /// Response buffer size the gateway is asked to allocate.
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }
}

impl Transport for HttpTransport {
    fn call(&self, request_xml: &str) -> Result<String> {
        let size = self.size.to_string();
        let form = [
            ("db2", self.database.as_str()),
            ("uid", self.user.as_str()),
            ("pwd", self.password.as_str()),
            ("ipc", self.ipc.as_str()),
            ("ctl", self.ctl.as_str()),
            ("xmlin", request_xml),
            ("xmlout", size.as_str()),
        ];
        let response = self
            .client
            .post(&self.url)
            .form(&form)
            .send()
            .with_context(|| format!("POST {}", self.url))?;
        if !response.status().is_success() {
            bail!("gateway returned {} for {}", response.status(), self.url);
        }
        response.text().context("reading gateway reply")
    }

    fn describe(&self) -> String {
        format!(
            "http {} db2={} uid={} ipc={} ctl={}",
            self.url, self.database, self.user, self.ipc, self.ctl
        )
    }
}

/// Executes a DB2JSON payload and returns the gateway's decoded reply.
pub trait JsonTransport {
    fn execute(&self, payload: &Value) -> Result<Value>;

    fn describe(&self) -> String {
        "json transport".to_string()
    }
}

/// DB2JSON over HTTP: JSON POST with basic auth, JSON reply passed through.
pub struct Db2JsonTransport {
    url: String,
    user: String,
    password: String,
    client: reqwest::blocking::Client,
}

impl Db2JsonTransport {
    pub fn new(
        url: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Db2JsonTransport {
            url: url.into(),
            user: user.into(),
            password: password.into(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl JsonTransport for Db2JsonTransport {
    fn execute(&self, payload: &Value) -> Result<Value> {
        let response = self
            .client
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.password))
            .json(payload)
            .send()
            .with_context(|| format!("POST {}", self.url))?;
        if !response.status().is_success() {
            bail!("gateway returned {} for {}", response.status(), self.url);
        }
        response.json().context("decoding gateway reply")
    }

    fn describe(&self) -> String {
        format!("db2json {} uid={}", self.url, self.user)
    }
}
