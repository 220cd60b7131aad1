use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const CONTRACTS_PATH: &str = "/api/contracts";
pub const SPECS_PATH: &str = "/api/specs";
pub const ENVIRONMENTS_PATH: &str = "/api/environments";
pub const PARTICIPANTS_PATH: &str = "/api/participants";
pub const DEPLOY_GUARD_PATH: &str = "/api/deploy";

const VERSION_EXISTS: &str = "Participant version already exists";
const VERSION_EXISTS_GUIDANCE: &str =
    "A new participant version must be set whenever a contract is published.";

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Status code: {status}\n{message}")]
    Rejected { status: StatusCode, message: String },
    #[error("broker responded with {status} and an unreadable error body")]
    UndecodableError {
        status: StatusCode,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode broker response")]
    Decode(#[source] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployGuardError {
    pub title: String,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployGuardResponse {
    pub status: bool,
    #[serde(default)]
    pub errors: Vec<DeployGuardError>,
}

/// Blocking client for a single broker base URL. One attempt per call, no
/// retries.
#[derive(Debug, Clone)]
pub struct BrokerClient {
    base: String,
    http: Client,
}

impl BrokerClient {
    pub fn new(base_url: &str) -> Result<Self, BrokerError> {
        let http = Client::builder().build().map_err(BrokerError::Client)?;
        Ok(Self {
            base: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// POST a publish body to `path`; the broker answers 201 on success.
    pub fn publish(&self, path: &str, body: Vec<u8>) -> Result<(), BrokerError> {
        let url = self.url(path);
        let resp = send(json_body(self.http.post(&url), body), &url)?;
        if resp.status() == StatusCode::CREATED {
            return Ok(());
        }
        match rejection(resp) {
            BrokerError::Rejected { status, message } if message == VERSION_EXISTS => {
                Err(BrokerError::Rejected {
                    status,
                    message: format!("{message}\n\n{VERSION_EXISTS_GUIDANCE}"),
                })
            }
            other => Err(other),
        }
    }

    pub fn publish_contract(&self, body: Vec<u8>) -> Result<(), BrokerError> {
        self.publish(CONTRACTS_PATH, body)
    }

    pub fn publish_spec(&self, body: Vec<u8>) -> Result<(), BrokerError> {
        self.publish(SPECS_PATH, body)
    }

    pub fn register_environment(&self, body: Vec<u8>) -> Result<(), BrokerError> {
        let url = self.url(ENVIRONMENTS_PATH);
        let resp = send(json_body(self.http.post(&url), body), &url)?;
        expect_status(resp, StatusCode::CREATED).map(drop)
    }

    pub fn update_deployment(&self, body: Vec<u8>) -> Result<(), BrokerError> {
        let url = self.url(PARTICIPANTS_PATH);
        let resp = send(json_body(self.http.patch(&url), body), &url)?;
        expect_status(resp, StatusCode::OK).map(drop)
    }

    /// Raw body of the latest spec published for `provider`.
    pub fn latest_spec(&self, provider: &str) -> Result<Vec<u8>, BrokerError> {
        let url = self.url(SPECS_PATH);
        let req = self.http.get(&url).query(&[("provider", provider)]);
        let resp = expect_status(send(req, &url)?, StatusCode::OK)?;
        let bytes = resp.bytes().map_err(BrokerError::Decode)?;
        Ok(bytes.to_vec())
    }

    pub fn deploy_guard(
        &self,
        name: &str,
        version: &str,
        environment: &str,
    ) -> Result<DeployGuardResponse, BrokerError> {
        let url = self.url(DEPLOY_GUARD_PATH);
        let req = self.http.get(&url).query(&[
            ("providerName", name),
            ("participantVersion", version),
            ("environmentName", environment),
        ]);
        let resp = expect_status(send(req, &url)?, StatusCode::OK)?;
        resp.json().map_err(BrokerError::Decode)
    }

    /// True when the broker considers the deployment safe.
    pub fn check_deploy_guard(
        &self,
        name: &str,
        version: &str,
        environment: &str,
    ) -> Result<bool, BrokerError> {
        Ok(self.deploy_guard(name, version, environment)?.status)
    }
}

fn json_body(req: RequestBuilder, body: Vec<u8>) -> RequestBuilder {
    req.header(CONTENT_TYPE, "application/json").body(body)
}

fn send(req: RequestBuilder, url: &str) -> Result<Response, BrokerError> {
    debug!(%url, "broker request");
    let resp = req.send().map_err(|source| BrokerError::Transport {
        url: url.to_string(),
        source,
    })?;
    debug!(%url, status = %resp.status(), "broker response");
    Ok(resp)
}

fn expect_status(resp: Response, expected: StatusCode) -> Result<Response, BrokerError> {
    if resp.status() == expected {
        Ok(resp)
    } else {
        Err(rejection(resp))
    }
}

fn rejection(resp: Response) -> BrokerError {
    let status = resp.status();
    match resp.json::<ErrorBody>() {
        Ok(body) => BrokerError::Rejected {
            status,
            message: body.error,
        },
        Err(source) => BrokerError::UndecodableError { status, source },
    }
}
