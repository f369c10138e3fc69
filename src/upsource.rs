use std::time::Duration;

use reqwest::Client;
use reqwest::StatusCode;
use serde_json::Map;
use serde_json::Value;
use tokio::time::sleep;

use crate::error::Error;
use crate::options::Options;

pub const RETRY_ATTEMPTS: u32 = 3;
pub const RETRY_INTERVAL: Duration = Duration::from_secs(1);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ParamSpec {
    pub name: &'static str,
    pub default: Option<ParamDefault>,
}

#[derive(Clone, Copy)]
pub enum ParamDefault {
    Int(i64),
    Bool(bool),
    Str(&'static str),
}

impl ParamDefault {
    fn to_value(self) -> Value {
        match self {
            ParamDefault::Int(value) => Value::from(value),
            ParamDefault::Bool(value) => Value::from(value),
            ParamDefault::Str(value) => Value::from(value),
        }
    }
}

const fn required(name: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        default: None,
    }
}

const fn int(name: &'static str, value: i64) -> ParamSpec {
    ParamSpec {
        name,
        default: Some(ParamDefault::Int(value)),
    }
}

const fn boolean(name: &'static str, value: bool) -> ParamSpec {
    ParamSpec {
        name,
        default: Some(ParamDefault::Bool(value)),
    }
}

const fn text(name: &'static str, value: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        default: Some(ParamDefault::Str(value)),
    }
}

// one row per remote operation, adding an operation is adding a row
// https://<endpoint>/~api_doc/reference/Service.html#messages.UpsourceRPC
pub const OPERATIONS: &[(&str, &[ParamSpec])] = &[
    ("getProjectInfo", &[required("projectId")]),
    ("getCodeReviewPatterns", &[]),
    (
        "getRevisionsList",
        &[
            required("projectId"),
            required("limit"),
            int("skip", 0),
            boolean("requestGraph", false),
        ],
    ),
    (
        "getRevisionsListFiltered",
        &[
            required("projectId"),
            required("query"),
            required("limit"),
            int("skip", 0),
            boolean("requestGraph", false),
        ],
    ),
    (
        "getRevisionInfo",
        &[required("projectId"), required("revisionId")],
    ),
    ("getBranchInfo", &[required("projectId"), required("branch")]),
    ("getBranchGraph", &[required("projectId"), required("branch")]),
    (
        "getBranches",
        &[
            required("projectId"),
            required("query"),
            required("limit"),
            text("sortBy", "updated"),
        ],
    ),
    (
        "findCommits",
        &[
            required("commits"),
            boolean("requestChanges", false),
            int("limit", 10),
        ],
    ),
    (
        "getReviews",
        &[
            required("limit"),
            text("query", "*"),
            text("sortBy", "updated"),
            required("projectId"),
            int("skip", 0),
        ],
    ),
];

fn operation_params(operation: &str) -> Result<&'static [ParamSpec], Error> {
    OPERATIONS
        .iter()
        .find(|(name, _)| *name == operation)
        .map(|(_, params)| *params)
        .ok_or_else(|| Error::UnknownOperation(operation.to_owned()))
}

/// fill declared defaults and reject parameters the table does not know
pub fn build_params(
    operation: &str,
    supplied: &Map<String, Value>,
) -> Result<Map<String, Value>, Error> {
    let specs = operation_params(operation)?;
    for key in supplied.keys() {
        if !specs.iter().any(|spec| spec.name == key.as_str()) {
            return Err(Error::UnexpectedParameter {
                operation: operation.to_owned(),
                parameter: key.clone(),
            });
        }
    }
    let mut params = Map::new();
    for spec in specs {
        match supplied.get(spec.name) {
            Some(value) => {
                params.insert(spec.name.to_owned(), value.clone());
            }
            None => match spec.default {
                Some(default) => {
                    params.insert(spec.name.to_owned(), default.to_value());
                }
                None => {
                    return Err(Error::MissingParameter {
                        operation: operation.to_owned(),
                        parameter: spec.name.to_owned(),
                    });
                }
            },
        }
    }
    Ok(params)
}

pub fn review_url(endpoint: &str, project: &str, review_id: &str) -> String {
    format!("{endpoint}/{project}/review/{review_id}")
}

pub struct UpsourceClient {
    http: Client,
    endpoint: String,
    username: String,
    password: String,
    retry_attempts: u32,
    retry_interval: Duration,
}

impl UpsourceClient {
    pub fn new(options: &Options) -> Result<UpsourceClient, Error> {
        if !options.upsource_verify_ssl {
            log::warn!("tls certificate verification is disabled");
        }
        let http = Client::builder()
            .danger_accept_invalid_certs(!options.upsource_verify_ssl)
            // a remote that accepts but never answers must fail the attempt
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(UpsourceClient {
            http,
            endpoint: options.upsource_endpoint.trim_end_matches('/').to_owned(),
            username: options.upsource_username.clone(),
            password: options.upsource_password.clone(),
            retry_attempts: RETRY_ATTEMPTS,
            retry_interval: RETRY_INTERVAL,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// authenticated rpc round trip with a fixed retry budget
    pub async fn call(
        &self,
        operation: &str,
        supplied: &Map<String, Value>,
    ) -> Result<Value, Error> {
        let params = build_params(operation, supplied)?;
        let url = format!("{endpoint}/~rpc/{operation}", endpoint = self.endpoint);
        let body = Value::Object(params);
        log::info!(
            "rpc request '{operation}':\n{}",
            serde_json::to_string_pretty(&body)?
        );
        let mut last: Option<Error> = None;
        for attempt in 1..=self.retry_attempts {
            match self.call_once(operation, &url, &body).await {
                Ok(result) => {
                    log::info!(
                        "rpc response '{operation}':\n{}",
                        serde_json::to_string_pretty(&result)?
                    );
                    return Ok(result);
                }
                Err(e) => {
                    log::warn!(
                        "rpc '{operation}' failed, attempt {attempt}/{attempts}, request: {body}, error: {e}",
                        attempts = self.retry_attempts
                    );
                    last = Some(e);
                }
            }
            if attempt < self.retry_attempts {
                sleep(self.retry_interval).await;
            }
        }
        let detail = match last {
            Some(e) => e.to_string(),
            None => "no attempts were made".to_owned(),
        };
        Err(Error::RpcExhausted {
            operation: operation.to_owned(),
            attempts: self.retry_attempts,
            detail,
        })
    }

    async fn call_once(&self, operation: &str, url: &str, body: &Value) -> Result<Value, Error> {
        let response = self
            .http
            .post(url)
            .basic_auth(&self.username, Some(&self.password))
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::RpcStatus {
                operation: operation.to_owned(),
                status: status.as_u16(),
            });
        }
        let payload: Value = response.json().await?;
        match payload.get("result") {
            Some(result) => Ok(result.clone()),
            None => Err(Error::RpcMissingResult {
                operation: operation.to_owned(),
            }),
        }
    }
}
