use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use k8s_openapi::api::core::v1::Secret;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::err::OsbError;
use super::types::*;
use crate::apis::{
    AuthMethod, CommonServiceBrokerSpec, UserInfo, BASIC_AUTH_PASSWORD_KEY, BASIC_AUTH_USERNAME_KEY,
    BEARER_TOKEN_KEY,
};

pub const API_VERSION_HEADER: &str = "X-Broker-API-Version";
pub const ORIGINATING_IDENTITY_HEADER: &str = "X-Broker-API-Originating-Identity";
pub const LATEST_API_VERSION: &str = "2.13";
pub const PLATFORM_KUBERNETES: &str = "kubernetes";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, PartialEq, Eq)]
pub enum AuthConfig {
    Basic { username: String, password: String },
    Bearer { token: String },
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthConfig::Basic { username, .. } => write!(f, "Basic {{ username: {username:?} }}"),
            AuthConfig::Bearer { .. } => f.write_str("Bearer"),
        }
    }
}

impl AuthConfig {
    /// Reads broker credentials for `method` out of a secret's data.
    pub fn from_secret(method: AuthMethod, secret: &Secret) -> Result<Self, OsbError> {
        let data = secret.data.clone().unwrap_or_default();
        let field = |key: &str| -> Result<String, OsbError> {
            let value = data.get(key).ok_or_else(|| {
                OsbError::Config(format!("auth secret didn't contain {key}"))
            })?;
            String::from_utf8(value.0.clone())
                .map_err(|_| OsbError::Config(format!("auth secret {key} is not valid UTF-8")))
        };
        Ok(match method {
            AuthMethod::Basic => AuthConfig::Basic {
                username: field(BASIC_AUTH_USERNAME_KEY)?,
                password: field(BASIC_AUTH_PASSWORD_KEY)?,
            },
            AuthMethod::Bearer => AuthConfig::Bearer {
                token: field(BEARER_TOKEN_KEY)?,
            },
        })
    }
}

/// How to reach one broker.
#[derive(Debug, Clone)]
pub struct ClientConfiguration {
    pub name: String,
    pub url: String,
    pub api_version: String,
    pub auth_config: Option<AuthConfig>,
    /// PEM encoded CA certificates trusted for the broker's serving certificate.
    pub ca_bundle: Option<Vec<u8>>,
    pub insecure: bool,
    pub timeout: Duration,
}

impl ClientConfiguration {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            api_version: LATEST_API_VERSION.to_string(),
            auth_config: None,
            ca_bundle: None,
            insecure: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// The configuration for a broker resource; the CA bundle on the spec is base64 encoded.
    pub fn for_broker(
        name: &str,
        spec: &CommonServiceBrokerSpec,
        auth_config: Option<AuthConfig>,
    ) -> Result<Self, OsbError> {
        let ca_bundle = spec
            .ca_bundle
            .as_deref()
            .filter(|b| !b.is_empty())
            .map(|b| STANDARD.decode(b))
            .transpose()
            .map_err(|e| OsbError::Config(format!("caBundle is not valid base64: {e}")))?;
        Ok(Self {
            auth_config,
            ca_bundle,
            insecure: spec.insecure_skip_tls_verify,
            ..Self::new(name, &spec.url)
        })
    }
}

impl OriginatingIdentity {
    /// The identity of a Kubernetes user, as sent by the catalog.
    pub fn kubernetes(user: &UserInfo) -> Result<Self, OsbError> {
        Ok(Self {
            platform: PLATFORM_KUBERNETES.to_string(),
            value: serde_json::to_string(user)?,
        })
    }

    /// `<platform> <base64 value>`
    pub fn header_value(&self) -> String {
        format!("{} {}", self.platform, STANDARD.encode(&self.value))
    }
}

/// A client for one Open Service Broker API endpoint.
#[derive(Debug, Clone)]
pub struct Client {
    name: String,
    url: String,
    api_version: String,
    auth_config: Option<AuthConfig>,
    http: reqwest::Client,
}

impl Client {
    pub fn new(config: ClientConfiguration) -> Result<Self, OsbError> {
        let mut builder = reqwest::Client::builder().timeout(config.timeout);
        if config.insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(pem) = &config.ca_bundle {
            for cert in reqwest::Certificate::from_pem_bundle(pem)? {
                builder = builder.add_root_certificate(cert);
            }
        }
        Ok(Self {
            name: config.name,
            url: config.url.trim_end_matches('/').to_string(),
            api_version: config.api_version,
            auth_config: config.auth_config,
            http: builder.build()?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        identity: Option<&OriginatingIdentity>,
    ) -> RequestBuilder {
        let mut req = self
            .http
            .request(method, format!("{}{path}", self.url))
            .header(API_VERSION_HEADER, &self.api_version);
        req = match &self.auth_config {
            Some(AuthConfig::Basic { username, password }) => req.basic_auth(username, Some(password)),
            Some(AuthConfig::Bearer { token }) => req.bearer_auth(token),
            None => req,
        };
        if let Some(identity) = identity {
            req = req.header(ORIGINATING_IDENTITY_HEADER, identity.header_value());
        }
        req
    }

    async fn send(&self, req: RequestBuilder) -> Result<(StatusCode, Vec<u8>), OsbError> {
        let response = req.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        debug!(broker = %self.name, %status, "broker responded");
        Ok((status, body))
    }

    #[instrument(skip(self), fields(broker = %self.name))]
    pub async fn get_catalog(&self) -> Result<CatalogResponse, OsbError> {
        let (status, body) = self.send(self.request(Method::GET, "/v2/catalog", None)).await?;
        match status {
            StatusCode::OK => decode(&body),
            _ => Err(OsbError::from_status(status, &body)),
        }
    }

    #[instrument(skip(self, r), fields(broker = %self.name, instance = %r.instance_id))]
    pub async fn provision_instance(&self, r: &ProvisionRequest) -> Result<ProvisionResponse, OsbError> {
        let req = self
            .request(Method::PUT, &instance_path(&r.instance_id), r.originating_identity.as_ref())
            .query(&accepts_incomplete(r.accepts_incomplete))
            .json(r);
        let (status, body) = self.send(req).await?;
        match status {
            StatusCode::OK | StatusCode::CREATED => decode(&body),
            StatusCode::ACCEPTED => Ok(ProvisionResponse {
                is_async: true,
                ..decode(&body)?
            }),
            _ => Err(OsbError::from_status(status, &body)),
        }
    }

    #[instrument(skip(self, r), fields(broker = %self.name, instance = %r.instance_id))]
    pub async fn update_instance(&self, r: &UpdateInstanceRequest) -> Result<UpdateInstanceResponse, OsbError> {
        let req = self
            .request(Method::PATCH, &instance_path(&r.instance_id), r.originating_identity.as_ref())
            .query(&accepts_incomplete(r.accepts_incomplete))
            .json(r);
        let (status, body) = self.send(req).await?;
        match status {
            StatusCode::OK => Ok(UpdateInstanceResponse::default()),
            StatusCode::ACCEPTED => Ok(UpdateInstanceResponse {
                is_async: true,
                ..decode(&body)?
            }),
            _ => Err(OsbError::from_status(status, &body)),
        }
    }

    /// A broker answering 410 no longer knows the instance, which counts as deprovisioned.
    #[instrument(skip(self, r), fields(broker = %self.name, instance = %r.instance_id))]
    pub async fn deprovision_instance(&self, r: &DeprovisionRequest) -> Result<DeprovisionResponse, OsbError> {
        let mut query = vec![("service_id", r.service_id.as_str()), ("plan_id", r.plan_id.as_str())];
        query.extend(accepts_incomplete(r.accepts_incomplete));
        let req = self
            .request(Method::DELETE, &instance_path(&r.instance_id), r.originating_identity.as_ref())
            .query(&query);
        let (status, body) = self.send(req).await?;
        match status {
            StatusCode::OK | StatusCode::GONE => Ok(DeprovisionResponse::default()),
            StatusCode::ACCEPTED => Ok(DeprovisionResponse {
                is_async: true,
                ..decode(&body)?
            }),
            _ => Err(OsbError::from_status(status, &body)),
        }
    }

    #[instrument(skip(self, r), fields(broker = %self.name, instance = %r.instance_id))]
    pub async fn poll_last_instance_operation(
        &self,
        r: &LastOperationRequest,
    ) -> Result<LastOperationResponse, OsbError> {
        let query: Vec<(&str, &str)> = [
            ("operation", r.operation_key.as_deref()),
            ("service_id", r.service_id.as_deref()),
            ("plan_id", r.plan_id.as_deref()),
        ]
        .into_iter()
        .filter_map(|(k, v)| Some((k, v?)))
        .collect();
        let path = format!("{}/last_operation", instance_path(&r.instance_id));
        let req = self
            .request(Method::GET, &path, r.originating_identity.as_ref())
            .query(&query);
        let (status, body) = self.send(req).await?;
        match status {
            StatusCode::OK => decode(&body),
            _ => Err(OsbError::from_status(status, &body)),
        }
    }

    #[instrument(skip(self, r), fields(broker = %self.name, instance = %r.instance_id, binding = %r.binding_id))]
    pub async fn bind(&self, r: &BindRequest) -> Result<BindResponse, OsbError> {
        let req = self
            .request(
                Method::PUT,
                &binding_path(&r.instance_id, &r.binding_id),
                r.originating_identity.as_ref(),
            )
            .query(&accepts_incomplete(r.accepts_incomplete))
            .json(r);
        let (status, body) = self.send(req).await?;
        match status {
            StatusCode::OK | StatusCode::CREATED => decode(&body),
            StatusCode::ACCEPTED => Ok(BindResponse {
                is_async: true,
                ..decode(&body)?
            }),
            _ => Err(OsbError::from_status(status, &body)),
        }
    }

    /// A broker answering 410 no longer knows the binding, which counts as unbound.
    #[instrument(skip(self, r), fields(broker = %self.name, instance = %r.instance_id, binding = %r.binding_id))]
    pub async fn unbind(&self, r: &UnbindRequest) -> Result<UnbindResponse, OsbError> {
        let mut query = vec![("service_id", r.service_id.as_str()), ("plan_id", r.plan_id.as_str())];
        query.extend(accepts_incomplete(r.accepts_incomplete));
        let req = self
            .request(
                Method::DELETE,
                &binding_path(&r.instance_id, &r.binding_id),
                r.originating_identity.as_ref(),
            )
            .query(&query);
        let (status, body) = self.send(req).await?;
        match status {
            StatusCode::OK | StatusCode::GONE => Ok(UnbindResponse::default()),
            StatusCode::ACCEPTED => Ok(UnbindResponse {
                is_async: true,
                ..decode(&body)?
            }),
            _ => Err(OsbError::from_status(status, &body)),
        }
    }

    #[instrument(skip(self, r), fields(broker = %self.name, instance = %r.instance_id, binding = %r.binding_id))]
    pub async fn get_binding(&self, r: &GetBindingRequest) -> Result<GetBindingResponse, OsbError> {
        let req = self.request(Method::GET, &binding_path(&r.instance_id, &r.binding_id), None);
        let (status, body) = self.send(req).await?;
        match status {
            StatusCode::OK => decode(&body),
            _ => Err(OsbError::from_status(status, &body)),
        }
    }
}

fn instance_path(instance_id: &str) -> String {
    format!("/v2/service_instances/{instance_id}")
}

fn binding_path(instance_id: &str, binding_id: &str) -> String {
    format!("{}/service_bindings/{binding_id}", instance_path(instance_id))
}

fn accepts_incomplete(accepts: bool) -> Vec<(&'static str, &'static str)> {
    if accepts {
        vec![("accepts_incomplete", "true")]
    } else {
        vec![]
    }
}

/// Decodes a response body; brokers may answer with an empty body instead of `{}`.
fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, OsbError> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        body
    };
    Ok(serde_json::from_slice(body)?)
}
