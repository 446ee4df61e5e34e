use ratesweep_common::{ConfigError, Result, ServiceEndpoints, WorkloadError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// URL scheme for the site-root probes, which exist in both flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// PEM files of the client certificate presented to the access-control server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoints: ServiceEndpoints,
    /// Use `https` for the API calls. Disabled only against local test servers.
    pub tls: bool,
    pub identity: Option<IdentityPaths>,
}

#[derive(Debug, Serialize)]
struct AuthorizationRequest<'a> {
    objperm: &'a str,
    objtype: &'a str,
    objuid: String,
}

#[derive(Debug, Deserialize)]
struct AuthorizationList {
    authorizations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Authorization {
    token: String,
}

#[derive(Debug, Deserialize)]
struct SecretVersion {
    data: String,
}

/// Client for the Tutamen access-control (ACS) and storage (SS) servers.
pub struct Client {
    pub config: ClientConfig,
    http_client: reqwest::Client,
    /// Present only when an identity was configured.
    cert_client: Option<reqwest::Client>,
}

impl Client {
    /// Create a new client. Loads the client certificate when one is configured.
    pub fn new(config: ClientConfig) -> std::result::Result<Self, ConfigError> {
        let cert_client = match &config.identity {
            None => None,
            Some(paths) => Some(build_cert_client(paths)?),
        };
        Ok(Self {
            config,
            http_client: reqwest::Client::new(),
            cert_client,
        })
    }

    fn scheme(&self) -> &'static str {
        if self.config.tls {
            Scheme::Https.as_str()
        } else {
            Scheme::Http.as_str()
        }
    }

    /// `<scheme>://<acs>/api/v1/`
    pub fn acs_api_url(&self) -> String {
        format!("{}://{}/api/v1/", self.scheme(), self.config.endpoints.acs_addr)
    }

    /// `<scheme>://<ss>/api/v1/`
    pub fn ss_api_url(&self) -> String {
        format!("{}://{}/api/v1/", self.scheme(), self.config.endpoints.ss_addr)
    }

    pub fn acs_site_url(&self, scheme: Scheme) -> String {
        format!("{}://{}/", scheme.as_str(), self.config.endpoints.acs_addr)
    }

    pub fn ss_site_url(&self, scheme: Scheme) -> String {
        format!("{}://{}/", scheme.as_str(), self.config.endpoints.ss_addr)
    }

    pub fn authorizations_url(&self) -> String {
        format!("{}authorizations/", self.acs_api_url())
    }

    pub fn authorization_url(&self, uid: &str) -> String {
        format!("{}authorizations/{}/", self.acs_api_url(), uid)
    }

    pub fn secret_url(&self, col_uid: &Uuid, sec_uid: &Uuid) -> String {
        format!(
            "{}collections/{}/secrets/{}/versions/latest/",
            self.ss_api_url(),
            col_uid,
            sec_uid
        )
    }

    fn cert_client(&self) -> Result<&reqwest::Client> {
        self.cert_client.as_ref().ok_or(WorkloadError::MissingIdentity)
    }

    /// Request an authorization for `obj_perm` on `obj_type` (optionally a specific object).
    /// Returns the uid of the new authorization.
    pub async fn create_authorization(
        &self,
        obj_perm: &str,
        obj_type: &str,
        obj_uid: Option<&Uuid>,
    ) -> Result<String> {
        let body = AuthorizationRequest {
            objperm: obj_perm,
            objtype: obj_type,
            objuid: obj_uid.map(|u| u.to_string()).unwrap_or_default(),
        };

        let response = self
            .cert_client()?
            .post(self.authorizations_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| WorkloadError::NetworkError(e.to_string()))?;
        let response = check_status(response)?;

        let list: AuthorizationList = parse_json(response).await?;
        list.authorizations
            .into_iter()
            .next()
            .ok_or_else(|| WorkloadError::MalformedResponse("empty authorizations list".to_string()))
    }

    /// Fetch the token granted by a previously created authorization.
    pub async fn authorization_token(&self, uid: &str) -> Result<String> {
        let response = self
            .cert_client()?
            .get(self.authorization_url(uid))
            .send()
            .await
            .map_err(|e| WorkloadError::NetworkError(e.to_string()))?;
        let response = check_status(response)?;

        let authz: Authorization = parse_json(response).await?;
        Ok(authz.token)
    }

    /// Read the latest version of a secret using an authorization token.
    pub async fn secret_data(&self, token: &str, col_uid: &Uuid, sec_uid: &Uuid) -> Result<String> {
        let response = self
            .http_client
            .get(self.secret_url(col_uid, sec_uid))
            .header("tutamen-tokens", token)
            .send()
            .await
            .map_err(|e| WorkloadError::NetworkError(e.to_string()))?;
        let response = check_status(response)?;

        let secret: SecretVersion = parse_json(response).await?;
        Ok(secret.data)
    }

    /// GET the ACS API root presenting the client certificate.
    pub async fn acs_api_root_with_cert(&self) -> Result<()> {
        let client = self.cert_client()?;
        probe(client, &self.acs_api_url()).await
    }

    pub async fn acs_api_root(&self) -> Result<()> {
        probe(&self.http_client, &self.acs_api_url()).await
    }

    pub async fn ss_api_root(&self) -> Result<()> {
        probe(&self.http_client, &self.ss_api_url()).await
    }

    pub async fn acs_site_root(&self, scheme: Scheme) -> Result<()> {
        probe(&self.http_client, &self.acs_site_url(scheme)).await
    }

    pub async fn ss_site_root(&self, scheme: Scheme) -> Result<()> {
        probe(&self.http_client, &self.ss_site_url(scheme)).await
    }
}

fn build_cert_client(paths: &IdentityPaths) -> std::result::Result<reqwest::Client, ConfigError> {
    let cert = read_pem(&paths.cert)?;
    let key = read_pem(&paths.key)?;
    let identity = reqwest::Identity::from_pkcs8_pem(&cert, &key)
        .map_err(|e| ConfigError::InvalidIdentity(e.to_string()))?;
    reqwest::Client::builder()
        .identity(identity)
        .build()
        .map_err(|e| ConfigError::InvalidIdentity(e.to_string()))
}

fn read_pem(path: &std::path::Path) -> std::result::Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Issue a bare GET and discard the body; only the status matters.
async fn probe(client: &reqwest::Client, url: &str) -> Result<()> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| WorkloadError::NetworkError(e.to_string()))?;
    check_status(response)?;
    Ok(())
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if !status.is_success() {
        return Err(WorkloadError::HttpError(
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown status").to_string(),
        ));
    }
    Ok(response)
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| WorkloadError::MalformedResponse(e.to_string()))
}
