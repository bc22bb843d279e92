use super::{ProviderDomain, ProvisioningProvider, VerifyOutcome};
use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

/// REST client for the provisioning provider's domain API.
///
/// Endpoints:
/// - `GET    {base}/domains?name={hostname}` — lookup by name
/// - `POST   {base}/domains` with `{"name": ...}` — register
/// - `DELETE {base}/domains/{id}` — remove
/// - `POST   {base}/domains/{id}/verify` — (re)trigger verification
pub struct HttpProvider {
    api_base: String,
    api_token: Option<String>,
    client: Client,
}

impl HttpProvider {
    pub fn new(api_base: &str, api_token: Option<&str>) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            api_token: api_token.map(str::to_string),
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let mut req = self.client.request(method, url);
        if let Some(token) = &self.api_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        req
    }
}

// ── Wire payloads ────────────────────────────────────────────────

/// Provider domain payload. Older API versions report a boolean
/// `verified`; newer ones a string `verificationStatus`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DomainPayload {
    id: String,
    name: String,
    #[serde(default)]
    verified: Option<bool>,
    #[serde(default)]
    verification_status: Option<String>,
}

impl DomainPayload {
    fn is_verified(&self) -> bool {
        if let Some(flag) = self.verified {
            return flag;
        }
        matches!(
            self.verification_status.as_deref(),
            Some("verified") | Some("active")
        )
    }

    fn into_domain(self) -> ProviderDomain {
        let verified = self.is_verified();
        ProviderDomain {
            id: self.id,
            name: self.name,
            verified,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DomainListPayload {
    #[serde(default)]
    domains: Vec<DomainPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyPayload {
    #[serde(default)]
    verified: bool,
    #[serde(default)]
    queued: bool,
}

// ── Trait impl ───────────────────────────────────────────────────

#[async_trait::async_trait]
impl ProvisioningProvider for HttpProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn find_domain_by_name(&self, hostname: &str) -> Result<Option<ProviderDomain>> {
        let url = format!("{}/domains?name={}", self.api_base, hostname);
        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .context("Provider domain lookup failed")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            anyhow::bail!(
                "Provider domain lookup returned {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }

        let listing: DomainListPayload = response
            .json()
            .await
            .context("Failed to decode provider domain listing")?;
        Ok(listing
            .domains
            .into_iter()
            .find(|d| d.name.eq_ignore_ascii_case(hostname))
            .map(DomainPayload::into_domain))
    }

    async fn add_domain(&self, hostname: &str) -> Result<ProviderDomain> {
        let url = format!("{}/domains", self.api_base);
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&serde_json::json!({ "name": hostname }))
            .send()
            .await
            .context("Provider domain registration failed")?;

        // Idempotent registration: an existing domain is success.
        if response.status() == StatusCode::CONFLICT {
            if let Some(existing) = self.find_domain_by_name(hostname).await? {
                return Ok(existing);
            }
            anyhow::bail!("Provider reported domain {hostname} as existing but lookup found none");
        }
        if !response.status().is_success() {
            anyhow::bail!(
                "Provider domain registration returned {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }

        let payload: DomainPayload = response
            .json()
            .await
            .context("Failed to decode provider domain object")?;
        Ok(payload.into_domain())
    }

    async fn remove_domain(&self, domain_id: &str) -> Result<()> {
        let url = format!("{}/domains/{}", self.api_base, domain_id);
        let response = self
            .request(reqwest::Method::DELETE, url)
            .send()
            .await
            .context("Provider domain removal failed")?;

        // Already gone is fine; a concurrent rebuild phase may have raced us.
        if response.status() == StatusCode::NOT_FOUND || response.status().is_success() {
            return Ok(());
        }
        anyhow::bail!(
            "Provider domain removal returned {}: {}",
            response.status(),
            response.text().await.unwrap_or_default()
        );
    }

    async fn verify_domain(&self, domain_id: &str) -> Result<VerifyOutcome> {
        let url = format!("{}/domains/{}/verify", self.api_base, domain_id);
        let response = self
            .request(reqwest::Method::POST, url)
            .send()
            .await
            .context("Provider domain verification failed")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Provider domain verification returned {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }

        let payload: VerifyPayload = response
            .json()
            .await
            .context("Failed to decode provider verification outcome")?;
        Ok(VerifyOutcome {
            verified: payload.verified,
            queued: payload.queued,
        })
    }
}
