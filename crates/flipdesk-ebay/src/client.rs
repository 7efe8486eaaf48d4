//! HTTP client for the eBay Taxonomy, Identity and Trading APIs.
//!
//! One client holds one application token for its lifetime; the token is
//! fetched lazily on the first authenticated call. The category tree id is
//! resolved the same way when it is not configured.

use std::time::Duration;

use flipdesk_core::{AppConfig, CategoryNode};
use reqwest::{Client, Url};
use tokio::sync::OnceCell;

use crate::error::EbayError;
use crate::trading;
use crate::types::{
    CategoryTreeEnvelope, DefaultTreeIdResponse, SuggestedCategory, TokenResponse,
    TradingCategory,
};

const OAUTH_SCOPE: &str = "https://api.ebay.com/oauth/api_scope";
const TRADING_COMPATIBILITY_LEVEL: &str = "1193";

/// Everything needed to build an [`EbayClient`].
#[derive(Clone)]
pub struct EbaySettings {
    pub client_id: String,
    pub client_secret: String,
    /// Seller token for Trading API calls; the application token is used
    /// when absent.
    pub user_token: Option<String>,
    pub base_url: String,
    pub marketplace_id: String,
    pub category_tree_id: Option<String>,
    pub site_id: u32,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for EbaySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EbaySettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("user_token", &self.user_token.as_ref().map(|_| "[redacted]"))
            .field("base_url", &self.base_url)
            .field("marketplace_id", &self.marketplace_id)
            .field("category_tree_id", &self.category_tree_id)
            .field("site_id", &self.site_id)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl EbaySettings {
    /// Pulls eBay settings out of the application config.
    ///
    /// # Errors
    ///
    /// Returns [`EbayError::MissingCredentials`] when the client id or secret
    /// is not configured.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, EbayError> {
        let client_id = config
            .ebay_client_id
            .clone()
            .ok_or(EbayError::MissingCredentials("EBAY_CLIENT_ID"))?;
        let client_secret = config
            .ebay_client_secret
            .clone()
            .ok_or(EbayError::MissingCredentials("EBAY_CLIENT_SECRET"))?;

        Ok(Self {
            client_id,
            client_secret,
            user_token: config.ebay_user_token.clone(),
            base_url: config.ebay_environment.api_base_url().to_string(),
            marketplace_id: config.ebay_marketplace_id.clone(),
            category_tree_id: config.ebay_category_tree_id.clone(),
            site_id: config.ebay_site_id,
            timeout_secs: config.ebay_request_timeout_secs,
        })
    }
}

/// Client for the eBay APIs used by category sync and leaf resolution.
pub struct EbayClient {
    client: Client,
    base_url: Url,
    client_id: String,
    client_secret: String,
    user_token: Option<String>,
    marketplace_id: String,
    site_id: u32,
    token: OnceCell<String>,
    tree_id: OnceCell<String>,
}

impl EbayClient {
    /// # Errors
    ///
    /// Returns [`EbayError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`EbayError::InvalidBaseUrl`] if the base
    /// URL does not parse.
    pub fn new(settings: EbaySettings) -> Result<Self, EbayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("flipdesk/0.1 (category-sync)")
            .build()?;

        let normalised = format!("{}/", settings.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| EbayError::InvalidBaseUrl(format!("{}: {e}", settings.base_url)))?;

        let tree_id = match settings.category_tree_id {
            Some(id) => OnceCell::new_with(Some(id)),
            None => OnceCell::new(),
        };

        Ok(Self {
            client,
            base_url,
            client_id: settings.client_id,
            client_secret: settings.client_secret,
            user_token: settings.user_token,
            marketplace_id: settings.marketplace_id,
            site_id: settings.site_id,
            token: OnceCell::new(),
            tree_id,
        })
    }

    /// Builds a client from the application config.
    ///
    /// # Errors
    ///
    /// See [`EbaySettings::from_app_config`] and [`EbayClient::new`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self, EbayError> {
        Self::new(EbaySettings::from_app_config(config)?)
    }

    /// Returns the application access token, exchanging client credentials
    /// on first use.
    ///
    /// # Errors
    ///
    /// Returns [`EbayError::Auth`] if the token exchange fails.
    pub async fn access_token(&self) -> Result<&str, EbayError> {
        let token = self
            .token
            .get_or_try_init(|| self.fetch_token())
            .await?;
        Ok(token.as_str())
    }

    async fn fetch_token(&self) -> Result<String, EbayError> {
        let url = self.endpoint("identity/v1/oauth2/token")?;
        let response = self
            .client
            .post(url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials"), ("scope", OAUTH_SCOPE)])
            .send()
            .await
            .map_err(|e| EbayError::Auth(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(EbayError::Auth(format!(
                "token exchange failed with status {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| EbayError::Auth(format!("token parse error: {e}")))?;

        tracing::debug!(expires_in = ?token.expires_in, "obtained eBay application token");
        Ok(token.access_token)
    }

    /// Returns the category tree id to use: the configured one, or the
    /// marketplace default looked up once.
    ///
    /// # Errors
    ///
    /// Propagates auth and upstream failures from the lookup.
    pub async fn category_tree_id(&self) -> Result<&str, EbayError> {
        let id = self
            .tree_id
            .get_or_try_init(|| self.default_category_tree_id())
            .await?;
        Ok(id.as_str())
    }

    /// Looks up the default category tree id of the configured marketplace.
    ///
    /// # Errors
    ///
    /// - [`EbayError::Auth`] if no token can be obtained.
    /// - [`EbayError::Upstream`] on a non-2xx status.
    /// - [`EbayError::Deserialize`] if the body does not match.
    pub async fn default_category_tree_id(&self) -> Result<String, EbayError> {
        let mut url = self.endpoint("commerce/taxonomy/v1/get_default_category_tree_id")?;
        url.query_pairs_mut()
            .append_pair("marketplace_id", &self.marketplace_id);

        let context = format!("getDefaultCategoryTreeId(marketplace_id={})", self.marketplace_id);
        let body = self.get_json(url, &context).await?;
        let response: DefaultTreeIdResponse =
            serde_json::from_str(&body).map_err(|e| EbayError::Deserialize {
                context,
                source: e,
            })?;
        Ok(response.category_tree_id)
    }

    /// Fetches the category tree, or the subtree rooted at `parent_id`.
    ///
    /// # Errors
    ///
    /// - [`EbayError::Auth`] if no token can be obtained.
    /// - [`EbayError::Upstream`] on a non-2xx status.
    /// - [`EbayError::Deserialize`] if the body is not a category tree.
    pub async fn fetch_category_tree(
        &self,
        parent_id: Option<&str>,
    ) -> Result<CategoryNode, EbayError> {
        let tree_id = self.category_tree_id().await?.to_string();

        let (url, context) = match parent_id {
            None => (
                self.endpoint(&format!("commerce/taxonomy/v1/category_tree/{tree_id}"))?,
                format!("getCategoryTree(tree={tree_id})"),
            ),
            Some(parent) => {
                let mut url = self.endpoint(&format!(
                    "commerce/taxonomy/v1/category_tree/{tree_id}/get_category_subtree"
                ))?;
                url.query_pairs_mut().append_pair("category_id", parent);
                (
                    url,
                    format!("getCategorySubtree(tree={tree_id}, category_id={parent})"),
                )
            }
        };

        let body = self.get_json(url, &context).await?;
        let envelope: CategoryTreeEnvelope =
            serde_json::from_str(&body).map_err(|e| EbayError::Deserialize {
                context: context.clone(),
                source: e,
            })?;

        tracing::debug!(
            tree_id = envelope.category_tree_id.as_deref().unwrap_or(&tree_id),
            version = envelope.category_tree_version.as_deref().unwrap_or("unknown"),
            "fetched eBay category tree"
        );

        envelope.node.ok_or_else(|| EbayError::Deserialize {
            context,
            source: <serde_json::Error as serde::de::Error>::missing_field("rootCategoryNode"),
        })
    }

    /// Calls Trading `GetCategories` for `parent_id` and its descendants
    /// down to `level_limit` levels below the top.
    ///
    /// # Errors
    ///
    /// - [`EbayError::Auth`] if no token can be obtained.
    /// - [`EbayError::Upstream`] on a non-2xx status.
    /// - [`EbayError::Xml`] / [`EbayError::Api`] on a malformed or failed
    ///   response.
    pub async fn get_categories(
        &self,
        parent_id: Option<&str>,
        level_limit: Option<u32>,
    ) -> Result<Vec<TradingCategory>, EbayError> {
        let body = trading::get_categories_request(self.site_id, parent_id, level_limit);
        let xml = self.trading_call("GetCategories", body).await?;
        trading::parse_get_categories(&xml)
    }

    /// Calls Trading `GetSuggestedCategories`, returning eBay's ranking.
    ///
    /// # Errors
    ///
    /// Same as [`EbayClient::get_categories`].
    pub async fn get_suggested_categories(
        &self,
        query: &str,
    ) -> Result<Vec<SuggestedCategory>, EbayError> {
        let body = trading::get_suggested_categories_request(query);
        let xml = self.trading_call("GetSuggestedCategories", body).await?;
        trading::parse_suggested_categories(&xml)
    }

    async fn trading_call(&self, call: &str, body: String) -> Result<String, EbayError> {
        let token = match self.user_token.as_deref() {
            Some(token) => token,
            None => self.access_token().await?,
        };
        let url = self.endpoint("ws/api.dll")?;

        let response = self
            .client
            .post(url)
            .header("X-EBAY-API-CALL-NAME", call)
            .header("X-EBAY-API-SITEID", self.site_id.to_string())
            .header("X-EBAY-API-COMPATIBILITY-LEVEL", TRADING_COMPATIBILITY_LEVEL)
            .header("X-EBAY-API-IAF-TOKEN", token)
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EbayError::Upstream {
                context: call.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }

    async fn get_json(&self, url: Url, context: &str) -> Result<String, EbayError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .header("X-EBAY-C-MARKETPLACE-ID", &self.marketplace_id)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EbayError::Upstream {
                context: context.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }

    fn endpoint(&self, path: &str) -> Result<Url, EbayError> {
        self.base_url
            .join(path)
            .map_err(|e| EbayError::InvalidBaseUrl(format!("{}{path}: {e}", self.base_url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(base_url: &str) -> EbaySettings {
        EbaySettings {
            client_id: "app-id".to_string(),
            client_secret: "app-secret".to_string(),
            user_token: None,
            base_url: base_url.to_string(),
            marketplace_id: "EBAY_US".to_string(),
            category_tree_id: None,
            site_id: 0,
            timeout_secs: 30,
        }
    }

    #[test]
    fn endpoint_joins_under_base_path() {
        let client = EbayClient::new(settings("https://api.ebay.com")).expect("client");
        let url = client
            .endpoint("commerce/taxonomy/v1/category_tree/0")
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://api.ebay.com/commerce/taxonomy/v1/category_tree/0"
        );
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let client = EbayClient::new(settings("http://127.0.0.1:9000/mock/")).expect("client");
        let url = client.endpoint("ws/api.dll").expect("url");
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/mock/ws/api.dll");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = EbayClient::new(settings("not a url"));
        assert!(matches!(result, Err(EbayError::InvalidBaseUrl(_))));
    }

    #[test]
    fn settings_debug_redacts_secrets() {
        let mut s = settings("https://api.ebay.com");
        s.user_token = Some("v^1.1#secret-user-token".to_string());
        let debug = format!("{s:?}");
        assert!(!debug.contains("app-secret"));
        assert!(!debug.contains("secret-user-token"));
        assert!(debug.contains("app-id"));
    }

    #[tokio::test]
    async fn configured_tree_id_skips_lookup() {
        let mut s = settings("http://127.0.0.1:1");
        s.category_tree_id = Some("100".to_string());
        let client = EbayClient::new(s).expect("client");
        assert_eq!(client.category_tree_id().await.expect("tree id"), "100");
    }
}
