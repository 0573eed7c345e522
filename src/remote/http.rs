use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::model::User;

use super::{AuthSession, Backend, Filter, Query};

const AUTH_PATH: &str = "auth/v1";
const REST_PATH: &str = "rest/v1";

/// REST client for the hosted service.
///
/// Auth calls go to `/auth/v1`, table calls to `/rest/v1/<table>` with
/// filters encoded as `column=eq.value` / `column=in.(a,b)` query pairs.
pub struct HttpBackend {
    base_url: String,
    api_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Value,
}

impl AuthUser {
    fn into_user(self) -> User {
        let name = self
            .user_metadata
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        User {
            id: self.id,
            name,
            email: self.email.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(default)]
    access_token: Option<String>,
    user: Option<AuthUser>,
}

#[derive(Debug, Deserialize, Default)]
struct ErrorBody {
    #[serde(default, alias = "msg", alias = "error_description")]
    message: Option<String>,
    #[serde(default, alias = "error_code")]
    code: Option<Value>,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        let (url, key) = config.endpoint()?;
        Self::new(url, key, Duration::from_secs(config.timeout_secs))
    }

    fn url(&self, prefix: &str, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, prefix, path)
    }

    fn request(&self, builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        let bearer = token.unwrap_or(&self.api_key);
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    fn table_request(&self, builder: RequestBuilder, token: &str, query: &Query) -> RequestBuilder {
        let mut pairs = Vec::new();
        if let Some(columns) = &query.columns {
            pairs.push(("select".to_string(), columns.join(",")));
        }
        for filter in &query.filters {
            pairs.push(encode_filter(filter));
        }
        if let Some(order) = &query.order {
            let direction = if order.ascending { "asc" } else { "desc" };
            pairs.push(("order".to_string(), format!("{}.{}", order.column, direction)));
        }
        self.request(builder, Some(token)).query(&pairs)
    }

    async fn auth_session(&self, response: Response) -> Result<AuthSession> {
        let response = check_auth(response).await?;
        let body: AuthResponse = response.json().await?;
        let access_token = body.access_token.ok_or_else(|| {
            Error::Persistence("sign-up needs email confirmation before sign-in".to_string())
        })?;
        let user = body
            .user
            .ok_or_else(|| Error::Persistence("auth response carried no user".to_string()))?
            .into_user();
        Ok(AuthSession { access_token, user })
    }
}

fn encode_filter(filter: &Filter) -> (String, String) {
    match filter {
        Filter::Eq(column, value) => (column.clone(), format!("eq.{}", encode_value(value))),
        Filter::In(column, values) => {
            let list: Vec<String> = values.iter().map(encode_value).collect();
            (column.clone(), format!("in.({})", list.join(",")))
        }
    }
}

fn encode_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

async fn error_body(response: Response) -> (StatusCode, ErrorBody) {
    let status = response.status();
    let body = response.json::<ErrorBody>().await.unwrap_or_default();
    (status, body)
}

fn describe(status: StatusCode, body: &ErrorBody) -> String {
    body.message
        .clone()
        .unwrap_or_else(|| format!("request failed with {status}"))
}

/// Map auth endpoint failures onto the auth error variants.
async fn check_auth(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let (status, body) = error_body(response).await;
    let message = describe(status, &body);
    let code = body
        .code
        .as_ref()
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    tracing::debug!(%status, %message, "auth request failed");

    let lowered = message.to_lowercase();
    if code == "user_already_exists" || lowered.contains("already registered") {
        return Err(Error::DuplicateEmail(message));
    }
    if code == "invalid_credentials" || lowered.contains("invalid login credentials") {
        return Err(Error::InvalidCredentials);
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Unauthenticated),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            Err(Error::Validation(message))
        }
        _ => Err(Error::Persistence(message)),
    }
}

/// Map table endpoint failures: a rejected token is `Unauthenticated`,
/// anything else the service refused is a persistence error.
async fn check_table(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let (status, body) = error_body(response).await;
    let message = describe(status, &body);
    tracing::debug!(%status, %message, "table request failed");
    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::Unauthenticated);
    }
    Err(Error::Persistence(message))
}

#[async_trait]
impl Backend for HttpBackend {
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<AuthSession> {
        let body = json!({
            "email": email,
            "password": password,
            "data": { "name": name },
        });
        let response = self
            .request(self.client.post(self.url(AUTH_PATH, "signup")), None)
            .json(&body)
            .send()
            .await?;
        self.auth_session(response).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let response = self
            .request(self.client.post(self.url(AUTH_PATH, "token")), None)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        self.auth_session(response).await
    }

    async fn sign_out(&self, token: &str) -> Result<()> {
        let response = self
            .request(self.client.post(self.url(AUTH_PATH, "logout")), Some(token))
            .send()
            .await?;
        check_auth(response).await?;
        Ok(())
    }

    async fn get_user(&self, token: &str) -> Result<User> {
        let response = self
            .request(self.client.get(self.url(AUTH_PATH, "user")), Some(token))
            .send()
            .await?;
        let user: AuthUser = check_auth(response).await?.json().await?;
        Ok(user.into_user())
    }

    async fn select(&self, token: &str, query: &Query) -> Result<Vec<Value>> {
        let builder = self.client.get(self.url(REST_PATH, &query.table));
        let response = self.table_request(builder, token, query).send().await?;
        Ok(check_table(response).await?.json().await?)
    }

    async fn insert(&self, token: &str, table: &str, row: Value) -> Result<Value> {
        let response = self
            .request(self.client.post(self.url(REST_PATH, table)), Some(token))
            .header("Prefer", "return=representation")
            .json(&json!([row]))
            .send()
            .await?;
        let rows: Vec<Value> = check_table(response).await?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::Persistence(format!("insert into {table} returned no row")))
    }

    async fn update(&self, token: &str, query: &Query, changes: Value) -> Result<Vec<Value>> {
        let builder = self.client.patch(self.url(REST_PATH, &query.table));
        let response = self
            .table_request(builder, token, query)
            .header("Prefer", "return=representation")
            .json(&changes)
            .send()
            .await?;
        Ok(check_table(response).await?.json().await?)
    }

    async fn delete(&self, token: &str, query: &Query) -> Result<usize> {
        let builder = self.client.delete(self.url(REST_PATH, &query.table));
        let response = self
            .table_request(builder, token, query)
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let rows: Vec<Value> = check_table(response).await?.json().await?;
        Ok(rows.len())
    }
}
