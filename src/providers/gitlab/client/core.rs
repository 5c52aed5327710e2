use log::debug;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::Token;
use crate::error::{FulgensError, Result};

pub(super) const PAGE_SIZE: u32 = 100;

const TOKEN_HEADER: &str = "PRIVATE-TOKEN";
const NEXT_PAGE_HEADER: &str = "x-next-page";

/// GitLab REST v4 client authenticated with a personal access token.
pub struct GitLabClient {
    client: Client,
    base_url: Url,
    api_url: Url,
    token: Option<Token>,
}

impl GitLabClient {
    pub fn new(base_url: &str, token: Option<Token>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("fulgens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FulgensError::Config(format!("Failed to create HTTP client: {e}")))?;

        let mut base = Url::parse(base_url)
            .map_err(|e| FulgensError::Config(format!("Invalid base URL: {e}")))?;

        // Keep sub-path installs (https://host/gitlab) intact when joining
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let api_url = base
            .join("api/v4/")
            .map_err(|e| FulgensError::Config(format!("Invalid API base URL: {e}")))?;

        Ok(Self {
            client,
            base_url: base,
            api_url,
            token,
        })
    }

    /// Instance base URL including any sub-path, used to label reports.
    pub fn instance_url(&self) -> String {
        self.base_url.as_str().trim_end_matches('/').to_string()
    }

    pub fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.header(TOKEN_HEADER, token.as_str())
        } else {
            request
        }
    }

    pub(super) fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        self.api_url
            .join(endpoint)
            .map_err(|e| FulgensError::Config(format!("Invalid endpoint URL {endpoint}: {e}")))
    }

    /// GET a single resource.
    pub(super) async fn get_json<T>(&self, endpoint: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint_url(endpoint)?;
        debug!("GET {url}");

        let response = self.auth_request(self.client.get(url)).send().await?;
        let response = check_status(response, endpoint).await?;

        Ok(response.json().await?)
    }

    /// GET every page of a list endpoint, following `x-next-page` until the
    /// server stops returning one.
    pub(super) async fn get_all_pages<T>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint_url(endpoint)?;
        let mut all_items = Vec::new();
        let mut page: u32 = 1;

        loop {
            debug!("GET {url} (page {page})");

            let request = self
                .client
                .get(url.clone())
                .query(query)
                .query(&[("page", page), ("per_page", PAGE_SIZE)]);

            let response = self.auth_request(request).send().await?;
            let response = check_status(response, endpoint).await?;
            let next_page = next_page(&response);

            let items: Vec<T> = response.json().await?;
            all_items.extend(items);

            match next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        Ok(all_items)
    }
}

fn next_page(response: &Response) -> Option<u32> {
    response
        .headers()
        .get(NEXT_PAGE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

async fn check_status(response: Response, endpoint: &str) -> Result<Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(FulgensError::Unauthorized),
        StatusCode::NOT_FOUND => Err(FulgensError::NotFound(endpoint.to_string())),
        _ => {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            Err(FulgensError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            })
        }
    }
}

/// GitLab reports errors as `{"message": ...}` or `{"error": ...}`; fall back
/// to the raw body otherwise.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message").or_else(|| v.get("error")).map(|m| match m.as_str() {
                Some(s) => s.to_string(),
                None => m.to_string(),
            })
        })
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[derive(Debug, serde::Deserialize)]
    struct Item {
        id: u64,
    }

    #[test]
    fn test_api_url_from_root() {
        let client = GitLabClient::new("https://gitlab.com", None).unwrap();
        assert_eq!(
            client.endpoint_url("groups").unwrap().as_str(),
            "https://gitlab.com/api/v4/groups"
        );
        assert_eq!(client.instance_url(), "https://gitlab.com");
    }

    #[test]
    fn test_api_url_keeps_sub_path() {
        let client = GitLabClient::new("https://example.com/gitlab", None).unwrap();
        assert_eq!(
            client.endpoint_url("projects/7").unwrap().as_str(),
            "https://example.com/gitlab/api/v4/projects/7"
        );
        assert_eq!(client.instance_url(), "https://example.com/gitlab");
    }

    #[test]
    fn test_invalid_base_url() {
        let result = GitLabClient::new("not a url", None);
        assert!(matches!(result, Err(FulgensError::Config(_))));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"message": "403 Forbidden"}"#), "403 Forbidden");
        assert_eq!(error_message(r#"{"error": "insufficient_scope"}"#), "insufficient_scope");
        assert_eq!(
            error_message(r#"{"message": {"base": ["bad"]}}"#),
            r#"{"base":["bad"]}"#
        );
        assert_eq!(error_message("plain failure"), "plain failure");
    }

    #[tokio::test]
    async fn test_get_all_pages_follows_next_page() {
        let mut server = mockito::Server::new_async().await;

        let page1 = server
            .mock("GET", "/api/v4/groups")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("per_page".into(), "100".into()),
            ]))
            .match_header("private-token", "glpat-test")
            .with_header("content-type", "application/json")
            .with_header("x-next-page", "2")
            .with_body(r#"[{"id": 1}, {"id": 2}]"#)
            .create_async()
            .await;

        let page2 = server
            .mock("GET", "/api/v4/groups")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_header("content-type", "application/json")
            .with_header("x-next-page", "")
            .with_body(r#"[{"id": 3}]"#)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), Some(Token::from("glpat-test"))).unwrap();
        let items: Vec<Item> = client.get_all_pages("groups", &[]).await.unwrap();

        assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        page1.assert_async().await;
        page2.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v4/user")
            .with_status(401)
            .with_body(r#"{"message": "401 Unauthorized"}"#)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), Some(Token::from("expired"))).unwrap();
        let result: Result<Item> = client.get_json("user").await;

        assert!(matches!(result, Err(FulgensError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_not_found_maps_to_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v4/projects/99")
            .with_status(404)
            .with_body(r#"{"message": "404 Project Not Found"}"#)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None).unwrap();
        let result: Result<Item> = client.get_json("projects/99").await;

        match result {
            Err(FulgensError::NotFound(endpoint)) => assert_eq!(endpoint, "projects/99"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_carries_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v4/groups")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body(r#"{"message": "500 Internal Server Error"}"#)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None).unwrap();
        let result: Result<Vec<Item>> = client.get_all_pages("groups", &[]).await;

        match result {
            Err(FulgensError::Api { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "500 Internal Server Error");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
