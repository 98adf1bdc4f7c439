//! Remote list-store client: one POST per item, expecting `201 Created`.

use anyhow::{Context, Result};
use extrato_core::ExtratoError;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::csv_table::CsvTable;
use crate::oauth::AccessToken;

#[derive(Debug, Clone)]
pub struct ListStore {
    http: reqwest::Client,
    graph_base: String,
    site_id: String,
    list_id: String,
    token: String,
}

impl ListStore {
    pub fn new(
        http: reqwest::Client,
        graph_base: impl Into<String>,
        site_id: impl Into<String>,
        list_id: impl Into<String>,
        token: &AccessToken,
    ) -> Self {
        Self {
            http,
            graph_base: graph_base.into(),
            site_id: site_id.into(),
            list_id: list_id.into(),
            token: token.token.clone(),
        }
    }

    pub fn items_url(&self) -> String {
        items_url(&self.graph_base, &self.site_id, &self.list_id)
    }

    /// Create one list item from `fields`.
    pub async fn create_item<F: Serialize + ?Sized>(&self, fields: &F) -> Result<()> {
        #[derive(Serialize)]
        struct Req<'a, F: Serialize + ?Sized> {
            fields: &'a F,
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let resp = self
            .http
            .post(self.items_url())
            .headers(headers)
            .json(&Req { fields })
            .send()
            .await
            .context("list item request")?;

        let status = resp.status().as_u16();
        let body = resp.text().await.context("reading list item response")?;
        check_created(status, body)?;
        debug!("list item created");
        Ok(())
    }

    /// Upload every row of the table in order. Stops at the first failure;
    /// items already created stay created.
    pub async fn upload_csv_rows(&self, table: &CsvTable) -> Result<usize> {
        for (i, row) in table.rows.iter().enumerate() {
            let fields: Map<String, Value> = row.to_fields(&table.headers);
            self.create_item(&fields)
                .await
                .with_context(|| format!("uploading row {} of {}", i + 1, table.rows.len()))?;
        }
        info!(count = table.rows.len(), "uploaded CSV rows");
        Ok(table.rows.len())
    }
}

pub fn items_url(graph_base: &str, site_id: &str, list_id: &str) -> String {
    format!(
        "{}/sites/{}/lists/{}/items",
        graph_base.trim_end_matches('/'),
        site_id,
        list_id
    )
}

/// Anything but 201 is surfaced with its status and body verbatim.
pub fn check_created(status: u16, body: String) -> Result<()> {
    if status == 201 {
        Ok(())
    } else {
        Err(ExtratoError::UploadRejected { status, body }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_items_url() {
        let url = items_url(
            "https://graph.microsoft.com/v1.0/",
            "contoso.sharepoint.com,aaa,bbb",
            "list-1",
        );
        assert_eq!(
            url,
            "https://graph.microsoft.com/v1.0/sites/contoso.sharepoint.com,aaa,bbb/lists/list-1/items"
        );
    }

    #[test]
    fn test_check_created() {
        assert!(check_created(201, String::new()).is_ok());

        let err = check_created(200, "ok but not created".into()).unwrap_err();
        match err.downcast_ref::<ExtratoError>() {
            Some(ExtratoError::UploadRejected { status, body }) => {
                assert_eq!(*status, 200);
                assert_eq!(body, "ok but not created");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = check_created(403, r#"{"error":{"code":"accessDenied"}}"#.into()).unwrap_err();
        assert!(err.to_string().contains("status 403"));
        assert!(err.to_string().contains("accessDenied"));
    }

    /// Serve one canned HTTP response on a loopback port and return its base url.
    async fn serve_once(response: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut req = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = sock.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                req.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&req);
                if let Some(end) = text.find("\r\n\r\n") {
                    let len = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length").then(|| v.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if req.len() >= end + 4 + len {
                        break;
                    }
                }
            }
            sock.write_all(response.as_bytes()).await.unwrap();
            sock.shutdown().await.ok();
        });
        format!("http://{addr}")
    }

    fn store_at(base: &str) -> ListStore {
        let token = AccessToken { token: "t".into(), expires_in: None };
        ListStore::new(reqwest::Client::new(), base, "site", "list", &token)
    }

    #[tokio::test]
    async fn test_create_item_accepts_201() {
        let base = serve_once("HTTP/1.1 201 Created\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{}").await;
        store_at(&base)
            .create_item(&serde_json::json!({"Title": "Teste"}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_item_rejection_carries_body() {
        let base = serve_once(
            "HTTP/1.1 403 Forbidden\r\ncontent-length: 12\r\nconnection: close\r\n\r\naccessDenied",
        )
        .await;
        let err = store_at(&base)
            .create_item(&serde_json::json!({"Title": "Teste"}))
            .await
            .unwrap_err();
        match err.downcast_ref::<ExtratoError>() {
            Some(ExtratoError::UploadRejected { status, body }) => {
                assert_eq!(*status, 403);
                assert_eq!(body, "accessDenied");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_item_truncated_body_is_error() {
        // Promises 100 bytes, sends 7, then closes.
        let base = serve_once(
            "HTTP/1.1 403 Forbidden\r\ncontent-length: 100\r\nconnection: close\r\n\r\npartial",
        )
        .await;
        let err = store_at(&base)
            .create_item(&serde_json::json!({"Title": "Teste"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("reading list item response"));
        assert!(err.downcast_ref::<ExtratoError>().is_none());
    }

    #[test]
    fn test_store_builds_url_from_parts() {
        let token = AccessToken { token: "t".into(), expires_in: None };
        let store = ListStore::new(reqwest::Client::new(), "https://graph.example/v1.0", "site", "list", &token);
        assert_eq!(store.items_url(), "https://graph.example/v1.0/sites/site/lists/list/items");
    }
}
