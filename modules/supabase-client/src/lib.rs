pub mod error;
pub mod query;

pub use error::{Result, SupabaseError};
pub use query::Query;

use reqwest::{Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};

/// Row-level access to Supabase tables through the PostgREST endpoint.
///
/// Stateless: every call is an independent HTTP request, so there is no
/// transaction or locking beyond what Postgres applies per statement.
#[derive(Clone)]
pub struct SupabaseClient {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(url: &str, service_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        }
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        self.client
            .request(method, &url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn check(resp: Response) -> Result<Response> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SupabaseError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }

    /// `SELECT` rows matching `query`.
    pub async fn select<T: DeserializeOwned>(&self, table: &str, query: &Query) -> Result<Vec<T>> {
        let resp = self
            .request(Method::GET, table)
            .query(query.params())
            .send()
            .await?;
        let resp = Self::check(resp).await?;

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| SupabaseError::Parse(e.to_string()))
    }

    /// Bulk `INSERT`. PostgREST runs the whole array as one statement, so a
    /// single bad row rejects the batch.
    pub async fn insert<T: Serialize>(&self, table: &str, rows: &[T]) -> Result<()> {
        let resp = self
            .request(Method::POST, table)
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await?;
        Self::check(resp).await?;

        tracing::debug!(table, rows = rows.len(), "Inserted rows");
        Ok(())
    }

    /// Bulk `INSERT ... ON CONFLICT (on_conflict) DO UPDATE`.
    pub async fn upsert<T: Serialize>(
        &self,
        table: &str,
        rows: &[T],
        on_conflict: &str,
    ) -> Result<()> {
        let resp = self
            .request(Method::POST, table)
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows)
            .send()
            .await?;
        Self::check(resp).await?;

        tracing::debug!(table, rows = rows.len(), on_conflict, "Upserted rows");
        Ok(())
    }

    /// `UPDATE` the rows matching `query` with the columns in `patch`.
    pub async fn update<T: Serialize>(&self, table: &str, patch: &T, query: &Query) -> Result<()> {
        let resp = self
            .request(Method::PATCH, table)
            .query(query.params())
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        id: String,
        name: String,
    }

    #[tokio::test]
    async fn select_sends_filters_and_auth() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/influencers")
                    .header("apikey", "service")
                    .header("authorization", "Bearer service")
                    .query_param("select", "id,name")
                    .query_param("image_url", "is.null");
                then.status(200)
                    .json_body(json!([{"id": "1", "name": "Khaby Lame"}]));
            })
            .await;

        let client = SupabaseClient::new(&server.base_url(), "service");
        let rows: Vec<Row> = client
            .select(
                "influencers",
                &Query::new().select("id, name").is_null("image_url"),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            rows,
            vec![Row {
                id: "1".into(),
                name: "Khaby Lame".into()
            }]
        );
    }

    #[tokio::test]
    async fn upsert_merges_on_conflict_column() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rest/v1/avatars")
                    .query_param("on_conflict", "avatar_id")
                    .header("Prefer", "resolution=merge-duplicates,return=minimal")
                    .json_body(json!([{"avatar_id": "a1"}]));
                then.status(201);
            })
            .await;

        let client = SupabaseClient::new(&server.base_url(), "service");
        client
            .upsert("avatars", &[json!({"avatar_id": "a1"})], "avatar_id")
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn update_patches_matching_rows() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/rest/v1/influencers")
                    .query_param("id", "eq.42")
                    .json_body(json!({"avatar_id": "a1"}));
                then.status(204);
            })
            .await;

        let client = SupabaseClient::new(&server.base_url(), "service");
        client
            .update(
                "influencers",
                &json!({"avatar_id": "a1"}),
                &Query::new().eq("id", "42"),
            )
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn insert_failure_surfaces_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/influencers");
                then.status(409).body("duplicate key value violates unique constraint");
            })
            .await;

        let client = SupabaseClient::new(&server.base_url(), "service");
        let err = client
            .insert("influencers", &[json!({"id": "1"})])
            .await
            .unwrap_err();
        assert!(matches!(err, SupabaseError::Api { status: 409, .. }));
    }
}
