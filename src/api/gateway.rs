use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::ApiError;

/// Transport seam between the entity store / AI service and the server.
///
/// Implementations perform one JSON request against a path relative to the
/// API base URL and return the decoded body (`Value::Null` for empty
/// responses). The typed helpers on `dyn Gateway` sit on top of this.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError>;
}

fn decode<T: DeserializeOwned>(endpoint: &str, value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|source| ApiError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

fn encode<B: Serialize>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::BadRequest(e.to_string()))
}

impl dyn Gateway {
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let value = self.send(Method::GET, path, None).await?;
        decode(path, value)
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let value = self.send(Method::POST, path, Some(encode(body)?)).await?;
        decode(path, value)
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let value = self.send(Method::PUT, path, Some(encode(body)?)).await?;
        decode(path, value)
    }

    /// `PUT` whose response body is ignored.
    pub async fn put_unit<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        self.send(Method::PUT, path, Some(encode(body)?)).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, path, None).await?;
        Ok(())
    }

    /// Bulk delete: `DELETE` with a JSON array of ids as the body.
    pub async fn delete_many(&self, path: &str, ids: &[i64]) -> Result<(), ApiError> {
        self.send(Method::DELETE, path, Some(encode(&ids)?)).await?;
        Ok(())
    }
}
