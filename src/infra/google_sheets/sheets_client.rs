use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use super::service_account::ServiceAccountAuth;
use crate::core::links::{qualify_range, AppendResult, SheetError, SheetStore};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Google Sheets Values API client bound to one sheet of one spreadsheet.
pub struct GoogleSheetsClient {
    client: Client,
    auth: ServiceAccountAuth,
    base_url: String,
    spreadsheet_id: String,
    sheet_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    table_range: Option<String>,
    updates: AppendUpdates,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    updated_range: String,
}

impl GoogleSheetsClient {
    pub fn new(auth: ServiceAccountAuth, spreadsheet_id: String, sheet_name: String) -> Self {
        Self {
            client: Client::new(),
            auth,
            base_url: SHEETS_API_BASE.to_string(),
            spreadsheet_id,
            sheet_name,
        }
    }

    /// URL of `.../values/{range}{suffix}` with the range percent-encoded as
    /// a single path segment.
    fn values_url(&self, range: &str, suffix: &str) -> Result<Url, SheetError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| SheetError::Http(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SheetError::Http(format!("Cannot use {} as a base", self.base_url)))?
            .push(&self.spreadsheet_id)
            .push("values")
            .push(&format!(
                "{}{}",
                qualify_range(&self.sheet_name, range),
                suffix
            ));
        Ok(url)
    }

    async fn authorized(&self, method: Method, url: Url) -> Result<RequestBuilder, SheetError> {
        let token = self
            .auth
            .get_access_token()
            .await
            .map_err(|e| SheetError::Auth(e.to_string()))?;
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    async fn send<T: for<'de> Deserialize<'de>>(request: RequestBuilder) -> Result<T, SheetError> {
        let response = request
            .send()
            .await
            .map_err(|e| SheetError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SheetError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| SheetError::Http(e.to_string()))
    }
}

/// Renders a formatted cell value the way the sheet displays it.
fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl SheetStore for GoogleSheetsClient {
    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, SheetError> {
        let url = self.values_url(range, "")?;
        let request = self.authorized(Method::GET, url).await?;

        let body: ValueRange = Self::send(request).await?;
        Ok(body
            .values
            .iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect())
    }

    async fn update_range(&self, range: &str, rows: Vec<Vec<Value>>) -> Result<(), SheetError> {
        let qualified = qualify_range(&self.sheet_name, range);
        let url = self.values_url(range, "")?;
        let request = self
            .authorized(Method::PUT, url)
            .await?
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&json!({
                "range": qualified,
                "majorDimension": "ROWS",
                "values": rows,
            }));

        let _: Value = Self::send(request).await?;
        tracing::debug!(range = %qualified, "Updated sheet range");
        Ok(())
    }

    async fn append_rows(
        &self,
        range: &str,
        rows: Vec<Vec<Value>>,
    ) -> Result<AppendResult, SheetError> {
        let url = self.values_url(range, ":append")?;
        let request = self
            .authorized(Method::POST, url)
            .await?
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({
                "majorDimension": "ROWS",
                "values": rows,
            }));

        let body: AppendResponse = Self::send(request).await?;
        Ok(AppendResult {
            table_range: body.table_range,
            updated_range: body.updates.updated_range,
        })
    }
}
