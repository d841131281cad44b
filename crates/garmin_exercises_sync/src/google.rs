//! Google Sheets publisher: clear the tab, write every row, then format the
//! two header rows and the data area for browsing.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use jwt_simple::prelude::{Claims, Duration as JwtDuration, RS256KeyPair, RSAKeyPairLike};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::config::{PublishTarget, SyncConfig};
use crate::error::SyncError;
use crate::publisher::SheetPublisher;
use crate::table::{HEADER_ROWS, SheetTable};

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ERROR_SNIPPET_CHARS: usize = 256;

/// Background colour (red, green, blue) of every column in a group.
const GROUP_COLORS: [(&str, [f64; 3]); 4] = [
    ("NAME", [0.8, 0.9, 0.97]),
    ("DETAILED_INFO", [0.96, 0.8, 0.8]),
    ("MUSCLE_GROUPS", [0.85, 0.92, 0.83]),
    ("EQUIPMENT", [1.0, 0.95, 0.8]),
];

/// Fixed pixel widths by column header; other columns keep their width.
const COLUMN_WIDTHS: [(&str, u32); 8] = [
    ("Name", 400),
    ("CATEGORY", 150),
    ("NAME_GARMIN", 150),
    ("FOUND", 60),
    ("IMAGE", 150),
    ("URL", 60),
    ("DIFFICULTY", 90),
    ("DESCRIPTION", 150),
];

/// Tall enough for the `IMAGE` thumbnails to be legible.
const DATA_ROW_PIXELS: u32 = 103;

/// Fields of a service-account JSON key needed for the token exchange.
#[derive(Clone, Debug)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: SecretString,
    pub token_uri: String,
}

#[derive(Deserialize)]
struct RawServiceAccountKey {
    client_email: String,
    private_key: String,
    token_uri: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct ScopeClaim {
    scope: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Clone, Debug)]
pub enum Credentials {
    /// Pre-issued OAuth bearer token.
    AccessToken(SecretString),
    ServiceAccount(ServiceAccountKey),
}

impl Credentials {
    /// A configured access token wins; otherwise the service-account key file
    /// is read.
    pub fn from_config(cfg: &SyncConfig) -> Result<Self, SyncError> {
        match &cfg.access_token {
            Some(token) => Ok(Credentials::AccessToken(token.clone())),
            None => Self::from_key_file(&cfg.credentials_file),
        }
    }

    pub fn from_key_file(path: &Path) -> Result<Self, SyncError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Auth(format!("cannot read credentials {}: {e}", path.display()))
        })?;
        Self::from_service_account_json(&raw)
    }

    pub fn from_service_account_json(raw: &str) -> Result<Self, SyncError> {
        let key: RawServiceAccountKey = serde_json::from_str(raw)
            .map_err(|e| SyncError::Auth(format!("invalid service account key: {e}")))?;
        Ok(Credentials::ServiceAccount(ServiceAccountKey {
            client_email: key.client_email,
            private_key: SecretString::new(key.private_key.into_boxed_str()),
            token_uri: key
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        }))
    }

    /// Bearer token for the Sheets API, exchanging a signed assertion when
    /// holding a service-account key.
    pub async fn access_token(&self, client: &reqwest::Client) -> Result<SecretString, SyncError> {
        let key = match self {
            Credentials::AccessToken(token) => return Ok(token.clone()),
            Credentials::ServiceAccount(key) => key,
        };
        let assertion = sign_assertion(key)?;
        debug!(token_uri = %key.token_uri, "exchanging service account assertion");
        let resp = client
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| SyncError::Auth(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = snippet(resp).await;
            return Err(SyncError::Auth(format!(
                "token endpoint returned {}: {body}",
                status.as_u16()
            )));
        }
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| SyncError::Auth(format!("unexpected token response: {e}")))?;
        Ok(SecretString::new(token.access_token.into_boxed_str()))
    }
}

fn sign_assertion(key: &ServiceAccountKey) -> Result<String, SyncError> {
    let pair = RS256KeyPair::from_pem(key.private_key.expose_secret())
        .map_err(|e| SyncError::Auth(format!("invalid private key: {e}")))?;
    let claims = Claims::with_custom_claims(
        ScopeClaim {
            scope: SHEETS_SCOPE.to_string(),
        },
        JwtDuration::from_hours(1),
    )
    .with_issuer(&key.client_email)
    .with_audience(&key.token_uri);
    pair.sign(claims)
        .map_err(|e| SyncError::Auth(format!("cannot sign assertion: {e}")))
}

async fn snippet(resp: reqwest::Response) -> String {
    let body = resp.text().await.unwrap_or_default();
    body.chars().take(ERROR_SNIPPET_CHARS).collect()
}

/// A1 notation for `cells` on `sheet`, quoting names that need it.
pub fn a1_range(sheet: &str, cells: &str) -> String {
    if sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        format!("{sheet}!{cells}")
    } else {
        format!("'{}'!{cells}", sheet.replace('\'', "''"))
    }
}

/// The tab a publish writes into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetTab {
    pub id: i64,
    pub title: String,
    /// Filter views left by earlier publishes, replaced on every run.
    pub stale_filter_views: Vec<i64>,
}

impl SheetTab {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            stale_filter_views: Vec::new(),
        }
    }

    pub fn filter_view_title(&self) -> String {
        format!("{} Filter", self.title)
    }

    /// Find `title` among the `sheets` of a spreadsheet metadata response.
    fn find(meta: &Value, title: &str) -> Option<Self> {
        let sheet = meta["sheets"]
            .as_array()?
            .iter()
            .find(|s| s["properties"]["title"].as_str() == Some(title))?;
        let mut tab = Self::new(sheet["properties"]["sheetId"].as_i64()?, title);
        let filter_title = tab.filter_view_title();
        tab.stale_filter_views = sheet["filterViews"]
            .as_array()
            .into_iter()
            .flatten()
            .filter(|v| v["title"].as_str() == Some(filter_title.as_str()))
            .filter_map(|v| v["filterViewId"].as_i64())
            .collect();
        Some(tab)
    }
}

fn column_range(sheet_id: i64, start: usize, end: usize) -> Value {
    json!({"sheetId": sheet_id, "dimension": "COLUMNS", "startIndex": start, "endIndex": end})
}

/// `batchUpdate` requests that lay the sheet out for browsing:
///
/// - freeze and embolden the header rows and merge each group label across
///   its columns
/// - colour each group's columns and fix the widths of the wide columns
/// - give data rows room for the image thumbnails
/// - replace the filter view over the data from any earlier run
pub fn format_requests(tab: &SheetTab, table: &SheetTable) -> Vec<Value> {
    let sheet_id = tab.id;
    let header_rows = HEADER_ROWS as i64;
    let last_row = HEADER_ROWS + table.len();
    let mut requests: Vec<Value> = tab
        .stale_filter_views
        .iter()
        .map(|id| json!({"deleteFilterView": {"filterId": id}}))
        .collect();
    requests.extend([
        json!({"updateSheetProperties": {
            "properties": {"sheetId": sheet_id, "gridProperties": {"frozenRowCount": header_rows}},
            "fields": "gridProperties.frozenRowCount"
        }}),
        json!({"repeatCell": {
            "range": {"sheetId": sheet_id, "startRowIndex": 0, "endRowIndex": header_rows},
            "cell": {"userEnteredFormat": {"textFormat": {"bold": true}}},
            "fields": "userEnteredFormat.textFormat.bold"
        }}),
        json!({"repeatCell": {
            "range": {"sheetId": sheet_id, "startRowIndex": 0, "endRowIndex": 1},
            "cell": {"userEnteredFormat": {"horizontalAlignment": "CENTER"}},
            "fields": "userEnteredFormat.horizontalAlignment"
        }}),
        // merges from an earlier run would otherwise overlap the new ones
        json!({"unmergeCells": {
            "range": {"sheetId": sheet_id, "startRowIndex": 0, "endRowIndex": 1}
        }}),
    ]);
    for span in table.group_spans() {
        if let Some((_, [red, green, blue])) = GROUP_COLORS.iter().find(|(g, _)| *g == span.label)
        {
            requests.push(json!({"repeatCell": {
                "range": {
                    "sheetId": sheet_id,
                    "startRowIndex": 0,
                    "endRowIndex": last_row,
                    "startColumnIndex": span.start,
                    "endColumnIndex": span.end
                },
                "cell": {"userEnteredFormat": {
                    "backgroundColor": {"red": red, "green": green, "blue": blue}
                }},
                "fields": "userEnteredFormat.backgroundColor"
            }}));
        }
        if span.end - span.start > 1 {
            requests.push(json!({"mergeCells": {
                "range": {
                    "sheetId": sheet_id,
                    "startRowIndex": 0,
                    "endRowIndex": 1,
                    "startColumnIndex": span.start,
                    "endColumnIndex": span.end
                },
                "mergeType": "MERGE_ALL"
            }}));
        }
    }
    for (i, column) in table.header_columns.iter().enumerate() {
        if let Some((_, px)) = COLUMN_WIDTHS.iter().find(|(c, _)| *c == column.as_str()) {
            requests.push(json!({"updateDimensionProperties": {
                "range": column_range(sheet_id, i, i + 1),
                "properties": {"pixelSize": px},
                "fields": "pixelSize"
            }}));
        }
    }
    if !table.is_empty() {
        requests.push(json!({"updateDimensionProperties": {
            "range": {
                "sheetId": sheet_id,
                "dimension": "ROWS",
                "startIndex": HEADER_ROWS,
                "endIndex": last_row
            },
            "properties": {"pixelSize": DATA_ROW_PIXELS},
            "fields": "pixelSize"
        }}));
    }
    // the second header row carries the filter buttons
    requests.push(json!({"addFilterView": {"filter": {
        "title": tab.filter_view_title(),
        "range": {
            "sheetId": sheet_id,
            "startRowIndex": HEADER_ROWS - 1,
            "endRowIndex": last_row,
            "startColumnIndex": 0,
            "endColumnIndex": table.width()
        }
    }}}));
    requests
}

/// Publishes into one tab of an existing spreadsheet, creating the tab when
/// it does not exist yet.
pub struct GoogleSheetsPublisher {
    client: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    sheet_name: String,
    credentials: Credentials,
}

impl GoogleSheetsPublisher {
    /// `timeout` bounds every request, the token exchange included.
    pub fn new(
        base_url: &str,
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
            credentials,
        })
    }

    pub fn from_config(cfg: &SyncConfig) -> Result<Self, SyncError> {
        let PublishTarget::GoogleSheets {
            spreadsheet_id,
            sheet_name,
        } = &cfg.target
        else {
            return Err(SyncError::Config(
                "Google Sheets publisher needs a spreadsheet target".into(),
            ));
        };
        Self::new(
            &cfg.sheets_base_url,
            spreadsheet_id.clone(),
            sheet_name.clone(),
            Credentials::from_config(cfg)?,
            cfg.client.request_timeout,
        )
    }

    /// `{base}/v4/spreadsheets/{id}{suffix}` followed by `segments`, each
    /// percent-encoded as a single path segment.
    fn url(&self, suffix: &str, segments: &[&str]) -> Result<Url, SyncError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SyncError::Config(format!("invalid sheets base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| SyncError::Config("sheets base url cannot have a path".into()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets"])
            .push(&format!("{}{suffix}", self.spreadsheet_id))
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        token: &SecretString,
        what: &str,
    ) -> Result<reqwest::Response, SyncError> {
        let resp = request.bearer_auth(token.expose_secret()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = snippet(resp).await;
            return Err(SyncError::Publish(format!(
                "{what} returned {}: {body}",
                status.as_u16()
            )));
        }
        Ok(resp)
    }

    /// The target tab, added when missing.
    async fn sheet_tab(&self, token: &SecretString) -> Result<SheetTab, SyncError> {
        let url = self.url("", &[])?;
        let meta: Value = self
            .send(
                self.client.get(url).query(&[(
                    "fields",
                    "sheets(properties(sheetId,title),filterViews(filterViewId,title))",
                )]),
                token,
                "spreadsheet lookup",
            )
            .await?
            .json()
            .await?;
        if let Some(tab) = SheetTab::find(&meta, &self.sheet_name) {
            return Ok(tab);
        }

        info!(sheet = %self.sheet_name, "sheet tab missing; adding it");
        let body = json!({"requests": [{"addSheet": {"properties": {"title": self.sheet_name}}}]});
        let reply: Value = self
            .send(
                self.client.post(self.url(":batchUpdate", &[])?).json(&body),
                token,
                "add sheet",
            )
            .await?
            .json()
            .await?;
        reply["replies"][0]["addSheet"]["properties"]["sheetId"]
            .as_i64()
            .map(|id| SheetTab::new(id, self.sheet_name.clone()))
            .ok_or_else(|| SyncError::Publish("add sheet reply carried no sheetId".into()))
    }
}

#[async_trait]
impl SheetPublisher for GoogleSheetsPublisher {
    async fn publish(&self, table: &SheetTable) -> Result<usize, SyncError> {
        let token = self.credentials.access_token(&self.client).await?;
        let tab = self.sheet_tab(&token).await?;

        let clear_range = a1_range(&self.sheet_name, "A1:ZZ");
        let url = self.url("", &["values", &format!("{clear_range}:clear")])?;
        self.send(self.client.post(url).json(&json!({})), &token, "clear")
            .await?;

        let start = a1_range(&self.sheet_name, "A1");
        let url = self.url("", &["values", &start])?;
        let body = json!({
            "range": start,
            "majorDimension": "ROWS",
            "values": table.values(),
        });
        self.send(
            self.client
                .put(url)
                .query(&[("valueInputOption", "USER_ENTERED")])
                .json(&body),
            &token,
            "values update",
        )
        .await?;

        let body = json!({"requests": format_requests(&tab, table)});
        self.send(
            self.client.post(self.url(":batchUpdate", &[])?).json(&body),
            &token,
            "format",
        )
        .await?;

        info!(
            spreadsheet = %self.spreadsheet_id,
            sheet = %self.sheet_name,
            rows = table.len(),
            "sheet published"
        );
        Ok(table.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a1_quotes_names_with_spaces() {
        assert_eq!(a1_range("Exercises", "A1:ZZ"), "Exercises!A1:ZZ");
        assert_eq!(a1_range("My Sheet", "A1"), "'My Sheet'!A1");
        assert_eq!(a1_range("Bob's", "A1"), "'Bob''s'!A1");
    }

    fn requests_of<'a>(requests: &'a [Value], kind: &str) -> Vec<&'a Value> {
        requests.iter().filter_map(|r| r.get(kind)).collect()
    }

    #[test]
    fn format_requests_merge_multi_column_groups_only() {
        let table = SheetTable::from_records(&[]);
        let requests = format_requests(&SheetTab::new(7, "Exercises"), &table);
        let merges: Vec<(u64, u64)> = requests
            .iter()
            .filter_map(|r| r.get("mergeCells"))
            .map(|m| {
                (
                    m["range"]["startColumnIndex"].as_u64().unwrap_or_default(),
                    m["range"]["endColumnIndex"].as_u64().unwrap_or_default(),
                )
            })
            .collect();
        assert_eq!(merges, [(0, 2), (4, 6), (7, 14)]);
        assert_eq!(
            requests[0]["updateSheetProperties"]["properties"]["gridProperties"]["frozenRowCount"],
            2
        );
        assert_eq!(requests[1]["repeatCell"]["range"]["sheetId"], 7);
    }

    #[test]
    fn format_requests_lay_out_data_for_browsing() {
        let table = SheetTable::from_records(&[
            garmin_exercises_client::ExerciseRecord::new(
                garmin_exercises_client::ExerciseIdentifier::new("PLANK", "PLANK"),
            ),
            garmin_exercises_client::ExerciseRecord::new(
                garmin_exercises_client::ExerciseIdentifier::new("SQUAT", "AIR_SQUAT"),
            ),
        ]);
        let mut tab = SheetTab::new(7, "Exercises");
        tab.stale_filter_views = vec![11, 12];
        let requests = format_requests(&tab, &table);

        assert_eq!(requests[0]["deleteFilterView"]["filterId"], 11);
        assert_eq!(requests[1]["deleteFilterView"]["filterId"], 12);

        // one background per coloured group, down to the last data row
        let colours: Vec<(u64, u64)> = requests_of(&requests, "repeatCell")
            .into_iter()
            .filter(|r| r["fields"] == "userEnteredFormat.backgroundColor")
            .map(|r| {
                assert_eq!(r["range"]["endRowIndex"], 4);
                (
                    r["range"]["startColumnIndex"].as_u64().unwrap_or_default(),
                    r["range"]["endColumnIndex"].as_u64().unwrap_or_default(),
                )
            })
            .collect();
        assert_eq!(colours, [(2, 3), (4, 6), (6, 7), (7, 14)]);

        let dims = requests_of(&requests, "updateDimensionProperties");
        let widths: Vec<(u64, u64)> = dims
            .iter()
            .filter(|d| d["range"]["dimension"] == "COLUMNS")
            .map(|d| {
                (
                    d["range"]["startIndex"].as_u64().unwrap_or_default(),
                    d["properties"]["pixelSize"].as_u64().unwrap_or_default(),
                )
            })
            .collect();
        assert_eq!(
            widths,
            [(0, 150), (1, 150), (2, 400), (7, 60), (8, 90), (9, 150), (11, 150), (13, 60)]
        );
        let rows: Vec<&&Value> = dims
            .iter()
            .filter(|d| d["range"]["dimension"] == "ROWS")
            .collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["range"]["startIndex"], 2);
        assert_eq!(rows[0]["range"]["endIndex"], 4);
        assert_eq!(rows[0]["properties"]["pixelSize"], 103);

        let filter = requests.last().expect("requests")["addFilterView"]["filter"].clone();
        assert_eq!(filter["title"], "Exercises Filter");
        assert_eq!(filter["range"]["startRowIndex"], 1);
        assert_eq!(filter["range"]["endRowIndex"], 4);
        assert_eq!(filter["range"]["endColumnIndex"], 14);
    }

    #[test]
    fn empty_table_keeps_default_row_heights() {
        let table = SheetTable::from_records(&[]);
        let requests = format_requests(&SheetTab::new(7, "Exercises"), &table);
        assert!(
            requests_of(&requests, "updateDimensionProperties")
                .iter()
                .all(|d| d["range"]["dimension"] == "COLUMNS")
        );
        assert!(requests_of(&requests, "deleteFilterView").is_empty());
    }

    #[test]
    fn tab_lookup_collects_only_our_filter_views() {
        let meta = json!({"sheets": [
            {"properties": {"sheetId": 0, "title": "Sheet1"}},
            {
                "properties": {"sheetId": 7, "title": "Exercises"},
                "filterViews": [
                    {"filterViewId": 11, "title": "Exercises Filter"},
                    {"filterViewId": 12, "title": "My own view"}
                ]
            }
        ]});
        let tab = SheetTab::find(&meta, "Exercises").expect("tab");
        assert_eq!(tab.id, 7);
        assert_eq!(tab.stale_filter_views, [11]);
        assert!(SheetTab::find(&meta, "Missing").is_none());
        assert!(SheetTab::find(&json!({}), "Exercises").is_none());
    }

    #[test]
    fn service_account_key_defaults_token_uri() {
        let creds = Credentials::from_service_account_json(
            r#"{"client_email": "bot@example.iam", "private_key": "---"}"#,
        )
        .expect("creds");
        let Credentials::ServiceAccount(key) = creds else {
            panic!("expected service account");
        };
        assert_eq!(key.token_uri, DEFAULT_TOKEN_URI);
        assert_eq!(key.client_email, "bot@example.iam");
    }

    #[test]
    fn missing_key_file_is_auth_error() {
        let err = Credentials::from_key_file(Path::new("/nonexistent/credentials.json"))
            .unwrap_err();
        assert!(matches!(err, SyncError::Auth(_)));
    }

    #[tokio::test]
    async fn garbage_private_key_fails_before_any_request() {
        let creds = Credentials::from_service_account_json(
            r#"{"client_email": "bot@example.iam", "private_key": "not a pem", "token_uri": "http://127.0.0.1:9/token"}"#,
        )
        .expect("creds");
        let err = creds
            .access_token(&reqwest::Client::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid private key"));
    }

    #[test]
    fn publisher_requires_sheet_target() {
        let cfg = SyncConfig::from_env_with(|k| {
            (k == "GARMIN_SYNC_DRY_RUN_PATH").then(|| "out.json".to_string())
        })
        .expect("cfg");
        assert!(matches!(
            GoogleSheetsPublisher::from_config(&cfg),
            Err(SyncError::Config(_))
        ));
    }
}
