//! GraphQL transport for the clip connection.
//!
//! `ClipFilter` is a typed builder for the backend's `EntClipMetadataWhereInput`:
//! every predicate is a (field, comparison, value) triple that serializes to the
//! flat `<field><Suffix>` key the schema expects, e.g. `wordContains`.

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::clip::{ClipConnection, Cursor};

/// Fields of a clip record that can be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipField {
  Id,
  Filename,
  FileUrl,
  FileSize,
  Duration,
  Format,
  Word,
  Sentence,
  Thumbnail,
}

impl ClipField {
  fn graphql_name(self) -> &'static str {
    match self {
      ClipField::Id => "id",
      ClipField::Filename => "filename",
      ClipField::FileUrl => "fileURL",
      ClipField::FileSize => "fileSize",
      ClipField::Duration => "duration",
      ClipField::Format => "format",
      ClipField::Word => "word",
      ClipField::Sentence => "sentence",
      ClipField::Thumbnail => "thumbnail",
    }
  }

  fn is_numeric(self) -> bool {
    matches!(self, ClipField::FileSize | ClipField::Duration)
  }

  /// Text comparisons (contains, prefix, fold) exist only on free-text fields.
  fn supports_text_ops(self) -> bool {
    !self.is_numeric() && self != ClipField::Id
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
  Eq,
  Neq,
  Contains,
  ContainsFold,
  EqualFold,
  HasPrefix,
  HasSuffix,
  Gt,
  Gte,
  Lt,
  Lte,
  In,
  NotIn,
}

impl Comparison {
  fn suffix(self) -> &'static str {
    match self {
      Comparison::Eq => "",
      Comparison::Neq => "NEQ",
      Comparison::Contains => "Contains",
      Comparison::ContainsFold => "ContainsFold",
      Comparison::EqualFold => "EqualFold",
      Comparison::HasPrefix => "HasPrefix",
      Comparison::HasSuffix => "HasSuffix",
      Comparison::Gt => "GT",
      Comparison::Gte => "GTE",
      Comparison::Lt => "LT",
      Comparison::Lte => "LTE",
      Comparison::In => "In",
      Comparison::NotIn => "NotIn",
    }
  }

  fn is_text_op(self) -> bool {
    matches!(
      self,
      Comparison::Contains
        | Comparison::ContainsFold
        | Comparison::EqualFold
        | Comparison::HasPrefix
        | Comparison::HasSuffix
    )
  }

  fn is_set_op(self) -> bool {
    matches!(self, Comparison::In | Comparison::NotIn)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
  Text(String),
  Int(i64),
  List(Vec<FilterValue>),
}

impl FilterValue {
  fn to_json(&self) -> Value {
    match self {
      FilterValue::Text(s) => Value::String(s.clone()),
      FilterValue::Int(n) => Value::from(*n),
      FilterValue::List(items) => Value::Array(items.iter().map(FilterValue::to_json).collect()),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
  pub field: ClipField,
  pub op: Comparison,
  pub value: FilterValue,
}

/// Composable clip predicate. Sibling predicates are implicitly AND-ed by the backend.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClipFilter {
  predicates: Vec<Predicate>,
  and: Vec<ClipFilter>,
  or: Vec<ClipFilter>,
  not: Option<Box<ClipFilter>>,
}

impl ClipFilter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, field: ClipField, op: Comparison, value: FilterValue) -> Self {
    self.predicates.push(Predicate { field, op, value });
    self
  }

  pub fn contains(self, field: ClipField, needle: &str) -> Self {
    self.with(field, Comparison::Contains, FilterValue::Text(needle.to_string()))
  }

  #[cfg(test)]
  pub fn and(mut self, other: ClipFilter) -> Self {
    self.and.push(other);
    self
  }

  pub fn or(mut self, other: ClipFilter) -> Self {
    self.or.push(other);
    self
  }

  #[cfg(test)]
  pub fn negate(mut self, other: ClipFilter) -> Self {
    self.not = Some(Box::new(other));
    self
  }

  /// Serialize into the `where` input object, validating operator/field/value combinations.
  pub fn to_where_input(&self) -> Result<Value> {
    let mut map = Map::new();
    for p in &self.predicates {
      validate(p)?;
      let key = format!("{}{}", p.field.graphql_name(), p.op.suffix());
      if map.insert(key.clone(), p.value.to_json()).is_some() {
        return Err(anyhow!("duplicate predicate '{}' in clip filter", key));
      }
    }
    if !self.and.is_empty() {
      let nested = self.and.iter().map(ClipFilter::to_where_input).collect::<Result<Vec<_>>>()?;
      map.insert("and".to_string(), Value::Array(nested));
    }
    if !self.or.is_empty() {
      let nested = self.or.iter().map(ClipFilter::to_where_input).collect::<Result<Vec<_>>>()?;
      map.insert("or".to_string(), Value::Array(nested));
    }
    if let Some(ref inner) = self.not {
      map.insert("not".to_string(), inner.to_where_input()?);
    }
    Ok(Value::Object(map))
  }
}

fn validate(p: &Predicate) -> Result<()> {
  let name = p.field.graphql_name();
  if p.op.is_text_op() && !p.field.supports_text_ops() {
    return Err(anyhow!("{:?} is not supported on '{}'", p.op, name));
  }
  match (&p.value, p.op.is_set_op()) {
    (FilterValue::List(items), true) => {
      for item in items {
        check_scalar(p.field, item)?;
      }
      Ok(())
    }
    (FilterValue::List(_), false) => Err(anyhow!("{:?} on '{}' takes a single value, not a list", p.op, name)),
    (_, true) => Err(anyhow!("{:?} on '{}' takes a list", p.op, name)),
    (scalar, false) => check_scalar(p.field, scalar),
  }
}

fn check_scalar(field: ClipField, value: &FilterValue) -> Result<()> {
  match (value, field.is_numeric()) {
    (FilterValue::Int(_), true) | (FilterValue::Text(_), false) => Ok(()),
    (FilterValue::List(_), _) => Err(anyhow!("nested lists are not valid for '{}'", field.graphql_name())),
    _ => Err(anyhow!("value type does not match field '{}'", field.graphql_name())),
  }
}

// --- Query document ---

pub const CLIP_PAGE_QUERY: &str = r#"query ClipPageQuery(
  $first: Int
  $after: Cursor
  $last: Int
  $before: Cursor
  $where: EntClipMetadataWhereInput!
) {
  entClipMetadataSlice(first: $first, after: $after, last: $last, before: $before, where: $where) {
    totalCount
    edges {
      cursor
      node {
        id
        filename
        fileURL
        fileSize
        duration
        format
        word
        sentence
        thumbnail
      }
    }
    pageInfo {
      hasNextPage
      hasPreviousPage
      startCursor
      endCursor
    }
  }
}"#;

/// Which slice of the connection to request.
#[derive(Debug, Clone, PartialEq)]
pub enum PageWindow {
  /// `first` items after the optional cursor.
  Forward { count: usize, after: Option<Cursor> },
  /// `last` items before the cursor.
  Backward { count: usize, before: Cursor },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClipPageVariables {
  #[serde(skip_serializing_if = "Option::is_none")]
  first: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  after: Option<Cursor>,
  #[serde(skip_serializing_if = "Option::is_none")]
  last: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  before: Option<Cursor>,
  #[serde(rename = "where")]
  filter: Value,
}

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a> {
  query: &'a str,
  variables: ClipPageVariables,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
  message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClipPageData {
  ent_clip_metadata_slice: ClipConnection,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
  data: Option<ClipPageData>,
  #[serde(default)]
  errors: Vec<GraphqlError>,
}

fn build_request(filter: &ClipFilter, window: &PageWindow) -> Result<GraphqlRequest<'static>> {
  let filter = filter.to_where_input()?;
  let variables = match window {
    PageWindow::Forward { count, after } => {
      ClipPageVariables { first: Some(*count), after: after.clone(), last: None, before: None, filter }
    }
    PageWindow::Backward { count, before } => {
      ClipPageVariables { first: None, after: None, last: Some(*count), before: Some(before.clone()), filter }
    }
  };
  Ok(GraphqlRequest { query: CLIP_PAGE_QUERY, variables })
}

fn decode_response(body: &str) -> Result<ClipConnection> {
  let response: GraphqlResponse = serde_json::from_str(body).context("Malformed GraphQL response")?;
  if !response.errors.is_empty() {
    let messages: Vec<&str> = response.errors.iter().map(|e| e.message.as_str()).collect();
    return Err(anyhow!("GraphQL error: {}", messages.join("; ")));
  }
  response.data.map(|d| d.ent_clip_metadata_slice).ok_or_else(|| anyhow!("GraphQL response carried no data"))
}

/// HTTP client for the clip GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct ClipClient {
  http: Client,
  endpoint: Url,
}

impl ClipClient {
  pub fn new(endpoint: Url, timeout: Duration) -> Result<Self> {
    let http = Client::builder().timeout(timeout).build().context("Failed to build HTTP client")?;
    Ok(Self { http, endpoint })
  }

  /// Shared HTTP client, reused for thumbnails and downloads.
  pub fn http(&self) -> &Client {
    &self.http
  }

  /// Fetch one page of clips. Always goes to the network.
  pub async fn fetch_page(&self, filter: &ClipFilter, window: &PageWindow) -> Result<ClipConnection> {
    let request = build_request(filter, window)?;
    debug!(endpoint = %self.endpoint, ?window, "graphql: fetching clip page");

    let response = self
      .http
      .post(self.endpoint.clone())
      .json(&request)
      .send()
      .await
      .with_context(|| format!("Failed to reach GraphQL endpoint {}", self.endpoint))?;

    let status = response.status();
    let body = response.text().await.context("Failed to read GraphQL response body")?;
    if !status.is_success() {
      warn!(%status, "graphql: non-success status");
      // GraphQL servers often put a useful `errors` array in 4xx bodies.
      return match decode_response(&body) {
        Err(e) => Err(e.context(format!("HTTP {}", status))),
        Ok(_) => Err(anyhow!("GraphQL endpoint returned HTTP {}", status)),
      };
    }
    decode_response(&body)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn contains_serializes_to_flat_key() {
    let filter = ClipFilter::new().contains(ClipField::Word, "hello");
    assert_eq!(filter.to_where_input().unwrap(), json!({ "wordContains": "hello" }));
  }

  #[test]
  fn equality_uses_bare_field_name() {
    let filter = ClipFilter::new()
      .with(ClipField::Format, Comparison::Eq, FilterValue::Text("mp4".into()))
      .with(ClipField::FileUrl, Comparison::HasPrefix, FilterValue::Text("clips/".into()));
    assert_eq!(filter.to_where_input().unwrap(), json!({ "format": "mp4", "fileURLHasPrefix": "clips/" }));
  }

  #[test]
  fn ranges_sets_and_composition() {
    let short = ClipFilter::new().with(ClipField::Duration, Comparison::Lte, FilterValue::Int(10));
    let formats = ClipFilter::new().with(
      ClipField::Format,
      Comparison::In,
      FilterValue::List(vec![FilterValue::Text("mp4".into()), FilterValue::Text("webm".into())]),
    );
    let filter = ClipFilter::new()
      .with(ClipField::FileSize, Comparison::Gt, FilterValue::Int(0))
      .or(short)
      .or(formats)
      .negate(ClipFilter::new().contains(ClipField::Sentence, "bad"));
    assert_eq!(
      filter.to_where_input().unwrap(),
      json!({
        "fileSizeGT": 0,
        "or": [ { "durationLTE": 10 }, { "formatIn": ["mp4", "webm"] } ],
        "not": { "sentenceContains": "bad" }
      })
    );
  }

  #[test]
  fn and_nests_filters() {
    let filter = ClipFilter::new()
      .contains(ClipField::Word, "cat")
      .and(ClipFilter::new().with(ClipField::Format, Comparison::Eq, FilterValue::Text("mp4".into())));
    assert_eq!(filter.to_where_input().unwrap(), json!({ "wordContains": "cat", "and": [ { "format": "mp4" } ] }));
  }

  #[test]
  fn text_ops_on_numeric_fields_are_rejected() {
    let filter = ClipFilter::new().contains(ClipField::FileSize, "12");
    assert!(filter.to_where_input().is_err());
    let filter = ClipFilter::new().contains(ClipField::Id, "12");
    assert!(filter.to_where_input().is_err());
  }

  #[test]
  fn value_shape_is_checked() {
    let scalar_in = ClipFilter::new().with(ClipField::Id, Comparison::In, FilterValue::Text("1".into()));
    assert!(scalar_in.to_where_input().is_err());
    let list_eq = ClipFilter::new().with(ClipField::Word, Comparison::Eq, FilterValue::List(vec![]));
    assert!(list_eq.to_where_input().is_err());
    let wrong_type = ClipFilter::new().with(ClipField::Duration, Comparison::Gt, FilterValue::Text("x".into()));
    assert!(wrong_type.to_where_input().is_err());
  }

  #[test]
  fn duplicate_keys_are_rejected() {
    let filter = ClipFilter::new().contains(ClipField::Word, "a").contains(ClipField::Word, "b");
    assert!(filter.to_where_input().is_err());
  }

  #[test]
  fn forward_window_sets_first_and_after() {
    let filter = ClipFilter::new().contains(ClipField::Filename, "cat");
    let req = build_request(&filter, &PageWindow::Forward { count: 5, after: Some(Cursor("abc".into())) }).unwrap();
    let body = serde_json::to_value(&req).unwrap();
    assert_eq!(body["variables"], json!({ "first": 5, "after": "abc", "where": { "filenameContains": "cat" } }));
    assert!(body["query"].as_str().unwrap().contains("entClipMetadataSlice"));
  }

  #[test]
  fn backward_window_sets_last_and_before() {
    let req =
      build_request(&ClipFilter::new(), &PageWindow::Backward { count: 3, before: Cursor("zz".into()) }).unwrap();
    let body = serde_json::to_value(&req).unwrap();
    assert_eq!(body["variables"], json!({ "last": 3, "before": "zz", "where": {} }));
  }

  #[test]
  fn decode_success() {
    let body = json!({
      "data": { "entClipMetadataSlice": {
        "totalCount": 7,
        "edges": [ { "cursor": "c1", "node": {
          "id": "1", "filename": "a.mp4", "fileURL": "a.mp4", "fileSize": 100,
          "duration": 1.5, "format": "mp4", "word": "apple", "sentence": "An apple.", "thumbnail": "a.jpg"
        } } ],
        "pageInfo": { "hasNextPage": true, "hasPreviousPage": false, "startCursor": "c1", "endCursor": "c1" }
      } }
    })
    .to_string();
    let conn = decode_response(&body).unwrap();
    assert_eq!(conn.total_count, 7);
    assert!(conn.page_info.has_next_page);
    assert_eq!(conn.edges.len(), 1);
  }

  #[test]
  fn decode_surfaces_graphql_errors() {
    let body = json!({ "data": null, "errors": [ { "message": "boom" }, { "message": "again" } ] }).to_string();
    let err = decode_response(&body).unwrap_err();
    assert_eq!(err.to_string(), "GraphQL error: boom; again");
  }

  #[test]
  fn decode_rejects_missing_data() {
    assert!(decode_response(r#"{"data":null}"#).is_err());
    assert!(decode_response("<html>").is_err());
  }
}
