//! Exporter: pages through a model's intersection data.
//!
//! Each page response looks like
//!
//! ```json
//! {
//!   "data": [["Account", "Entity", "Value"], ["3910", "V001", "1000"]],
//!   "metadata": {"headers": ["Account", "Entity", "Value"], "nextPage": null}
//! }
//! ```
//!
//! The first `data` row repeats the header and is dropped. Whether another
//! page follows is decided, in order, by:
//! 1. `metadata.nextPage`, when the key is present: a link to follow, a page
//!    number to request next to `pageSize`, or `null` to stop
//! 2. `metadata.hasMore`, when present: request page `n + 1`
//! 3. otherwise a full page (`page_size` rows) means request page `n + 1`,
//!    and a short page means stop. A final page of exactly `page_size` rows
//!    therefore costs one extra, empty request.
//!
//! Pages are concatenated into one [`Table`]. Any failed page fails the whole
//! export; partial results are discarded. Requesting a URL twice is treated
//! as a continuation cycle and fails the export.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::client::VenaClient;
use crate::error::VenaError;
use crate::job::Clock;
use crate::table::{Scalar, Table};
use crate::transport::{ApiRequest, Transport};

/// What to request after a page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NextPage {
    /// Follow the link the API returned.
    Link(String),
    /// Request the page number the API returned.
    Page(u64),
    /// Request the next page number.
    Offset,
    /// No more data.
    Done,
}

/// Value of `metadata.nextPage`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageCursor {
    Link(String),
    Page(u64),
    /// `null` or an empty string.
    End,
}

/// One decoded page of intersections.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExportPage {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Scalar>>,
    /// `None` when the page has no `nextPage` key.
    pub next_page: Option<PageCursor>,
    pub has_more: Option<bool>,
}

impl ExportPage {
    /// Decodes a page response body.
    pub fn from_json(body: &Value) -> Result<Self, String> {
        let root = body.as_object().ok_or("page is not a JSON object")?;
        let empty = Map::new();
        let metadata = match root.get("metadata") {
            Some(Value::Object(map)) => map,
            Some(Value::Null) | None => &empty,
            Some(_) => return Err("'metadata' is not an object".to_string()),
        };

        let mut data: Vec<Vec<Scalar>> = match root.get("data") {
            Some(Value::Array(rows)) => rows
                .iter()
                .enumerate()
                .map(|(idx, row)| match row {
                    Value::Array(cells) => {
                        Ok(cells.iter().map(Scalar::from_json).collect::<Vec<_>>())
                    }
                    _ => Err(format!("data row {idx} is not an array")),
                })
                .collect::<Result<Vec<_>, String>>()?,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err("'data' is not an array".to_string()),
        };

        let headers: Vec<String> = match metadata.get("headers") {
            Some(Value::Array(names)) => names
                .iter()
                .map(|name| match name {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            _ if !data.is_empty() => data[0].iter().map(|c| c.to_string()).collect(),
            _ => Vec::new(),
        };

        let repeats_header = data.first().is_some_and(|first| {
            first.len() == headers.len()
                && first.iter().zip(&headers).all(|(c, h)| c.to_string() == *h)
        });
        if repeats_header {
            data.remove(0);
        }

        if let Some((idx, row)) = data
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != headers.len())
        {
            return Err(format!(
                "data row {} has {} values but there are {} headers",
                idx,
                row.len(),
                headers.len()
            ));
        }

        let next_page = match metadata.get("nextPage") {
            None => None,
            Some(cursor) => Some(parse_cursor(cursor)?),
        };
        let has_more = metadata.get("hasMore").and_then(Value::as_bool);

        Ok(Self {
            headers,
            rows: data,
            next_page,
            has_more,
        })
    }

    /// Decodes a page from raw bytes.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, String> {
        let body: Value = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        Self::from_json(&body)
    }

    /// Applies the continuation rules for a request of `page_size` rows.
    pub fn next(&self, page_size: usize) -> NextPage {
        if let Some(cursor) = &self.next_page {
            return match cursor {
                PageCursor::Link(link) => NextPage::Link(link.clone()),
                PageCursor::Page(page) => NextPage::Page(*page),
                PageCursor::End => NextPage::Done,
            };
        }
        match self.has_more {
            Some(true) => NextPage::Offset,
            Some(false) => NextPage::Done,
            None if self.rows.len() >= page_size => NextPage::Offset,
            None => NextPage::Done,
        }
    }
}

impl<T: Transport, C: Clock> VenaClient<T, C> {
    /// Downloads all intersection data of the configured model.
    ///
    /// # Errors
    /// - [`VenaError::Configuration`] without a model id or with
    ///   `page_size == 0`, before any request is made
    /// - [`VenaError::Transport`] / [`VenaError::UnexpectedResponse`] on the
    ///   first failing page
    pub fn export_data(&self, page_size: usize) -> Result<Table, VenaError> {
        let model_id = self.config().require_model_id("export data")?;
        if page_size == 0 {
            return Err(VenaError::Configuration(
                "page_size must be a positive integer".to_string(),
            ));
        }

        let intersections = self.endpoint(&["models", model_id, "intersections"])?;
        let mut request = ApiRequest::get(&intersections).query("pageSize", page_size);
        let mut table: Option<Table> = None;
        let mut pages = 0usize;
        let mut requested = HashSet::new();

        loop {
            let url = request.full_url()?.to_string();
            if !requested.insert(url.clone()) {
                return Err(VenaError::UnexpectedResponse {
                    url,
                    message: "nextPage points back at a page that was already fetched"
                        .to_string(),
                });
            }
            debug!(page = pages + 1, url = %url, "requesting export page");
            let body = self.execute(request)?.json(&url)?;
            let page = ExportPage::from_json(&body)
                .map_err(|message| VenaError::UnexpectedResponse {
                    url: url.clone(),
                    message,
                })?;
            pages += 1;

            let next = page.next(page_size);
            accumulate(&mut table, page, &url)?;
            let fetched = table.as_ref().map(Table::num_rows).unwrap_or(0);

            request = match next {
                NextPage::Done => break,
                NextPage::Link(link) => ApiRequest::get(self.resolve_link(&link)?),
                NextPage::Page(page) => ApiRequest::get(&intersections)
                    .query("pageSize", page_size)
                    .query("page", page),
                NextPage::Offset => ApiRequest::get(&intersections)
                    .query("pageSize", page_size)
                    .query("page", pages + 1),
            };
            info!(records = fetched, "fetching next page");
        }

        let table = table.unwrap_or_default();
        info!(records = table.num_rows(), pages, "export finished");
        Ok(table)
    }
}

/// Strings of digits count as page numbers.
fn parse_cursor(cursor: &Value) -> Result<PageCursor, String> {
    match cursor {
        Value::Null => Ok(PageCursor::End),
        Value::String(s) if s.trim().is_empty() => Ok(PageCursor::End),
        Value::String(s) => Ok(match s.trim().parse::<u64>() {
            Ok(page) => PageCursor::Page(page),
            Err(_) => PageCursor::Link(s.clone()),
        }),
        Value::Number(n) => n
            .as_u64()
            .map(PageCursor::Page)
            .ok_or_else(|| format!("'nextPage' {n} is not a page number")),
        other => Err(format!(
            "'nextPage' must be a link, a page number or null, got {other}"
        )),
    }
}

fn accumulate(acc: &mut Option<Table>, page: ExportPage, url: &str) -> Result<(), VenaError> {
    let unexpected = |message: String| VenaError::UnexpectedResponse {
        url: url.to_string(),
        message,
    };

    // Trailing empty pages may omit headers.
    if acc.is_some() && page.rows.is_empty() {
        return Ok(());
    }
    let next = Table::from_rows(page.headers, page.rows).map_err(|e| unexpected(e.to_string()))?;
    match acc {
        None => *acc = Some(next),
        Some(table) => table.append(next).map_err(|e| unexpected(e.to_string()))?,
    }
    Ok(())
}
