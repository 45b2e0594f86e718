use serde::Deserialize;
use thiserror::Error;

/// Errors from the content API boundary.
///
/// `Transport` and `Decode` are the transient kind: the caller may retry the
/// same operation with the same cursor. `NotFound` is terminal for the
/// requested document.
#[derive(Debug, Error)]
pub enum CmsError {
    #[error("document not found")]
    NotFound,
    #[error("repository exposes no master ref")]
    NoMasterRef,
    #[error("CMS returned HTTP {status} for {url}")]
    Http {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error("request to CMS failed")]
    Transport(#[from] reqwest::Error),
    #[error("failed to decode CMS response")]
    Decode(#[source] serde_json::Error),
}

/// One raw document as returned by the query API.
///
/// `uid` and the publication dates are nullable on purpose: unpublished
/// drafts and preview-only documents legitimately lack them. The `data`
/// payload is schemaless here; it is validated at the formatting boundary
/// (see `post.rs`).
#[derive(Debug, Clone, Deserialize)]
pub struct RawDocument {
    pub id: String,
    pub uid: Option<String>,
    pub first_publication_date: Option<String>,
    pub last_publication_date: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Envelope of a paged query. `next_page` is an opaque continuation URL;
/// `None` means no further pages exist.
#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    pub next_page: Option<String>,
    pub results: Vec<RawDocument>,
    #[serde(default)]
    pub total_results_size: u64,
}

/// Repository metadata from the API root, used to resolve the master ref.
#[derive(Debug, Deserialize)]
pub struct ApiInfo {
    pub refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
pub struct ApiRef {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(rename = "isMasterRef", default)]
    pub is_master_ref: bool,
}

impl ApiInfo {
    pub fn master_ref(&self) -> Option<&str> {
        self.refs
            .iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference.as_str())
    }
}

/// Parameters for one paged query: document-type filter, field selection,
/// page size, ordering expression, and any extra predicates.
#[derive(Debug, Clone)]
pub struct Query {
    pub document_type: String,
    pub fetch: Vec<String>,
    pub page_size: usize,
    pub orderings: Option<String>,
    pub predicates: Vec<String>,
}

impl Query {
    pub fn for_type(document_type: &str) -> Self {
        Query {
            document_type: document_type.to_string(),
            fetch: Vec::new(),
            page_size: 20,
            orderings: None,
            predicates: Vec::new(),
        }
    }

    /// The `q` expression: the type filter plus any extra predicates, each
    /// in its own bracket group.
    fn q_expression(&self) -> String {
        let mut q = format!("[[at(document.type,\"{}\")]", self.document_type);
        for predicate in &self.predicates {
            q.push('[');
            q.push_str(predicate);
            q.push(']');
        }
        q.push(']');
        q
    }

    fn to_params(&self, reference: &str) -> Vec<(String, String)> {
        let mut params = vec![
            ("ref".to_string(), reference.to_string()),
            ("q".to_string(), self.q_expression()),
            ("pageSize".to_string(), self.page_size.to_string()),
        ];
        if !self.fetch.is_empty() {
            params.push(("fetch".to_string(), self.fetch.join(",")));
        }
        if let Some(orderings) = &self.orderings {
            params.push(("orderings".to_string(), format!("[{}]", orderings)));
        }
        params
    }
}

/// Blocking client for a Prismic-style repository endpoint.
///
/// Construction resolves the ref to query against: the preview ref when one
/// is supplied, otherwise the repository's master ref from the API root.
pub struct Client {
    api_url: String,
    reference: String,
    http: reqwest::blocking::Client,
}

impl Client {
    pub fn new(api_url: &str, preview_ref: Option<&str>) -> Result<Self, CmsError> {
        let http = reqwest::blocking::Client::new();
        let reference = match preview_ref {
            Some(r) => r.to_string(),
            None => {
                let info = fetch_api_info(&http, api_url)?;
                info.master_ref().ok_or(CmsError::NoMasterRef)?.to_string()
            }
        };
        Ok(Client {
            api_url: api_url.trim_end_matches('/').to_string(),
            reference,
            http,
        })
    }

    /// Run a paged query against `/documents/search`.
    pub fn query(&self, query: &Query) -> Result<QueryResponse, CmsError> {
        let url = format!("{}/documents/search", self.api_url);
        let resp = self
            .http
            .get(&url)
            .query(&query.to_params(&self.reference))
            .header("Accept", "application/json")
            .send()?;
        decode_response(resp)
    }

    /// Follow a continuation URL returned by a previous query. The URL is
    /// opaque; it already carries the ref, cursor, and page parameters.
    pub fn query_url(&self, next_page: &str) -> Result<QueryResponse, CmsError> {
        let resp = self
            .http
            .get(next_page)
            .header("Accept", "application/json")
            .send()?;
        decode_response(resp)
    }

    /// Fetch a single document by its unique slug within a document type.
    pub fn get_by_uid(&self, document_type: &str, uid: &str) -> Result<RawDocument, CmsError> {
        let mut query = Query::for_type(document_type);
        query.page_size = 1;
        query.predicates = vec![format!(
            "at(my.{}.uid,\"{}\")",
            document_type,
            uid.replace('"', "")
        )];
        let mut response = self.query(&query)?;
        if response.results.is_empty() {
            return Err(CmsError::NotFound);
        }
        Ok(response.results.remove(0))
    }
}

fn fetch_api_info(
    http: &reqwest::blocking::Client,
    api_url: &str,
) -> Result<ApiInfo, CmsError> {
    let resp = http
        .get(api_url)
        .header("Accept", "application/json")
        .send()?;
    decode_response(resp)
}

fn decode_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::blocking::Response,
) -> Result<T, CmsError> {
    let status = resp.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(CmsError::NotFound);
    }
    if !status.is_success() {
        return Err(CmsError::Http {
            status,
            url: resp.url().to_string(),
        });
    }
    let body = resp.text()?;
    serde_json::from_str(&body).map_err(CmsError::Decode)
}
