use crate::cms::{Client, CmsError, QueryResponse};
use crate::post::{MalformedRecord, PostSummary};
use thiserror::Error;

/// Why a "load more" attempt produced no page: the transport/API call
/// failed, or a returned record could not be formatted.
#[derive(Debug, Error)]
pub enum FetchPageError {
    #[error(transparent)]
    Cms(#[from] CmsError),
    #[error(transparent)]
    Malformed(#[from] MalformedRecord),
}

/// One formatted page of the listing: its summaries in arrival order plus
/// the continuation cursor for the page after it. A `None` cursor means the
/// listing is exhausted.
#[derive(Debug, Clone)]
pub struct PostPage {
    pub next_page: Option<String>,
    pub results: Vec<PostSummary>,
}

impl PostPage {
    /// Format every raw record of a query response. All-or-nothing: one
    /// malformed record fails the whole page rather than producing a
    /// partial listing.
    pub fn from_response(response: &QueryResponse) -> Result<PostPage, MalformedRecord> {
        let results = response
            .results
            .iter()
            .map(PostSummary::from_raw)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PostPage {
            next_page: response.next_page.clone(),
            results,
        })
    }
}

/// Retrieval of one listing page via a continuation cursor. A trait seam so
/// tests can substitute counting or failing fetchers for the HTTP client.
pub trait PageFetcher {
    fn fetch_page(&self, cursor: &str) -> Result<PostPage, FetchPageError>;
}

impl PageFetcher for Client {
    fn fetch_page(&self, cursor: &str) -> Result<PostPage, FetchPageError> {
        let response = self.query_url(cursor)?;
        Ok(PostPage::from_response(&response)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Fetching,
}

/// Outcome of one "load more" trigger.
#[derive(Debug, PartialEq, Eq)]
pub enum LoadMore {
    /// A page arrived; this many summaries were appended.
    Appended(usize),
    /// The cursor was already exhausted; nothing was fetched.
    NoMorePages,
    /// A fetch was already in flight; the trigger was ignored.
    AlreadyLoading,
}

/// Accumulated post listing with at-most-one fetch in flight.
///
/// Seeded from the statically-fetched first page, then grown one page per
/// trigger. Items stay in arrival order; the listing never re-sorts or
/// dedupes (duplicate uids would be a paging bug upstream, not something to
/// paper over here). A failed fetch returns to Idle with the cursor and
/// items untouched, so the same trigger can simply be retried.
#[derive(Debug)]
pub struct PostListing {
    items: Vec<PostSummary>,
    cursor: Option<String>,
    state: State,
}

impl PostListing {
    pub fn new(first_page: PostPage) -> Self {
        PostListing {
            items: first_page.results,
            cursor: first_page.next_page,
            state: State::Idle,
        }
    }

    pub fn items(&self) -> &[PostSummary] {
        &self.items
    }

    pub fn has_more(&self) -> bool {
        self.cursor.is_some()
    }

    /// Idle -> Fetching. Yields the cursor to fetch, or `None` when a fetch
    /// is already in flight or the listing is exhausted.
    pub fn begin_load(&mut self) -> Option<String> {
        if self.state == State::Fetching {
            return None;
        }
        let cursor = self.cursor.clone()?;
        self.state = State::Fetching;
        Some(cursor)
    }

    /// Fetching -> Idle on success: append in arrival order and replace the
    /// cursor with the page's continuation (possibly `None`, terminating
    /// future fetches).
    pub fn complete(&mut self, page: PostPage) {
        self.items.extend(page.results);
        self.cursor = page.next_page;
        self.state = State::Idle;
    }

    /// Fetching -> Idle on failure: state is left exactly as before the
    /// attempt.
    pub fn fail(&mut self) {
        self.state = State::Idle;
    }

    /// Drive one full trigger cycle against a fetcher.
    pub fn load_more(&mut self, fetcher: &impl PageFetcher) -> Result<LoadMore, FetchPageError> {
        if !self.has_more() {
            return Ok(LoadMore::NoMorePages);
        }
        let Some(cursor) = self.begin_load() else {
            return Ok(LoadMore::AlreadyLoading);
        };
        match fetcher.fetch_page(&cursor) {
            Ok(page) => {
                let appended = page.results.len();
                self.complete(page);
                Ok(LoadMore::Appended(appended))
            }
            Err(e) => {
                self.fail();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    fn summary(uid: &str) -> PostSummary {
        PostSummary {
            uid: Some(uid.to_string()),
            first_publication_date: Some("2021-03-25T10:00:00+0000".to_string()),
            title: format!("title-{uid}"),
            subtitle: "subtitle".to_string(),
            author: "author".to_string(),
        }
    }

    fn page(uids: &[&str], next: Option<&str>) -> PostPage {
        PostPage {
            next_page: next.map(str::to_string),
            results: uids.iter().map(|u| summary(u)).collect(),
        }
    }

    /// Serves queued pages and counts how many fetches actually happen.
    struct ScriptedFetcher {
        calls: Cell<usize>,
        pages: RefCell<Vec<Result<PostPage, FetchPageError>>>,
    }

    impl ScriptedFetcher {
        fn new(pages: Vec<Result<PostPage, FetchPageError>>) -> Self {
            ScriptedFetcher {
                calls: Cell::new(0),
                pages: RefCell::new(pages),
            }
        }
    }

    impl PageFetcher for ScriptedFetcher {
        fn fetch_page(&self, _cursor: &str) -> Result<PostPage, FetchPageError> {
            self.calls.set(self.calls.get() + 1);
            self.pages.borrow_mut().remove(0)
        }
    }

    fn uids(listing: &PostListing) -> Vec<String> {
        listing
            .items()
            .iter()
            .map(|s| s.uid.clone().unwrap())
            .collect()
    }

    #[test]
    fn test_appends_in_arrival_order_and_terminates() {
        let mut listing = PostListing::new(page(&["a", "b"], Some("cursor-1")));
        let fetcher = ScriptedFetcher::new(vec![Ok(page(&["d", "e"], None))]);

        assert!(listing.has_more());
        let outcome = listing.load_more(&fetcher).unwrap();
        assert_eq!(outcome, LoadMore::Appended(2));
        assert_eq!(uids(&listing), ["a", "b", "d", "e"]);
        assert!(!listing.has_more());

        // Cursor exhausted: further triggers fetch nothing.
        assert_eq!(listing.load_more(&fetcher).unwrap(), LoadMore::NoMorePages);
        assert_eq!(fetcher.calls.get(), 1);
    }

    #[test]
    fn test_double_trigger_fetches_once() {
        let mut listing = PostListing::new(page(&["a"], Some("cursor-1")));

        // First trigger takes the cursor; a second trigger while the first
        // is still in flight is ignored.
        let first = listing.begin_load();
        assert_eq!(first.as_deref(), Some("cursor-1"));
        assert_eq!(listing.begin_load(), None);

        listing.complete(page(&["b"], Some("cursor-2")));

        // Back in Idle the next trigger goes through with the new cursor.
        assert_eq!(listing.begin_load().as_deref(), Some("cursor-2"));
    }

    #[test]
    fn test_failed_fetch_is_retryable() {
        let mut listing = PostListing::new(page(&["a", "b"], Some("cursor-1")));
        let fetcher = ScriptedFetcher::new(vec![
            Err(FetchPageError::Cms(CmsError::Http {
                status: reqwest::StatusCode::BAD_GATEWAY,
                url: "cursor-1".to_string(),
            })),
            Ok(page(&["c"], None)),
        ]);

        let before = uids(&listing);
        assert!(listing.load_more(&fetcher).is_err());

        // Nothing moved: same items, same cursor, still retryable.
        assert_eq!(uids(&listing), before);
        assert!(listing.has_more());

        assert_eq!(listing.load_more(&fetcher).unwrap(), LoadMore::Appended(1));
        assert_eq!(uids(&listing), ["a", "b", "c"]);
        assert_eq!(fetcher.calls.get(), 2);
    }

    #[test]
    fn test_no_dedupe_of_repeated_uids() {
        let mut listing = PostListing::new(page(&["a"], Some("cursor-1")));
        let fetcher = ScriptedFetcher::new(vec![Ok(page(&["a"], None))]);

        listing.load_more(&fetcher).unwrap();
        assert_eq!(uids(&listing), ["a", "a"]);
    }

    #[test]
    fn test_page_from_response_formats_all_records() {
        let response: crate::cms::QueryResponse = serde_json::from_str(
            r#"{
                "next_page": "https://cms.example/search?page=2",
                "results": [
                    {"id": "1", "uid": "a", "first_publication_date": null, "last_publication_date": null,
                     "data": {"title": "T", "subtitle": "S", "author": "A"}},
                    {"id": "2", "uid": "b", "first_publication_date": null, "last_publication_date": null,
                     "data": {"title": "T2", "subtitle": "S2", "author": "A2"}}
                ]
            }"#,
        )
        .unwrap();
        let page = PostPage::from_response(&response).unwrap();
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.next_page.as_deref(), Some("https://cms.example/search?page=2"));
    }

    #[test]
    fn test_page_from_response_rejects_malformed_record() {
        let response: crate::cms::QueryResponse = serde_json::from_str(
            r#"{
                "next_page": null,
                "results": [
                    {"id": "1", "uid": "a", "first_publication_date": null, "last_publication_date": null,
                     "data": {"title": "T", "subtitle": "S"}}
                ]
            }"#,
        )
        .unwrap();
        assert!(PostPage::from_response(&response).is_err());
    }
}
