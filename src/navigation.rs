use crate::cms::{Client, CmsError, Query, QueryResponse, RawDocument};
use crate::post::{title_of, MalformedRecord};
use anyhow::{Context, Result};

/// Runs one neighbor-lookup query. A trait seam so tests can substitute
/// recording or scripted sources for the HTTP client.
pub trait NeighborSource {
    fn run(&self, query: &Query) -> Result<QueryResponse, CmsError>;
}

impl NeighborSource for Client {
    fn run(&self, query: &Query) -> Result<QueryResponse, CmsError> {
        self.query(query)
    }
}

/// Chronological neighbors of one post, for the prev/next footer links.
/// Absence of a neighbor is a normal state, never an error.
#[derive(Debug, Default)]
pub struct NavigationLinks {
    pub previous: Option<NeighborLink>,
    pub next: Option<NeighborLink>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct NeighborLink {
    pub uid: String,
    pub title: String,
}

enum Direction {
    Previous,
    Next,
}

/// Resolve both neighbors of the current document with two independent
/// single-result queries: previous is the newest post published strictly
/// before the current one, next the oldest published strictly after. A
/// document with no publication date (draft, preview) has no neighbors.
pub fn resolve(
    source: &impl NeighborSource,
    document_type: &str,
    current: &RawDocument,
) -> Result<NavigationLinks> {
    let Some(date) = &current.first_publication_date else {
        return Ok(NavigationLinks::default());
    };
    Ok(NavigationLinks {
        previous: neighbor(source, document_type, date, Direction::Previous)
            .context("Failed to resolve previous post")?,
        next: neighbor(source, document_type, date, Direction::Next)
            .context("Failed to resolve next post")?,
    })
}

fn neighbor(
    source: &impl NeighborSource,
    document_type: &str,
    date: &str,
    direction: Direction,
) -> Result<Option<NeighborLink>> {
    let mut query = Query::for_type(document_type);
    query.page_size = 1;
    query.fetch = vec![format!("{document_type}.title")];
    let (predicate, order) = match direction {
        Direction::Previous => ("dateBefore", "desc"),
        Direction::Next => ("dateAfter", "asc"),
    };
    query.predicates = vec![format!(
        "{}(document.first_publication_date, \"{}\")",
        predicate, date
    )];
    query.orderings = Some(format!("document.first_publication_date {order}"));

    let response = source.run(&query)?;
    match response.results.first() {
        Some(raw) => Ok(link_from(raw)?),
        None => Ok(None),
    }
}

/// A neighbor without a uid cannot be linked to; skip it rather than fail.
fn link_from(raw: &RawDocument) -> Result<Option<NeighborLink>, MalformedRecord> {
    let Some(uid) = raw.uid.clone() else {
        return Ok(None);
    };
    Ok(Some(NeighborLink {
        uid,
        title: title_of(raw)?,
    }))
}
