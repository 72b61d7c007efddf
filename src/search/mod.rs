//! Search engine and named-entity collaborators.
//!
//! The indexers depend only on [`SearchClient`] and [`EntityExtractor`];
//! [`SolrClient`] and [`GnrdClient`] are the HTTP implementations.

pub mod gnrd;
pub mod solr;

pub use gnrd::GnrdClient;
pub use solr::SolrClient;

use crate::error::{ArchiveError, ItemError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Flat search document with fixed, externally consumed field names.
///
/// Absent values are omitted from the JSON entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: String,
    pub title_display: String,
    pub title_t: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_topic_facet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_topic_s: Option<String>,
    /// Scientific names found in the title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gnrd_sm: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_t: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_unstem_search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_display_facet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iiif_manifest_s: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iiif_thumbnail_s: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_of_facet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_of_s: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_facet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_s: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents_s: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recto_s: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verso_s: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_s: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institutional_stamp_s: Option<String>,
    /// Full transcript, notebooks only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulltext_s: Option<String>,
    /// `scan` or `text`.
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type_s: Option<String>,
    /// RFC 3339, UTC.
    pub timestamp: String,
}

/// A search index accepting documents and a single explicit commit.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Reachability check run before any document is built.
    async fn ping(&self) -> Result<(), ArchiveError>;

    async fn add(&self, document: &SearchDocument) -> Result<(), ArchiveError>;

    async fn commit(&self) -> Result<(), ArchiveError>;
}

/// Finds scientific names in free text.
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    async fn find_names(&self, text: &str) -> Result<Vec<String>, ItemError>;
}
