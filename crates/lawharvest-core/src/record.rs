//! Typed rows produced by collectors.
//!
//! A collector fills one of these per detail page and the updater turns a
//! run's worth of them into an Arrow batch with [`to_record_batch`].

use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::schema::{EntityKind, PLACEHOLDER};

/// A row type with a fixed column layout.
pub trait TableRecord {
    const KIND: EntityKind;

    /// Cell values in the order of `KIND.columns()`.
    fn values(&self) -> Vec<Option<&str>>;
}

/// Document info for a central or local law.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LawInfo {
    #[serde(rename = "regionID")]
    pub region_id: Option<String>,
    #[serde(rename = "itemID")]
    pub item_id: Option<String>,
    pub code: Option<String>,
    pub title: Option<String>,
    pub doc_type: Option<String>,
    pub issuer: Option<String>,
    pub validity: Option<String>,
    pub issue_date: Option<String>,
    pub effective_date: Option<String>,
    pub signer_title: Option<String>,
    pub signer: Option<String>,
    pub scope: Option<String>,
    pub url: Option<String>,
}

impl LawInfo {
    /// A row with every descriptive field set to the placeholder.
    ///
    /// Collectors start from this and overwrite what the page yields.
    pub fn placeholder(region_id: &str, item_id: &str, url: &str) -> Self {
        let unknown = || Some(PLACEHOLDER.to_string());
        Self {
            region_id: Some(region_id.to_string()),
            item_id: Some(item_id.to_string()),
            code: unknown(),
            title: unknown(),
            doc_type: unknown(),
            issuer: unknown(),
            validity: unknown(),
            issue_date: unknown(),
            effective_date: unknown(),
            signer_title: unknown(),
            signer: unknown(),
            scope: unknown(),
            url: Some(url.to_string()),
        }
    }
}

impl TableRecord for LawInfo {
    const KIND: EntityKind = EntityKind::LawInfo;

    fn values(&self) -> Vec<Option<&str>> {
        vec![
            self.region_id.as_deref(),
            self.item_id.as_deref(),
            self.code.as_deref(),
            self.title.as_deref(),
            self.doc_type.as_deref(),
            self.issuer.as_deref(),
            self.validity.as_deref(),
            self.issue_date.as_deref(),
            self.effective_date.as_deref(),
            self.signer_title.as_deref(),
            self.signer.as_deref(),
            self.scope.as_deref(),
            self.url.as_deref(),
        ]
    }
}

/// Document info for an administrative directive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectiveInfo {
    pub docid: Option<String>,
    pub code: Option<String>,
    pub issue_date: Option<String>,
    pub effective_date: Option<String>,
    pub doc_type: Option<String>,
    pub issuer: Option<String>,
    pub signer: Option<String>,
    pub title: Option<String>,
    pub attachment_url: Option<String>,
    pub url: Option<String>,
}

impl DirectiveInfo {
    pub fn placeholder(docid: &str, url: &str) -> Self {
        let unknown = || Some(PLACEHOLDER.to_string());
        Self {
            docid: Some(docid.to_string()),
            code: unknown(),
            issue_date: unknown(),
            effective_date: unknown(),
            doc_type: unknown(),
            issuer: unknown(),
            signer: unknown(),
            title: unknown(),
            attachment_url: unknown(),
            url: Some(url.to_string()),
        }
    }
}

impl TableRecord for DirectiveInfo {
    const KIND: EntityKind = EntityKind::DirectiveInfo;

    fn values(&self) -> Vec<Option<&str>> {
        vec![
            self.docid.as_deref(),
            self.code.as_deref(),
            self.issue_date.as_deref(),
            self.effective_date.as_deref(),
            self.doc_type.as_deref(),
            self.issuer.as_deref(),
            self.signer.as_deref(),
            self.title.as_deref(),
            self.attachment_url.as_deref(),
            self.url.as_deref(),
        ]
    }
}

/// A reference from one law to another.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(rename = "regionID")]
    pub region_id: Option<String>,
    #[serde(rename = "itemID")]
    pub item_id: Option<String>,
    pub new_code: Option<String>,
    #[serde(rename = "relation_itemID")]
    pub relation_item_id: Option<String>,
    pub relation_type: Option<String>,
}

impl TableRecord for Relation {
    const KIND: EntityKind = EntityKind::Relation;

    fn values(&self) -> Vec<Option<&str>> {
        vec![
            self.region_id.as_deref(),
            self.item_id.as_deref(),
            self.new_code.as_deref(),
            self.relation_item_id.as_deref(),
            self.relation_type.as_deref(),
        ]
    }
}

/// A downloadable file attached to a law.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadLink {
    #[serde(rename = "regionID")]
    pub region_id: Option<String>,
    #[serde(rename = "itemID")]
    pub item_id: Option<String>,
    pub code: Option<String>,
    pub link_url: Option<String>,
}

impl TableRecord for DownloadLink {
    const KIND: EntityKind = EntityKind::DownloadLink;

    fn values(&self) -> Vec<Option<&str>> {
        vec![
            self.region_id.as_deref(),
            self.item_id.as_deref(),
            self.code.as_deref(),
            self.link_url.as_deref(),
        ]
    }
}

/// Build a text batch from typed rows. Column order follows `R::KIND`.
pub fn to_record_batch<R: TableRecord>(records: &[R]) -> Result<RecordBatch, ArrowError> {
    let columns = R::KIND.columns();
    let rows: Vec<Vec<Option<&str>>> = records.iter().map(TableRecord::values).collect();

    let arrays: Vec<ArrayRef> = (0..columns.len())
        .map(|i| {
            let array: StringArray = rows.iter().map(|row| row[i]).collect();
            Arc::new(array) as ArrayRef
        })
        .collect();

    RecordBatch::try_new(Arc::new(R::KIND.schema()), arrays)
}
