//! Column names and Arrow schemas for scraped legal-document tables.
//!
//! Every column is a nullable `Utf8`. Collectors write [`PLACEHOLDER`] for
//! values they could not find on the page, so "unknown" shows up either as
//! a null or as `-` depending on where a table came from.

use arrow::datatypes::{DataType, Field, Schema};
use serde::{Deserialize, Serialize};

/// Sentinel written by collectors for a field that could not be extracted.
pub const PLACEHOLDER: &str = "-";

/// Column names shared by all entity tables.
pub mod col {
    pub const ID: &str = "id";
    pub const REGION_ID: &str = "regionID";
    pub const ITEM_ID: &str = "itemID";
    pub const DOC_ID: &str = "docid";
    pub const CODE: &str = "code";
    pub const TITLE: &str = "title";
    pub const DOC_TYPE: &str = "doc_type";
    pub const ISSUER: &str = "issuer";
    pub const VALIDITY: &str = "validity";
    pub const ISSUE_DATE: &str = "issue_date";
    pub const EFFECTIVE_DATE: &str = "effective_date";
    pub const SIGNER_TITLE: &str = "signer_title";
    pub const SIGNER: &str = "signer";
    pub const SCOPE: &str = "scope";
    pub const URL: &str = "url";
    pub const ATTACHMENT_URL: &str = "attachment_url";
    pub const NEW_CODE: &str = "new_code";
    pub const RELATION_ITEM_ID: &str = "relation_itemID";
    pub const RELATION_TYPE: &str = "relation_type";
    pub const LINK_URL: &str = "link_url";
}

const LAW_INFO_COLUMNS: &[&str] = &[
    col::REGION_ID,
    col::ITEM_ID,
    col::CODE,
    col::TITLE,
    col::DOC_TYPE,
    col::ISSUER,
    col::VALIDITY,
    col::ISSUE_DATE,
    col::EFFECTIVE_DATE,
    col::SIGNER_TITLE,
    col::SIGNER,
    col::SCOPE,
    col::URL,
];

const DIRECTIVE_INFO_COLUMNS: &[&str] = &[
    col::DOC_ID,
    col::CODE,
    col::ISSUE_DATE,
    col::EFFECTIVE_DATE,
    col::DOC_TYPE,
    col::ISSUER,
    col::SIGNER,
    col::TITLE,
    col::ATTACHMENT_URL,
    col::URL,
];

const RELATION_COLUMNS: &[&str] = &[
    col::REGION_ID,
    col::ITEM_ID,
    col::NEW_CODE,
    col::RELATION_ITEM_ID,
    col::RELATION_TYPE,
];

const DOWNLOAD_LINK_COLUMNS: &[&str] = &[col::REGION_ID, col::ITEM_ID, col::CODE, col::LINK_URL];

/// The kinds of table a collector produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    LawInfo,
    DirectiveInfo,
    Relation,
    DownloadLink,
}

impl EntityKind {
    /// Kinds produced by the law collectors (central and local).
    pub const LAW_KINDS: [EntityKind; 3] = [
        EntityKind::LawInfo,
        EntityKind::Relation,
        EntityKind::DownloadLink,
    ];

    /// Sub-directory holding this kind's batches under a collector root.
    pub fn dir_name(self) -> &'static str {
        match self {
            EntityKind::LawInfo | EntityKind::DirectiveInfo => "info",
            EntityKind::Relation => "relation",
            EntityKind::DownloadLink => "download_link",
        }
    }

    /// Stem used in chunk batch file names (`info_output_001_010`).
    pub fn chunk_stem(self) -> &'static str {
        match self {
            EntityKind::LawInfo | EntityKind::DirectiveInfo => "info",
            EntityKind::Relation => "relations",
            EntityKind::DownloadLink => "download_link",
        }
    }

    /// Columns a collector writes for this kind, in order.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            EntityKind::LawInfo => LAW_INFO_COLUMNS,
            EntityKind::DirectiveInfo => DIRECTIVE_INFO_COLUMNS,
            EntityKind::Relation => RELATION_COLUMNS,
            EntityKind::DownloadLink => DOWNLOAD_LINK_COLUMNS,
        }
    }

    /// Row identity inside one collector's canonical table.
    pub fn dedup_key(self) -> &'static [&'static str] {
        match self {
            EntityKind::LawInfo => &[col::REGION_ID, col::ITEM_ID],
            EntityKind::DirectiveInfo => &[col::DOC_ID],
            EntityKind::Relation => &[
                col::REGION_ID,
                col::ITEM_ID,
                col::RELATION_ITEM_ID,
                col::RELATION_TYPE,
            ],
            EntityKind::DownloadLink => &[col::REGION_ID, col::ITEM_ID, col::LINK_URL],
        }
    }

    /// Whether duplicates are resolved by information score after the key pass.
    pub fn scored(self) -> bool {
        matches!(self, EntityKind::LawInfo)
    }

    /// Whether canonical tables of this kind carry a dense `id` column.
    pub fn has_primary_key(self) -> bool {
        matches!(self, EntityKind::Relation | EntityKind::DownloadLink)
    }

    /// Identifier columns that must compare as text across collectors.
    pub fn identifier_columns(self) -> &'static [&'static str] {
        match self {
            EntityKind::LawInfo => &[col::REGION_ID, col::ITEM_ID],
            EntityKind::DirectiveInfo => &[col::DOC_ID],
            EntityKind::Relation => &[col::REGION_ID, col::ITEM_ID, col::RELATION_ITEM_ID],
            EntityKind::DownloadLink => &[col::REGION_ID, col::ITEM_ID, col::LINK_URL],
        }
    }

    /// Arrow schema for freshly collected rows of this kind.
    pub fn schema(self) -> Schema {
        text_schema(self.columns())
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::LawInfo => "law_info",
            EntityKind::DirectiveInfo => "directive_info",
            EntityKind::Relation => "relation",
            EntityKind::DownloadLink => "download_link",
        };
        f.write_str(name)
    }
}

/// A schema of nullable `Utf8` columns with the given names.
pub fn text_schema(columns: &[&str]) -> Schema {
    Schema::new(
        columns
            .iter()
            .map(|name| Field::new(*name, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    )
}
