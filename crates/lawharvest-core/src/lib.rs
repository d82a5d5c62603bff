pub mod ident;
pub mod mode;
pub mod normalize;
pub mod record;
pub mod schema;

pub use ident::{
    PORTAL_BASE, absolute_url, download_target, preferred_download_links, query_identifier,
    region_code,
};
pub use mode::Mode;
pub use normalize::{is_filled, normalize_date, normalize_key, relation_code, validity_from_label};
pub use record::{DirectiveInfo, DownloadLink, LawInfo, Relation, TableRecord, to_record_batch};
pub use schema::{EntityKind, PLACEHOLDER, col, text_schema};
