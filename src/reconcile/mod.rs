//! Cross-year reconciliation of review sheets into master tables
//!
//! Each year's sheets use one of several column layouts. The layout is picked
//! from the file name, rows get a composite business id, ministries are
//! mapped onto a fixed org set, and wide budget/expense column families are
//! turned into long-format facts.

pub mod identity;
pub mod layout;
pub mod master;
pub mod org;
pub mod sheet;
pub mod types;
pub mod wide;
pub mod writer;

pub use identity::{build_id, bulk_id};
pub use layout::{IdRule, LayoutVersion, SchemaYearResolver, WideTemplates};
pub use master::{BuildOptions, FileOutcome, MasterBuilder, MasterTables, RunReport};
pub use org::NameReconciler;
pub use sheet::Sheet;
pub use types::{AxisKey, BulkRowId, CompositeRecordId, Header, Row, WideFact};
pub use wide::WideColumnPatternExtractor;
pub use writer::{OutputFormat, TableWriter};
