pub mod analysis;
pub mod config;
pub mod numbering;
pub mod record;
pub mod schema;

pub use analysis::{GapInterval, GapKind, SequenceAnalysis, analyze};
pub use config::{
    ConfigError, GuardPolicy, OutlierPolicy, PipelineConfig, RecoveryPolicy, RepairPolicy,
};
pub use numbering::{ArticleNumber, normalize_article_number};
pub use record::{ArticleRecord, RecordKind, sort_records};
pub use schema::articles;
