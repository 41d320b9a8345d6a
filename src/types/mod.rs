pub mod error;
pub mod request;
pub mod result;
pub mod summary;

pub use error::{ApiError, ErrorCategory, ErrorClassifier, LensError, Result};
pub use request::{Domain, Endpoint, FetchRequest, QueryParams, date_range};
pub use result::{FetchResult, TermCount};
pub use summary::{
    AiSummaryRequest, AiSummaryResponse, TabularSummary, chronological_counts, clean_term_counts,
};
