pub mod error;
pub mod ids;
pub mod utils;

pub use error::{
    AiServiceError, AstSide, CacheError, DiffError, DocGenError, ErrorCategory, ErrorClassifier,
    Result,
};
pub use ids::{IdAllocator, content_id};
pub use utils::{json_bool, json_string, json_string_array, truncate_chars};
