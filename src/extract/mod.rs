//! Structured field extraction
//!
//! Pure functions from parsed HTML to flat field sets, plus the normalizer
//! that turns raw quote strings into typed records. Nothing here performs
//! I/O.

mod article;
pub mod html;
mod normalize;
mod quote;

pub use article::{
    extract_cnn_article, extract_naver_article, parse_cnn_timestamp, parse_naver_timestamp,
    ArticleFields, CNN_DATE_FORMAT, CNN_MEDIA, NAVER_DATE_FORMAT,
};
pub use normalize::{
    clean_integer, clean_long, normalize_quote, split_combined, GENERIC_SPLIT, MULTIPLE_SPLIT,
    PAR_VALUE_SPLIT,
};
pub use quote::{
    extract_quote_fields, row_rule, CellTransform, QuoteField, QuoteFields, RowRule,
    COMPARATIVE_ROWS,
};
