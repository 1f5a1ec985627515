//! Collection pipelines built on the crawler primitives
//!
//! - `quote`: one fetch and one record per instrument page
//! - `article`: index harvest followed by throttled detail fetches

mod article;
mod quote;

pub use article::{
    news_site, run_articles, ArticlePipeline, ArticleReport, CnnNews, NaverNews, NewsSite,
};
pub use quote::{run_quotes, QuotePipeline, QuoteReport};
