use crate::config::types::{
    ArticleSourceConfig, Config, CrawlerConfig, FetchConfig, IntervalConfig, QuoteConfig,
    ScheduleConfig, StorageConfig, SummarizerConfig,
};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetch_config(&config.fetch)?;
    validate_storage_config(&config.storage)?;
    if let Some(crawler) = &config.crawler {
        validate_crawler_config(crawler)?;
    }
    if let Some(quote) = &config.quote {
        validate_quote_config(quote)?;
    }
    validate_article_sources(&config.articles)?;
    if let Some(summarizer) = &config.summarizer {
        validate_summarizer_config(summarizer)?;
    }
    validate_schedule_config(&config.schedule)?;
    Ok(())
}

/// Validates the shared fetch identity
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    validate_http_url("referrer", &config.referrer)?;

    if config.timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "timeout_ms must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates the generic page crawl configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_http_url("start_url", &config.start_url)?;
    validate_delay_range("crawler", config.min_delay_ms, config.max_delay_ms)?;

    if config.max_queue_size == Some(0) {
        return Err(ConfigError::Validation(
            "max_queue_size must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates the quote crawl configuration
fn validate_quote_config(config: &QuoteConfig) -> Result<(), ConfigError> {
    validate_http_url("quote base_url", &config.base_url)?;
    validate_delay_range("quote", config.min_delay_ms, config.max_delay_ms)?;

    if config.codes.is_empty() {
        return Err(ConfigError::Validation(
            "quote section must list at least one code".to_string(),
        ));
    }

    for code in &config.codes {
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::Validation(format!(
                "quote code must be non-empty and alphanumeric, got '{}'",
                code
            )));
        }
    }

    Ok(())
}

/// Validates article source entries
fn validate_article_sources(sources: &[ArticleSourceConfig]) -> Result<(), ConfigError> {
    for entry in sources {
        let name = entry.source.to_db_string();

        if entry.index_urls.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Article source '{}' must have at least one index URL",
                name
            )));
        }

        for index_url in &entry.index_urls {
            validate_http_url("index URL", index_url)?;
        }

        if let Some(referrer) = &entry.referrer {
            validate_http_url("article referrer", referrer)?;
        }

        if let Some(pattern) = &entry.url_pattern {
            Regex::new(pattern).map_err(|e| {
                ConfigError::InvalidPattern(format!("'{}' for source '{}': {}", pattern, name, e))
            })?;
        }

        validate_delay_range(name, entry.min_delay_ms, entry.max_delay_ms)?;
    }

    Ok(())
}

/// Validates the summarizer endpoint
fn validate_summarizer_config(config: &SummarizerConfig) -> Result<(), ConfigError> {
    validate_http_url("summarizer endpoint", &config.endpoint)?;

    if config.timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "summarizer timeout_ms must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates the scheduler intervals
fn validate_schedule_config(config: &ScheduleConfig) -> Result<(), ConfigError> {
    let entries = [
        ("web", config.web),
        ("quote", config.quote),
        ("articles", config.articles),
    ];

    for (kind, interval) in entries {
        if let Some(IntervalConfig {
            min_interval_secs,
            max_interval_secs,
        }) = interval
        {
            if min_interval_secs == 0 {
                return Err(ConfigError::Validation(format!(
                    "schedule.{} min_interval_secs must be > 0",
                    kind
                )));
            }
            if min_interval_secs > max_interval_secs {
                return Err(ConfigError::Validation(format!(
                    "schedule.{} min_interval_secs ({}) exceeds max_interval_secs ({})",
                    kind, min_interval_secs, max_interval_secs
                )));
            }
        }
    }

    Ok(())
}

/// Requires `min <= max` for a delay range
fn validate_delay_range(section: &str, min_ms: u64, max_ms: u64) -> Result<(), ConfigError> {
    if min_ms > max_ms {
        return Err(ConfigError::Validation(format!(
            "{} min_delay_ms ({}) exceeds max_delay_ms ({})",
            section, min_ms, max_ms
        )));
    }
    Ok(())
}

/// Requires a parseable http(s) URL
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}
