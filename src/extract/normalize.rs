//! Record normalization for quote pages
//!
//! Converts the raw strings produced by the field extractor into a typed
//! [`QuoteRecord`]. Numeric cleaning is tolerant: anything that does not
//! yield a number becomes `None`.

use crate::extract::quote::{QuoteField, QuoteFields};
use crate::storage::QuoteRecord;
use chrono::Utc;
use regex::Regex;
use std::sync::LazyLock;

/// `"100원 l 1주"`: par value and trading unit
pub static PAR_VALUE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.+원)\s*l\s*(.+주)").expect("valid regex"));

/// `"4.00매수 l 76,333"`, `"86,100 l 49,900"`: any two values
pub static GENERIC_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.+?)\s*l\s*(.+)").expect("valid regex"));

/// `"13.68배 l 5,102원"`: a multiple and a per-share amount
pub static MULTIPLE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.+?배)\s*l\s*(.+원)").expect("valid regex"));

/// Splits a combined cell into its two values
///
/// Both captured groups are trimmed. When the pattern does not match, the
/// whole trimmed text is returned as the first value and the second is
/// `None`.
///
/// ```
/// use quarry::extract::{split_combined, PAR_VALUE_SPLIT};
///
/// assert_eq!(
///     split_combined("100원 l 1주", &PAR_VALUE_SPLIT),
///     ("100원".to_string(), Some("1주".to_string()))
/// );
/// ```
pub fn split_combined(text: &str, pattern: &Regex) -> (String, Option<String>) {
    let text = text.trim();
    match pattern.captures(text) {
        Some(caps) => {
            let first = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
            let second = caps.get(2).map(|m| m.as_str().trim().to_string());
            (first, second)
        }
        None => (text.to_string(), None),
    }
}

/// Keeps the integral part of a number: digits plus a leading minus sign
fn integral_digits(text: &str) -> String {
    let text = text.trim();
    let integral = match text.find('.') {
        Some(idx) => &text[..idx],
        None => text,
    };

    let mut cleaned = String::with_capacity(integral.len());
    for c in integral.chars() {
        if c.is_ascii_digit() {
            cleaned.push(c);
        } else if c == '-' && cleaned.is_empty() {
            cleaned.push(c);
        }
    }
    cleaned
}

/// Parses locale-formatted text as an `i32`
///
/// `"1,186.35"` → `1186`, `"100원"` → `100`; anything unparseable or out
/// of range → `None`.
pub fn clean_integer(text: &str) -> Option<i32> {
    integral_digits(text).parse().ok()
}

/// Parses locale-formatted text as an `i64`
pub fn clean_long(text: &str) -> Option<i64> {
    integral_digits(text).parse().ok()
}

/// Builds a successful quote record from extracted fields
///
/// The record is a success whatever number of fields were found. Prices
/// the page does not show (opening, high, low, ending) are always `None`.
pub fn normalize_quote(source_url: &str, fields: &QuoteFields) -> QuoteRecord {
    let text = |field| fields.get(field).map(|v| v.trim().to_string());
    let integer = |field| fields.get(field).and_then(clean_integer);

    QuoteRecord {
        source_url: source_url.to_string(),
        stock_code: text(QuoteField::StockCode),
        stock_name: text(QuoteField::StockName),
        current_price: integer(QuoteField::CurrentPrice),
        change_price: text(QuoteField::ChangePrice),
        change_rate: text(QuoteField::ChangeRate),
        sales_revenue: integer(QuoteField::SalesRevenue),
        oper_profit: integer(QuoteField::OperProfit),
        adjusted_oper_profit: integer(QuoteField::AdjustedOperProfit),
        oper_profit_growth_rate: text(QuoteField::OperProfitGrowthRate),
        net_income: integer(QuoteField::NetIncome),
        earning_per_share: text(QuoteField::EarningPerShare),
        roe: text(QuoteField::Roe),
        opening_price: None,
        high_price: None,
        low_price: None,
        ending_price: None,
        market_cap: text(QuoteField::MarketCap),
        market_cap_rank: text(QuoteField::MarketCapRank),
        listed_shares_count: fields.get(QuoteField::ListedSharesCount).and_then(clean_long),
        par_value: integer(QuoteField::ParValue),
        trading_unit: integer(QuoteField::TradingUnit),
        investment_opinion: text(QuoteField::InvestmentOpinion),
        target_price: integer(QuoteField::TargetPrice),
        fifty_two_week_high: integer(QuoteField::FiftyTwoWeekHigh),
        fifty_two_week_low: integer(QuoteField::FiftyTwoWeekLow),
        current_per: text(QuoteField::CurrentPer),
        current_eps: integer(QuoteField::CurrentEps),
        pbr: text(QuoteField::Pbr),
        bps: integer(QuoteField::Bps),
        dividend_yield: text(QuoteField::DividendYield),
        status_code: Some(200),
        error_message: None,
        collected_at: Utc::now(),
    }
}
