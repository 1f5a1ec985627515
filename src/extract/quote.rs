//! Field extraction for financial quote pages
//!
//! A quote page is read in two passes. The comparative pass walks the
//! peer-comparison table and keeps only the first column, which is the
//! instrument the page is about. Row labels go through an allow-list:
//! each known label maps to a target field and a cell transform, a few are
//! deferred to the detail pass, and everything else is ignored.
//!
//! The detail pass reads the market-cap, investment-opinion and PER/EPS
//! tables of the `#tab_con1` section. Several of its cells hold two values
//! joined by a literal `l`; those are split with [`split_combined`].
//!
//! Missing tables or cells leave fields unset. Extraction never fails.

use crate::extract::html::{element_text, next_cell, non_empty, own_text};
use crate::extract::normalize::{split_combined, GENERIC_SPLIT, MULTIPLE_SPLIT, PAR_VALUE_SPLIT};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::sync::LazyLock;

macro_rules! selector {
    ($name:ident, $css:expr) => {
        static $name: LazyLock<Selector> =
            LazyLock::new(|| Selector::parse($css).expect("valid selector"));
    };
}

selector!(COMPARE_TABLE, "table.tb_type1.tb_num[summary*='동종업종 비교']");
selector!(FIRST_HEADER, "thead tr th[scope='col']");
selector!(BODY_ROW, "tbody tr");
selector!(ROW_LABEL, "th[scope='row'] span");
selector!(CELL, "td");
selector!(ANCHOR, "a");
selector!(EM, "em");
selector!(TH, "th");
selector!(DETAIL_SECTION, "div#tab_con1");
selector!(MARKET_SUM_TABLE, "table[summary='시가총액 정보']");
selector!(OPINION_TABLE, "div:not(.gray) > table[summary='투자의견 정보']");
selector!(PER_TABLE, "table.per_table[summary='PER/EPS 정보']");

/// Every field a quote page can yield
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QuoteField {
    StockCode,
    StockName,
    CurrentPrice,
    ChangePrice,
    ChangeRate,
    SalesRevenue,
    OperProfit,
    AdjustedOperProfit,
    OperProfitGrowthRate,
    NetIncome,
    EarningPerShare,
    Roe,
    MarketCap,
    MarketCapRank,
    ListedSharesCount,
    ParValue,
    TradingUnit,
    InvestmentOpinion,
    TargetPrice,
    FiftyTwoWeekHigh,
    FiftyTwoWeekLow,
    CurrentPer,
    CurrentEps,
    Pbr,
    Bps,
    DividendYield,
}

/// Raw extracted values keyed by field
///
/// A field that was found but came out empty, or the second half of a
/// combined cell that failed to split, is present with a `None` value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteFields {
    values: BTreeMap<QuoteField, Option<String>>,
}

impl QuoteFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: QuoteField) -> Option<&str> {
        self.values.get(&field).and_then(|v| v.as_deref())
    }

    pub fn set(&mut self, field: QuoteField, value: Option<String>) {
        self.values.insert(field, value);
    }

    /// Returns true if the field was visited, even when it has no value
    pub fn contains(&self, field: QuoteField) -> bool {
        self.values.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// How a comparative-table cell is turned into text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellTransform {
    /// Cell text as is
    Text,
    /// Text of the cell's `<em>`, with the direction words replaced by arrows
    DirectionArrow,
    /// Text of the cell's `<em>`, with the direction words removed
    StripDirection,
}

const DOWN: &str = "하향";
const UP: &str = "상향";

impl CellTransform {
    pub fn apply(self, cell: ElementRef<'_>) -> String {
        let marked = || cell.select(&EM).next().map(element_text);
        match self {
            Self::Text => element_text(cell),
            Self::DirectionArrow => match marked() {
                Some(text) => text.replace(DOWN, "▼").replace(UP, "▲"),
                None => element_text(cell),
            },
            Self::StripDirection => match marked() {
                Some(text) => text.replace(DOWN, "").replace(UP, "").trim().to_string(),
                None => element_text(cell),
            },
        }
    }
}

/// What the comparative pass does with a row label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRule {
    Extract(QuoteField, CellTransform),
    /// Read from the detail section instead
    Deferred,
}

/// The comparative-table allow-list
pub const COMPARATIVE_ROWS: &[(&str, RowRule)] = &[
    ("현재가", RowRule::Extract(QuoteField::CurrentPrice, CellTransform::Text)),
    ("전일대비", RowRule::Extract(QuoteField::ChangePrice, CellTransform::DirectionArrow)),
    ("등락률", RowRule::Extract(QuoteField::ChangeRate, CellTransform::StripDirection)),
    ("매출액(억)", RowRule::Extract(QuoteField::SalesRevenue, CellTransform::Text)),
    ("영업이익(억)", RowRule::Extract(QuoteField::OperProfit, CellTransform::Text)),
    ("조정영업이익(억)", RowRule::Extract(QuoteField::AdjustedOperProfit, CellTransform::Text)),
    ("영업이익증가율(%)", RowRule::Extract(QuoteField::OperProfitGrowthRate, CellTransform::Text)),
    ("당기순이익(억)", RowRule::Extract(QuoteField::NetIncome, CellTransform::Text)),
    ("주당순이익(원)", RowRule::Extract(QuoteField::EarningPerShare, CellTransform::Text)),
    ("ROE(%)", RowRule::Extract(QuoteField::Roe, CellTransform::Text)),
    ("시가총액(억)", RowRule::Deferred),
    ("외국인비율(%)", RowRule::Deferred),
    ("PER(%)", RowRule::Deferred),
    ("PBR(배)", RowRule::Deferred),
];

/// Looks up the allow-list entry for a row label
pub fn row_rule(label: &str) -> Option<RowRule> {
    COMPARATIVE_ROWS
        .iter()
        .find(|(known, _)| *known == label)
        .map(|(_, rule)| *rule)
}

/// Runs both extraction passes over a quote page
pub fn extract_quote_fields(document: &Html) -> QuoteFields {
    let mut fields = QuoteFields::new();
    extract_comparative_table(document, &mut fields);
    extract_detail_section(document, &mut fields);
    fields
}

fn extract_comparative_table(document: &Html, fields: &mut QuoteFields) {
    let Some(table) = document.select(&COMPARE_TABLE).next() else {
        tracing::debug!("Comparison table not found");
        return;
    };

    if let Some(link) = table
        .select(&FIRST_HEADER)
        .next()
        .and_then(|header| header.select(&ANCHOR).next())
    {
        fields.set(QuoteField::StockName, non_empty(own_text(link)));
        if let Some(code) = link.select(&EM).next() {
            fields.set(QuoteField::StockCode, non_empty(element_text(code)));
        }
    }

    for row in table.select(&BODY_ROW) {
        let Some(label) = row.select(&ROW_LABEL).next().map(element_text) else {
            continue;
        };
        let Some(cell) = row.select(&CELL).next() else {
            continue;
        };

        match row_rule(&label) {
            Some(RowRule::Extract(field, transform)) => {
                fields.set(field, non_empty(transform.apply(cell)));
            }
            Some(RowRule::Deferred) => {}
            None => tracing::trace!("Ignoring comparison row {}", label),
        }
    }
}

fn extract_detail_section(document: &Html, fields: &mut QuoteFields) {
    let Some(section) = document.select(&DETAIL_SECTION).next() else {
        tracing::debug!("Detail section not found");
        return;
    };

    if let Some(table) = section.select(&MARKET_SUM_TABLE).next() {
        if let Some(cell) = cell_after(table, "시가총액") {
            if cell.select(&EM).next().is_some() {
                fields.set(QuoteField::MarketCap, non_empty(combined_text(cell)));
            }
        }
        if let Some(cell) = cell_after(table, "시가총액순위") {
            fields.set(QuoteField::MarketCapRank, non_empty(element_text(cell)));
        }
        if let Some(em) = cell_after(table, "상장주식수").and_then(|cell| cell.select(&EM).next()) {
            fields.set(QuoteField::ListedSharesCount, non_empty(element_text(em)));
        }
        set_combined(
            fields,
            table,
            "액면가",
            &PAR_VALUE_SPLIT,
            (QuoteField::ParValue, QuoteField::TradingUnit),
        );
    }

    if let Some(table) = section.select(&OPINION_TABLE).next() {
        set_combined(
            fields,
            table,
            "투자의견",
            &GENERIC_SPLIT,
            (QuoteField::InvestmentOpinion, QuoteField::TargetPrice),
        );
        set_combined(
            fields,
            table,
            "52주최고",
            &GENERIC_SPLIT,
            (QuoteField::FiftyTwoWeekHigh, QuoteField::FiftyTwoWeekLow),
        );
    }

    if let Some(table) = section.select(&PER_TABLE).next() {
        set_combined(
            fields,
            table,
            "PER",
            &MULTIPLE_SPLIT,
            (QuoteField::CurrentPer, QuoteField::CurrentEps),
        );
        set_combined(
            fields,
            table,
            "PBR",
            &MULTIPLE_SPLIT,
            (QuoteField::Pbr, QuoteField::Bps),
        );
        if let Some(em) = cell_after(table, "배당수익률").and_then(|cell| cell.select(&EM).next()) {
            fields.set(QuoteField::DividendYield, non_empty(element_text(em)));
        }
    }
}

/// The value cell of the first header whose text contains `label`
fn cell_after<'a>(table: ElementRef<'a>, label: &str) -> Option<ElementRef<'a>> {
    table
        .select(&TH)
        .find(|th| element_text(*th).contains(label))
        .and_then(next_cell)
}

/// All text under the cell, concatenated without separators for `<br>`
fn combined_text(cell: ElementRef<'_>) -> String {
    crate::extract::html::collapse_whitespace(&cell.text().collect::<String>())
}

fn set_combined(
    fields: &mut QuoteFields,
    table: ElementRef<'_>,
    label: &str,
    pattern: &Regex,
    (first, second): (QuoteField, QuoteField),
) {
    let Some(cell) = cell_after(table, label) else {
        return;
    };
    let text = element_text(cell);
    if text.is_empty() {
        fields.set(first, None);
        fields.set(second, None);
        return;
    }
    let (head, tail) = split_combined(&text, pattern);
    fields.set(first, non_empty(head));
    fields.set(second, tail);
}
