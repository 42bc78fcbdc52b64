use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::naming::{KeyLayout, TimestampGranularity};
use crate::outputs::OutputFormat;
use crate::provider::{FlowReport, PeriodGranularity, ReportSource};
use crate::reshape::{PeriodColumn, ReshapePlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    BalanceSheet,
    Cashflow,
    IncomeStatement,
    PriceStock,
    Ratio,
}

impl JobKind {
    pub const ALL: [JobKind; 5] = [
        JobKind::BalanceSheet,
        JobKind::Cashflow,
        JobKind::IncomeStatement,
        JobKind::PriceStock,
        JobKind::Ratio,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            JobKind::BalanceSheet => "balance_sheet",
            JobKind::Cashflow => "cashflow",
            JobKind::IncomeStatement => "income_statement",
            JobKind::PriceStock => "price_stock",
            JobKind::Ratio => "ratio",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown job '{0}'")]
pub struct UnknownJob(pub String);

impl FromStr for JobKind {
    type Err = UnknownJob;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        JobKind::ALL
            .into_iter()
            .find(|kind| kind.code() == normalized)
            .ok_or_else(|| UnknownJob(value.to_string()))
    }
}

/// Price history reaches back to January 1st of this year.
pub const PRICE_HISTORY_START_YEAR: i32 = 2010;

#[derive(Debug, Clone)]
pub struct JobDescriptor {
    pub kind: JobKind,
    /// Report name used in artifact file names.
    pub report_name: &'static str,
    pub source: ReportSource,
    pub period: PeriodGranularity,
    pub history_start_year: Option<i32>,
    pub reshape: ReshapePlan,
    pub format: OutputFormat,
    pub layout: KeyLayout,
    pub timestamp: TimestampGranularity,
    pub default_prefix: &'static str,
    pub description: &'static str,
}

static JOBS: Lazy<Vec<JobDescriptor>> = Lazy::new(|| {
    vec![
        JobDescriptor {
            kind: JobKind::BalanceSheet,
            report_name: "balance_sheet",
            source: ReportSource::FinancialFlow(FlowReport::BalanceSheet),
            period: PeriodGranularity::Quarterly,
            history_start_year: None,
            reshape: ReshapePlan {
                period: PeriodColumn::SplitYearQuarter,
                transpose_metrics: false,
                identifier_column: "ticker",
            },
            format: OutputFormat::Parquet,
            layout: KeyLayout::PerIdentifier,
            timestamp: TimestampGranularity::Second,
            default_prefix: "raw/balance_sheet",
            description: "Quarterly balance sheet, year/quarter split, parquet per ticker folder",
        },
        JobDescriptor {
            kind: JobKind::Cashflow,
            report_name: "cashflow",
            source: ReportSource::FinancialFlow(FlowReport::CashFlow),
            period: PeriodGranularity::Yearly,
            history_start_year: None,
            reshape: ReshapePlan {
                period: PeriodColumn::Year,
                transpose_metrics: false,
                identifier_column: "ticker",
            },
            format: OutputFormat::Json,
            layout: KeyLayout::Flat,
            timestamp: TimestampGranularity::Day,
            default_prefix: "raw/cashflow",
            description: "Yearly cash flow statement as JSON records",
        },
        JobDescriptor {
            kind: JobKind::IncomeStatement,
            report_name: "income_statement",
            source: ReportSource::FinancialFlow(FlowReport::IncomeStatement),
            period: PeriodGranularity::Yearly,
            history_start_year: None,
            reshape: ReshapePlan {
                period: PeriodColumn::Year,
                transpose_metrics: false,
                identifier_column: "ticker",
            },
            format: OutputFormat::Json,
            layout: KeyLayout::Flat,
            timestamp: TimestampGranularity::Day,
            default_prefix: "raw/income_statement",
            description: "Yearly income statement as JSON records",
        },
        JobDescriptor {
            kind: JobKind::PriceStock,
            report_name: "price_stock",
            source: ReportSource::PriceHistory,
            period: PeriodGranularity::Daily,
            history_start_year: Some(PRICE_HISTORY_START_YEAR),
            reshape: ReshapePlan {
                period: PeriodColumn::Keep,
                transpose_metrics: false,
                identifier_column: "Ticker",
            },
            format: OutputFormat::Json,
            layout: KeyLayout::Flat,
            timestamp: TimestampGranularity::Day,
            default_prefix: "raw/price_stock",
            description: "Daily price bars since 2010 as JSON records",
        },
        JobDescriptor {
            kind: JobKind::Ratio,
            report_name: "ratio",
            source: ReportSource::FinancialRatio,
            period: PeriodGranularity::Quarterly,
            history_start_year: None,
            reshape: ReshapePlan {
                period: PeriodColumn::Keep,
                transpose_metrics: true,
                identifier_column: "ticker",
            },
            format: OutputFormat::Json,
            layout: KeyLayout::Flat,
            timestamp: TimestampGranularity::Day,
            default_prefix: "raw/ratio",
            description: "Quarterly financial ratios, one row per metric",
        },
    ]
});

pub fn all_job_descriptors() -> &'static [JobDescriptor] {
    JOBS.as_slice()
}

pub fn descriptor(kind: JobKind) -> &'static JobDescriptor {
    JOBS.iter()
        .find(|job| job.kind == kind)
        .unwrap_or_else(|| unreachable!("every JobKind is registered"))
}
