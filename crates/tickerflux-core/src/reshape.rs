use polars::prelude::{Column, DataFrame, DataType, PolarsError};
use thiserror::Error;

use crate::provider::PERIOD_COLUMN;

/// Value written into numeric cells the provider left empty.
pub const NUMERIC_DEFAULT: f64 = 0.0;
/// Value written into text cells the provider left empty.
pub const TEXT_DEFAULT: &str = "0";

#[derive(Debug, Error)]
pub enum ReshapeError {
    #[error("report has no `{0}` column")]
    MissingColumn(String),
    #[error("malformed period label '{label}', expected {expected}")]
    PeriodLabel {
        label: String,
        expected: &'static str,
    },
    #[error("column `{column}` has unsupported type {dtype} and contains nulls")]
    UnsupportedType { column: String, dtype: String },
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodColumn {
    /// `"2024-Q1"` becomes `year = 2024`, `quarter = 1`.
    SplitYearQuarter,
    /// `"2024"` becomes `year = 2024`.
    Year,
    Keep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReshapePlan {
    pub period: PeriodColumn,
    pub transpose_metrics: bool,
    pub identifier_column: &'static str,
}

/// Fill, reshape the period label, optionally transpose, then tag rows with `ticker`.
pub fn reshape(
    raw: &DataFrame,
    ticker: &str,
    plan: &ReshapePlan,
) -> Result<DataFrame, ReshapeError> {
    let filled = fill_missing(raw)?;

    let mut shaped = match plan.period {
        PeriodColumn::SplitYearQuarter => split_year_quarter(&filled)?,
        PeriodColumn::Year => period_as_year(&filled)?,
        PeriodColumn::Keep => filled,
    };

    if plan.transpose_metrics {
        shaped = transpose_metrics(&shaped)?;
    }

    attach_identifier(&mut shaped, plan.identifier_column, ticker)?;
    Ok(shaped)
}

pub fn fill_missing(df: &DataFrame) -> Result<DataFrame, ReshapeError> {
    let mut columns = Vec::with_capacity(df.width());

    for column in df.get_columns() {
        let name = column.name().clone();
        let filled = match column.dtype() {
            DataType::Float64 => Column::new(
                name,
                column
                    .f64()?
                    .into_iter()
                    .map(|value| value.unwrap_or(NUMERIC_DEFAULT))
                    .collect::<Vec<f64>>(),
            ),
            DataType::Int64 => Column::new(
                name,
                column
                    .i64()?
                    .into_iter()
                    .map(|value| value.unwrap_or(NUMERIC_DEFAULT as i64))
                    .collect::<Vec<i64>>(),
            ),
            DataType::String => Column::new(
                name,
                column
                    .str()?
                    .into_iter()
                    .map(|value| value.unwrap_or(TEXT_DEFAULT).to_string())
                    .collect::<Vec<String>>(),
            ),
            DataType::Null => Column::new(name, vec![NUMERIC_DEFAULT; column.len()]),
            _ if column.null_count() == 0 => column.clone(),
            other => {
                return Err(ReshapeError::UnsupportedType {
                    column: name.to_string(),
                    dtype: other.to_string(),
                })
            }
        };
        columns.push(filled);
    }

    Ok(DataFrame::new(columns)?)
}

pub fn split_year_quarter(df: &DataFrame) -> Result<DataFrame, ReshapeError> {
    let labels = period_labels(df)?;

    let mut years = Vec::with_capacity(labels.len());
    let mut quarters = Vec::with_capacity(labels.len());
    for label in &labels {
        let (year, quarter) = parse_year_quarter(label)?;
        years.push(year);
        quarters.push(quarter);
    }

    let mut out = df.drop(PERIOD_COLUMN)?;
    out.with_column(Column::new("year".into(), years))?;
    out.with_column(Column::new("quarter".into(), quarters))?;
    Ok(out)
}

pub fn period_as_year(df: &DataFrame) -> Result<DataFrame, ReshapeError> {
    let years = period_labels(df)?
        .iter()
        .map(|label| parse_year(label))
        .collect::<Result<Vec<i64>, _>>()?;

    let mut out = df.drop(PERIOD_COLUMN)?;
    out.with_column(Column::new("year".into(), years))?;
    Ok(out)
}

/// Turns a period-per-row table into a metric-per-row table: a `metric` column with
/// the former numeric column names, then one column per period label. Text columns
/// other than the period label carry no metric and are dropped.
pub fn transpose_metrics(df: &DataFrame) -> Result<DataFrame, ReshapeError> {
    let labels = period_labels(df)?;

    let mut metrics: Vec<String> = Vec::new();
    let mut values: Vec<Vec<f64>> = Vec::new();
    for column in df.get_columns() {
        if column.name().as_str() == PERIOD_COLUMN {
            continue;
        }
        let series: Vec<f64> = match column.dtype() {
            DataType::Float64 => column
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(NUMERIC_DEFAULT))
                .collect(),
            DataType::Int64 => column
                .i64()?
                .into_iter()
                .map(|v| v.map(|v| v as f64).unwrap_or(NUMERIC_DEFAULT))
                .collect(),
            _ => continue,
        };
        metrics.push(column.name().to_string());
        values.push(series);
    }

    let mut columns = Vec::with_capacity(labels.len() + 1);
    columns.push(Column::new("metric".into(), metrics));
    for (period_index, label) in labels.iter().enumerate() {
        let per_metric: Vec<f64> = values.iter().map(|series| series[period_index]).collect();
        columns.push(Column::new(label.as_str().into(), per_metric));
    }

    Ok(DataFrame::new(columns)?)
}

pub fn attach_identifier(
    df: &mut DataFrame,
    column: &str,
    ticker: &str,
) -> Result<(), ReshapeError> {
    let tickers = vec![ticker; df.height()];
    df.with_column(Column::new(column.into(), tickers))?;
    Ok(())
}

fn period_labels(df: &DataFrame) -> Result<Vec<String>, ReshapeError> {
    let column = df
        .column(PERIOD_COLUMN)
        .map_err(|_| ReshapeError::MissingColumn(PERIOD_COLUMN.to_string()))?;

    let labels = match column.dtype() {
        DataType::String => column
            .str()?
            .into_iter()
            .map(|label| label.unwrap_or(TEXT_DEFAULT).to_string())
            .collect(),
        DataType::Int64 => column
            .i64()?
            .into_iter()
            .map(|label| label.unwrap_or_default().to_string())
            .collect(),
        other => {
            return Err(ReshapeError::UnsupportedType {
                column: PERIOD_COLUMN.to_string(),
                dtype: other.to_string(),
            })
        }
    };
    Ok(labels)
}

fn parse_year(label: &str) -> Result<i64, ReshapeError> {
    label
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|year| *year > 0)
        .ok_or_else(|| ReshapeError::PeriodLabel {
            label: label.to_string(),
            expected: "YYYY",
        })
}

fn parse_year_quarter(label: &str) -> Result<(i64, i64), ReshapeError> {
    let malformed = || ReshapeError::PeriodLabel {
        label: label.to_string(),
        expected: "YYYY-Qn",
    };

    let (year, quarter) = label.trim().split_once("-Q").ok_or_else(malformed)?;
    let year = parse_year(year).map_err(|_| malformed())?;
    let quarter = quarter
        .parse::<i64>()
        .ok()
        .filter(|q| (1..=4).contains(q))
        .ok_or_else(malformed)?;
    Ok((year, quarter))
}
