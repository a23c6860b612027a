//! Print a raw range of the sheet, optionally filtered per column.

use anyhow::{Context as _, Result, bail};
use clap::Args;
use console::style;
use sheetroll_core::{ColumnFilters, GridSource, SheetGrid};

use super::{OutputFormat, print_json, truncate};
use crate::context::Context;

const CELL_WIDTH: usize = 18;

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// A1 range inside the sheet; defaults to `data_range` from config
    #[arg(short, long)]
    pub range: Option<String>,

    /// Keep rows whose COLUMN (header text or letter) equals VALUE.
    /// Repeat for more values or columns
    #[arg(long = "filter", value_name = "COLUMN=VALUE", value_parser = parse_filter)]
    pub filters: Vec<(String, String)>,

    /// List the distinct values of COLUMN instead of the rows
    #[arg(long, value_name = "COLUMN", conflicts_with = "filters")]
    pub values: Option<String>,

    #[arg(short, long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

fn parse_filter(value: &str) -> Result<(String, String), String> {
    let (column, wanted) = value
        .split_once('=')
        .ok_or_else(|| format!("`{value}` is not COLUMN=VALUE"))?;
    if column.trim().is_empty() {
        return Err(format!("`{value}` names no column"));
    }
    Ok((column.trim().to_string(), wanted.trim().to_string()))
}

fn column_filters(grid: &SheetGrid, filters: &[(String, String)]) -> Result<ColumnFilters> {
    let mut selected = ColumnFilters::new();
    for (column, value) in filters {
        let Some(index) = grid.find_column(column) else {
            bail!("no column named {column}");
        };
        selected.select(index, value.as_str());
    }
    Ok(selected)
}

pub async fn run(ctx: &Context, args: &FetchArgs) -> Result<()> {
    let range = args.range.as_deref().unwrap_or(&ctx.data_range);
    let (grid, source) = ctx
        .service
        .fetch_range_with_source(&ctx.sheet, range)
        .await
        .with_context(|| format!("failed to read {}!{range}", ctx.sheet))?;

    if source == GridSource::Sample && args.format == OutputFormat::Table {
        eprintln!(
            "{} the sheet could not be read, showing sample data",
            style("warning:").yellow().bold()
        );
    }

    if let Some(column) = &args.values {
        let Some(index) = grid.find_column(column) else {
            bail!("no column named {column}");
        };
        let values = grid.unique_column_values(index);
        return match args.format {
            OutputFormat::Json => print_json(&values),
            OutputFormat::Table => {
                for value in &values {
                    println!("{value}");
                }
                Ok(())
            }
        };
    }

    let filters = column_filters(&grid, &args.filters)?;
    let rows: Vec<&[String]> = grid
        .rows()
        .first()
        .map(Vec::as_slice)
        .into_iter()
        .chain(grid.filter_rows(&filters))
        .collect();

    if args.format == OutputFormat::Json {
        return print_json(&rows);
    }

    if rows.is_empty() {
        println!("{}", style("No rows in range").dim());
        return Ok(());
    }

    for (index, row) in rows.iter().enumerate() {
        let line = row
            .iter()
            .map(|cell| format!("{:<CELL_WIDTH$}", truncate(cell, CELL_WIDTH)))
            .collect::<Vec<_>>()
            .join(" ");
        if index == 0 {
            println!("{}", style(line.trim_end()).bold());
        } else {
            println!("{}", line.trim_end());
        }
    }
    if !filters.is_empty() {
        println!("\n{} of {} rows", rows.len() - 1, grid.data_rows().len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> SheetGrid {
        SheetGrid::from_rows([
            vec!["ID", "Name", "Class", "School"],
            vec!["1", "Asha", "6th", "North"],
            vec!["2", "Ravi", "7th", "South"],
            vec!["3", "Mira", "6th", "South"],
        ])
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(
            parse_filter("School = North"),
            Ok(("School".to_string(), "North".to_string()))
        );
        assert_eq!(parse_filter("D="), Ok(("D".to_string(), String::new())));
        assert!(parse_filter("School").is_err());
        assert!(parse_filter("=North").is_err());
    }

    #[test]
    fn test_column_filters_resolve_headers_and_letters() {
        let grid = roster();
        let filters = column_filters(
            &grid,
            &[
                ("school".to_string(), "South".to_string()),
                ("C".to_string(), "6th".to_string()),
            ],
        )
        .unwrap();
        let rows = grid.filter_rows(&filters);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], "Mira");
    }

    #[test]
    fn test_column_filters_reject_unknown_column() {
        let err = column_filters(&roster(), &[("Mobile!".to_string(), "1".to_string())])
            .unwrap_err();
        assert!(err.to_string().contains("Mobile!"));
    }
}
