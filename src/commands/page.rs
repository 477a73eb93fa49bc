use crate::api::DirectoryApi;
use crate::error::{Error, Result};
use crate::model::{PageResult, hours_left_today};
use chrono::Timelike;
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use serde::Serialize;
use tokio::runtime::Runtime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Table,
    Json,
    Csv,
}

impl Format {
    pub fn from_flags(json: bool, csv: bool) -> Self {
        if json {
            Format::Json
        } else if csv {
            Format::Csv
        } else {
            Format::Table
        }
    }
}

pub fn run(api: &dyn DirectoryApi, runtime: &Runtime, page: u32, format: Format) -> Result<()> {
    let result = runtime.block_on(api.fetch_page(page))?;
    check_range(page, &result)?;

    let hour = chrono::Local::now().hour();
    let output = match format {
        Format::Table => render_table(page, &result, hour),
        Format::Json => render_json(page, &result, hour)?,
        Format::Csv => render_csv(&result),
    };
    println!("{}", output);
    Ok(())
}

/// An empty page past the last one means the page number was wrong
pub fn check_range(page: u32, result: &PageResult) -> Result<()> {
    if result.users.is_empty() && result.total_pages > 0 && u64::from(page) > result.total_pages {
        return Err(Error::PageOutOfRange {
            page,
            total_pages: result.total_pages,
        });
    }
    Ok(())
}

pub fn render_table(page: u32, result: &PageResult, hour: u32) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Page {} / {}\n", page, result.total_pages));
    out.push_str(&format!(
        "# Total users: {} | Active this page: {} | Today copied: {} | Total copied: {} | Hours left today: {}\n",
        result.total_users,
        result.active_count(),
        result.today_copied,
        result.total_copied,
        hours_left_today(hour)
    ));

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["ID", "Full Name", "First", "Last", "City", "Status"]);
    for user in &result.users {
        let status = match user.locked_at {
            Some(at) if user.locked => format!("locked {}", at.format("%Y-%m-%d %H:%M")),
            _ if user.locked => "locked".to_string(),
            _ => "open".to_string(),
        };
        table.add_row(vec![
            Cell::new(&user.id),
            Cell::new(&user.full_name),
            Cell::new(&user.first_name),
            Cell::new(&user.last_name),
            Cell::new(&user.city),
            Cell::new(status),
        ]);
    }
    out.push_str(&table.to_string());
    out
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PageReport<'a> {
    page: u32,
    active_count: usize,
    hours_left_today: u32,
    #[serde(flatten)]
    result: &'a PageResult,
}

pub fn render_json(page: u32, result: &PageResult, hour: u32) -> Result<String> {
    let report = PageReport {
        page,
        active_count: result.active_count(),
        hours_left_today: hours_left_today(hour),
        result,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

pub fn render_csv(result: &PageResult) -> String {
    let mut out = String::from("id,full_name,first_name,last_name,city,locked,locked_at\n");
    for user in &result.users {
        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            csv_field(&user.id),
            csv_field(&user.full_name),
            csv_field(&user.first_name),
            csv_field(&user.last_name),
            csv_field(&user.city),
            user.locked,
            user.locked_at.map(|t| t.to_rfc3339()).unwrap_or_default()
        ));
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
