use serde::Serialize;

use crate::cli::OutputFormat;
use crate::ui;

pub mod table;

pub use table::Column;

/// One titled table of a tabular rendering.
#[derive(Clone, Debug)]
pub struct TableSection {
    pub title: Option<&'static str>,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

impl TableSection {
    #[must_use]
    pub fn new(title: Option<&'static str>, columns: &[Column], rows: Vec<Vec<String>>) -> Self {
        Self {
            title,
            columns: columns.to_vec(),
            rows,
        }
    }
}

/// A response that knows how to lay itself out as tables.
pub trait Tabular: Serialize {
    fn sections(&self) -> Vec<TableSection>;
}

/// Render a response to a string in the requested format.
pub fn render<T: Tabular>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Table => Ok(render_table(value)),
    }
}

/// Print a response in the requested format.
pub fn output<T: Tabular>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = render(value, format)?;
    println!("{rendered}");
    Ok(())
}

fn render_table<T: Tabular>(value: &T) -> String {
    let prefs = ui::prefs();
    let options = table::TableOptions {
        max_width: prefs.term_width,
        color: prefs.table_color,
    };

    value
        .sections()
        .iter()
        .map(|section| {
            let body = if section.rows.is_empty() {
                String::from("(no rows)")
            } else {
                table::render_rows(&section.columns, &section.rows, options)
            };
            match section.title {
                Some(title) => format!("{title}:\n{body}"),
                None => body,
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
