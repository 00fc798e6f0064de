//! Plain-text layout of report sections.
//!
//! Each column declares its kind. Text columns are left-aligned and are the
//! only ones shortened to fit the terminal; counts are right-aligned; status
//! columns are left-aligned and coloured. Widths are measured in chars.

const SEPARATOR: &str = "  ";

/// Text columns are never shortened below this.
const MIN_TEXT_WIDTH: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Count,
    Status,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Column {
    pub header: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    #[must_use]
    pub const fn text(header: &'static str) -> Self {
        Self {
            header,
            kind: ColumnKind::Text,
        }
    }

    #[must_use]
    pub const fn count(header: &'static str) -> Self {
        Self {
            header,
            kind: ColumnKind::Count,
        }
    }

    #[must_use]
    pub const fn status(header: &'static str) -> Self {
        Self {
            header,
            kind: ColumnKind::Status,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TableOptions {
    /// Terminal width to fit into; `None` never shortens.
    pub max_width: Option<usize>,
    pub color: bool,
}

fn char_width(value: &str) -> usize {
    value.chars().count()
}

/// Render `rows` under a header line and a dashed divider.
#[must_use]
pub fn render_rows(columns: &[Column], rows: &[Vec<String>], options: TableOptions) -> String {
    let mut widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            rows.iter()
                .filter_map(|row| row.get(idx))
                .map(|cell| char_width(cell))
                .fold(char_width(column.header), usize::max)
        })
        .collect();
    if let Some(max_width) = options.max_width {
        shrink_text_columns(columns, &mut widths, max_width);
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(join_cells(columns.iter().zip(&widths).map(|(column, width)| {
        let header = fit(column.header, *width);
        pad(&header, *width, column.kind)
    })));
    lines.push(join_cells(widths.iter().map(|width| "-".repeat(*width))));

    for row in rows {
        lines.push(join_cells(columns.iter().zip(&widths).enumerate().map(
            |(idx, (column, width))| {
                let value = row.get(idx).map_or("-", String::as_str);
                let shown = match column.kind {
                    ColumnKind::Text => fit(value, *width),
                    ColumnKind::Count | ColumnKind::Status => value.to_string(),
                };
                let cell = pad(&shown, *width, column.kind);
                if options.color && column.kind == ColumnKind::Status {
                    colorize_status(&shown, &cell)
                } else {
                    cell
                }
            },
        )));
    }
    lines.join("\n")
}

fn join_cells(cells: impl Iterator<Item = String>) -> String {
    cells.collect::<Vec<_>>().join(SEPARATOR)
}

/// Take one char at a time from the widest shortenable text column until
/// the line fits or nothing is left to take.
fn shrink_text_columns(columns: &[Column], widths: &mut [usize], max_width: usize) {
    let line_width = widths.iter().sum::<usize>() + SEPARATOR.len() * widths.len().saturating_sub(1);
    let mut excess = line_width.saturating_sub(max_width);

    while excess > 0 {
        let widest = columns
            .iter()
            .zip(widths.iter())
            .enumerate()
            .filter(|(_, (column, width))| column.kind == ColumnKind::Text && **width > MIN_TEXT_WIDTH)
            .max_by_key(|(_, (_, width))| **width)
            .map(|(idx, _)| idx);
        let Some(idx) = widest else {
            break;
        };
        widths[idx] -= 1;
        excess -= 1;
    }
}

/// `value` cut to `width` chars, ending in `…` when cut.
fn fit(value: &str, width: usize) -> String {
    if char_width(value) <= width {
        return value.to_string();
    }
    let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn pad(value: &str, width: usize, kind: ColumnKind) -> String {
    let fill = " ".repeat(width.saturating_sub(char_width(value)));
    match kind {
        ColumnKind::Count => format!("{fill}{value}"),
        ColumnKind::Text | ColumnKind::Status => format!("{value}{fill}"),
    }
}

/// Wrap the status word of an already padded `cell` in an ANSI colour.
fn colorize_status(status: &str, cell: &str) -> String {
    let code = match status {
        "ok" | "uploaded" | "present" => "32",
        "pending" | "skipped" => "33",
        "failed" | "missing" | "error" => "31",
        _ => return cell.to_string(),
    };
    let padding = &cell[status.len()..];
    format!("\u{1b}[{code}m{status}\u{1b}[0m{padding}")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const PLAIN: TableOptions = TableOptions {
        max_width: None,
        color: false,
    };

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn counts_align_right_and_text_left() {
        let columns = [Column::text("repo"), Column::status("status"), Column::count("missing")];
        let rows = vec![row(&["lsst/a", "ok", "0"]), row(&["lsst/afwdata", "missing", "12"])];

        let table = render_rows(&columns, &rows, PLAIN);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "repo          status   missing");
        assert_eq!(lines[1], "------------  -------  -------");
        assert_eq!(lines[2], "lsst/a        ok             0");
        assert_eq!(lines[3], "lsst/afwdata  missing       12");
    }

    #[test]
    fn shortened_cells_keep_columns_aligned() {
        let columns = [Column::text("reason"), Column::count("n")];
        let rows = vec![
            row(&["size mismatch: déclaré 5, reçu 4", "1"]),
            row(&["short", "22"]),
        ];

        let table = render_rows(
            &columns,
            &rows,
            TableOptions {
                max_width: Some(16),
                color: false,
            },
        );

        assert!(table.contains('…'));
        let widths: Vec<usize> = table.lines().map(char_width).collect();
        assert!(widths.iter().all(|w| *w == widths[0]), "{table}");
        assert!(widths[0] <= 16);
        assert!(table.lines().nth(3).is_some_and(|line| line.ends_with("22")));
    }

    #[test]
    fn counts_and_statuses_are_never_shortened() {
        let columns = [Column::status("status"), Column::count("objects")];
        let rows = vec![row(&["pending", "123456789"])];

        let table = render_rows(
            &columns,
            &rows,
            TableOptions {
                max_width: Some(5),
                color: false,
            },
        );

        assert!(table.contains("pending"));
        assert!(table.contains("123456789"));
        assert!(!table.contains('…'));
    }

    #[test]
    fn only_status_columns_are_coloured() {
        let columns = [Column::text("repo"), Column::status("status")];
        let rows = vec![row(&["failed", "failed"])];

        let table = render_rows(
            &columns,
            &rows,
            TableOptions {
                max_width: None,
                color: true,
            },
        );
        let body = table.lines().nth(2).unwrap_or_default();

        assert_eq!(body, "failed  \u{1b}[31mfailed\u{1b}[0m");
    }
}
