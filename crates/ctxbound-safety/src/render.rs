//! Truncated plain-text table rendering.
//!
//! Output is one header line, at most `max_rows` data lines, and one marker
//! line when rows were left out: never more than `max_rows + 2` lines.

use ctxbound_core::types::{Scalar, Table};
use ctxbound_core::Result;

/// Longest cell rendered before it is cut and suffixed with `...`.
pub const MAX_CELL_CHARS: usize = 32;

/// Render `table` with at most `max_rows` rows: the first half and the last
/// half, separated by a `... N rows omitted ...` marker. `columns` selects
/// and orders the columns shown; unknown names are an error.
pub fn safe_render_table(table: &Table, max_rows: usize, columns: Option<&[String]>) -> Result<String> {
    let projected;
    let table = match columns {
        Some(names) => {
            projected = table.select(names)?;
            &projected
        }
        None => table,
    };

    let total = table.num_rows();
    let (head, tail) = if total <= max_rows {
        (total, 0)
    } else {
        (max_rows - max_rows / 2, max_rows / 2)
    };
    let omitted = total - head - tail;

    let shown: Vec<usize> = (0..head).chain(total - tail..total).collect();
    let cells: Vec<Vec<String>> = shown
        .iter()
        .map(|&r| table.columns.iter().map(|c| cell(&c.values[r])).collect())
        .collect();
    let header: Vec<String> = table.columns.iter().map(|c| clip(&c.name)).collect();

    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    push_line(&mut out, &header, &widths);
    for (i, row) in cells.iter().enumerate() {
        if i == head && omitted > 0 {
            out.push_str(&marker(omitted));
        }
        push_line(&mut out, row, &widths);
    }
    if omitted > 0 && tail == 0 {
        out.push_str(&marker(omitted));
    }
    Ok(out)
}

fn marker(omitted: usize) -> String {
    format!("... {omitted} rows omitted ...\n")
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(c, w)| format!("{c:<w$}"))
        .collect::<Vec<_>>()
        .join(" | ");
    out.push_str(line.trim_end());
    out.push('\n');
}

fn cell(value: &Scalar) -> String {
    match value {
        Scalar::Null => String::new(),
        v => clip(&v.to_string()),
    }
}

fn clip(s: &str) -> String {
    if s.chars().count() <= MAX_CELL_CHARS {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(MAX_CELL_CHARS - 3).collect();
    cut.push_str("...");
    cut
}
