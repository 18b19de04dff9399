//! Box-drawn table rendering.

/// A fixed-width table. Column widths grow to fit the widest cell.
#[derive(Debug)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    column_widths: Vec<usize>,
}

fn width(cell: &str) -> usize {
    cell.chars().count()
}

impl Table {
    /// Create a new table with the given headers.
    pub fn new(headers: &[&str]) -> Self {
        let headers: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
        let column_widths = headers.iter().map(|h| width(h)).collect();

        Self {
            headers,
            rows: Vec::new(),
            column_widths,
        }
    }

    /// Add a row to the table. Cells beyond the header count are dropped.
    pub fn add_row(&mut self, row: Vec<String>) {
        for (i, cell) in row.iter().enumerate() {
            if let Some(column) = self.column_widths.get_mut(i) {
                *column = (*column).max(width(cell));
            }
        }
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render the table; every line ends with a newline.
    pub fn render(&self) -> String {
        let mut output = String::new();

        output.push_str(&self.render_border('┌', '┬', '┐'));
        output.push_str(&self.render_row(&self.headers));
        output.push_str(&self.render_border('├', '┼', '┤'));
        for row in &self.rows {
            output.push_str(&self.render_row(row));
        }
        output.push_str(&self.render_border('└', '┴', '┘'));

        output
    }

    fn render_border(&self, left: char, mid: char, right: char) -> String {
        let segments: Vec<String> = self
            .column_widths
            .iter()
            .map(|width| "─".repeat(width + 2))
            .collect();
        format!("{left}{}{right}\n", segments.join(&mid.to_string()))
    }

    fn render_row(&self, row: &[String]) -> String {
        let mut s = String::from("│");

        for (i, column) in self.column_widths.iter().enumerate() {
            let cell = row.get(i).map(|s| s.as_str()).unwrap_or("");
            let padding = column - width(cell);
            s.push(' ');
            s.push_str(cell);
            s.push_str(&" ".repeat(padding));
            s.push_str(" │");
        }

        s.push('\n');
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn table_empty() {
        let table = Table::new(&["A", "B"]);
        assert!(table.is_empty());
        assert_eq!(table.row_count(), 0);

        let output = table.render();
        assert!(output.contains("A"));
        assert!(output.contains("B"));
    }

    #[test]
    fn table_adjusts_column_width() {
        let mut table = Table::new(&["A"]);
        table.add_row(row(&["longer_value"]));

        assert_eq!(
            table.render(),
            "┌──────────────┐\n│ A            │\n├──────────────┤\n│ longer_value │\n└──────────────┘\n"
        );
    }

    #[test]
    fn table_pads_by_characters() {
        let mut table = Table::new(&["Name"]);
        table.add_row(row(&["größe"]));
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        let widths: Vec<usize> = lines.iter().map(|l| l.chars().count()).collect();
        assert!(widths.iter().all(|w| *w == widths[0]), "{lines:?}");
    }

    #[test]
    fn table_handles_missing_cells() {
        let mut table = Table::new(&["A", "B", "C"]);
        table.add_row(row(&["only", "two"]));

        let output = table.render();
        assert!(output.contains("only"));
        assert!(output.contains("two"));
    }

    #[test]
    fn table_render_line_count() {
        let mut table = Table::new(&["Rule ID", "Level", "Line"]);
        table.add_row(row(&["policy-uid", "error", "3"]));
        table.add_row(row(&["query-unassigned", "warning", "9"]));

        // top border, header, separator, 2 data rows, bottom border
        assert_eq!(table.render().lines().count(), 6);
    }
}
