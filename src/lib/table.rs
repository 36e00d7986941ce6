//! Labelled tables: column labels across the top, a row index down the side.

use crate::ReportError;

/// A rectangular grid of cells with labelled rows and columns.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTable {
    columns: Vec<String>,
    index: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl LabeledTable {
    /// Builds a table, checking that every row matches the column count and
    /// that there is one index label per row.
    pub fn new(
        columns: Vec<String>,
        index: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> Result<Self, ReportError> {
        if columns.is_empty() {
            return Err(ReportError::invalid_table("a table needs at least one column"));
        }
        if index.len() != rows.len() {
            return Err(ReportError::invalid_table(format!(
                "{} index labels for {} rows",
                index.len(),
                rows.len()
            )));
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(ReportError::invalid_table(format!(
                "row {} has {} cells but there are {} columns",
                i + 1,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self {
            columns,
            index,
            rows,
        })
    }

    /// Parses a grid whose first row holds the column labels and whose first
    /// column holds the row labels. The top-left cell is the index heading
    /// and is discarded.
    pub fn from_grid<S: AsRef<str>>(grid: &[Vec<S>]) -> Result<Self, ReportError> {
        let (header, body) = grid
            .split_first()
            .ok_or_else(|| ReportError::invalid_table("the grid is empty"))?;
        if header.len() < 2 {
            return Err(ReportError::invalid_table(
                "the header row needs an index cell and at least one column label",
            ));
        }
        let columns = header[1..].iter().map(|c| c.as_ref().to_string()).collect();

        let mut index = Vec::with_capacity(body.len());
        let mut rows = Vec::with_capacity(body.len());
        for (i, row) in body.iter().enumerate() {
            let (label, cells) = row.split_first().ok_or_else(|| {
                ReportError::invalid_table(format!("row {} is empty", i + 1))
            })?;
            index.push(label.as_ref().to_string());
            rows.push(cells.iter().map(|c| c.as_ref().to_string()).collect());
        }
        Self::new(columns, index, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn index(&self) -> &[String] {
        &self.index
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// `(label, cells)` pairs in row order.
    pub fn labelled_rows(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.index
            .iter()
            .map(String::as_str)
            .zip(self.rows.iter().map(Vec::as_slice))
    }
}

impl<S: AsRef<str>> TryFrom<Vec<Vec<S>>> for LabeledTable {
    type Error = ReportError;

    fn try_from(grid: Vec<Vec<S>>) -> Result<Self, Self::Error> {
        Self::from_grid(&grid)
    }
}

/// How a table is decorated.
#[derive(Debug, Clone, PartialEq)]
pub struct TableStyle {
    /// Draw the label row in the `TableHeader` style.
    pub emphasize_header: bool,
    /// Draw the index column in the `TableHeader` style.
    pub emphasize_index: bool,
    /// Frame every cell.
    pub grid: bool,
    /// Text in the top-left corner cell.
    pub index_label: String,
    /// Relative column widths, index column first. Equal widths when `None`.
    pub column_weights: Option<Vec<usize>>,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            emphasize_header: true,
            emphasize_index: true,
            grid: true,
            index_label: String::new(),
            column_weights: None,
        }
    }
}

impl TableStyle {
    /// Column weights for a table with `columns` data columns.
    pub fn weights_for(&self, columns: usize) -> Vec<usize> {
        match &self.column_weights {
            Some(w) if w.len() == columns + 1 && w.iter().all(|&x| x > 0) => w.clone(),
            _ => vec![1; columns + 1],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn test_valid_table() {
        let table = LabeledTable::new(s(&["a", "b"]), s(&["r1"]), vec![s(&["1", "2"])]).unwrap();
        assert_eq!(table.columns(), ["a", "b"]);
        let rows: Vec<_> = table.labelled_rows().collect();
        assert_eq!(rows[0].0, "r1");
        assert_eq!(rows[0].1, ["1", "2"]);
    }

    #[test]
    fn test_ragged_row_rejected() {
        let err = LabeledTable::new(s(&["a", "b"]), s(&["r1"]), vec![s(&["1"])]).unwrap_err();
        assert!(matches!(err, ReportError::InvalidTableInput { .. }));
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_index_length_mismatch_rejected() {
        assert!(LabeledTable::new(s(&["a"]), s(&[]), vec![s(&["1"])]).is_err());
    }

    #[test]
    fn test_no_columns_rejected() {
        assert!(LabeledTable::new(vec![], vec![], vec![]).is_err());
    }

    #[test]
    fn test_from_grid() {
        let table = LabeledTable::try_from(vec![
            vec!["", "x", "y"],
            vec!["first", "1", "2"],
            vec!["second", "3", "4"],
        ])
        .unwrap();
        assert_eq!(table.columns(), ["x", "y"]);
        assert_eq!(table.index(), ["first", "second"]);
        assert_eq!(table.rows()[1], ["3", "4"]);
    }

    #[test]
    fn test_from_grid_rejects_bad_shapes() {
        assert!(LabeledTable::from_grid::<&str>(&[]).is_err());
        assert!(LabeledTable::from_grid(&[vec!["only"]]).is_err());
        assert!(LabeledTable::from_grid(&[vec!["", "x"], vec![]]).is_err());
        assert!(LabeledTable::from_grid(&[vec!["", "x"], vec!["r", "1", "2"]]).is_err());
    }

    #[test]
    fn test_header_only_grid_is_empty_table() {
        let table = LabeledTable::from_grid(&[vec!["", "x"]]).unwrap();
        assert!(table.rows().is_empty());
    }

    #[test]
    fn test_weights() {
        let mut style = TableStyle::default();
        assert_eq!(style.weights_for(2), vec![1, 1, 1]);
        style.column_weights = Some(vec![2, 1, 1]);
        assert_eq!(style.weights_for(2), vec![2, 1, 1]);
        assert_eq!(style.weights_for(3), vec![1, 1, 1, 1]);
    }
}
