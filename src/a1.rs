use std::fmt;

/// One corner of an A1 range. Either part may be open: `A` is a whole
/// column, `3` a whole row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub col: Option<u32>,
    pub row: Option<u32>,
}

impl CellRef {
    pub fn at(col: u32, row: u32) -> Self {
        Self {
            col: Some(col),
            row: Some(row),
        }
    }

    pub fn col(col: u32) -> Self {
        Self {
            col: Some(col),
            row: None,
        }
    }

    pub fn row(row: u32) -> Self {
        Self {
            col: None,
            row: Some(row),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    pub sheet: String,
    pub start: CellRef,
    pub end: Option<CellRef>,
}

/// Inclusive, 1-based rectangle a range covers. `None` upper bounds are open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub first_col: u32,
    pub last_col: Option<u32>,
    pub first_row: u32,
    pub last_row: Option<u32>,
}

impl Bounds {
    pub fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.first_row
            && col >= self.first_col
            && self.last_row.map_or(true, |last| row <= last)
            && self.last_col.map_or(true, |last| col <= last)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid A1 range '{0}'")]
pub struct InvalidRange(pub String);

impl CellRange {
    pub fn cell(sheet: &str, col: u32, row: u32) -> Self {
        Self {
            sheet: sheet.to_string(),
            start: CellRef::at(col, row),
            end: None,
        }
    }

    /// `A{row}:{last}{row}`
    pub fn row_span(sheet: &str, row: u32, first_col: u32, last_col: u32) -> Self {
        Self {
            sheet: sheet.to_string(),
            start: CellRef::at(first_col, row),
            end: Some(CellRef::at(last_col, row)),
        }
    }

    /// `{row}:{row}`
    pub fn whole_row(sheet: &str, row: u32) -> Self {
        Self {
            sheet: sheet.to_string(),
            start: CellRef::row(row),
            end: Some(CellRef::row(row)),
        }
    }

    /// `A:A`
    pub fn whole_column(sheet: &str, col: u32) -> Self {
        Self {
            sheet: sheet.to_string(),
            start: CellRef::col(col),
            end: Some(CellRef::col(col)),
        }
    }

    /// `A1:{last}` with no row bound.
    pub fn columns_from_top(sheet: &str, last_col: u32) -> Self {
        Self {
            sheet: sheet.to_string(),
            start: CellRef::at(1, 1),
            end: Some(CellRef::col(last_col)),
        }
    }

    /// Parses `Sheet!A1:B2` style text. Text without a sheet prefix is taken
    /// to address `default_sheet`.
    pub fn parse_in(default_sheet: &str, text: &str) -> Result<Self, InvalidRange> {
        let invalid = || InvalidRange(text.to_string());
        let trimmed = text.trim();
        let (sheet, cells) = match trimmed.rfind('!') {
            Some(pos) => (unquote_sheet(&trimmed[..pos]).ok_or_else(invalid)?, &trimmed[pos + 1..]),
            None => (default_sheet.to_string(), trimmed),
        };
        if sheet.is_empty() || cells.is_empty() {
            return Err(invalid());
        }

        let (start, end) = match cells.split_once(':') {
            Some((start, end)) => (
                parse_ref(start).ok_or_else(invalid)?,
                Some(parse_ref(end).ok_or_else(invalid)?),
            ),
            None => (parse_ref(cells).ok_or_else(invalid)?, None),
        };
        Ok(Self { sheet, start, end })
    }

    pub fn bounds(&self) -> Bounds {
        let first_col = self.start.col.unwrap_or(1);
        let first_row = self.start.row.unwrap_or(1);
        let (last_col, last_row) = match self.end {
            Some(end) => (end.col, end.row),
            None => (self.start.col, self.start.row),
        };
        Bounds {
            first_col,
            last_col,
            first_row,
            last_row,
        }
    }

    /// Cells part only, without the sheet prefix.
    pub fn cells_a1(&self) -> String {
        match self.end {
            Some(end) => format!("{}:{}", self.start, end),
            None => self.start.to_string(),
        }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = self.col {
            f.write_str(&column_letters(col))?;
        }
        if let Some(row) = self.row {
            write!(f, "{row}")?;
        }
        Ok(())
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", quote_sheet(&self.sheet), self.cells_a1())
    }
}

/// 1 -> A, 26 -> Z, 27 -> AA. Zero has no letters.
pub fn column_letters(mut index: u32) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, ch| {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = u32::from(ch.to_ascii_uppercase() as u8 - b'A' + 1);
        acc.checked_mul(26)?.checked_add(digit)
    })
}

fn parse_ref(raw: &str) -> Option<CellRef> {
    let raw = raw.trim().replace('$', "");
    if raw.is_empty() {
        return None;
    }
    let split = raw
        .find(|ch: char| ch.is_ascii_digit())
        .unwrap_or(raw.len());
    let (letters, digits) = raw.split_at(split);
    let col = if letters.is_empty() {
        None
    } else {
        Some(column_index(letters)?)
    };
    let row = if digits.is_empty() {
        None
    } else {
        let value = digits.parse::<u32>().ok()?;
        if value == 0 {
            return None;
        }
        Some(value)
    };
    Some(CellRef { col, row })
}

fn quote_sheet(title: &str) -> String {
    if !title.is_empty()
        && title
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        title.to_string()
    } else {
        format!("'{}'", title.replace('\'', "''"))
    }
}

fn unquote_sheet(raw: &str) -> Option<String> {
    let raw = raw.trim();
    match raw.strip_prefix('\'') {
        Some(rest) => Some(rest.strip_suffix('\'')?.replace("''", "'")),
        None => Some(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::{column_index, column_letters, Bounds, CellRange, CellRef};

    #[test]
    fn column_letters_are_bijective_base26() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(52), "AZ");
        assert_eq!(column_letters(703), "AAA");
        assert_eq!(column_letters(0), "");
        for index in [1, 9, 26, 27, 200, 16384] {
            assert_eq!(column_index(&column_letters(index)), Some(index));
        }
    }

    #[test]
    fn parses_ranges_with_and_without_sheet() {
        let range = CellRange::parse_in("Users", "B5").expect("cell should parse");
        assert_eq!(range, CellRange::cell("Users", 2, 5));

        let range = CellRange::parse_in("Users", "Config!A2:D2").expect("range should parse");
        assert_eq!(range.sheet, "Config");
        assert_eq!(range.start, CellRef::at(1, 2));
        assert_eq!(range.end, Some(CellRef::at(4, 2)));

        let range = CellRange::parse_in("x", "'Quiz Scores'!1:1").expect("quoted sheet");
        assert_eq!(range.sheet, "Quiz Scores");
        assert_eq!(range.to_string(), "'Quiz Scores'!1:1");
    }

    #[test]
    fn rejects_malformed_ranges() {
        for text in ["", "Users!", "A0", "1A", "Users!A1:", "A-1"] {
            assert!(
                CellRange::parse_in("Users", text).is_err(),
                "expected '{text}' to be rejected"
            );
        }
    }

    #[test]
    fn bounds_follow_open_ended_forms() {
        let table = CellRange::columns_from_top("Users", 26);
        assert_eq!(table.to_string(), "Users!A1:Z");
        assert_eq!(
            table.bounds(),
            Bounds {
                first_col: 1,
                last_col: Some(26),
                first_row: 1,
                last_row: None,
            }
        );

        let header = CellRange::whole_row("Users", 1);
        assert_eq!(header.to_string(), "Users!1:1");
        assert!(header.bounds().contains(1, 400));
        assert!(!header.bounds().contains(2, 1));

        let column = CellRange::whole_column("Users", 1);
        assert_eq!(column.to_string(), "Users!A:A");
        assert!(column.bounds().contains(9000, 1));

        let cell = CellRange::cell("Students", 2, 7);
        assert_eq!(cell.to_string(), "Students!B7");
        assert!(cell.bounds().contains(7, 2));
        assert!(!cell.bounds().contains(7, 3));
    }

    #[test]
    fn row_span_renders_full_width_rewrite() {
        let span = CellRange::row_span("Mentors", 4, 1, 8);
        assert_eq!(span.to_string(), "Mentors!A4:H4");
    }
}
