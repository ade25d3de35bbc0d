//! Sheet layout classification.
//!
//! A sheet is either a maker x category export (one column per vehicle
//! class) or a monthly export (one column per calendar month). Monthly
//! exports come in two flavours: maker x month and category x month.

const MONTHS: [&str; 12] = [
    "JANUARY",
    "FEBRUARY",
    "MARCH",
    "APRIL",
    "MAY",
    "JUNE",
    "JULY",
    "AUGUST",
    "SEPTEMBER",
    "OCTOBER",
    "NOVEMBER",
    "DECEMBER",
];

/// Minimum number of month columns for a sheet to be treated as monthly.
pub const MIN_MONTH_COLUMNS: usize = 3;

/// Parse a month column name: `JAN`..`DEC` or the full English name,
/// case-insensitive. `SEPT` is accepted as well.
pub fn month_token(name: &str) -> Option<u8> {
    let name = name.trim().to_uppercase();
    if name.len() < 3 {
        return None;
    }
    let position = MONTHS.iter().position(|month| {
        *month == name || (name.len() == 3 && month.starts_with(name.as_str()))
    });
    let position = match position {
        Some(position) => Some(position),
        None if name == "SEPT" => Some(8),
        None => None,
    };
    position.and_then(|p| u8::try_from(p + 1).ok())
}

/// Which column names the rows of a monthly sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLabel {
    /// Each row is one maker.
    Maker(usize),
    /// Each row is one vehicle category, summed over all makers.
    Category(usize),
}

/// The detected shape of a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetLayout {
    /// Maker x category columns, resolved further by the detection rules.
    Category,
    /// Month columns as `(column, month)` pairs in header order.
    Monthly {
        months: Vec<(usize, u8)>,
        label: Option<RowLabel>,
        year_column: Option<usize>,
    },
}

impl SheetLayout {
    /// Classify a header row.
    pub fn detect(header: &[String]) -> Self {
        let months: Vec<(usize, u8)> = header
            .iter()
            .enumerate()
            .filter_map(|(index, name)| month_token(name).map(|month| (index, month)))
            .collect();
        if months.len() < MIN_MONTH_COLUMNS {
            return SheetLayout::Category;
        }

        let position_of = |needle: &str| {
            header
                .iter()
                .position(|name| name.to_lowercase().contains(needle))
        };
        let label = position_of("maker")
            .map(RowLabel::Maker)
            .or_else(|| position_of("category").map(RowLabel::Category))
            .or_else(|| (header.len() > 1).then_some(RowLabel::Maker(1)));

        SheetLayout::Monthly {
            months,
            label,
            year_column: position_of("year"),
        }
    }

    /// Short name for log output.
    pub fn kind(&self) -> &'static str {
        match self {
            SheetLayout::Category => "maker x category",
            SheetLayout::Monthly {
                label: Some(RowLabel::Category(_)),
                ..
            } => "category x month",
            SheetLayout::Monthly { .. } => "maker x month",
        }
    }
}
