use crate::error::RustyDishError;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::SpreadsheetError;
use crate::table::Value;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::Timelike;
use iso8601_duration::Duration as IsoDuration;

/// Types of cell data in spreadsheet files.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values stored as 1/0
    Boolean,
    /// Numeric values
    Number,
    /// Date/time values stored as numbers from 1900 epoch
    NumberDateTime1900,
    /// Date values stored as numbers from 1900 epoch
    NumberDate1900,
    /// Time values stored as numbers from 1900 epoch
    NumberTime1900,
    /// Date/time values stored as numbers from 1904 epoch
    NumberDateTime1904,
    /// Date values stored as numbers from 1904 epoch
    NumberDate1904,
    /// Time values stored as numbers from 1904 epoch
    NumberTime1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// ISO 8601 duration strings
    IsoDuration,
    /// Inline string values
    InlineString,
    /// Shared string table references
    SharedString,
    /// Error values such as `#DIV/0!`, kept as their text
    Error,
}

impl CellType {
    /// Parses built-in Excel number format IDs to determine cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Parses custom number format strings to determine cell type.
    /// Date and time tokens inside quoted literals, escapes and `[...]` sections are ignored.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_bracket = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_literal => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            (false, false, _) => Self::Number,
        }
    }
}

/// Text of a binary error code as Excel displays it.
pub(crate) fn to_error_value(code: u8) -> &'static str {
    match code {
        0x00 => "#NULL!",
        0x07 => "#DIV/0!",
        0x0F => "#VALUE!",
        0x17 => "#REF!",
        0x1D => "#NAME?",
        0x24 => "#NUM!",
        0x2A => "#N/A",
        0x2B => "#GETTING_DATA",
        _ => "#ERROR!",
    }
}

/// A single non-empty cell collected from a worksheet.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    pub(crate) kind: CellType,
    /// Raw cell value as stored in the file
    pub(crate) value: String,
}

impl Cell {
    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Converts the raw cell into a table value.
    /// Shared string cells are resolved against the workbook's shared string table.
    pub(crate) fn to_value(&self, shared_strings: &[String]) -> Result<Value, RustyDishError> {
        let invalid = |message: &str| SpreadsheetError::CellValueError(self.reference(), format!("{message} '{}'", self.value));
        let value = match self.kind {
            CellType::Empty => Value::Empty,
            CellType::Boolean => Value::Text(if self.value == "1" || self.value.eq_ignore_ascii_case("true") { "true" } else { "false" }.to_owned()),
            CellType::Number => Value::Number(self.value.trim().parse::<f64>().map_err(|_| invalid("not a number"))?),
            CellType::NumberDateTime1900 | CellType::NumberDateTime1904 => {
                let serial = self.value.trim().parse::<f64>().map_err(|_| invalid("not a date serial"))?;
                let datetime = serial_to_datetime(serial, self.kind == CellType::NumberDateTime1904).ok_or_else(|| invalid("date out of range"))?;
                Value::Text(format_datetime(&datetime))
            }
            CellType::NumberDate1900 | CellType::NumberDate1904 => {
                let serial = self.value.trim().parse::<f64>().map_err(|_| invalid("not a date serial"))?;
                let datetime = serial_to_datetime(serial, self.kind == CellType::NumberDate1904).ok_or_else(|| invalid("date out of range"))?;
                Value::Text(datetime.date().format("%Y-%m-%d").to_string())
            }
            CellType::NumberTime1900 | CellType::NumberTime1904 => {
                let serial = self.value.trim().parse::<f64>().map_err(|_| invalid("not a time serial"))?;
                Value::Text(format_time_of_day(serial))
            }
            CellType::IsoDateTime => Value::Text(self.value.replace('T', " ")),
            CellType::IsoDuration => {
                let duration = self.value.parse::<IsoDuration>().map_err(|_| invalid("not an ISO 8601 duration"))?;
                let seconds = (duration.hour * 3600.0 + duration.minute * 60.0 + duration.second).round() as i64;
                Value::Text(format!("{:02}:{:02}:{:02}", seconds / 3600, seconds % 3600 / 60, seconds % 60))
            }
            CellType::InlineString | CellType::Error => Value::Text(self.value.to_owned()),
            CellType::SharedString => {
                let index = self.value.trim().parse::<usize>()?;
                let text = shared_strings.get(index).ok_or_else(|| invalid("unknown shared string"))?;
                Value::Text(text.to_owned())
            }
        };
        Ok(value)
    }
}

/// Converts an Excel date serial to a timestamp, rounded to the millisecond.
/// The 1900 system keeps Lotus 1-2-3's phantom 1900-02-29 (serial 60).
fn serial_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.trunc() as i64;
    let offset = if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    };
    let milliseconds = (serial.fract() * 86_400_000f64).round() as i64;
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    epoch
        .checked_add_signed(Duration::days(days + offset))?
        .checked_add_signed(Duration::milliseconds(milliseconds))
}

fn format_datetime(datetime: &NaiveDateTime) -> String {
    if datetime.nanosecond() == 0 {
        datetime.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
    }
}

/// Formats the fractional day of a serial as a time of day.
fn format_time_of_day(serial: f64) -> String {
    let mut milliseconds = (serial.fract().abs() * 86_400_000f64).round() as i64;
    let millis = milliseconds % 1_000; milliseconds /= 1_000;
    let seconds = milliseconds % 60; milliseconds /= 60;
    let minutes = milliseconds % 60; milliseconds /= 60;
    let hours = milliseconds;
    if millis > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}
