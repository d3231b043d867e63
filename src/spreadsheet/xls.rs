use crate::error::RustyDishError;
use crate::helpers::biff8::Biff8Reader;
use crate::helpers::cfb::Cfb;
use crate::helpers::reader::UnifiedReader;
use crate::match_biff8_record;
use crate::spreadsheet::cell::to_error_value;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::excel::load_number_formats;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use std::collections::HashMap;
use thiserror::Error;

// BIFF8 record types
const FORMULA: u16 = 6;
const EOF: u16 = 10;
const DATE1904: u16 = 34;
const FILE_PASS: u16 = 47;
const CODE_PAGE: u16 = 66;
const BOUND_SHEET8: u16 = 133;
const MUL_RK: u16 = 189;
const XF: u16 = 224;
const SST: u16 = 252;
const LABEL_SST: u16 = 253;
const NUMBER: u16 = 515;
const LABEL: u16 = 516;
const BOOL_ERR: u16 = 517;
const STRING: u16 = 519;
const RK: u16 = 638;
const FORMAT: u16 = 1054;
const BOF: u16 = 2057;

// Sheet type of BOUND_SHEET8 for worksheets (charts and macro sheets are skipped)
const WORKSHEET: u8 = 0;

#[derive(Error, Debug)]
pub enum XlsError {
    #[error("Invalid code page '{0}'")]
    CodePageError(u16),

    #[error("Invalid formula value '{0:#018x}'")]
    FormulaValueError(u64),
}

/// A legacy Excel 97-2003 workbook
pub(crate) struct XlsSpreadsheet {
    /// Display name of the workbook (file name or upload name)
    pub(crate) name: String,
    reader: Biff8Reader,
    shared_strings: Vec<String>,
    /// Cell types indexed by XF record
    number_formats: Vec<CellType>,
    /// Worksheets as (name, stream offset of their BOF record) in workbook order
    sheets: Vec<(String, usize)>,
}

impl XlsSpreadsheet {
    /// Loads the workbook stream and reads the globals substream: code page, date system,
    /// number formats, shared strings and the worksheet directory.
    pub(crate) fn open(name: &str, mut reader: UnifiedReader) -> Result<XlsSpreadsheet, RustyDishError> {
        let cfb = Cfb::new(&mut reader)?;
        // Files written by Excel 5 name the stream "Book"
        let stream = match cfb.read("Workbook")? {
            Some(stream) => stream,
            None => cfb.read("Book")?.ok_or_else(|| SpreadsheetError::SpreadsheetEmptyError(name.to_owned()))?,
        };
        let mut reader = Biff8Reader::new(stream);
        let mut is_1904 = false;
        let mut shared_strings = Vec::new();
        let mut custom_formats = HashMap::<String, CellType>::new();
        let mut format_indexes = Vec::<String>::new();
        let mut sheets = Vec::<(String, usize)>::new();
        match_biff8_record!(reader => {
            EOF => break,
            FILE_PASS => Err(SpreadsheetError::SpreadsheetPasswordProtectedError(name.to_owned()))?,
            DATE1904 if reader.read_u16()? == 1 => is_1904 = true,
            CODE_PAGE => {
                let code_page = reader.read_u16()?;
                reader.encoding = codepage::to_encoding(code_page).ok_or(XlsError::CodePageError(code_page))?;
            }
            FORMAT => {
                let id = reader.read_u16()?;
                let format = reader.read_xl_unicode_string()?;
                custom_formats.insert(id.to_string(), CellType::parse_custom_number_format(&format, is_1904));
            }
            XF => {
                reader.skip(2)?;
                format_indexes.push(reader.read_u16()?.to_string());
            }
            SST => shared_strings = load_shared_strings(&mut reader)?,
            BOUND_SHEET8 => {
                let pointer = reader.read_usize()?;
                reader.skip(1)?;
                let sheet_type = reader.read_u8()?;
                let sheet_name = reader.read_short_xl_unicode_string()?;
                if sheet_type == WORKSHEET {
                    sheets.push((sheet_name, pointer));
                }
            }
        });
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(name.to_owned()))?
        }

        Ok(XlsSpreadsheet {
            name: name.to_owned(),
            reader,
            shared_strings,
            number_formats: load_number_formats(format_indexes, custom_formats, is_1904),
            sheets,
        })
    }
}

impl Spreadsheet for XlsSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    /// The shared string table was already read with the globals.
    fn load_shared_strings(&mut self) -> Result<Vec<String>, RustyDishError> {
        Ok(self.shared_strings.clone())
    }

    /// Reads the first worksheet accepted by the criteria.
    fn read_sheet(&mut self, criteria: &Criteria) -> Result<Option<Sheet>, RustyDishError> {
        let Some((sheet_name, pointer)) = self.sheets.iter().find(|(name, _)| criteria.accept(name)) else {
            return Ok(None);
        };

        let mut sheet = Sheet::new(sheet_name, criteria.range, criteria.rows_limit, criteria.skip_empty_rows);
        let reader = &mut self.reader;
        let number_formats = &self.number_formats;
        reader.goto(*pointer);
        reader.next()?;
        'records: while let Some(record) = reader.next()? {
            match record {
                BOF | EOF => break,
                MUL_RK => {
                    let row = reader.read_u16()? as usize;
                    let first_col = reader.read_u16()? as usize;
                    let last_col = reader.get_u16_back(2)? as usize;
                    if sheet.after_row_upper_bound(row) {
                        break;
                    }
                    for col in first_col..=last_col {
                        let format = reader.read_u16()?;
                        let value = reader.read_rk_number()?;
                        if !sheet.contains(row, col) {
                            continue;
                        }
                        if criteria.end_at_empty_row && sheet.follows_empty_row(row) {
                            break 'records;
                        }
                        sheet.push(Cell {
                            row,
                            col,
                            kind: format_of(number_formats, format),
                            value,
                        });
                    }
                }
                BOOL_ERR | NUMBER | RK | LABEL_SST | LABEL | FORMULA => {
                    let row = reader.read_u16()? as usize;
                    let col = reader.read_u16()? as usize;
                    if sheet.after_row_upper_bound(row) {
                        break;
                    } else if !sheet.contains(row, col) {
                        continue;
                    }
                    let (kind, value) = match record {
                        BOOL_ERR => read_bool_or_error_cell(reader)?,
                        NUMBER => read_number_cell(reader, number_formats)?,
                        RK => read_rk_cell(reader, number_formats)?,
                        LABEL_SST => read_label_sst_cell(reader)?,
                        LABEL => read_label_cell(reader)?,
                        _ => read_formula_cell(reader, number_formats)?,
                    };
                    if value.is_empty() || (kind == CellType::Error && criteria.error_as_null) {
                        continue;
                    }
                    if criteria.end_at_empty_row && sheet.follows_empty_row(row) {
                        break;
                    }
                    sheet.push(Cell { row, col, kind, value });
                }
                _ => (),
            }
        }

        Ok(Some(sheet))
    }
}

fn format_of(number_formats: &[CellType], index: u16) -> CellType {
    number_formats.get(index as usize).copied().unwrap_or(CellType::Number)
}

fn load_shared_strings(reader: &mut Biff8Reader) -> Result<Vec<String>, RustyDishError> {
    // Total reference count, then the number of unique strings
    reader.skip(4)?;
    let count = reader.read_usize()?;
    (0..count).map(|_| reader.read_xl_unicode_rich_extended_string()).collect()
}

fn read_bool_or_error_cell(reader: &mut Biff8Reader) -> Result<(CellType, String), RustyDishError> {
    reader.skip(2)?;
    let value = reader.read_u8()?;
    Ok(if reader.read_u8()? == 0 {
        (CellType::Boolean, value.to_string())
    } else {
        (CellType::Error, to_error_value(value).to_owned())
    })
}

fn read_number_cell(reader: &mut Biff8Reader, number_formats: &[CellType]) -> Result<(CellType, String), RustyDishError> {
    let format = reader.read_u16()?;
    let value = reader.read_f64()?;
    Ok((format_of(number_formats, format), value.to_string()))
}

fn read_rk_cell(reader: &mut Biff8Reader, number_formats: &[CellType]) -> Result<(CellType, String), RustyDishError> {
    let format = reader.read_u16()?;
    let value = reader.read_rk_number()?;
    Ok((format_of(number_formats, format), value))
}

fn read_label_sst_cell(reader: &mut Biff8Reader) -> Result<(CellType, String), RustyDishError> {
    reader.skip(2)?;
    Ok((CellType::SharedString, reader.read_usize()?.to_string()))
}

fn read_label_cell(reader: &mut Biff8Reader) -> Result<(CellType, String), RustyDishError> {
    reader.skip(2)?;
    Ok((CellType::InlineString, reader.read_xl_unicode_string()?))
}

/// Reads the cached result of a formula. String results live in the STRING record
/// that follows the FORMULA record.
fn read_formula_cell(reader: &mut Biff8Reader, number_formats: &[CellType]) -> Result<(CellType, String), RustyDishError> {
    let format = reader.read_u16()?;
    let formula = reader.read_u64()?;
    if (formula & 0xFFFF_0000_0000_0000) != 0xFFFF_0000_0000_0000 {
        return Ok((format_of(number_formats, format), f64::from_bits(formula).to_string()));
    }
    match formula & 0xFF {
        0 if reader.next()? == Some(STRING) => Ok((CellType::InlineString, reader.read_xl_unicode_string()?)),
        1 => {
            let value = if (formula & 0xFF_0000) > 0 { "1" } else { "0" };
            Ok((CellType::Boolean, value.to_owned()))
        }
        2 => Ok((CellType::Error, to_error_value(((formula >> 16) & 0xFF) as u8).to_owned())),
        3 => Ok((CellType::InlineString, String::new())),
        _ => Err(XlsError::FormulaValueError(formula))?,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::helpers::cfb::tests::compound_file;
    use crate::spreadsheet::read_table_from_bytes;
    use crate::spreadsheet::ReadOptions;
    use crate::table::Value;

    fn record(kind: u16, payload: &[u8]) -> Vec<u8> {
        let mut bytes = kind.to_le_bytes().to_vec();
        bytes.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    /// Cell record: row, column, XF index, then the record specific payload.
    fn cell(kind: u16, row: u16, col: u16, xf: u16, rest: &[u8]) -> Vec<u8> {
        let mut payload = [row, col, xf].iter().flat_map(|value| value.to_le_bytes()).collect::<Vec<_>>();
        payload.extend_from_slice(rest);
        record(kind, &payload)
    }

    /// String with a 16-bit length, stored compressed when it is all Latin-1.
    fn unicode(text: &str) -> Vec<u8> {
        let units = text.encode_utf16().collect::<Vec<_>>();
        let mut bytes = (units.len() as u16).to_le_bytes().to_vec();
        if units.iter().all(|unit| *unit < 0x100) {
            bytes.push(0);
            bytes.extend(units.iter().map(|unit| *unit as u8));
        } else {
            bytes.push(1);
            bytes.extend(units.iter().flat_map(|unit| unit.to_le_bytes()));
        }
        bytes
    }

    fn bound_sheet(pointer: u32, sheet_type: u8, name: &str) -> Vec<u8> {
        let mut payload = pointer.to_le_bytes().to_vec();
        payload.extend([0, sheet_type, name.len() as u8, 0]);
        payload.extend(name.bytes());
        record(BOUND_SHEET8, &payload)
    }

    fn bof(substream: u16) -> Vec<u8> {
        let mut payload = vec![0u8; 16];
        payload[0..2].copy_from_slice(&0x0600u16.to_le_bytes());
        payload[2..4].copy_from_slice(&substream.to_le_bytes());
        record(BOF, &payload)
    }

    fn globals(pointer: u32, protected: bool) -> Vec<u8> {
        let mut stream = bof(0x0005);
        if protected {
            stream.extend(record(FILE_PASS, &[1, 0]));
        }
        stream.extend(record(CODE_PAGE, &1200u16.to_le_bytes()));
        for format in [0u16, 14] {
            let mut xf = vec![0u8; 20];
            xf[2..4].copy_from_slice(&format.to_le_bytes());
            stream.extend(record(XF, &xf));
        }
        let strings = ["keyword", "score", "奶茶", "咖啡"];
        let mut sst = [strings.len() as u32 + 1, strings.len() as u32]
            .iter()
            .flat_map(|count| count.to_le_bytes())
            .collect::<Vec<_>>();
        strings.iter().for_each(|text| sst.extend(unicode(text)));
        stream.extend(record(SST, &sst));
        stream.extend(bound_sheet(0, 2, "Chart1"));
        stream.extend(bound_sheet(pointer, WORKSHEET, "Report"));
        stream.extend(record(EOF, &[]));
        stream
    }

    fn worksheet() -> Vec<u8> {
        let rk_integer = |value: i32| ((value << 2) | 2).to_le_bytes();
        let mut formula = vec![0, 0, 0, 0, 0, 0, 0xFF, 0xFF];
        formula.extend([0u8; 8]);

        let mut stream = bof(0x0010);
        for (col, index) in [(0, 0u32), (1, 1)] {
            stream.extend(cell(LABEL_SST, 0, col, 0, &index.to_le_bytes()));
        }
        stream.extend(cell(LABEL, 0, 2, 0, &unicode("dish")));
        stream.extend(cell(LABEL, 0, 3, 0, &unicode("day")));

        stream.extend(cell(LABEL_SST, 1, 0, 0, &2u32.to_le_bytes()));
        stream.extend(cell(NUMBER, 1, 1, 0, &9.5f64.to_le_bytes()));
        stream.extend(cell(LABEL, 1, 2, 0, &unicode("Latte")));
        stream.extend(cell(NUMBER, 1, 3, 1, &45292f64.to_le_bytes()));

        stream.extend(cell(LABEL_SST, 2, 0, 0, &3u32.to_le_bytes()));
        stream.extend(cell(RK, 2, 1, 0, &rk_integer(7)));
        stream.extend(cell(FORMULA, 2, 2, 0, &formula));
        stream.extend(record(STRING, &unicode("Mocha")));

        stream.extend(cell(LABEL_SST, 3, 0, 0, &2u32.to_le_bytes()));
        let mut mul_rk = [3u16, 1].iter().flat_map(|value| value.to_le_bytes()).collect::<Vec<_>>();
        mul_rk.extend(0u16.to_le_bytes());
        mul_rk.extend(0x3FF8_0000u32.to_le_bytes());
        mul_rk.extend(0u16.to_le_bytes());
        mul_rk.extend(rk_integer(42));
        mul_rk.extend(2u16.to_le_bytes());
        stream.extend(record(MUL_RK, &mul_rk));

        stream.extend(cell(BOOL_ERR, 4, 0, 0, &[0x07, 1]));
        stream.extend(cell(BOOL_ERR, 4, 1, 0, &[0, 0]));
        stream.extend(record(EOF, &[]));
        stream
    }

    fn workbook(protected: bool) -> Vec<u8> {
        let pointer = globals(0, protected).len() as u32;
        let mut stream = globals(pointer, protected);
        stream.extend(worksheet());
        compound_file("Workbook", &stream)
    }

    #[test]
    fn reads_first_worksheet() {
        let table = read_table_from_bytes("dishes.xls", workbook(false), &ReadOptions::default()).unwrap();

        assert_eq!(table.columns(), &["keyword", "score", "dish", "day"].map(String::from));
        assert_eq!(table.len(), 4);
        assert_eq!(
            table.rows()[0],
            vec![Value::from("奶茶"), Value::Number(9.5), Value::from("Latte"), Value::from("2024-01-01")]
        );
        assert_eq!(table.rows()[1], vec![Value::from("咖啡"), Value::Number(7.0), Value::from("Mocha"), Value::Empty]);
        assert_eq!(table.rows()[2], vec![Value::from("奶茶"), Value::Number(1.5), Value::Number(42.0), Value::Empty]);
        assert_eq!(table.value(3, "keyword"), Some(&Value::from("#DIV/0!")));
        assert_eq!(table.value(3, "score"), Some(&Value::from("false")));
    }

    #[test]
    fn error_cells_can_read_as_null() {
        let options = ReadOptions {
            error_as_null: true,
            ..ReadOptions::default()
        };
        let table = read_table_from_bytes("dishes.xls", workbook(false), &options).unwrap();
        assert_eq!(table.value(3, "keyword"), Some(&Value::Empty));
    }

    #[test]
    fn charts_are_not_worksheets() {
        let options = ReadOptions {
            sheet: Some("Chart*".to_owned()),
            ..ReadOptions::default()
        };
        let error = read_table_from_bytes("dishes.xls", workbook(false), &options).unwrap_err();
        assert!(error.to_string().contains("not found"), "{error}");
    }

    #[test]
    fn encrypted_workbook_is_rejected() {
        let error = read_table_from_bytes("dishes.xls", workbook(true), &ReadOptions::default()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MalformedInput);
        assert!(error.to_string().contains("password protected"), "{error}");
    }

    #[test]
    fn zip_content_is_not_a_workbook() {
        let error = read_table_from_bytes("dishes.xls", b"PK\x03\x04".to_vec(), &ReadOptions::default()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MalformedInput);
    }
}
