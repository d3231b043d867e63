use crate::error::RustyDishError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::io::Read;
use thiserror::Error;
use zip::ZipArchive;

/// ODS file MIME type identifier
const MIME_TYPE: &[u8] = b"application/vnd.oasis.opendocument.spreadsheet";
const SPREADSHEET: QName = QName(b"office:spreadsheet");
const TABLE: QName = QName(b"table:table");
const TABLE_ROW: QName = QName(b"table:table-row");
const TABLE_CELL: QName = QName(b"table:table-cell");
/// Covered cells are the hidden part of merged cells
const TABLE_COVERED_CELL: QName = QName(b"table:covered-table-cell");
/// Comments attached to a cell
const ANNOTATION: QName = QName(b"office:annotation");
const PARAGRAPH: QName = QName(b"text:p");
/// Run of `text:c` spaces
const STRING: QName = QName(b"text:s");

/// Errors specific to OpenDocument spreadsheets
#[derive(Error, Debug)]
pub enum OdsError {
    #[error("Invalid ODS MIME type")]
    MimeTypeError,

    #[error("Missing content.xml")]
    MissingContentError,
}

/// An OpenDocument spreadsheet
pub(crate) struct OdsSpreadsheet {
    pub(crate) name: String,
    zip: ZipArchive<UnifiedReader>,
}

impl OdsSpreadsheet {
    /// Opens the package, checking its MIME type and rejecting encrypted documents.
    pub(crate) fn open(name: &str, reader: UnifiedReader) -> Result<Self, RustyDishError> {
        let mut zip = ZipArchive::new(reader)?;
        check_mime(&mut zip)?;
        if is_password_protected(&mut zip)? {
            Err(SpreadsheetError::SpreadsheetPasswordProtectedError(name.to_owned()))?;
        }
        Ok(OdsSpreadsheet {
            name: name.to_owned(),
            zip,
        })
    }
}

impl Spreadsheet for OdsSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    /// Strings are stored inline in ODS.
    fn load_shared_strings(&mut self) -> Result<Vec<String>, RustyDishError> {
        Ok(Vec::new())
    }

    fn read_sheet(&mut self, criteria: &Criteria) -> Result<Option<Sheet>, RustyDishError> {
        let mut reader = self.zip
            .xml_reader("content.xml")?
            .ok_or(OdsError::MissingContentError)?;

        let mut sheet_name = None::<String>;
        match_xml_events!(reader => {
            Event::End(event) if event.name() == SPREADSHEET => break,
            Event::Start(event) if event.name() == TABLE => {
                let table_name = event.get_attribute_value("table:name")?.unwrap_or_default();
                if criteria.accept(&table_name) {
                    sheet_name = Some(table_name.into_owned());
                    break;
                }
            }
        });
        let Some(sheet_name) = sheet_name else {
            return Ok(None);
        };

        let mut sheet = Sheet::new(&sheet_name, criteria.range, criteria.rows_limit, criteria.skip_empty_rows);
        let mut row = 0usize;
        let mut col = 0usize;
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        // Whether paragraph text of the current cell is collected
        let mut element_context = false;
        let mut comment_context = false;
        'table: {
            match_xml_events!(reader => {
                Event::End(event) if event.name() == TABLE => break,
                Event::Start(event) if event.name() == TABLE_ROW => {
                    row_count = event.parse_attribute_value("table:number-rows-repeated")?.unwrap_or(1);
                    col = 0;
                }
                Event::End(event) if event.name() == TABLE_ROW => {
                    row += row_count;
                    if sheet.after_row_upper_bound(row) {
                        break;
                    }
                }
                Event::Start(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                    value.clear();
                    col_count = event.parse_attribute_value::<usize>("table:number-columns-repeated")?.unwrap_or(1);
                    let is_error = event.get_attribute_value("calcext:value-type")?
                        .map(|cow| cow == "error")
                        .unwrap_or(false);
                    kind = match event.get_attribute_value("office:value-type")?.as_deref() {
                        None => CellType::Empty,
                        Some("boolean") => CellType::Boolean,
                        Some("date") => CellType::IsoDateTime,
                        Some("time") => CellType::IsoDuration,
                        Some("string") if is_error && criteria.error_as_null => CellType::Empty,
                        Some("string") if is_error => CellType::Error,
                        Some("string") => CellType::InlineString,
                        Some(_) => CellType::Number,
                    };

                    let attribute = match kind {
                        CellType::Boolean => Some("office:boolean-value"),
                        CellType::IsoDateTime => Some("office:date-value"),
                        CellType::IsoDuration => Some("office:time-value"),
                        CellType::Number => Some("office:value"),
                        _ => None,
                    };
                    match attribute {
                        Some(attribute) => if let Some(data) = event.get_attribute_value(attribute)? {
                            value.push_str(&data);
                        },
                        None => element_context = kind != CellType::Empty,
                    }
                }
                Event::End(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                    if kind != CellType::Empty && !value.is_empty() {
                        for row_offset in 0..row_count {
                            let row_number = row + row_offset;
                            if sheet.before_row_lower_bound(row_number) {
                                continue;
                            } else if sheet.after_row_upper_bound(row_number) {
                                break;
                            }
                            if criteria.end_at_empty_row && sheet.follows_empty_row(row_number) {
                                break 'table;
                            }
                            for col_offset in 0..col_count {
                                let col_number = col + col_offset;
                                if !sheet.before_col_lower_bound(col_number) && !sheet.after_col_upper_bound(col_number) {
                                    sheet.push(Cell {
                                        row: row_number,
                                        col: col_number,
                                        kind,
                                        value: value.to_owned(),
                                    });
                                }
                            }
                        }
                    }
                    col += col_count;
                    element_context = false;
                    comment_context = false;
                }
                Event::Start(event) if element_context && event.name() == ANNOTATION => comment_context = true,
                Event::End(event) if element_context && comment_context && event.name() == ANNOTATION => comment_context = false,
                Event::Start(event) if element_context && !comment_context && event.name() == PARAGRAPH => {
                    if !value.is_empty() {
                        value.push('\n');
                    }
                }
                Event::Start(event) if element_context && !comment_context && event.name() == STRING => {
                    let count = event.parse_attribute_value("text:c")?.unwrap_or(1);
                    for _ in 0..count {
                        value.push(' ');
                    }
                }
                Event::Text(event) if element_context && !comment_context => value.push_bytes_text(&event)?,
                Event::GeneralRef(event) if element_context && !comment_context => value.push_bytes_ref(&event)?,
            });
        }

        Ok(Some(sheet))
    }
}

/// Validates the `mimetype` entry when the package carries one.
fn check_mime(zip: &mut ZipArchive<UnifiedReader>) -> Result<(), RustyDishError> {
    if let Some(mut file) = zip.file("mimetype")? {
        let mut buffer = Vec::with_capacity(MIME_TYPE.len());
        file.read_to_end(&mut buffer)?;
        if buffer.trim_ascii() != MIME_TYPE {
            Err(OdsError::MimeTypeError)?;
        }
    }
    Ok(())
}

/// Checks the manifest for encryption data; packages without a manifest are not encrypted.
fn is_password_protected(zip: &mut ZipArchive<UnifiedReader>) -> Result<bool, RustyDishError> {
    let Some(mut reader) = zip.xml_reader("META-INF/manifest.xml")? else {
        return Ok(false);
    };
    let mut in_file_entry = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == QName(b"manifest:file-entry") => in_file_entry = true,
        Event::Start(event) if in_file_entry && event.name() == QName(b"manifest:encryption-data") => {
            return Ok(true);
        }
    });
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::zip::PackageWriter;
    use crate::table::Value;
    use std::io::Cursor;

    const CONTENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" xmlns:calcext="urn:org:documentfoundation:names:experimental:calc:xmlns:calcext:1.0">
<office:body><office:spreadsheet>
<table:table table:name="Cover"><table:table-row><table:table-cell office:value-type="string"><text:p>cover</text:p></table:table-cell></table:table-row></table:table>
<table:table table:name="Dishes">
<table:table-row>
<table:table-cell office:value-type="string"><text:p>flavor</text:p></table:table-cell>
<table:table-cell office:value-type="string"><text:p>dish</text:p></table:table-cell>
<table:table-cell office:value-type="string"><text:p>sold</text:p></table:table-cell>
</table:table-row>
<table:table-row>
<table:table-cell office:value-type="string"><text:p>奶茶</text:p></table:table-cell>
<table:table-cell office:value-type="string"><text:p>Brown<text:s text:c="2"/>Sugar</text:p><office:annotation><text:p>note</text:p></office:annotation></table:table-cell>
<table:table-cell office:value-type="float" office:value="12"/>
</table:table-row>
<table:table-row table:number-rows-repeated="2"><table:table-cell table:number-columns-repeated="3"/></table:table-row>
<table:table-row>
<table:table-cell office:value-type="string"><text:p>合计</text:p></table:table-cell>
<table:table-cell office:value-type="string" calcext:value-type="error"><text:p>#DIV/0!</text:p></table:table-cell>
<table:table-cell office:value-type="float" office:value="12"/>
</table:table-row>
</table:table>
</office:spreadsheet></office:body></office:document-content>"#;

    fn document(mime: &str) -> Vec<u8> {
        let mut writer = PackageWriter::new(Cursor::new(Vec::new()));
        writer.part("mimetype", mime.as_bytes()).unwrap();
        writer.part("content.xml", CONTENT.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn criteria(pattern: &str) -> Criteria {
        Criteria {
            sheet_name_pattern: Some(glob::Pattern::new(pattern).unwrap()),
            ..Criteria::default()
        }
    }

    #[test]
    fn reads_named_sheet() {
        let bytes = document("application/vnd.oasis.opendocument.spreadsheet");
        let mut spreadsheet = OdsSpreadsheet::open("dishes.ods", UnifiedReader::from_bytes(bytes)).unwrap();
        let criteria = criteria("Dishes");
        let sheet = spreadsheet.read_sheet(&criteria).unwrap().unwrap();
        let table = sheet.to_table(&[], true, &criteria.nulls).unwrap();

        assert_eq!(table.columns(), &["flavor", "dish", "sold"].map(String::from));
        assert_eq!(table.len(), 4);
        assert_eq!(table.value(0, "dish"), Some(&Value::from("Brown  Sugar")));
        assert_eq!(table.value(0, "sold"), Some(&Value::Number(12.0)));
        assert_eq!(table.value(1, "flavor"), Some(&Value::Empty));
        assert_eq!(table.value(3, "flavor"), Some(&Value::from("合计")));
        assert_eq!(table.value(3, "dish"), Some(&Value::from("#DIV/0!")));

        let criteria = Criteria { error_as_null: true, ..criteria };
        let sheet = spreadsheet.read_sheet(&criteria).unwrap().unwrap();
        let table = sheet.to_table(&[], true, &criteria.nulls).unwrap();
        assert_eq!(table.value(3, "dish"), Some(&Value::Empty));
    }

    #[test]
    fn stops_at_empty_row() {
        let bytes = document("application/vnd.oasis.opendocument.spreadsheet");
        let mut spreadsheet = OdsSpreadsheet::open("dishes.ods", UnifiedReader::from_bytes(bytes)).unwrap();
        let criteria = Criteria {
            end_at_empty_row: true,
            ..criteria("Dishes")
        };
        let sheet = spreadsheet.read_sheet(&criteria).unwrap().unwrap();
        assert_eq!(sheet.row_upper_bound, Some(1));
    }

    #[test]
    fn missing_sheet_and_bad_mime() {
        let bytes = document("application/vnd.oasis.opendocument.spreadsheet");
        let mut spreadsheet = OdsSpreadsheet::open("dishes.ods", UnifiedReader::from_bytes(bytes)).unwrap();
        assert!(spreadsheet.read_sheet(&criteria("Summary")).unwrap().is_none());

        let bytes = document("application/vnd.oasis.opendocument.text");
        assert!(OdsSpreadsheet::open("notes.odt", UnifiedReader::from_bytes(bytes)).is_err());
    }
}
