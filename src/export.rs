//! # Workbook export
//!
//! Renders an [`Extraction`] and its [`CountSummary`] as a two-sheet `.xlsx` workbook:
//! the result rows first, the per-keyword counts second. Numbers become numeric
//! cells, text becomes inline strings and empty values are left out.

use crate::error::RustyDishError;
use crate::extract::Extraction;
use crate::extract::RANK_COLUMN;
use crate::helpers::xml::XmlWriter;
use crate::helpers::zip::PackageWriter;
use crate::spreadsheet::reference::index_to_reference;
use crate::summary::CountSummary;
use crate::table::Table;
use crate::table::Value;
use std::io::Cursor;
use std::path::Path;
use tracing::info;

const NAMESPACE_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NAMESPACE_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
</Types>"#;

const ROOT_RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const WORKBOOK_RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>
<fills count="1"><fill><patternFill patternType="none"/></fill></fills>
<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
<cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>
<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>
</styleSheet>"#;

/// Label set of the exported workbook.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    Chinese,
    English,
}

impl Locale {
    pub fn result_sheet(&self) -> &'static str {
        match self {
            Locale::Chinese => "TOP菜品",
            Locale::English => "Top dishes",
        }
    }

    pub fn summary_sheet(&self) -> &'static str {
        match self {
            Locale::Chinese => "统计",
            Locale::English => "Summary",
        }
    }

    pub fn keyword_label(&self) -> &'static str {
        match self {
            Locale::Chinese => "关键词",
            Locale::English => "keyword",
        }
    }

    pub fn count_label(&self) -> &'static str {
        match self {
            Locale::Chinese => "数量",
            Locale::English => "count",
        }
    }

    /// Suggested download file name
    pub fn file_name(&self) -> &'static str {
        match self {
            Locale::Chinese => "TOP菜品_结果.xlsx",
            Locale::English => "top_dishes.xlsx",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportOptions {
    pub locale: Locale,
    /// Keep [`RANK_COLUMN`] in the result sheet
    pub keep_rank: bool,
}

/// Builds the workbook in memory.
pub fn export_workbook(extraction: &Extraction, summary: &CountSummary, options: &ExportOptions) -> Result<Vec<u8>, RustyDishError> {
    let locale = options.locale;
    let mut result = extraction.table.clone();
    if !options.keep_rank {
        result.drop_column(RANK_COLUMN);
    }
    let counts = summary_table(summary, locale)?;

    let mut package = PackageWriter::new(Cursor::new(Vec::new()));
    package.part("[Content_Types].xml", CONTENT_TYPES.as_bytes())?;
    package.part("_rels/.rels", ROOT_RELATIONSHIPS.as_bytes())?;
    package.part("xl/workbook.xml", &workbook_xml(&[locale.result_sheet(), locale.summary_sheet()])?)?;
    package.part("xl/_rels/workbook.xml.rels", WORKBOOK_RELATIONSHIPS.as_bytes())?;
    package.part("xl/styles.xml", STYLES.as_bytes())?;
    package.part("xl/worksheets/sheet1.xml", &worksheet_xml(&result)?)?;
    package.part("xl/worksheets/sheet2.xml", &worksheet_xml(&counts)?)?;
    let bytes = package.finish()?.into_inner();

    info!(
        rows = result.len(),
        keywords = summary.len(),
        bytes = bytes.len(),
        "Workbook exported"
    );
    Ok(bytes)
}

/// Writes the workbook to `path`, replacing any existing file.
pub fn export_workbook_to_path<P: AsRef<Path>>(
    path: P,
    extraction: &Extraction,
    summary: &CountSummary,
    options: &ExportOptions,
) -> Result<(), RustyDishError> {
    let bytes = export_workbook(extraction, summary, options)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

fn summary_table(summary: &CountSummary, locale: Locale) -> Result<Table, RustyDishError> {
    let rows = summary
        .entries()
        .iter()
        .map(|(keyword, count)| vec![Value::from(keyword.as_str()), Value::from(*count as i64)]);
    Ok(Table::from_rows([locale.keyword_label(), locale.count_label()], rows)?)
}

fn workbook_xml(sheet_names: &[&str]) -> Result<Vec<u8>, RustyDishError> {
    let mut writer = XmlWriter::new(Vec::new())?;
    writer.start("workbook", &[("xmlns", NAMESPACE_MAIN), ("xmlns:r", NAMESPACE_RELATIONSHIPS)])?;
    writer.start("sheets", &[])?;
    for (index, &name) in sheet_names.iter().enumerate() {
        let id = (index + 1).to_string();
        let relationship = format!("rId{id}");
        writer.empty("sheet", &[("name", name), ("sheetId", id.as_str()), ("r:id", relationship.as_str())])?;
    }
    writer.end("sheets")?;
    writer.end("workbook")?;
    Ok(writer.into_inner())
}

/// One worksheet: a header row with the column names, then one row per table row.
fn worksheet_xml(table: &Table) -> Result<Vec<u8>, RustyDishError> {
    let mut writer = XmlWriter::new(Vec::new())?;
    writer.start("worksheet", &[("xmlns", NAMESPACE_MAIN)])?;
    writer.start("sheetData", &[])?;

    let header = table.columns().iter().map(|column| Value::from(column.as_str())).collect::<Vec<_>>();
    for (row, values) in std::iter::once(&header).chain(table.rows()).enumerate() {
        let number = (row + 1).to_string();
        writer.start("row", &[("r", number.as_str())])?;
        for (col, value) in values.iter().enumerate() {
            write_cell(&mut writer, &index_to_reference(row, col), value)?;
        }
        writer.end("row")?;
    }

    writer.end("sheetData")?;
    writer.end("worksheet")?;
    Ok(writer.into_inner())
}

fn write_cell(writer: &mut XmlWriter<Vec<u8>>, reference: &str, value: &Value) -> Result<(), RustyDishError> {
    match value {
        Value::Empty => Ok(()),
        Value::Number(number) if number.is_finite() => {
            writer.start("c", &[("r", reference)])?;
            writer.text_element("v", &[], &number.to_string())?;
            writer.end("c")
        }
        _ => {
            let text = value.as_text();
            writer.start("c", &[("r", reference), ("t", "inlineStr")])?;
            writer.start("is", &[])?;
            if text.trim() == text.as_ref() {
                writer.text_element("t", &[], &text)?;
            } else {
                writer.text_element("t", &[("xml:space", "preserve")], &text)?;
            }
            writer.end("is")?;
            writer.end("c")
        }
    }
}
