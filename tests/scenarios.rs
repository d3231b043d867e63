use anyhow::Result;
use rusty_dish::export_workbook_to_path;
use rusty_dish::read_table_from_path;
use rusty_dish::run_bytes;
use rusty_dish::run_path;
use rusty_dish::ErrorKind;
use rusty_dish::ExportOptions;
use rusty_dish::ExtractRequest;
use rusty_dish::Job;
use rusty_dish::Locale;
use rusty_dish::ReadOptions;
use rusty_dish::Value;
use std::io::Cursor;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Report" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<cellXfs count="1"><xf numFmtId="0"/></cellXfs>
</styleSheet>"#;

/// A single-sheet report with a `cat` and a `score` column.
fn report(rows: &[(&str, f64)]) -> Result<Vec<u8>> {
    let cells = rows
        .iter()
        .map(|(cat, score)| (*cat, format!("<v>{score}</v>"), ""))
        .collect::<Vec<_>>();
    workbook(&cells)
}

/// Like [`report`], with the raw `<v>` payload and `t` attribute of each score cell.
fn workbook(rows: &[(&str, String, &str)]) -> Result<Vec<u8>> {
    let mut sheet = String::from(
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    sheet.push_str(r#"<row r="1"><c r="A1" t="inlineStr"><is><t>cat</t></is></c><c r="B1" t="inlineStr"><is><t>score</t></is></c></row>"#);
    for (index, (cat, score, kind)) in rows.iter().enumerate() {
        let row = index + 2;
        let kind = if kind.is_empty() { String::new() } else { format!(r#" t="{kind}""#) };
        sheet.push_str(&format!(
            r#"<row r="{row}"><c r="A{row}" t="inlineStr"><is><t>{cat}</t></is></c><c r="B{row}"{kind}>{score}</c></row>"#
        ));
    }
    sheet.push_str("</sheetData></worksheet>");

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in [
        ("xl/workbook.xml", WORKBOOK),
        ("xl/_rels/workbook.xml.rels", RELATIONSHIPS),
        ("xl/styles.xml", STYLES),
        ("xl/worksheets/sheet1.xml", sheet.as_str()),
    ] {
        writer.start_file(name, SimpleFileOptions::default())?;
        writer.write_all(content.as_bytes())?;
    }
    Ok(writer.finish()?.into_inner())
}

fn scenario_report() -> Result<Vec<u8>> {
    report(&[("A", 10.0), ("A", 5.0), ("B", 1.0), ("Total", 999.0)])
}

#[test]
fn footer_is_cut_and_top_row_kept_per_keyword() -> Result<()> {
    let request = ExtractRequest::new("cat", "score", ["A", "B"], 1);
    let outcome = run_bytes("report.xlsx", scenario_report()?, &Job::new(request))?;

    let cut = outcome.footer.cut.as_ref().expect("footer row");
    assert_eq!((cut.row, cut.keyword.as_str()), (3, "Total"));
    assert_eq!(outcome.cleaned_rows, 3);

    let result = &outcome.extraction.table;
    assert_eq!(result.columns(), &["cat", "score", "rank_by_keyword"]);
    assert_eq!(
        result.rows(),
        &[
            vec![Value::from("A"), Value::from(10.0), Value::from(1i64)],
            vec![Value::from("B"), Value::from(1.0), Value::from(1i64)],
        ]
    );
    assert_eq!(outcome.summary.entries(), &[("A".to_owned(), 1), ("B".to_owned(), 1)]);
    Ok(())
}

#[test]
fn unmatched_keywords_give_empty_result() -> Result<()> {
    let request = ExtractRequest::new("cat", "score", ["C"], 3);
    let outcome = run_bytes("report.xlsx", scenario_report()?, &Job::new(request))?;

    assert!(outcome.is_empty());
    assert!(outcome.summary.is_empty());
    assert_eq!(outcome.summary.total(), 0);
    assert!(!outcome.export(&ExportOptions::default())?.is_empty());
    Ok(())
}

#[test]
fn same_grouping_and_ranking_column_is_rejected() -> Result<()> {
    let request = ExtractRequest::new("cat", "cat", ["A"], 1);
    let error = run_bytes("report.xlsx", scenario_report()?, &Job::new(request)).unwrap_err();

    assert_eq!(error.kind(), ErrorKind::InvalidRequest);
    assert_eq!(error.stage(), None);
    Ok(())
}

#[test]
fn missing_ranking_column_is_rejected() -> Result<()> {
    let request = ExtractRequest::new("cat", "price", ["A"], 1);
    let error = run_bytes("report.xlsx", scenario_report()?, &Job::new(request)).unwrap_err();

    assert_eq!(error.kind(), ErrorKind::InvalidRequest);
    assert!(error.to_string().contains("price"), "{error}");
    Ok(())
}

#[test]
fn exported_workbook_reads_back() -> Result<()> {
    let directory = tempfile::tempdir()?;
    let input = directory.path().join("report.xlsx");
    std::fs::write(&input, report(&[("奶茶", 3.0), ("咖啡", 8.0), ("奶茶", 7.5), ("奶茶", 1.0), ("合计", 19.5)])?)?;

    let request = ExtractRequest::from_text("cat", "score", "奶茶\n咖啡\n", 2);
    let outcome = run_path(&input, &Job::new(request))?;
    assert_eq!(outcome.cleaned_rows, 4);

    let output = directory.path().join("top.xlsx");
    let options = ExportOptions {
        locale: Locale::English,
        keep_rank: true,
    };
    export_workbook_to_path(&output, &outcome.extraction, &outcome.summary, &options)?;

    let result = read_table_from_path(&output, &ReadOptions::default())?;
    assert_eq!(result, outcome.extraction.table);

    let summary = read_table_from_path(
        &output,
        &ReadOptions {
            sheet: Some(Locale::English.summary_sheet().to_owned()),
            ..ReadOptions::default()
        },
    )?;
    assert_eq!(summary.columns(), &["keyword", "count"]);
    assert_eq!(
        summary.rows(),
        &[
            vec![Value::from("咖啡"), Value::from(1i64)],
            vec![Value::from("奶茶"), Value::from(2i64)],
        ]
    );
    Ok(())
}

#[test]
fn error_cells_rank_as_missing_scores() -> Result<()> {
    let bytes = workbook(&[
        ("A", "<v>#DIV/0!</v>".to_owned(), "e"),
        ("A", "<v>5</v>".to_owned(), ""),
        ("B", "<v>#N/A</v>".to_owned(), "e"),
    ])?;
    let request = ExtractRequest::new("cat", "score", ["A", "B"], 2);
    let outcome = run_bytes("report.xlsx", bytes, &Job::new(request))?;

    assert_eq!(
        outcome.extraction.table.rows(),
        &[
            vec![Value::from("A"), Value::from(5.0), Value::from(1i64)],
            vec![Value::from("A"), Value::from("#DIV/0!"), Value::from(2i64)],
            vec![Value::from("B"), Value::from("#N/A"), Value::from(1i64)],
        ]
    );
    Ok(())
}

#[test]
fn unreadable_report_is_malformed_input() -> Result<()> {
    let directory = tempfile::tempdir()?;
    let input = directory.path().join("report.xlsx");
    std::fs::write(&input, b"PK but not really")?;

    let request = ExtractRequest::new("cat", "score", ["A"], 1);
    let error = run_path(&input, &Job::new(request)).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::MalformedInput);
    Ok(())
}
