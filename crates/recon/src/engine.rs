use crate::config::SyncConfig;
use crate::error::ReconError;
use crate::log::OutcomeLog;
use crate::lookup::LookupTable;
use crate::matcher::find_ingredients;
use crate::model::{RunCounters, RunSummary};
use crate::reconcile::reconcile_record;
use crate::tree::Document;

/// Run one reconciliation pass over `document` in place.
///
/// Every record's code is read before the first mutation, so a record
/// without a code field fails the run with the document, counters and log
/// untouched.
pub fn run(
    config: &SyncConfig,
    table: &LookupTable,
    document: &mut Document,
    log: &mut dyn OutcomeLog,
) -> Result<RunSummary, ReconError> {
    let container_name = config.container_name();
    let code_name = config.code_name();
    let field_name = config.ingredient_name();

    let root = document
        .root_mut()
        .ok_or_else(|| ReconError::Xml("document has no root element".into()))?;
    let container = root
        .find_mut(&container_name)
        .ok_or_else(|| ReconError::MissingContainer {
            name: container_name.to_string(),
        })?;

    let codes = container
        .child_elements()
        .enumerate()
        .map(|(i, record)| {
            record
                .find(&code_name)
                .map(|code| code.text().unwrap_or_default())
                .ok_or_else(|| ReconError::MalformedRecord {
                    index: i + 1,
                    field: code_name.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(records = codes.len(), "products container located");

    let mut counters = RunCounters::default();
    for (record, code) in container.child_elements_mut().zip(&codes) {
        let candidate = find_ingredients(table, code);
        if candidate.is_none() {
            log.record_not_found(code)?;
        }
        let outcome = reconcile_record(record, candidate, &field_name, &mut counters, log)?;
        tracing::trace!(code = %code, %outcome, "record reconciled");
    }

    Ok(RunSummary {
        counters,
        total: codes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::MemoryLog;
    use crate::parse::parse_document;

    const CONFIG: &str = r#"{
        "excel_path": "table.xlsx",
        "excel_fields": ["code", "ingredients"],
        "namespace": {"urn": "urn:p"},
        "ingredient_tag_name": "Ingredients"
    }"#;

    fn table(rows: &[(&str, &str)]) -> LookupTable {
        LookupTable::from_rows(
            rows.iter()
                .map(|(c, i)| (c.to_string(), Some(i.to_string()))),
        )
    }

    fn doc(products: &str) -> Document {
        parse_document(&format!(
            r#"<root xmlns:urn="urn:p"><urn:products>{products}</urn:products></root>"#
        ))
        .unwrap()
    }

    #[test]
    fn counts_each_branch() {
        let config = SyncConfig::from_json(CONFIG).unwrap();
        let table = table(&[("1", "a"), ("2", "b"), ("3", "c"), ("4", "")]);
        let mut document = doc(
            "<urn:product><urn:ProfileNumber>1</urn:ProfileNumber></urn:product>\
             <urn:product><urn:ProfileNumber>2</urn:ProfileNumber><urn:Ingredients>x</urn:Ingredients></urn:product>\
             <urn:product><urn:ProfileNumber>3</urn:ProfileNumber><urn:Ingredients>c</urn:Ingredients></urn:product>\
             <urn:product><urn:ProfileNumber>4</urn:ProfileNumber></urn:product>\
             <urn:product><urn:ProfileNumber>5</urn:ProfileNumber></urn:product>",
        );
        let mut log = MemoryLog::default();

        let summary = run(&config, &table, &mut document, &mut log).unwrap();

        assert_eq!(
            summary.counters,
            RunCounters { not_found: 2, updated: 1, appended: 1 }
        );
        assert_eq!(summary.total, 5);
        assert_eq!(summary.unchanged(), 1);
        // "4" matched a blank cell: counted, but it is not a lookup miss
        assert_eq!(log.not_found, vec!["5".to_string()]);
        assert_eq!(log.overrides, vec![("x".to_string(), "b".to_string())]);
    }

    #[test]
    fn malformed_record_aborts_before_any_mutation() {
        let config = SyncConfig::from_json(CONFIG).unwrap();
        let table = table(&[("1", "a")]);
        let mut document = doc(
            "<urn:product><urn:ProfileNumber>1</urn:ProfileNumber></urn:product>\
             <urn:product><urn:Name>no code</urn:Name></urn:product>",
        );
        let before = document.clone();
        let mut log = MemoryLog::default();

        let err = run(&config, &table, &mut document, &mut log).unwrap_err();

        assert!(matches!(err, ReconError::MalformedRecord { index: 2, .. }));
        assert_eq!(document, before);
        assert!(log.is_empty());
    }

    #[test]
    fn missing_container_is_an_error() {
        let config = SyncConfig::from_json(CONFIG).unwrap();
        let mut document = parse_document(r#"<root xmlns:urn="urn:p"><urn:items/></root>"#).unwrap();
        let err = run(&config, &LookupTable::default(), &mut document, &mut MemoryLog::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "products container {urn:p}products not found under document root"
        );
    }

    #[test]
    fn unqualified_container_does_not_match() {
        let config = SyncConfig::from_json(CONFIG).unwrap();
        let mut document = parse_document("<root><products/></root>").unwrap();
        let err = run(&config, &LookupTable::default(), &mut document, &mut MemoryLog::default())
            .unwrap_err();
        assert!(matches!(err, ReconError::MissingContainer { .. }));
    }

    #[test]
    fn empty_container_yields_zero_totals() {
        let config = SyncConfig::from_json(CONFIG).unwrap();
        let mut document = doc("");
        let summary = run(&config, &LookupTable::default(), &mut document, &mut MemoryLog::default())
            .unwrap();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.counters, RunCounters::default());
    }
}
