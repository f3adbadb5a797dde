use crate::error::ReconError;
use crate::log::OutcomeLog;
use crate::model::{Outcome, RunCounters};
use crate::tree::{Element, ExpandedName};

/// Apply one looked-up ingredients value to a product record.
///
/// - no candidate, or an empty one (blank source cell): `NotFound`, untouched
/// - field absent: created with the candidate text, `Appended`
/// - field present with the same text: `Unchanged`
/// - field present with other text: overwritten and logged, `Updated`
///
/// `counters` is bumped to match the returned outcome.
pub fn reconcile_record(
    record: &mut Element,
    candidate: Option<&str>,
    field: &ExpandedName,
    counters: &mut RunCounters,
    log: &mut dyn OutcomeLog,
) -> Result<Outcome, ReconError> {
    let outcome = apply(record, candidate, field, log)?;
    counters.record(outcome);
    Ok(outcome)
}

fn apply(
    record: &mut Element,
    candidate: Option<&str>,
    field: &ExpandedName,
    log: &mut dyn OutcomeLog,
) -> Result<Outcome, ReconError> {
    let ingredients = match candidate {
        Some(value) if !value.is_empty() => value,
        _ => return Ok(Outcome::NotFound),
    };

    if let Some(existing) = record.find_mut(field) {
        let current = existing.text().unwrap_or_default();
        if current == ingredients {
            return Ok(Outcome::Unchanged);
        }
        log.record_override(&current, ingredients)?;
        existing.set_text(ingredients);
        return Ok(Outcome::Updated);
    }

    let mut created = record.new_child(field);
    created.set_text(ingredients);
    record.append_child(created);
    Ok(Outcome::Appended)
}
