//! Row-level access commands: `check` and `filter`.

use std::path::PathBuf;

use anyhow::{Result, bail};
use hrac::{Action, EntityType, Record, RecordId, RecordSet, SelectQuery, Value};

use super::{StoreLocation, read_records, read_user};
use crate::style::{self, SemanticStyle};

/// The user, records and action of a row-level question.
pub struct Target {
    pub user: PathBuf,
    pub records: PathBuf,
    pub entity: String,
    pub action: String,
}

pub fn check(store: &StoreLocation, target: &Target, id: u64) -> Result<()> {
    let action: Action = target.action.parse()?;
    let entity = EntityType::new(&target.entity);
    let user = read_user(&target.user)?;
    let records = read_records(&target.records, &entity)?;

    let Some(record) = records.iter().find(|r| r.id() == RecordId::new(id)) else {
        bail!("No {entity} with id {id} in {}", target.records.display());
    };

    let engine = store.open()?;
    let decision = engine.evaluator().decide(&user, record, action);

    let verdict = if decision.allowed {
        "ALLOWED".allowed()
    } else {
        "DENIED".denied()
    };
    println!("{verdict} {action} {entity} {id} for {}", user.username);
    style::print_labeled("reason", &decision.to_string());
    Ok(())
}

pub fn filter(store: &StoreLocation, target: &Target, table: Option<&str>) -> Result<()> {
    let action: Action = target.action.parse()?;
    let entity = EntityType::new(&target.entity);
    let user = read_user(&target.user)?;
    let records = read_records(&target.records, &entity)?;
    let total = records.len();

    let engine = store.open()?;
    let evaluator = engine.evaluator();
    let kept = evaluator.filter_by_permission(&user, RecordSet::new(entity.clone(), records), action);

    let rows: Vec<Vec<String>> = kept.iter().map(|r| vec![r.id().to_string()]).collect();
    style::print_list_table(&["ID"], &rows, &entity.to_string());
    println!(
        "{}",
        format!("{} of {total} {} records pass {action}", kept.len(), entity).muted()
    );

    if let Some(table) = table {
        let query = evaluator.filter_by_permission(&user, SelectQuery::new(entity, table), action);
        style::print_spacer();
        println!("{}", query.to_sql().code());
        for (index, param) in query.params().iter().enumerate() {
            style::print_labeled(&format!("${}", index + 1), &render_param(param));
        }
    }
    Ok(())
}

fn render_param(value: &Value) -> String {
    match value {
        Value::Text(text) => format!("'{text}'"),
        other => other.as_text().unwrap_or_else(|| "NULL".to_string()),
    }
}
