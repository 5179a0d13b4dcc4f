//! Attribute rule commands.

use anyhow::{Context, Result};
use hrac::{
    AccessStore, Action, AttributeRule, ConditionType, ConditionValue, EntityType, RoleId, RuleId,
};

use super::StoreLocation;
use crate::style::{self, SemanticStyle};

/// Arguments of `rule add`.
pub struct RuleSpec {
    pub id: u64,
    pub role: u64,
    pub entity: String,
    pub field: String,
    pub condition: String,
    pub value: String,
    pub action: String,
}

impl RuleSpec {
    fn to_rule(&self) -> Result<AttributeRule> {
        let condition: ConditionType = self.condition.parse()?;
        let action: Action = self.action.parse()?;
        Ok(AttributeRule::new(
            RuleId::new(self.id),
            RoleId::new(self.role),
            &EntityType::new(&self.entity),
            &self.field,
            condition,
            ConditionValue::parse(&self.value),
            action,
        ))
    }
}

pub fn list(store: &StoreLocation) -> Result<()> {
    let engine = store.open()?;
    let mut rules = engine.store().rules()?;
    rules.sort_by_key(|r| r.id);

    let rows: Vec<Vec<String>> = rules
        .iter()
        .map(|rule| {
            vec![
                rule.id.to_string(),
                rule.role.to_string(),
                rule.action.to_string(),
                format!("{}.{}", rule.entity, rule.field),
                rule.condition.to_string(),
                rule.value.to_string(),
            ]
        })
        .collect();

    style::print_list_table(
        &["ID", "Role", "Action", "Field", "Condition", "Value"],
        &rows,
        "rule",
    );
    Ok(())
}

pub fn add(store: &StoreLocation, spec: &RuleSpec) -> Result<()> {
    let rule = spec.to_rule()?;
    let summary = rule.to_string();
    let dynamic = rule.value.is_dynamic();

    let engine = store.open()?;
    engine
        .add_rule(rule)
        .with_context(|| format!("Failed to add rule {}", spec.id))?;
    engine.save()?;

    style::print_success(&format!("Added rule {}", summary.code()));
    if dynamic {
        style::print_hint("The value is resolved against the acting user at check time");
    }
    Ok(())
}

pub fn delete(store: &StoreLocation, id: u64) -> Result<()> {
    let engine = store.open()?;
    let rule = engine.delete_rule(RuleId::new(id))?;
    engine.save()?;

    style::print_success(&format!("Deleted rule {}", rule.to_string().code()));
    Ok(())
}
