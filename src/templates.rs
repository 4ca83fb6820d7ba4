use chrono::Utc;
use uuid::Uuid;

use crate::error::{Result, TrackerError};
use crate::models::{MetricType, Template};
use crate::storage::Store;
use crate::tasks::{validate_color, validate_goal, validate_metric, validate_name, LIST_CAP};

/// Fields a caller supplies when creating a template.
#[derive(Debug, Clone, Default)]
pub struct NewTemplate {
    pub name: String,
    pub color: Option<String>,
    pub metric: MetricType,
    pub goal: Option<u32>,
    /// Weekdays, Monday = 0 .. Sunday = 6. May contain duplicates.
    pub active_days: Vec<u8>,
}

/// Validates and stores a new recurring template.
pub fn create_template(store: &Store, new: NewTemplate) -> Result<Template> {
    let name = validate_name(&new.name)?;
    let color = validate_color(new.color.as_deref())?;
    validate_metric(&new.metric)?;
    validate_goal(new.goal)?;
    let active_days = normalize_days(&new.active_days)?;

    let template = Template {
        id: Uuid::new_v4().to_string(),
        name,
        color,
        metric: new.metric,
        goal: new.goal,
        active_days,
        created_at: Utc::now(),
    };
    store.insert_template(template.clone())?;
    tracing::info!(template_id = %template.id, days = ?template.active_days, "template created");
    Ok(template)
}

pub fn list_templates(store: &Store) -> Result<Vec<Template>> {
    let mut templates = store.find_templates(|_| true)?;
    templates.sort_by_key(|t| t.created_at);
    templates.truncate(LIST_CAP);
    Ok(templates)
}

/// Removes a template. Tasks generated from it keep their `template_id`.
pub fn delete_template(store: &Store, id: &str) -> Result<()> {
    if !store.delete_template(id)? {
        return Err(TrackerError::template_not_found(id));
    }
    tracing::info!(template_id = %id, "template deleted");
    Ok(())
}

/// Checks the 0..=6 range, then sorts and deduplicates.
pub fn normalize_days(days: &[u8]) -> Result<Vec<u8>> {
    if days.is_empty() {
        return Err(TrackerError::invalid("active_days must not be empty"));
    }
    if let Some(bad) = days.iter().find(|&&d| d > 6) {
        return Err(TrackerError::invalid(format!(
            "active day {} is out of range. Use 0 (Mon) to 6 (Sun).",
            bad
        )));
    }
    let mut days = days.to_vec();
    days.sort_unstable();
    days.dedup();
    Ok(days)
}

/// Parses one weekday, either its index (`0` = Monday) or a name such as `wed`.
pub fn parse_day(input: &str) -> Result<u8> {
    const NAMES: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];
    let s = input.trim();
    let lower = s.to_lowercase();
    if let Some(pos) = NAMES.iter().position(|n| lower.starts_with(n)) {
        return Ok(pos as u8);
    }
    s.parse::<u8>()
        .map_err(|_| TrackerError::invalid(format!("invalid weekday '{}'", s)))
}

/// Parses a comma separated weekday list such as `0,1,2` or `mon,wed`.
pub fn parse_days(input: &str) -> Result<Vec<u8>> {
    input
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(parse_day)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_days() {
        assert_eq!(normalize_days(&[4, 0, 4, 2]).unwrap(), vec![0, 2, 4]);
        assert!(normalize_days(&[]).is_err());
        assert!(normalize_days(&[7]).is_err());
    }

    #[test]
    fn parses_day_names_and_numbers() {
        assert_eq!(parse_days("0,1, 2").unwrap(), vec![0, 1, 2]);
        assert_eq!(parse_days("sat,Sunday").unwrap(), vec![5, 6]);
        assert!(parse_days("funday").is_err());
    }
}
