//! Derived fields injected into the caller's data tree before rendering
//!
//! These rules decide exact output, so every one of them is configurable
//! and documented on [`BindingRules`].

use crate::value::{Scope, Value};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// `collection` inside an element yields a `field` holding its length.
///
/// With a `parent`, every element of the collection of that name gets the
/// field, 0 when it holds no such collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub collection: String,
    pub field: String,
}

impl CountRule {
    pub fn new(collection: impl Into<String>, field: impl Into<String>) -> Self {
        Self { parent: None, collection: collection.into(), field: field.into() }
    }

    /// A rule that also defaults to 0 on every element of `parent`
    pub fn scoped(
        parent: impl Into<String>,
        collection: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self { parent: Some(parent.into()), ..Self::new(collection, field) }
    }

    fn count_in(&self, scope: &Scope, parent: Option<&str>) -> Option<usize> {
        let present = scope.get(&self.collection).and_then(Value::as_collection).map(<[Value]>::len);
        match present {
            Some(count) => Some(count),
            None if parent.is_some() && self.parent.as_deref() == parent => Some(0),
            None => None,
        }
    }
}

/// Rules applied to the root of every render
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingRules {
    /// chrono format used for `<date>_formatted` and `generated_date`
    pub date_format: String,
    /// chrono format used for `generated_time`
    pub time_format: String,
    /// Name of the 1-based position injected into collection elements
    pub index_field: String,
    /// Counts derived on every collection element (e.g. modules -> module_count)
    pub element_counts: Vec<CountRule>,
    /// Counts derived at the root from hardware category collections
    pub root_counts: Vec<CountRule>,
    /// Sum of all root counts
    pub root_total_field: String,
}

impl Default for BindingRules {
    fn default() -> Self {
        Self {
            date_format: "%d.%m.%Y".to_string(),
            time_format: "%H:%M".to_string(),
            index_field: "index".to_string(),
            element_counts: vec![CountRule::scoped("workstations", "modules", "module_count")],
            root_counts: vec![
                CountRule::new("cameras", "camera_count"),
                CountRule::new("lenses", "lens_count"),
                CountRule::new("lights", "light_count"),
                CountRule::new("controllers", "controller_count"),
            ],
            root_total_field: "hardware_count".to_string(),
        }
    }
}

impl BindingRules {
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    pub fn with_time_format(mut self, format: impl Into<String>) -> Self {
        self.time_format = format.into();
        self
    }

    pub fn with_element_count(mut self, rule: CountRule) -> Self {
        self.element_counts.push(rule);
        self
    }

    /// Inject every derived field into `root`.
    ///
    /// Caller-supplied values win over derived ones, except for the
    /// `generated_*` fields, which always reflect `now`.
    pub fn apply(&self, root: &mut Scope, now: DateTime<Utc>) {
        self.derive_dates(root);

        for (key, value) in root.iter_mut() {
            self.annotate(Some(key.as_str()), value);
        }

        let mut total = 0usize;
        for rule in &self.root_counts {
            let count = root
                .get(&rule.collection)
                .and_then(Value::as_collection)
                .map_or(0, <[Value]>::len);
            total += count;
            insert_absent(root, &rule.field, Value::from(count));
        }
        if !self.root_counts.is_empty() {
            insert_absent(root, &self.root_total_field, Value::from(total));
        }

        let date = now.format(&self.date_format).to_string();
        let time = now.format(&self.time_format).to_string();
        root.insert("generated_at".to_string(), Value::from(format!("{} {}", date, time)));
        root.insert("generated_date".to_string(), Value::from(date));
        root.insert("generated_time".to_string(), Value::from(time));
    }

    fn derive_dates(&self, root: &mut Scope) {
        let dates: Vec<(String, NaiveDate)> = root
            .iter()
            .filter_map(|(key, value)| parse_date(value.as_text()?).map(|d| (key.clone(), d)))
            .collect();

        for (key, date) in dates {
            insert_absent(
                root,
                &format!("{}_formatted", key),
                Value::from(date.format(&self.date_format).to_string()),
            );
            insert_absent(root, &format!("{}_year", key), Value::from(date.year() as i64));
            insert_absent(root, &format!("{}_month", key), Value::from(date.month()));
            insert_absent(root, &format!("{}_day", key), Value::from(date.day()));
        }
    }

    /// `name` is the key the value is bound to, `None` inside nested lists
    fn annotate(&self, name: Option<&str>, value: &mut Value) {
        match value {
            Value::Collection(items) => {
                for (i, item) in items.iter_mut().enumerate() {
                    if let Value::Object(scope) = item {
                        insert_absent(scope, &self.index_field, Value::from(i + 1));
                        for rule in &self.element_counts {
                            if let Some(count) = rule.count_in(scope, name) {
                                insert_absent(scope, &rule.field, Value::from(count));
                            }
                        }
                    }
                    self.annotate(None, item);
                }
            }
            Value::Object(scope) => {
                for (key, child) in scope.iter_mut() {
                    self.annotate(Some(key.as_str()), child);
                }
            }
            Value::Scalar(_) => {}
        }
    }
}

fn insert_absent(scope: &mut Scope, key: &str, value: Value) {
    scope.entry(key.to_string()).or_insert(value);
}

/// Recognize ISO dates (`2024-12-20`) and timestamps (RFC 3339 or naive)
fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.len() < 10 || !text.as_bytes()[0].is_ascii_digit() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.date())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Scalar;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 7, 9, 5, 0).unwrap()
    }

    fn apply(json: serde_json::Value) -> Scope {
        let mut root = Value::root_scope(&json);
        BindingRules::default().apply(&mut root, fixed_now());
        root
    }

    fn num(scope: &Scope, key: &str) -> f64 {
        match scope.get(key) {
            Some(Value::Scalar(Scalar::Number(n))) => *n,
            other => panic!("expected number for {key}, got {other:?}"),
        }
    }

    #[test]
    fn test_date_derivation() {
        let root = apply(json!({"date": "2024-12-20"}));
        assert_eq!(root["date_formatted"].as_text(), Some("20.12.2024"));
        assert_eq!(num(&root, "date_year"), 2024.0);
        assert_eq!(num(&root, "date_month"), 12.0);
        assert_eq!(num(&root, "date_day"), 20.0);
    }

    #[test]
    fn test_timestamp_derivation() {
        let root = apply(json!({"created_at": "2024-01-05T10:30:00Z"}));
        assert_eq!(num(&root, "created_at_day"), 5.0);
        assert_eq!(num(&root, "created_at_month"), 1.0);
    }

    #[test]
    fn test_non_dates_ignored() {
        let root = apply(json!({"name": "2024 line", "serial": "12345678901"}));
        assert!(!root.contains_key("name_year"));
        assert!(!root.contains_key("serial_year"));
    }

    #[test]
    fn test_index_and_module_count() {
        let root = apply(json!({
            "workstations": [
                {"name": "WS-01", "modules": [{"name": "M1"}, {"name": "M2"}]},
                {"name": "WS-02", "modules": []}
            ]
        }));
        let stations = root["workstations"].as_collection().unwrap();
        let first = stations[0].as_object().unwrap();
        let second = stations[1].as_object().unwrap();
        assert_eq!(num(first, "index"), 1.0);
        assert_eq!(num(first, "module_count"), 2.0);
        assert_eq!(num(second, "index"), 2.0);
        assert_eq!(num(second, "module_count"), 0.0);

        let modules = first["modules"].as_collection().unwrap();
        assert_eq!(num(modules[1].as_object().unwrap(), "index"), 2.0);
    }

    #[test]
    fn test_module_count_defaults_to_zero_for_workstations() {
        let root = apply(json!({
            "workstations": [{"name": "WS-01", "modules": [{"name": "M1"}]}, {"name": "WS-02"}],
            "lines": [{"name": "L1"}]
        }));
        let stations = root["workstations"].as_collection().unwrap();
        assert_eq!(num(stations[0].as_object().unwrap(), "module_count"), 1.0);
        assert_eq!(num(stations[1].as_object().unwrap(), "module_count"), 0.0);

        let line = root["lines"].as_collection().unwrap()[0].as_object().unwrap();
        assert!(!line.contains_key("module_count"));
    }

    #[test]
    fn test_unscoped_count_rule_needs_collection() {
        let mut root = Value::root_scope(&json!({
            "lines": [{"stations": [1, 2, 3]}, {"name": "L2"}]
        }));
        BindingRules::default()
            .with_element_count(CountRule::new("stations", "station_count"))
            .apply(&mut root, fixed_now());
        let lines = root["lines"].as_collection().unwrap();
        assert_eq!(num(lines[0].as_object().unwrap(), "station_count"), 3.0);
        assert!(!lines[1].as_object().unwrap().contains_key("station_count"));
    }

    #[test]
    fn test_caller_index_kept() {
        let root = apply(json!({"items": [{"index": "A"}]}));
        let item = root["items"].as_collection().unwrap()[0].as_object().unwrap();
        assert_eq!(item["index"].as_text(), Some("A"));
    }

    #[test]
    fn test_hardware_counts() {
        let root = apply(json!({
            "cameras": [{"model": "a"}, {"model": "b"}],
            "lights": [{"model": "ring"}]
        }));
        assert_eq!(num(&root, "camera_count"), 2.0);
        assert_eq!(num(&root, "lens_count"), 0.0);
        assert_eq!(num(&root, "light_count"), 1.0);
        assert_eq!(num(&root, "controller_count"), 0.0);
        assert_eq!(num(&root, "hardware_count"), 3.0);
    }

    #[test]
    fn test_generated_fields_always_injected() {
        let root = apply(json!({"generated_date": "stale"}));
        assert_eq!(root["generated_date"].as_text(), Some("07.03.2025"));
        assert_eq!(root["generated_time"].as_text(), Some("09:05"));
        assert_eq!(root["generated_at"].as_text(), Some("07.03.2025 09:05"));
    }

    #[test]
    fn test_custom_formats() {
        let mut root = Value::root_scope(&json!({"date": "2024-12-20"}));
        BindingRules::default()
            .with_date_format("%Y/%m/%d")
            .apply(&mut root, fixed_now());
        assert_eq!(root["date_formatted"].as_text(), Some("2024/12/20"));
    }

    #[test]
    fn test_rules_deserialize_with_defaults() {
        let rules: BindingRules = serde_json::from_str(r#"{"date_format": "%m/%d/%Y"}"#).unwrap();
        assert_eq!(rules.date_format, "%m/%d/%Y");
        assert_eq!(rules.index_field, "index");
        assert_eq!(rules.root_counts.len(), 4);
        assert_eq!(rules.element_counts[0].parent.as_deref(), Some("workstations"));

        let rule: CountRule =
            serde_json::from_str(r#"{"collection": "cameras", "field": "camera_count"}"#).unwrap();
        assert_eq!(rule, CountRule::new("cameras", "camera_count"));
    }
}
