use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One settings entry as the service stores it. The value is genuinely
/// polymorphic (string, object, number), so it is carried as raw JSON and
/// only coerced at the egress boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsEntry {
    pub id: String,
    pub scope: String,
    pub key: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultInfo {
    #[serde(rename = "totalRecords", default)]
    pub total_records: i64,
}

/// One page of results from `GET settings/entries`.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsPage {
    #[serde(default)]
    pub items: Vec<SettingsEntry>,
    #[serde(rename = "resultInfo", default)]
    pub result_info: ResultInfo,
}

/// Coerce a settings value to the string form the config surface returns:
/// strings pass through, anything else is serialised to a JSON string.
pub fn value_as_string(value: &Value) -> Result<String, serde_json::Error> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => serde_json::to_string(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_value_passes_through() {
        assert_eq!(value_as_string(&json!("v1")).unwrap(), "v1");
    }

    #[test]
    fn test_object_value_is_serialised_with_sorted_keys() {
        let value = json!({"url": "u", "user": "f", "pass": "p"});
        assert_eq!(
            value_as_string(&value).unwrap(),
            r#"{"pass":"p","url":"u","user":"f"}"#
        );
    }

    #[test]
    fn test_number_value_is_serialised() {
        assert_eq!(value_as_string(&json!(42)).unwrap(), "42");
    }

    #[test]
    fn test_page_decodes_result_info() {
        let page: SettingsPage = serde_json::from_str(
            r#"{"items": [{"id": "x", "scope": "ui-ldp.admin", "key": "config", "value": "v1"}],
                "resultInfo": {"totalRecords": 1}}"#,
        )
        .unwrap();
        assert_eq!(page.result_info.total_records, 1);
        assert_eq!(page.items[0].key, "config");
    }
}
