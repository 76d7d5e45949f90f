use serde_json::Value;

// Shared param extraction; handlers turn the Err string into a bad_params
// response.

pub fn required_str(params: &Value, key: &str) -> Result<String, String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| format!("missing {}", key))
}

pub fn optional_str(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

pub fn optional_bool(params: &Value, key: &str) -> Option<bool> {
    params.get(key).and_then(|v| v.as_bool())
}

pub fn required_str_list(params: &Value, key: &str) -> Result<Vec<String>, String> {
    let items = params
        .get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| format!("missing {}", key))?;
    Ok(items
        .iter()
        .filter_map(|v| v.as_str().map(|s| s.to_string()))
        .collect())
}

/// Treats a present-but-blank string the way the original forms did: as
/// "not provided".
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
