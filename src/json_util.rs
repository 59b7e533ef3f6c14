use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Loose numeric read: JSON numbers, or strings holding a number. Blank
/// strings and non-finite results are rejected.
pub fn parse_f64(v: Option<&Value>) -> Option<f64> {
    let n = match v? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Text form of a scalar; `None` for null, arrays and objects.
pub fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Text form of any non-null value, used when upstream sent something we
/// could not interpret and it should be shown as-is.
pub fn raw_text(v: &Value) -> String {
    scalar_text(v).unwrap_or_else(|| v.to_string())
}

/// Follows `path` through nested objects. Null counts as absent.
pub fn lookup<'a>(v: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = v;
    for key in path {
        cur = cur.get(key)?;
    }
    (!cur.is_null()).then_some(cur)
}

/// First path that resolves to a non-null value.
pub fn first_present<'a>(v: &'a Value, paths: &[&[&str]]) -> Option<&'a Value> {
    paths.iter().find_map(|p| lookup(v, p))
}

/// Serde helper for upstream fields that arrive as either strings or numbers.
pub fn de_loose_string<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(scalar_text))
}

/// Serde helper for nested records that upstream sometimes sends in another
/// shape. Only a JSON object that decodes as `T` is kept; anything else reads
/// as absent instead of failing the enclosing record.
pub fn de_object<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.and_then(object_as))
}

/// List form of [`de_object`]: entries that are not decodable objects are
/// skipped, and a non-array reads as absent.
pub fn de_object_list<'de, D, T>(d: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<Value>::deserialize(d)? {
        Some(Value::Array(items)) => Ok(Some(items.into_iter().filter_map(object_as).collect())),
        _ => Ok(None),
    }
}

fn object_as<T: DeserializeOwned>(v: Value) -> Option<T> {
    match v {
        Value::Object(_) => serde_json::from_value(v).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_f64_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_f64(Some(&json!(12))), Some(12.0));
        assert_eq!(parse_f64(Some(&json!(" 7 "))), Some(7.0));
        assert_eq!(parse_f64(Some(&json!("-3.5"))), Some(-3.5));
    }

    #[test]
    fn parse_f64_rejects_blank_and_garbage() {
        assert_eq!(parse_f64(None), None);
        assert_eq!(parse_f64(Some(&json!(""))), None);
        assert_eq!(parse_f64(Some(&json!("   "))), None);
        assert_eq!(parse_f64(Some(&json!("12abc"))), None);
        assert_eq!(parse_f64(Some(&json!("inf"))), None);
        assert_eq!(parse_f64(Some(&json!(null))), None);
        assert_eq!(parse_f64(Some(&json!({"a": 1}))), None);
    }

    #[test]
    fn lookup_treats_null_as_missing() {
        let v = json!({"team": {"name": null}, "all": {"goals": {"for": 3}}});
        assert!(lookup(&v, &["team", "name"]).is_none());
        assert_eq!(lookup(&v, &["all", "goals", "for"]), Some(&json!(3)));
        assert_eq!(
            first_present(&v, &[&["team", "name"], &["all", "goals", "for"]]),
            Some(&json!(3))
        );
    }

    #[test]
    fn raw_text_keeps_strings_verbatim() {
        assert_eq!(raw_text(&json!("N/A")), "N/A");
        assert_eq!(raw_text(&json!(4)), "4");
        assert_eq!(raw_text(&json!([1])), "[1]");
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Named {
        name: String,
    }

    #[derive(Debug, Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "de_object")]
        one: Option<Named>,
        #[serde(default, deserialize_with = "de_object_list")]
        many: Option<Vec<Named>>,
    }

    #[test]
    fn object_helpers_skip_foreign_shapes() {
        let h: Holder = serde_json::from_value(json!({
            "one": "Ligue 2",
            "many": [{"name": "a"}, null, 3, ["b"], {"name": "c"}, {"other": 1}]
        }))
        .expect("holder");
        assert_eq!(h.one, None);
        let names: Vec<String> = h.many.expect("list").into_iter().map(|n| n.name).collect();
        assert_eq!(names, vec!["a", "c"]);

        let h: Holder =
            serde_json::from_value(json!({"one": {"name": "x"}, "many": {"name": "y"}}))
                .expect("holder");
        assert_eq!(h.one, Some(Named { name: "x".to_string() }));
        assert!(h.many.is_none());

        let h: Holder = serde_json::from_value(json!({"one": ["x"]})).expect("holder");
        assert_eq!(h.one, None);
    }
}
