//! Document expression from json.
use serde::Serialize;
use serde_json::Value as Json;

use super::Expr;
use crate::value::Value;

impl Expr {
    /// Parse json text into a literal expression.
    ///
    /// Objects become [`Expr::Document`] and arrays [`Expr::Array`].
    pub fn from_json(text: &str) -> serde_json::Result<Expr> {
        serde_json::from_str::<Json>(text).map(Expr::from)
    }

    /// Serialize a value into a literal expression.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Expr> {
        serde_json::to_value(value).map(Expr::from)
    }
}

impl From<Json> for Expr {
    fn from(json: Json) -> Self {
        match json {
            Json::Null => Expr::Literal(Value::Null),
            Json::Bool(b) => Expr::Literal(Value::Bool(b)),
            Json::Number(n) => Expr::Literal(match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => Value::Int(i),
                (None, Some(u)) => Value::UInt(u),
                (None, None) => Value::Double(n.as_f64().unwrap_or_default()),
            }),
            Json::String(s) => Expr::Literal(Value::String(s)),
            Json::Array(items) => Expr::Array(items.into_iter().map(Expr::from).collect()),
            Json::Object(map) => Expr::Document(map.into_iter().map(|(k, v)| (k, Expr::from(v))).collect()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn object() {
        let expr = Expr::from_json(r#"{"name": "x", "tags": [1, 2.5], "big": 18446744073709551615}"#).unwrap();
        let Expr::Document(fields) = expr else { panic!("expected document") };
        let get = |key: &str| fields.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
        assert_eq!(get("name"), Some(Expr::Literal(Value::String("x".into()))));
        assert_eq!(
            get("tags"),
            Some(Expr::Array(vec![Expr::Literal(Value::Int(1)), Expr::Literal(Value::Double(2.5))]))
        );
        assert_eq!(get("big"), Some(Expr::Literal(Value::UInt(u64::MAX))));
    }

    #[test]
    fn serialize() {
        let expr = Expr::from_serialize(&[("a", 1)]).unwrap();
        assert_eq!(expr.to_string(), "[[\"a\", 1]]");
    }

    #[test]
    fn invalid() {
        assert!(Expr::from_json("{\"a\": ").is_err());
    }
}
