//! Expression evaluation seam.
//!
//! Template and expression languages are host concerns. The engine only needs
//! the handful of operations in [`Evaluator`]; [`DefaultEvaluator`] covers the
//! common `${path}` subset so the engine works out of the box.

use serde_json::{Map, Number, Value};
use stencil_core::{Schema, prop::is_truthy};

/// Evaluates templates and conditional expressions against data.
pub trait Evaluator {
    /// Interpolates every `${..}` in `template`.
    fn filter(&self, template: &str, data: &Value) -> String;

    /// Evaluates a conditional expression.
    fn eval_expression(&self, expression: &str, data: &Value) -> bool;

    /// Whether `text` contains an expression.
    fn is_expression(&self, text: &str) -> bool;

    /// Resolves `text`, keeping the raw value when it is a single variable.
    fn resolve_variable_and_filter(&self, text: &str, data: &Value, default_filter: &str)
    -> Value;

    /// Computes conditional properties: `fooOn` becomes a boolean `foo`,
    /// `fooExpr` becomes an interpolated string `foo`.
    fn expr_properties(&self, schema: &Schema, data: &Value) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, value) in schema.props() {
            let Some(text) = value.as_str().filter(|text| !text.is_empty()) else {
                continue;
            };
            if let Some(prop) = key.strip_suffix("On").filter(|prop| !prop.is_empty()) {
                out.insert(prop.to_owned(), Value::Bool(self.eval_expression(text, data)));
            } else if let Some(prop) = key.strip_suffix("Expr").filter(|prop| !prop.is_empty()) {
                out.insert(prop.to_owned(), Value::String(self.filter(text, data)));
            }
        }
        out
    }

    /// Evaluates formula entries of a `style` object.
    fn build_style(&self, style: &Value, data: &Value) -> Value {
        let Value::Object(entries) = style else {
            return style.clone();
        };
        Value::Object(
            entries
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(text) if self.is_expression(text) => {
                            self.resolve_variable_and_filter(text, data, "| raw")
                        }
                        other => other.clone(),
                    };
                    (key.clone(), value)
                })
                .collect(),
        )
    }
}

/// `${path}` interpolation with `!`, `==` and `!=` conditions.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEvaluator;

fn lookup<'a>(path: &str, data: &'a Value) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() || path == "&" {
        return Some(data);
    }
    path.split('.').try_fold(data, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn unwrap_expression(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix("${")
        .and_then(|inner| inner.strip_suffix('}'))
        .unwrap_or(text)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => a == b,
    }
}

impl DefaultEvaluator {
    fn operand(token: &str, data: &Value) -> Value {
        let token = token.trim();
        let quoted = token
            .strip_prefix('\'')
            .and_then(|t| t.strip_suffix('\''))
            .or_else(|| token.strip_prefix('"').and_then(|t| t.strip_suffix('"')));
        if let Some(text) = quoted {
            return Value::String(text.to_owned());
        }
        match token {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            "null" | "undefined" => return Value::Null,
            _ => {}
        }
        if let Ok(number) = token.parse::<f64>() {
            return Number::from_f64(number).map_or(Value::Null, Value::Number);
        }
        lookup(token, data).cloned().unwrap_or(Value::Null)
    }

    fn condition(expression: &str, data: &Value) -> bool {
        let expression = expression.trim();
        if let Some((left, right)) = expression.split_once("!=") {
            let right = right.trim_start_matches('=');
            return !loosely_equal(&Self::operand(left, data), &Self::operand(right, data));
        }
        if let Some((left, right)) = expression.split_once("==") {
            let right = right.trim_start_matches('=');
            return loosely_equal(&Self::operand(left, data), &Self::operand(right, data));
        }
        if let Some(inner) = expression.strip_prefix('!') {
            return !Self::condition(inner, data);
        }
        is_truthy(&Self::operand(expression, data))
    }
}

impl Evaluator for DefaultEvaluator {
    fn filter(&self, template: &str, data: &Value) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                return out;
            };
            out.push_str(&stringify(&Self::operand(&after[..end], data)));
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out
    }

    fn eval_expression(&self, expression: &str, data: &Value) -> bool {
        Self::condition(unwrap_expression(expression), data)
    }

    fn is_expression(&self, text: &str) -> bool {
        text.find("${")
            .is_some_and(|start| text[start..].contains('}'))
    }

    fn resolve_variable_and_filter(
        &self,
        text: &str,
        data: &Value,
        _default_filter: &str,
    ) -> Value {
        let trimmed = text.trim();
        let single = trimmed
            .strip_prefix("${")
            .and_then(|inner| inner.strip_suffix('}'))
            .filter(|inner| !inner.contains("${") && !inner.contains('}'));
        match single {
            Some(inner) => Self::operand(inner, data),
            None => Value::String(self.filter(text, data)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn interpolates_paths() {
        let data = json!({"user": {"name": "ada"}, "n": 2});
        let eval = DefaultEvaluator;
        assert_eq!(eval.filter("hi ${user.name} x${n}", &data), "hi ada x2");
        assert_eq!(eval.filter("plain", &data), "plain");
        assert_eq!(eval.filter("${missing}", &data), "");
    }

    #[test]
    fn evaluates_conditions() {
        let data = json!({"role": "admin", "count": 3, "off": false});
        let eval = DefaultEvaluator;
        assert!(eval.eval_expression("${role == 'admin'}", &data));
        assert!(eval.eval_expression("${count === 3}", &data));
        assert!(eval.eval_expression("${role != 'guest'}", &data));
        assert!(eval.eval_expression("${!off}", &data));
        assert!(!eval.eval_expression("off", &data));
    }

    #[test]
    fn single_variables_keep_raw_values() {
        let data = json!({"items": [1, 2]});
        let eval = DefaultEvaluator;
        assert_eq!(
            eval.resolve_variable_and_filter("${items}", &data, "| raw"),
            json!([1, 2])
        );
        assert_eq!(
            eval.resolve_variable_and_filter("n=${items.0}", &data, "| raw"),
            json!("n=1")
        );
    }

    #[test]
    fn conditional_properties() {
        let schema = Schema::from_value(json!({
            "type": "text",
            "hiddenOn": "${flag}",
            "labelExpr": "Hello ${who}",
            "visibleOn": ""
        }))
        .unwrap();
        let props = DefaultEvaluator.expr_properties(&schema, &json!({"flag": true, "who": "you"}));
        assert_eq!(props.get("hidden"), Some(&json!(true)));
        assert_eq!(props.get("label"), Some(&json!("Hello you")));
        assert!(!props.contains_key("visible"));
    }

    #[test]
    fn style_formulas() {
        let style = json!({"color": "${c}", "width": 10});
        assert_eq!(
            DefaultEvaluator.build_style(&style, &json!({"c": "red"})),
            json!({"color": "red", "width": 10})
        );
    }
}
