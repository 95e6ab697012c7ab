use super::{expression, resolver::PropertyResolver};
use crate::{
    core::error::DothttpError,
    syntax::ast::{JsonAst, JsonKey},
};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::{Map, Number, Value};

lazy_static! {
    static ref NAME_REGEX: Regex = Regex::new(r"(^|[^0-9A-Za-z_.])([A-Za-z_][A-Za-z0-9_]*)").unwrap();
}

fn placeholder_for(reference: &str) -> String {
    if reference.starts_with("{{") {
        reference.to_string()
    } else {
        format!("{{{{{reference}}}}}")
    }
}

fn parse_number(text: &str) -> Value {
    serde_json::from_str::<Number>(text)
        .map(Value::Number)
        .unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Evaluates a JSON AST: strings interpolate, references resolve to scalars
/// or nested JSON, expressions are computed.
pub fn evaluate(ast: &JsonAst, resolver: &mut PropertyResolver) -> Result<Value, DothttpError> {
    Ok(match ast {
        JsonAst::Null => Value::Null,
        JsonAst::Bool(b) => Value::Bool(*b),
        JsonAst::Number(n) => parse_number(n),
        JsonAst::Str(s) => Value::String(resolver.get_updated_content(&s.value)?),
        JsonAst::VarRef(r) => resolver.get_updated_obj_content(&placeholder_for(r))?,
        JsonAst::Expr(e) => evaluate_expression(e, resolver)?,
        JsonAst::Array(items) => Value::Array(
            items
                .iter()
                .map(|i| evaluate(i, resolver))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        JsonAst::Object(members) => {
            let mut map = Map::new();
            for (key, value) in members {
                let key = match key {
                    JsonKey::Str(s) => resolver.get_updated_content(&s.value)?,
                    JsonKey::Var(v) => match resolver.get_updated_obj_content(v)? {
                        Value::String(s) => s,
                        other => other.to_string(),
                    },
                };
                let value = evaluate(value, resolver)?;
                map.insert(key, value);
            }
            Value::Object(map)
        }
    })
}

/// Substitutes placeholders and bare names, then computes the arithmetic.
pub fn evaluate_expression(
    expr: &str,
    resolver: &mut PropertyResolver,
) -> Result<Value, DothttpError> {
    let interpolated = resolver.get_updated_content(expr)?;
    let mut missing = Vec::new();
    let substituted = NAME_REGEX.replace_all(&interpolated, |caps: &Captures| {
        let (lead, name) = (&caps[1], &caps[2]);
        match resolver.resolve_property_string(name) {
            Ok(Some(v)) => format!("{lead}{v}"),
            _ => {
                missing.push(name.to_string());
                caps[0].to_string()
            }
        }
    });
    if !missing.is_empty() {
        let placeholders: String = missing.iter().map(|m| format!("{{{{{m}}}}}")).collect();
        resolver.check_properties(&placeholders)?;
    }
    let result = expression::evaluate(&substituted)
        .map_err(|e| DothttpError::PayloadInvalid(format!("cannot evaluate `{expr}`: {e}")))?;
    Ok(parse_number(&result))
}
