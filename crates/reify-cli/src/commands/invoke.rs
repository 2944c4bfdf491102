//! `reify invoke`: create a reified instance and call one operation on it.

use reify_core::{TargetType, Value};

use crate::context::Context;

/// Command-line literal to a boxed value
///
/// Accepts the forms values print in: `null`, `true`, `7`, `7L`, `2.5`,
/// `2.5f`, `2.5d`. Anything else is a string; quotes force one.
fn parse_literal(text: &str) -> Value {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        return Value::string(&text[1..text.len() - 1]);
    }
    match text {
        "null" => return Value::Null,
        "true" => return Value::Boolean(true),
        "false" => return Value::Boolean(false),
        _ => {}
    }
    if let Ok(v) = text.parse::<i32>() {
        return Value::Int(v);
    }
    if let Some(v) = text.strip_suffix('L').and_then(|t| t.parse::<i64>().ok()) {
        return Value::Long(v);
    }
    if let Some(v) = text.strip_suffix('f').and_then(|t| t.parse::<f32>().ok()) {
        return Value::Float(v);
    }
    if let Some(v) = text
        .strip_suffix('d')
        .unwrap_or(text)
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
    {
        return Value::Double(v);
    }
    Value::string(text)
}

pub fn execute(
    ctx: &mut Context,
    target: &str,
    method: &str,
    args: &[String],
    constructor_args: &[String],
    dispatcher: Option<&str>,
) -> anyhow::Result<()> {
    let target: TargetType = target.parse()?;
    let dispatcher = dispatcher
        .unwrap_or(&ctx.config.stubs.default_dispatcher)
        .to_string();
    let generics: Vec<&str> = target.generics().iter().map(String::as_str).collect();
    let ctor_values: Vec<Value> = constructor_args.iter().map(|a| parse_literal(a)).collect();
    let arg_values: Vec<Value> = args.iter().map(|a| parse_literal(a)).collect();

    let stub = ctx.reifier.create_reified_instance(
        target.name(),
        &generics,
        &ctor_values,
        &dispatcher,
        &[],
    )?;
    tracing::info!(target = %target, %dispatcher, method, "invoking through stub");
    let result = ctx.reifier.invoke(&stub, method, &arg_values)?;
    ctx.out.line(&format!("{:?}", result));
    ctx.out.flush();
    Ok(())
}
