//! `reify resolve`: most specific constructor or overload.

use reify_core::mop::Resolver;

use crate::context::Context;

pub fn execute(
    ctx: &mut Context,
    type_name: &str,
    method: Option<&str>,
    args: &[String],
) -> anyhow::Result<()> {
    let ty = ctx.reifier.types().resolve(type_name)?;
    let actual: Vec<Option<String>> = args
        .iter()
        .map(|a| if a == "null" { None } else { Some(a.clone()) })
        .collect();
    let resolver = Resolver::new(ctx.reifier.types());

    let chosen = match method {
        Some(name) => resolver.resolve_method(&ty, name, &actual)?.to_string(),
        None => resolver.resolve_constructor(&ty, &actual)?.to_string(),
    };
    ctx.out.line(&chosen);
    Ok(())
}
