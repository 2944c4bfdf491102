//! `reify stub`: synthesize one stub and print its layout.

use reify_core::TargetType;

use crate::context::Context;

pub fn execute(ctx: &mut Context, target: &str) -> anyhow::Result<()> {
    let target: TargetType = target.parse()?;
    let handle = ctx.reifier.stubs().get_or_create(&target)?;
    ctx.out.line(&handle.listing());
    Ok(())
}
