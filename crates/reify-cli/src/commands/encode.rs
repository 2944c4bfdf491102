//! `reify encode`: target type to stub name.

use reify_core::mop::name_codec;
use reify_core::TargetType;

use crate::context::Context;

pub fn execute(ctx: &mut Context, target: &str) -> anyhow::Result<()> {
    let target: TargetType = target.parse()?;
    ctx.out.line(&name_codec::encode(&target));
    Ok(())
}
