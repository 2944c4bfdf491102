//! `reify decode`: stub name to target type.

use reify_core::mop::name_codec;

use crate::context::Context;

pub fn execute(ctx: &mut Context, name: &str) -> anyhow::Result<()> {
    if !name_codec::is_stub_name(name) {
        anyhow::bail!("{} is not in the {} namespace", name, name_codec::STUB_NAMESPACE);
    }
    let target = name_codec::decode(name)?;
    ctx.out.line(&target.to_string());
    Ok(())
}
