//! `reify check`: reifiability of each target.

use crate::context::Context;

pub fn execute(ctx: &mut Context, targets: &[String]) -> anyhow::Result<()> {
    let mut failed = 0;
    for target in targets {
        match ctx.reifier.check_reifiable(target) {
            Ok(()) => ctx.out.status(true, target),
            Err(e) => {
                failed += 1;
                ctx.out.status(false, &e.to_string());
            }
        }
    }
    ctx.out.flush();
    if failed > 0 {
        anyhow::bail!("{} of {} target(s) cannot be reified", failed, targets.len());
    }
    Ok(())
}
