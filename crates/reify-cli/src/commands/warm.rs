//! `reify warm`: pre-synthesize stubs and report each outcome.

use reify_core::TargetType;

use crate::context::Context;

pub fn execute(ctx: &mut Context, extra: &[String]) -> anyhow::Result<()> {
    let mut targets = ctx.config.warm_targets()?;
    for t in extra {
        targets.push(t.parse::<TargetType>()?);
    }
    if targets.is_empty() {
        ctx.out.notice("nothing to warm", " (set [stubs] warm in reify.toml or pass targets)");
        return Ok(());
    }

    let results = ctx.reifier.stubs().warm(&targets);
    let mut failed = 0;
    for (target, result) in &results {
        match result {
            Ok(handle) => ctx.out.status(true, &format!("{} -> {}", target, handle.name())),
            Err(e) => {
                failed += 1;
                tracing::warn!(target = %target, error = %e, "warm-up failed");
                ctx.out.status(false, &format!("{}: {}", target, e));
            }
        }
    }
    ctx.out.line(&format!(
        "{} stub(s) cached, {} failed",
        ctx.reifier.stubs().cached(),
        failed
    ));
    ctx.out.flush();
    if failed > 0 {
        anyhow::bail!("{} warm-up target(s) failed", failed);
    }
    Ok(())
}
