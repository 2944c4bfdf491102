//! `reify methods`: per-operation interception verdicts.

use reify_core::mop::selector::{self, Verdict};

use crate::context::Context;

pub fn execute(ctx: &mut Context, type_name: &str, eligible_only: bool) -> anyhow::Result<()> {
    let ty = ctx.reifier.types().resolve(type_name)?;
    let report = selector::select(&ty);

    ctx.out.heading(report.target(), &report.summary());
    for entry in report.entries() {
        match entry.verdict {
            Verdict::Eligible => ctx.out.verdict(&entry.method.qualified(), None),
            Verdict::Excluded(why) if !eligible_only => {
                ctx.out.verdict(&entry.method.qualified(), Some(&why.to_string()))
            }
            Verdict::Excluded(_) => {}
        }
    }
    ctx.out.flush();
    Ok(())
}
