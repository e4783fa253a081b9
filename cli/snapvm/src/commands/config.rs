//! `snapvm config`

use anyhow::Result;

use crate::output::print_json;

use super::CommandContext;

pub fn run(ctx: CommandContext) -> Result<i32> {
    print_json(&ctx.settings);
    Ok(0)
}
