//! `snapvm distros`

use anyhow::Result;
use serde::Serialize;
use snapvm_vm::Distro;
use tabled::Tabled;

use crate::output::print_output;

use super::CommandContext;

#[derive(Debug, Serialize, Tabled)]
struct DistroRow {
    #[tabled(rename = "Distro")]
    name: &'static str,

    #[tabled(rename = "Base image")]
    base_image: String,

    #[tabled(rename = "Default")]
    default: bool,
}

fn rows() -> Vec<DistroRow> {
    Distro::ALL
        .iter()
        .map(|d| DistroRow {
            name: d.as_str(),
            base_image: d.base_image(),
            default: *d == Distro::default(),
        })
        .collect()
}

pub fn run(ctx: CommandContext) -> Result<i32> {
    print_output(&rows(), ctx.format);
    Ok(0)
}
