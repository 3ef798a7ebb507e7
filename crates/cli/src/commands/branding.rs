//! Branding artifact commands

use serde_json::json;

use super::render::branding_context;
use super::Context;
use crate::output::{print_json, OutputFormat};
use crate::BrandingArgs;

pub fn show_script(ctx: &Context, args: &BrandingArgs) {
    let script = ctx.injector.branding_script(&branding_context(args));
    match ctx.format {
        OutputFormat::Json => print_json(&json!({ "script": script })),
        OutputFormat::Table => print!("{}", script),
    }
}

pub fn show_oneliner(ctx: &Context, args: &BrandingArgs) {
    let line = ctx.injector.branding_oneliner(&branding_context(args));
    match ctx.format {
        OutputFormat::Json => print_json(&json!({ "oneliner": line })),
        OutputFormat::Table => println!("{}", line),
    }
}

pub fn show_motd(ctx: &Context, args: &BrandingArgs) {
    let motd = ctx.injector.motd(&branding_context(args));
    match ctx.format {
        OutputFormat::Json => print_json(&json!({ "motd": motd })),
        OutputFormat::Table => println!("{}", motd),
    }
}

pub fn show_cleanup(ctx: &Context) {
    let script = ctx.injector.cleanup_script();
    match ctx.format {
        OutputFormat::Json => print_json(&json!({ "script": script })),
        OutputFormat::Table => print!("{}", script),
    }
}
