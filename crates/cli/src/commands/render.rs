//! Deployment rendering commands

use anyhow::{bail, Context as _, Result};
use colored::Colorize;
use provision_lib::{
    branding::{BrandedDeployment, BrandingMode, PollPolicy},
    deploy::{
        generate_container_name, ComposeManifest, ContainerName, DeploymentConfig,
        DeploymentRequest, LaunchCommand, TemplateCatalog,
    },
    BrandingContext,
};
use serde_json::json;
use tracing::debug;

use super::Context;
use crate::output::{print_info, print_json, OutputFormat};
use crate::{BrandingArgs, DeploymentArgs};

/// Poll and delivery settings for `render deploy`
#[derive(Debug, Clone, Copy)]
pub struct DeployOptions {
    pub max_attempts: u32,
    pub interval: u32,
    pub oneliner: bool,
}

/// Split a `KEY=VALUE` flag; the value may itself contain `=`
fn parse_env(pair: &str) -> Result<(String, String)> {
    match pair.split_once('=') {
        Some((key, value)) => Ok((key.to_string(), value.to_string())),
        None => bail!("invalid --env {:?}: expected KEY=VALUE", pair),
    }
}

/// Merge flags over the catalog template and validate
pub fn build_deployment(
    catalog: &dyn TemplateCatalog,
    args: &DeploymentArgs,
) -> Result<(DeploymentConfig, ContainerName)> {
    let template = args
        .template
        .as_deref()
        .map(|id| catalog.require(id))
        .transpose()?;

    let mut request = match (&args.image, &template) {
        (Some(image), Some(t)) => DeploymentRequest {
            image: image.clone(),
            ..DeploymentRequest::from_template(t)
        },
        (Some(image), None) => DeploymentRequest::new(image.clone(), "custom"),
        (None, Some(t)) => DeploymentRequest::from_template(t),
        (None, None) => bail!("either --image or --template is required"),
    };

    if let Some(category) = &args.category {
        request.category = category.clone();
    }
    if !args.ports.is_empty() {
        request.ports = Some(args.ports.clone());
    }
    if let Some(gpus) = args.gpus {
        request.gpu_count = gpus;
    }
    for pair in &args.env {
        let (key, value) = parse_env(pair)?;
        request.environment.insert(key, value);
    }
    request.volumes.extend(args.volumes.iter().cloned());
    if args.cmd.is_some() {
        request.command = args.cmd.clone();
    }

    let template_name = args
        .template_name
        .clone()
        .or_else(|| template.as_ref().map(|t| t.name.clone()))
        .context("--template-name is required without --template")?;

    debug!(template_name = %template_name, image = %request.image, "Building deployment");
    let name = generate_container_name(&template_name, &args.user_id)?;
    let config = request.build()?;
    Ok((config, name))
}

/// Print the container name for a template and user
pub fn show_name(template: &str, user_id: &str, format: OutputFormat) -> Result<()> {
    let name = generate_container_name(template, user_id)?;
    match format {
        OutputFormat::Json => print_json(&json!({ "containerName": name })),
        OutputFormat::Table => println!("{}", name),
    }
    Ok(())
}

pub fn render_command(ctx: &Context, args: &DeploymentArgs) -> Result<()> {
    let (config, name) = build_deployment(&ctx.catalog, args)?;
    let command = LaunchCommand::new(&config, &name);

    match ctx.format {
        OutputFormat::Json => print_json(&json!({
            "containerName": name,
            "command": command.to_shell(),
            "argv": command.argv(),
        })),
        OutputFormat::Table => println!("{}", command),
    }
    Ok(())
}

pub fn render_manifest(ctx: &Context, args: &DeploymentArgs) -> Result<()> {
    let (config, name) = build_deployment(&ctx.catalog, args)?;
    let manifest = ComposeManifest::new(&config, &name).to_yaml()?;

    match ctx.format {
        OutputFormat::Json => print_json(&json!({
            "containerName": name,
            "manifest": manifest,
        })),
        OutputFormat::Table => print!("{}", manifest),
    }
    Ok(())
}

pub fn render_deploy(
    ctx: &Context,
    args: &DeploymentArgs,
    branding: &BrandingArgs,
    options: DeployOptions,
) -> Result<()> {
    let (config, name) = build_deployment(&ctx.catalog, args)?;
    let mode = if options.oneliner {
        BrandingMode::Oneliner
    } else {
        BrandingMode::FullScript
    };
    let poll = PollPolicy::new(options.max_attempts, options.interval);
    let plan = BrandedDeployment::new(LaunchCommand::new(&config, &name), branding_context(branding))
        .with_injector(ctx.injector.clone())
        .with_poll(poll)
        .with_mode(mode);

    match ctx.format {
        OutputFormat::Json => print_json(&json!({
            "containerName": name,
            "pollPolicy": poll,
            "mode": mode,
            "script": plan.script(),
        })),
        OutputFormat::Table => {
            print!("{}", plan.script());
            print_info(&format!(
                "{} waits up to {}s for {} before branding",
                "deploy".bold(),
                poll.max_wait_secs(),
                name.as_str().cyan()
            ));
        }
    }
    Ok(())
}

pub fn branding_context(args: &BrandingArgs) -> BrandingContext {
    BrandingContext {
        instance_id: args.instance_id.clone(),
        region: args.region.clone(),
        plan: args.plan.clone(),
        expires_at: args.expires_at.clone(),
        username: args.username.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision_lib::deploy::StaticCatalog;

    fn args() -> DeploymentArgs {
        DeploymentArgs {
            image: None,
            template: None,
            category: None,
            ports: Vec::new(),
            gpus: None,
            env: Vec::new(),
            volumes: Vec::new(),
            cmd: None,
            template_name: None,
            user_id: "u-123".to_string(),
        }
    }

    #[test]
    fn test_parse_env() {
        assert_eq!(
            parse_env("URL=a=b").unwrap(),
            ("URL".to_string(), "a=b".to_string())
        );
        assert!(parse_env("NOVALUE").is_err());
    }

    #[test]
    fn test_template_seeds_deployment() {
        let catalog = StaticCatalog::builtin();
        let (config, name) = build_deployment(
            &catalog,
            &DeploymentArgs {
                template: Some("pytorch".to_string()),
                ..args()
            },
        )
        .unwrap();

        assert_eq!(config.image(), "pytorch/pytorch:2.1.0-cuda12.1-cudnn8-runtime");
        assert_eq!(config.ports(), &[8888, 6006, 22]);
        assert_eq!(config.gpu_count(), 1);
        assert!(name.as_str().starts_with("pytorch-2-1-cuda-12-1-"));
    }

    #[test]
    fn test_flags_override_template() {
        let catalog = StaticCatalog::builtin();
        let (config, _) = build_deployment(
            &catalog,
            &DeploymentArgs {
                template: Some("pytorch".to_string()),
                image: Some("my/torch:dev".to_string()),
                ports: vec![7860],
                gpus: Some(4),
                env: vec!["HF_TOKEN=x".to_string()],
                ..args()
            },
        )
        .unwrap();

        assert_eq!(config.image(), "my/torch:dev");
        assert_eq!(config.ports(), &[7860]);
        assert_eq!(config.gpu_count(), 4);
        assert_eq!(config.environment().get("HF_TOKEN"), Some("x"));
    }

    #[test]
    fn test_requires_image_or_template() {
        let catalog = StaticCatalog::builtin();
        let err = build_deployment(&catalog, &args()).unwrap_err();
        assert!(err.to_string().contains("--image"));

        let err = build_deployment(
            &catalog,
            &DeploymentArgs {
                image: Some("nginx".to_string()),
                ..args()
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("--template-name"));
    }
}
