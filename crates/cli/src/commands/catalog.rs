//! Static policy table and template catalog commands

use provision_lib::{
    deploy::TemplateCatalog,
    policy::{gpus_with_memory, ContainerState, ResourceStatus, CATEGORY_PORTS, REGIONS},
};
use serde::Serialize;
use tabled::Tabled;

use super::Context;
use crate::output::{color_status, print_table, OutputFormat};

#[derive(Tabled, Serialize)]
struct GpuRow {
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Vendor")]
    vendor: String,
    #[tabled(rename = "Architecture")]
    architecture: String,
    #[tabled(rename = "Memory")]
    memory_gb: String,
    #[tabled(rename = "CUDA Cores")]
    cuda_cores: u32,
    #[tabled(rename = "TDP")]
    tdp_watts: String,
}

#[derive(Tabled, Serialize)]
struct RegionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Location")]
    location: String,
}

#[derive(Tabled, Serialize)]
struct PortsRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Default Ports")]
    ports: String,
}

#[derive(Tabled, Serialize)]
struct TemplateRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Image")]
    image: String,
    #[tabled(rename = "GPU")]
    gpu: String,
}

#[derive(Tabled, Serialize)]
struct StatusRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Status")]
    status: String,
}

pub fn show_gpus(min_memory: Option<u32>, format: OutputFormat) {
    let rows: Vec<GpuRow> = gpus_with_memory(min_memory.unwrap_or(0))
        .map(|g| GpuRow {
            model: g.model.to_string(),
            vendor: g.vendor.to_string(),
            architecture: g.architecture.to_string(),
            memory_gb: format!("{} GB", g.memory_gb),
            cuda_cores: g.cuda_cores,
            tdp_watts: format!("{} W", g.tdp_watts),
        })
        .collect();
    print_table(&rows, format);
}

pub fn show_regions(format: OutputFormat) {
    let rows: Vec<RegionRow> = REGIONS
        .iter()
        .map(|r| RegionRow {
            id: r.id.to_string(),
            name: r.name.to_string(),
            location: r.location.to_string(),
        })
        .collect();
    print_table(&rows, format);
}

pub fn show_ports(format: OutputFormat) {
    let rows: Vec<PortsRow> = CATEGORY_PORTS
        .iter()
        .map(|(category, ports)| PortsRow {
            category: category.to_string(),
            ports: ports
                .iter()
                .map(u16::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();
    print_table(&rows, format);
}

pub fn show_templates(ctx: &Context) {
    let rows: Vec<TemplateRow> = ctx
        .catalog
        .list()
        .into_iter()
        .map(|t| TemplateRow {
            gpu: match (t.gpu_required, t.min_gpu_memory_gb) {
                (true, Some(gb)) => format!("required ({} GB+)", gb),
                (true, None) => "required".to_string(),
                (false, _) => "-".to_string(),
            },
            id: t.id,
            name: t.name,
            category: t.category,
            image: t.image,
        })
        .collect();
    print_table(&rows, ctx.format);
}

pub fn show_statuses(format: OutputFormat) {
    let resource = ResourceStatus::ALL
        .into_iter()
        .map(|s| ("resource", s.display()));
    let container = ContainerState::ALL
        .into_iter()
        .map(|s| ("container", s.display()));

    let rows: Vec<StatusRow> = resource
        .chain(container)
        .map(|(kind, display)| StatusRow {
            kind: kind.to_string(),
            status: match format {
                OutputFormat::Table => color_status(display),
                OutputFormat::Json => display.label.to_string(),
            },
        })
        .collect();
    print_table(&rows, format);
}
