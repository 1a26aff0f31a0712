//! vmrc-links - list virtual machines on a vCenter or ESXi host with direct
//! VMware Remote Console (vmrc) links.
//!
//! The tool:
//! - Logs in to the vCenter Automation API
//! - Walks each datacenter's VM folder tree
//! - Prints per-VM connection metadata including a vmrc:// console URI

mod config;
mod error;
mod inventory;
mod output;

use std::path::PathBuf;

use clap::Parser;
use config::{Config, ConfigError, PASSWORD_ENV};
use error::{Error, Result};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vsphere_api::VSphereApi;

/// List VMs on a vCenter or ESXi host with vmrc:// console links
#[derive(Parser, Debug)]
#[command(name = "vmrc-links")]
#[command(about = "List VMs on a vCenter or ESXi host with vmrc:// console links")]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host name or address of the vCenter or ESXi endpoint
    #[arg(short = 's', long)]
    host: Option<String>,

    /// HTTPS port to connect on
    #[arg(short = 'o', long)]
    port: Option<u16>,

    /// User name for the session login
    #[arg(short, long)]
    username: Option<String>,

    /// Password for the session login (prefer VMRC_LINKS_PASSWORD)
    #[arg(short, long)]
    password: Option<String>,

    /// Only walk the named datacenter
    #[arg(short, long)]
    datacenter: Option<String>,

    /// Accept invalid TLS certificates (self-signed hosts)
    #[arg(long)]
    insecure: bool,

    /// Print records as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => match Config::load_default() {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => Config::empty(),
            Err(e) => return Err(e.into()),
        },
    };
    config.apply_overrides(
        args.host.clone(),
        args.port,
        args.username.clone(),
        args.password.clone(),
        args.insecure,
    );
    config.validate()?;

    let password = config.password().ok_or_else(|| {
        Error::Config(ConfigError::ValidationError(format!(
            "No password configured. Pass --password or set {PASSWORD_ENV}"
        )))
    })?;

    let endpoint = config.endpoint();
    info!("Connecting to {}", endpoint);
    let api = VSphereApi::connect(
        &endpoint,
        &config.vcenter.username,
        &password,
        config.vcenter.accept_invalid_certs,
    )
    .await?;

    let result = run(&api, &args, &config).await;

    if let Err(e) = api.logout().await {
        warn!("Failed to end session: {}", e);
    }

    result?;
    Ok(())
}

/// Walk the selected datacenters and print every VM found.
async fn run(api: &VSphereApi, args: &Args, config: &Config) -> Result<()> {
    let mut datacenters = api.list_datacenters().await?;
    if let Some(name) = &args.datacenter {
        datacenters.retain(|dc| dc.name == *name);
        if datacenters.is_empty() {
            warn!("No datacenter named {:?}", name);
        }
    }

    let user = config.vcenter.username.as_str();
    let host = config.vcenter.host.as_str();
    let port = config.vcenter.port;

    let mut records: Vec<(inventory::VmRecord, String)> = Vec::new();
    for dc in &datacenters {
        debug!("Walking datacenter {} ({})", dc.name, dc.datacenter);
        let tree = inventory::fetch_datacenter_tree(api, &dc.datacenter).await?;
        inventory::walk(&tree, &mut |vm| {
            let console = output::console_uri(user, host, port, &vm.moid);
            records.push((vm.clone(), console));
        });
    }
    debug!("Visited {} virtual machines", records.len());

    let mut stdout = std::io::stdout().lock();
    if args.json {
        output::write_json(&mut stdout, &records)?;
    } else {
        for (vm, console) in &records {
            output::write_record(&mut stdout, vm, console)?;
        }
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_short_flags() {
        let args = Args::try_parse_from([
            "vmrc-links",
            "-s",
            "vcenter.example.com",
            "-o",
            "8443",
            "-u",
            "root",
        ])
        .expect("Failed to parse args");
        assert_eq!(args.host.as_deref(), Some("vcenter.example.com"));
        assert_eq!(args.port, Some(8443));
        assert_eq!(args.username.as_deref(), Some("root"));
        assert!(!args.insecure);
        assert!(!args.json);
    }

    #[test]
    fn test_args_long_flags() {
        let args = Args::try_parse_from([
            "vmrc-links",
            "--host",
            "esx01.lab.local",
            "--datacenter",
            "Homelab",
            "--insecure",
            "--json",
        ])
        .expect("Failed to parse args");
        assert_eq!(args.host.as_deref(), Some("esx01.lab.local"));
        assert_eq!(args.datacenter.as_deref(), Some("Homelab"));
        assert!(args.insecure);
        assert!(args.json);
    }
}
