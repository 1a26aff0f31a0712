use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vsphere_api::VSphereApi;

#[tokio::main]
async fn main() -> Result<()> {
    let fmt_layer = fmt::layer();
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    let endpoint = std::env::var("VSPHERE_URL")?;
    let username = std::env::var("VSPHERE_USERNAME")?;
    let password = std::env::var("VSPHERE_PASSWORD")?;

    let api = VSphereApi::connect(&endpoint, username, password, false).await?;
    for dc in api.list_datacenters().await? {
        println!("Datacenter: {} ({})", dc.name, dc.datacenter);
        let detail = api.get_datacenter(&dc.datacenter).await?;
        for vm in api.list_vms(&detail.vm_folder).await? {
            println!("  VM: {} ({}) - {}", vm.name, vm.vm, vm.power_state);
        }
    }
    api.logout().await?;
    Ok(())
}
