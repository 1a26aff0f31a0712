use reqwest::{Client, IntoUrl, Method, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

/// Session token header attached to every request after login.
const SESSION_HEADER: &str = "vmware-api-session-id";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Error within reqwest library
    #[error("vSphere API request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// Error returned by server
    #[error("HTTP error from API: {0}")]
    Http(StatusCode),

    /// Session login rejected by the server
    #[error("authentication failed: {0}")]
    AuthFailed(StatusCode),

    /// VMware Tools not running in the guest
    #[error("guest tools not available")]
    GuestUnavailable,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, Deserialize)]
pub struct DatacenterSummary {
    pub datacenter: String,
    pub name: String,
}

/// Detail for a single datacenter, including its inventory root folders.
#[derive(Debug, Clone, Deserialize)]
pub struct DatacenterDetail {
    pub name: String,
    pub vm_folder: String,
    pub host_folder: String,
    pub datastore_folder: String,
    pub network_folder: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FolderSummary {
    pub folder: String,
    pub name: String,
    #[serde(rename = "type")]
    pub folder_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmSummary {
    pub vm: String,
    pub name: String,
    pub power_state: String,
    #[serde(default)]
    pub cpu_count: Option<u32>,
    #[serde(rename = "memory_size_MiB", default)]
    pub memory_size_mib: Option<u64>,
}

/// Detail for a single VM.
///
/// Only the fields this crate's consumers read are modeled; deployments that
/// omit any of the optional ones deserialize cleanly to `None`.
#[derive(Debug, Clone, Deserialize)]
pub struct VmDetail {
    pub name: String,
    #[serde(rename = "guest_OS", default)]
    pub guest_os: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub annotation: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub power_state: Option<String>,
}

/// Identity reported by VMware Tools from inside the guest.
#[derive(Debug, Clone, Deserialize)]
pub struct GuestIdentity {
    #[serde(default)]
    pub full_name: Option<LocalizableMessage>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub host_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalizableMessage {
    pub default_message: String,
}

/// Client for the vCenter Automation (REST) API.
///
/// Covers the slice of the API needed to enumerate virtual machines: session
/// login/logout, datacenter and folder listing, VM summaries, and per-VM
/// detail and guest-identity lookups.
pub struct VSphereApi {
    client: Client,
    base_url: Url,
    session: String,
}

impl VSphereApi {
    /// Log in to a vCenter or ESXi endpoint and return an authenticated
    /// client. The session token from the login round-trip is attached to
    /// every subsequent request.
    pub async fn connect<T: IntoUrl, U: ToString, P: ToString>(
        endpoint: T,
        username: U,
        password: P,
        allow_invalid_tls: bool,
    ) -> Result<Self> {
        if allow_invalid_tls {
            warn!("TLS certificate verification is disabled for this session");
        }
        let client = Client::builder()
            .danger_accept_invalid_certs(allow_invalid_tls)
            .build()?;
        let base_url = endpoint.into_url()?.join("api/").unwrap();

        let url = base_url.join("session").unwrap();
        let resp = client
            .request(Method::POST, url)
            .basic_auth(username.to_string(), Some(password.to_string()))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            error!("Session login rejected: {status}");
            return Err(Error::AuthFailed(status));
        }
        let session: String = resp.json().await?;
        debug!("Session established");

        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(SESSION_HEADER, self.session.as_str())
    }

    /// End the session. The server invalidates the token; the client is
    /// unusable afterwards.
    pub async fn logout(&self) -> Result<()> {
        let url = self.base_url.join("session").unwrap();
        let resp = self.request(Method::DELETE, url).send().await?;
        let status = resp.status();
        if status.is_success() {
            debug!("Session ended");
            Ok(())
        } else {
            Err(Error::Http(status))
        }
    }

    pub async fn list_datacenters(&self) -> Result<Vec<DatacenterSummary>> {
        let url = self.base_url.join("vcenter/datacenter").unwrap();
        let resp = self.request(Method::GET, url).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp.json().await?)
        } else {
            error!("Failed to list datacenters: {status}");
            Err(Error::Http(status))
        }
    }

    /// Fetch a datacenter's detail, including its root VM folder.
    pub async fn get_datacenter(&self, moid: &str) -> Result<DatacenterDetail> {
        let path = format!("vcenter/datacenter/{moid}");
        let url = self.base_url.join(&path).unwrap();
        let resp = self.request(Method::GET, url).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp.json().await?)
        } else {
            error!("Failed to get datacenter {moid}: {status}");
            Err(Error::Http(status))
        }
    }

    /// List virtual-machine folders, optionally scoped to a datacenter and a
    /// parent folder. With a parent filter this returns that folder's direct
    /// child folders.
    pub async fn list_folders(
        &self,
        datacenter: Option<&str>,
        parent: Option<&str>,
    ) -> Result<Vec<FolderSummary>> {
        let mut url = self.base_url.join("vcenter/folder").unwrap();
        let mut query = vec!["type=VIRTUAL_MACHINE".to_string()];
        if let Some(datacenter) = datacenter {
            query.push(format!("datacenters={datacenter}"));
        }
        if let Some(parent) = parent {
            query.push(format!("parent_folders={parent}"));
        }
        url.set_query(Some(&query.join("&")));

        let resp = self.request(Method::GET, url).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp.json().await?)
        } else {
            error!("Failed to list folders: {status}");
            Err(Error::Http(status))
        }
    }

    /// List VM summaries contained directly in a folder.
    pub async fn list_vms(&self, folder: &str) -> Result<Vec<VmSummary>> {
        let mut url = self.base_url.join("vcenter/vm").unwrap();
        url.set_query(Some(&format!("folders={folder}")));
        let resp = self.request(Method::GET, url).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp.json().await?)
        } else {
            error!("Failed to list VMs in folder {folder}: {status}");
            Err(Error::Http(status))
        }
    }

    pub async fn get_vm(&self, moid: &str) -> Result<VmDetail> {
        let path = format!("vcenter/vm/{moid}");
        let url = self.base_url.join(&path).unwrap();
        let resp = self.request(Method::GET, url).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp.json().await?)
        } else {
            error!("Failed to get VM {moid}: {status}");
            Err(Error::Http(status))
        }
    }

    /// Identity reported by VMware Tools. A 503 from the server means Tools
    /// is not running in the guest and maps to [`Error::GuestUnavailable`].
    pub async fn get_guest_identity(&self, moid: &str) -> Result<GuestIdentity> {
        let path = format!("vcenter/vm/{moid}/guest/identity");
        let url = self.base_url.join(&path).unwrap();
        let resp = self.request(Method::GET, url).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp.json().await?)
        } else if status == StatusCode::SERVICE_UNAVAILABLE {
            Err(Error::GuestUnavailable)
        } else {
            error!("Failed to get guest identity for VM {moid}: {status}");
            Err(Error::Http(status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vm_summary_deserializes() {
        let json = r#"{
            "vm": "vm-1034",
            "name": "build-runner-01",
            "power_state": "POWERED_ON",
            "cpu_count": 4,
            "memory_size_MiB": 8192
        }"#;
        let summary: VmSummary = serde_json::from_str(json).expect("Failed to parse summary");
        assert_eq!(summary.vm, "vm-1034");
        assert_eq!(summary.power_state, "POWERED_ON");
        assert_eq!(summary.memory_size_mib, Some(8192));
    }

    #[test]
    fn test_vm_detail_tolerates_missing_fields() {
        let json = r#"{"name": "bare-vm"}"#;
        let detail: VmDetail = serde_json::from_str(json).expect("Failed to parse detail");
        assert_eq!(detail.name, "bare-vm");
        assert!(detail.guest_os.is_none());
        assert!(detail.annotation.is_none());
        assert!(detail.question.is_none());
    }

    #[test]
    fn test_guest_identity_full_name() {
        let json = r#"{
            "full_name": {"default_message": "Ubuntu Linux (64-bit)"},
            "ip_address": "10.0.4.17",
            "host_name": "runner01"
        }"#;
        let identity: GuestIdentity = serde_json::from_str(json).expect("Failed to parse identity");
        assert_eq!(
            identity.full_name.map(|m| m.default_message).as_deref(),
            Some("Ubuntu Linux (64-bit)")
        );
        assert_eq!(identity.ip_address.as_deref(), Some("10.0.4.17"));
    }
}
