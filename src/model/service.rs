//! Services exposed by components and their computed endpoints.

use std::net::Ipv6Addr;

use serde::{Deserialize, Serialize};

use super::value::StringOrList;
use crate::cmdb::Cmdb;
use crate::error::{CheckError, ComputeError};

/// Scheme used when a service declares none.
pub const DEFAULT_SCHEME: &str = "tcp";
/// Host used when no host can be placed.
pub const LOOPBACK_HOST: &str = "127.0.0.1";
/// Path used when a service declares none.
pub const DEFAULT_PATH: &str = "/";

/// A network service exposed by a component.
///
/// Compound fields (`addr`, `addrs`, `endpoints`, `urls`) are taken verbatim
/// when set and derived by [`Service::compute`] otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Service {
    /// Owning component.
    #[serde(skip)]
    pub component_name: String,

    /// Service name.
    #[serde(skip)]
    pub name: String,

    /// URL scheme.
    pub scheme: String,

    /// Explicit host.
    pub host: String,

    /// Explicit IPv4 address, used when no host is set.
    pub ipv4: String,

    /// Explicit IPv6 address, used when neither host nor IPv4 is set.
    pub ipv6: String,

    /// Listening port.
    pub port: u16,

    /// Public port, preferred over every other port.
    pub pub_port: u16,

    /// Load balancer port, preferred over `port`.
    pub lb_port: u16,

    /// Explicit address.
    pub addr: String,

    /// URL path.
    pub path: String,

    /// Explicit addresses.
    pub addrs: Vec<String>,

    /// Explicit endpoints.
    pub endpoints: Vec<String>,

    /// Explicit URLs.
    pub urls: Vec<String>,
}

/// The derived view of a service, rebuilt on every compute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceComputed {
    /// Effective scheme.
    pub scheme: String,
    /// First host.
    pub host: String,
    /// Effective port.
    pub port: u16,
    /// Address of the first host.
    pub addr: String,
    /// Normalized path.
    pub path: String,
    /// Every host serving the service.
    pub hosts: Vec<String>,
    /// One address per host.
    pub addrs: Vec<String>,
    /// One endpoint per address.
    pub endpoints: Vec<String>,
    /// One URL per endpoint.
    pub urls: Vec<String>,
}

/// A partial service decoded from a declaration or zone override.
///
/// Present fields replace the target field, including empty and zero values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServicePatch {
    /// URL scheme.
    pub scheme: Option<String>,
    /// Explicit host.
    pub host: Option<String>,
    /// Explicit IPv4 address.
    pub ipv4: Option<String>,
    /// Explicit IPv6 address.
    pub ipv6: Option<String>,
    /// Listening port.
    pub port: Option<u16>,
    /// Public port.
    #[serde(alias = "pubPort")]
    pub pub_port: Option<u16>,
    /// Load balancer port.
    #[serde(alias = "lbPort")]
    pub lb_port: Option<u16>,
    /// Explicit address.
    pub addr: Option<String>,
    /// URL path.
    pub path: Option<String>,
    /// Explicit addresses.
    pub addrs: Option<StringOrList>,
    /// Explicit endpoints.
    pub endpoints: Option<StringOrList>,
    /// Explicit URLs.
    pub urls: Option<StringOrList>,
}

impl ServicePatch {
    /// Overrides the fields of `service` present in this patch.
    pub fn apply_to(self, service: &mut Service) {
        if let Some(v) = self.scheme {
            service.scheme = v;
        }
        if let Some(v) = self.host {
            service.host = v;
        }
        if let Some(v) = self.ipv4 {
            service.ipv4 = v;
        }
        if let Some(v) = self.ipv6 {
            service.ipv6 = v;
        }
        if let Some(v) = self.port {
            service.port = v;
        }
        if let Some(v) = self.pub_port {
            service.pub_port = v;
        }
        if let Some(v) = self.lb_port {
            service.lb_port = v;
        }
        if let Some(v) = self.addr {
            service.addr = v;
        }
        if let Some(v) = self.path {
            service.path = v;
        }
        if let Some(v) = self.addrs {
            service.addrs = v.into_vec();
        }
        if let Some(v) = self.endpoints {
            service.endpoints = v.into_vec();
        }
        if let Some(v) = self.urls {
            service.urls = v.into_vec();
        }
    }
}

impl Service {
    /// Creates an empty service owned by `component_name`.
    #[must_use]
    pub fn new(component_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            component_name: component_name.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the port clients should use: `pub_port`, then `lb_port`,
    /// then `port`.
    #[must_use]
    pub const fn effective_port(&self) -> u16 {
        if self.pub_port != 0 {
            self.pub_port
        } else if self.lb_port != 0 {
            self.lb_port
        } else {
            self.port
        }
    }

    /// Returns the explicitly declared host: `host`, then `ipv4`, then `ipv6`.
    #[must_use]
    pub fn explicit_host(&self) -> Option<&str> {
        [&self.host, &self.ipv4, &self.ipv6]
            .into_iter()
            .find(|h| !h.is_empty())
            .map(String::as_str)
    }

    /// Computes the endpoints of this service.
    ///
    /// External services live outside the zone: their host defaults to the
    /// loopback address and their port is taken verbatim. Other services are
    /// placed on the hosts of the inventory group named after their component.
    ///
    /// # Errors
    ///
    /// Returns an error if a resolved host is empty or contains whitespace.
    pub fn compute(&self, external: bool, cmdb: &Cmdb) -> Result<ServiceComputed, ComputeError> {
        let scheme = if self.scheme.is_empty() {
            DEFAULT_SCHEME.to_string()
        } else {
            self.scheme.clone()
        };

        let hosts = match self.explicit_host() {
            Some(host) => vec![host.to_string()],
            None if external => vec![LOOPBACK_HOST.to_string()],
            None => {
                let placed = cmdb.hosts_for_component(&self.component_name);
                if placed.is_empty() {
                    vec![LOOPBACK_HOST.to_string()]
                } else {
                    placed
                }
            }
        };
        if let Some(bad) = hosts.iter().find(|h| !is_valid_host(h)) {
            return Err(ComputeError::ServiceFailed {
                component: self.component_name.clone(),
                service: self.name.clone(),
                reason: format!("invalid host {bad:?}"),
            });
        }
        let host = hosts.first().cloned().unwrap_or_default();

        let port = if external { self.port } else { self.effective_port() };
        let path = normalize_path(&self.path);

        let addr = if self.addr.is_empty() {
            join_host_port(&host, port)
        } else {
            self.addr.clone()
        };
        let addrs = if self.addrs.is_empty() {
            hosts.iter().map(|h| join_host_port(h, port)).collect()
        } else {
            self.addrs.clone()
        };
        let endpoints: Vec<String> = if self.endpoints.is_empty() {
            addrs.iter().map(|a| format!("{scheme}://{a}")).collect()
        } else {
            self.endpoints
                .iter()
                .map(|e| with_scheme(&scheme, e))
                .collect()
        };
        let urls = if self.urls.is_empty() {
            endpoints.iter().map(|e| join_url(e, &path)).collect()
        } else {
            self.urls.clone()
        };

        Ok(ServiceComputed {
            scheme,
            host,
            port,
            addr,
            path,
            hosts,
            addrs,
            endpoints,
            urls,
        })
    }

    /// Checks the declaration invariants of a non-external service.
    #[must_use]
    pub fn check(&self) -> Vec<CheckError> {
        let mut errors = Vec::new();
        if self.scheme.is_empty() {
            errors.push(self.check_error("the scheme of service can not be empty"));
        }
        if self.port == 0 {
            errors.push(self.check_error("the port of service can not be 0"));
        }
        errors
    }

    fn check_error(&self, message: &str) -> CheckError {
        CheckError {
            component: self.component_name.clone(),
            service: self.name.clone(),
            message: message.to_string(),
        }
    }
}

fn is_valid_host(host: &str) -> bool {
    !host.is_empty() && !host.chars().any(char::is_whitespace)
}

fn join_host_port(host: &str, port: u16) -> String {
    if host.parse::<Ipv6Addr>().is_ok() {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

fn with_scheme(scheme: &str, endpoint: &str) -> String {
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("{scheme}://{endpoint}")
    }
}

fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        DEFAULT_PATH.to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn join_url(endpoint: &str, path: &str) -> String {
    format!("{}{path}", endpoint.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Group;

    fn create_test_service() -> Service {
        let mut service = Service::new("api", "http");
        service.scheme = "http".to_string();
        service.port = 80;
        service
    }

    fn cmdb_with(group: &str, hosts: &[&str]) -> Cmdb {
        let cmdb = Cmdb::new();
        cmdb.inventory.set_group(Group::with_hosts(group, hosts.iter().copied()));
        cmdb
    }

    #[test]
    fn test_port_precedence() {
        let cmdb = Cmdb::new();
        let mut service = create_test_service();
        service.lb_port = 8000;
        service.pub_port = 9000;
        assert_eq!(service.compute(false, &cmdb).unwrap().port, 9000);

        service.pub_port = 0;
        assert_eq!(service.compute(false, &cmdb).unwrap().port, 8000);

        service.lb_port = 0;
        assert_eq!(service.compute(false, &cmdb).unwrap().port, 80);
    }

    #[test]
    fn test_external_port_is_verbatim() {
        let cmdb = Cmdb::new();
        let mut service = create_test_service();
        service.pub_port = 9000;
        assert_eq!(service.compute(true, &cmdb).unwrap().port, 80);
    }

    #[test]
    fn test_external_defaults_to_loopback() {
        let cmdb = cmdb_with("api", &["10.0.0.1"]);
        let service = create_test_service();

        let computed = service.compute(true, &cmdb).unwrap();
        assert_eq!(computed.hosts, vec!["127.0.0.1"]);
        assert_eq!(computed.addr, "127.0.0.1:80");
        assert_eq!(computed.urls, vec!["http://127.0.0.1:80/"]);
    }

    #[test]
    fn test_placed_on_component_group() {
        let cmdb = cmdb_with("api", &["10.0.0.2", "10.0.0.1"]);
        let service = create_test_service();

        let computed = service.compute(false, &cmdb).unwrap();
        assert_eq!(computed.host, "10.0.0.2");
        assert_eq!(computed.hosts, vec!["10.0.0.2", "10.0.0.1"]);
        assert_eq!(computed.addrs, vec!["10.0.0.2:80", "10.0.0.1:80"]);
        assert_eq!(
            computed.endpoints,
            vec!["http://10.0.0.2:80", "http://10.0.0.1:80"]
        );
    }

    #[test]
    fn test_empty_group_falls_back_to_loopback() {
        let cmdb = cmdb_with("api", &[]);
        let computed = create_test_service().compute(false, &cmdb).unwrap();
        assert_eq!(computed.hosts, vec!["127.0.0.1"]);
    }

    #[test]
    fn test_explicit_host_precedence() {
        let cmdb = cmdb_with("api", &["10.0.0.1"]);
        let mut service = create_test_service();
        service.ipv6 = "fd00::1".to_string();
        assert_eq!(service.compute(false, &cmdb).unwrap().addr, "[fd00::1]:80");

        service.ipv4 = "192.168.0.9".to_string();
        assert_eq!(service.compute(false, &cmdb).unwrap().host, "192.168.0.9");

        service.host = "api.internal".to_string();
        let computed = service.compute(false, &cmdb).unwrap();
        assert_eq!(computed.hosts, vec!["api.internal"]);
    }

    #[test]
    fn test_explicit_fields_win() {
        let cmdb = cmdb_with("api", &["10.0.0.1"]);
        let mut service = create_test_service();
        service.addr = "lb.example.com:443".to_string();
        service.endpoints = vec!["lb.example.com:443".to_string()];
        service.path = "health".to_string();

        let computed = service.compute(false, &cmdb).unwrap();
        assert_eq!(computed.addr, "lb.example.com:443");
        assert_eq!(computed.path, "/health");
        assert_eq!(computed.endpoints, vec!["http://lb.example.com:443"]);
        assert_eq!(computed.urls, vec!["http://lb.example.com:443/health"]);
    }

    #[test]
    fn test_default_scheme() {
        let mut service = create_test_service();
        service.scheme.clear();
        let computed = service.compute(false, &Cmdb::new()).unwrap();
        assert_eq!(computed.scheme, "tcp");
        assert_eq!(computed.endpoints, vec!["tcp://127.0.0.1:80"]);
    }

    #[test]
    fn test_invalid_host() {
        let mut service = create_test_service();
        service.host = "bad host".to_string();
        let result = service.compute(false, &Cmdb::new());
        assert!(matches!(result, Err(ComputeError::ServiceFailed { .. })));
    }

    #[test]
    fn test_check() {
        let mut service = Service::new("api", "http");
        assert_eq!(service.check().len(), 2);

        service.scheme = "http".to_string();
        service.port = 8080;
        assert!(service.check().is_empty());
    }

    #[test]
    fn test_patch_explicit_zero_wins() {
        let mut service = create_test_service();
        let patch: ServicePatch = serde_yaml::from_str("port: 0\nscheme: ''").unwrap();
        patch.apply_to(&mut service);
        assert_eq!(service.port, 0);
        assert!(service.scheme.is_empty());
    }

    #[test]
    fn test_patch_aliases_and_scalars() {
        let mut service = create_test_service();
        let patch: ServicePatch =
            serde_yaml::from_str("pubPort: 9000\nlb_port: 8000\nendpoints: a.b:1").unwrap();
        patch.apply_to(&mut service);
        assert_eq!(service.pub_port, 9000);
        assert_eq!(service.lb_port, 8000);
        assert_eq!(service.endpoints, vec!["a.b:1"]);
    }
}
