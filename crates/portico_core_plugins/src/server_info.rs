//! Server information plugin.

use std::time::SystemTime;

use portico_system::plugin::Plugin;
use portico_system::resource::GlobalResource;
use portico_system::server::Server;

/// Metadata about the running console server.
///
/// Components such as `SysInfo` render this directly.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    /// Human-readable deployment name.
    pub name: String,
    /// Framework version from `Cargo.toml`.
    pub version: &'static str,
    /// Whether the server was compiled with debug assertions.
    pub debug: bool,
    /// Wall-clock time the server was built.
    pub started_at: SystemTime,
}

impl GlobalResource for ServerInfo {}

impl ServerInfo {
    /// Creates server info with the given deployment name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Seconds since the server was built, zero if the system clock went back.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.started_at
            .elapsed()
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default()
    }
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: String::from("Portico"),
            version: env!("CARGO_PKG_VERSION"),
            debug: cfg!(debug_assertions),
            started_at: SystemTime::now(),
        }
    }
}

/// Registers [`ServerInfo`] as a global resource.
///
/// Foundational: most other plugins depend on it.
#[derive(Debug, Default, Clone)]
pub struct ServerInfoPlugin {
    name: Option<String>,
}

impl ServerInfoPlugin {
    /// Overrides the deployment name (default `"Portico"`).
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl Plugin for ServerInfoPlugin {
    fn build(&self, server: &mut Server) {
        let info = match &self.name {
            Some(name) => ServerInfo::named(name.clone()),
            None => ServerInfo::default(),
        };
        tracing::debug!(name = %info.name, version = info.version, "server info registered");
        server.insert_global(info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_info_default() {
        let info = ServerInfo::default();
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(info.name, "Portico");
        assert!(info.uptime_secs() < 5);
    }

    #[test]
    fn server_info_plugin_registers_resource() {
        let mut server = Server::new();
        server.add_plugins(ServerInfoPlugin::default().with_name("Operations"));
        server.finish();

        let info = server.get_global::<ServerInfo>().unwrap();
        assert_eq!(info.name, "Operations");
    }
}
