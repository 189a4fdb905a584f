//! The "System Information" component.

use std::num::NonZero;

use futures::FutureExt;
use futures::future::BoxFuture;
use portico_console::{
    Component, ComponentFault, ComponentInfo, ConsolePlugin, InstanceContext, RenderMode,
    RenderModes, RenderedFragment, TemplateError, escape_html,
};
use portico_core_plugins::{ServerInfo, ServerInfoPlugin};
use portico_system::plugin::{Plugin, PluginId};
use portico_system::server::Server;
use serde::Serialize;
use serde_json::{Map, Value};

const TYPE_NAME: &str = "SysInfo";
const TEMPLATE: &str = "sys_info";

/// Runtime facts shown by [`SysInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SysInfoModel {
    /// Deployment name from [`ServerInfo`].
    pub server_name: String,
    /// Framework version.
    pub version: String,
    /// Operating system family.
    pub os: String,
    /// CPU architecture.
    pub arch: String,
    /// Available parallelism.
    pub cpus: usize,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
}

/// Shows server and runtime information. One per connection.
#[derive(Debug, Clone)]
pub struct SysInfo {
    server: ServerInfo,
}

impl SysInfo {
    /// Reports on `server`.
    #[must_use]
    pub fn new(server: ServerInfo) -> Self {
        Self { server }
    }

    fn sample(&self) -> SysInfoModel {
        SysInfoModel {
            server_name: self.server.name.clone(),
            version: self.server.version.to_string(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cpus: std::thread::available_parallelism().map_or(1, NonZero::get),
            uptime_secs: self.server.uptime_secs(),
        }
    }
}

impl Component for SysInfo {
    type State = SysInfoModel;

    fn info(&self) -> ComponentInfo {
        ComponentInfo::new(TYPE_NAME, "System Information")
            .with_modes([RenderMode::Preview, RenderMode::View])
            .singleton()
    }

    fn add(&self, _: &mut InstanceContext, _: &Map<String, Value>) -> Result<SysInfoModel, ComponentFault> {
        Ok(self.sample())
    }

    fn render<'a>(
        &'a self,
        ctx: &'a InstanceContext,
        state: &'a SysInfoModel,
        modes: &'a RenderModes,
    ) -> BoxFuture<'a, Result<Vec<RenderedFragment>, ComponentFault>> {
        async move {
            let model = serde_json::to_value(state).map_err(|err| ctx.fault(err.to_string()))?;
            let html = ctx.render_template(TEMPLATE, &model)?;
            Ok(modes
                .iter()
                .map(|mode| RenderedFragment::new(mode, html.clone()))
                .collect())
        }
        .boxed()
    }

    fn update(
        &self,
        ctx: &mut InstanceContext,
        state: &mut SysInfoModel,
        method: &str,
        _: &[Value],
    ) -> Result<(), ComponentFault> {
        if method != "refresh" {
            return Err(ctx.fault(format!("unsupported update method '{method}'")));
        }
        *state = self.sample();
        let sample = serde_json::to_value(&*state).map_err(|err| ctx.fault(err.to_string()))?;
        ctx.notify_view("updateInfo", vec![sample]);
        Ok(())
    }
}

fn render(model: &Value, _locale: &str) -> Result<String, TemplateError> {
    let field = |key: &str| match &model[key] {
        Value::String(text) => Ok(escape_html(text)),
        Value::Number(number) => Ok(number.to_string()),
        _ => Err(TemplateError::render(TEMPLATE, format!("missing field '{key}'"))),
    };
    Ok(format!(
        "<table class=\"sys-info\">\
         <tr><th>Server</th><td>{} {}</td></tr>\
         <tr><th>System</th><td>{} ({})</td></tr>\
         <tr><th>CPUs</th><td>{}</td></tr>\
         <tr><th>Uptime</th><td data-field=\"uptime\">{} s</td></tr>\
         </table>",
        field("server_name")?,
        field("version")?,
        field("os")?,
        field("arch")?,
        field("cpus")?,
        field("uptime_secs")?,
    ))
}

/// Registers [`SysInfo`] for the server's [`ServerInfo`].
///
/// # Dependencies
///
/// - [`ServerInfoPlugin`]
/// - [`ConsolePlugin`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SysInfoPlugin;

impl Plugin for SysInfoPlugin {
    fn build(&self, server: &mut Server) {
        let Some(info) = server.get_global::<ServerInfo>().cloned() else {
            panic!("ServerInfo not found. Make sure to add ServerInfoPlugin before SysInfoPlugin.");
        };
        let (types, templates) = crate::registration_apis(server, "SysInfoPlugin");
        types.register(SysInfo::new(info));
        templates.register(TEMPLATE, render);
    }

    fn dependencies(&self) -> Vec<PluginId> {
        vec![
            PluginId::of::<ServerInfoPlugin>(),
            PluginId::of::<ConsolePlugin>(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_reads_server_info() {
        let component = SysInfo::new(ServerInfo::named("Lab"));
        let sample = component.sample();
        assert_eq!(sample.server_name, "Lab");
        assert_eq!(sample.os, std::env::consts::OS);
        assert!(sample.cpus >= 1);
    }

    #[test]
    fn template_escapes_and_requires_fields() {
        let mut model = serde_json::to_value(SysInfo::new(ServerInfo::named("<lab>")).sample())
            .unwrap();
        let html = render(&model, "en").unwrap();
        assert!(html.contains("&lt;lab&gt;"));

        model["cpus"] = Value::Null;
        assert!(render(&model, "en").is_err());
    }
}
