//! Third-party page libraries.

use portico_console::{ConsolePlugin, PageResourcesAPI, StaticResources};
use portico_resources::ResourceDescriptor;
use portico_system::plugin::{Plugin, PluginId};
use portico_system::server::Server;

/// Descriptors for jQuery, jQuery UI and Gridstack.
///
/// jQuery loads first (higher priority); jQuery UI requires jQuery and
/// Gridstack requires both.
#[must_use]
pub fn libraries() -> Vec<ResourceDescriptor> {
    vec![
        ResourceDescriptor::script_uri("/portico/lib/gridstack/gridstack-all.js")
            .provides(["gridstack"])
            .requires(["jquery", "jquery-ui"]),
        ResourceDescriptor::style_uri("/portico/lib/gridstack/gridstack.min.css")
            .provides(["gridstack.css"]),
        ResourceDescriptor::script_uri("/portico/lib/jquery-ui/jquery-ui.min.js")
            .provides(["jquery-ui"])
            .requires(["jquery"]),
        ResourceDescriptor::style_uri("/portico/lib/jquery-ui/jquery-ui.min.css")
            .provides(["jquery-ui.css"]),
        ResourceDescriptor::script_uri("/portico/lib/jquery/jquery.min.js")
            .provides(["jquery"])
            .with_priority(100),
    ]
}

/// Contributes [`libraries`] as the `"libraries"` page resource provider.
///
/// # Dependencies
///
/// - [`ConsolePlugin`]
#[derive(Debug, Clone, Copy, Default)]
pub struct LibrariesPlugin;

impl Plugin for LibrariesPlugin {
    fn build(&self, server: &mut Server) {
        let Some(api) = server.api::<PageResourcesAPI>() else {
            panic!("PageResourcesAPI not found. Make sure to add ConsolePlugin before LibrariesPlugin.");
        };
        api.add(StaticResources::new("libraries", libraries()));
    }

    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<ConsolePlugin>()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_resources::resolve;

    #[test]
    fn libraries_resolve_in_dependency_order() {
        let plan = resolve(libraries()).unwrap();
        assert_eq!(plan.len(), 5);
        assert_eq!(plan.position_of("jquery"), Some(0));
        assert!(plan.position_of("jquery-ui") < plan.position_of("gridstack"));
    }
}
