//! Protocol method names.

/// Browser announces it is ready for page resources.
pub const CONSOLE_READY: &str = "consoleReady";
/// Browser heartbeat; only refreshes connection activity.
pub const KEEP_ALIVE: &str = "keepAlive";
/// `addComponent(type, properties)`.
pub const ADD_COMPONENT: &str = "addComponent";
/// `renderComponent(instanceId, modes)`.
pub const RENDER_COMPONENT: &str = "renderComponent";
/// `updateComponent(instanceId, methodName, params...)`.
pub const UPDATE_COMPONENT: &str = "updateComponent";
/// `deleteComponent(instanceId)`.
pub const DELETE_COMPONENT: &str = "deleteComponent";
/// `setLocale(localeTag)`.
pub const SET_LOCALE: &str = "setLocale";

/// `resourcesToLoad(plan)`.
pub const RESOURCES_TO_LOAD: &str = "resourcesToLoad";
/// `resourceLoadFailed(reason)`.
pub const RESOURCE_LOAD_FAILED: &str = "resourceLoadFailed";
/// `addComponentType(type, displayName, modes)`.
pub const ADD_COMPONENT_TYPE: &str = "addComponentType";
/// `updateComponentType(type, modes)`.
pub const UPDATE_COMPONENT_TYPE: &str = "updateComponentType";
/// `componentAdded(instanceId, modes)`.
pub const COMPONENT_ADDED: &str = "componentAdded";
/// `componentRendered(instanceId, mode, html)`.
pub const COMPONENT_RENDERED: &str = "componentRendered";
/// `notifyView(instanceId, jsMethod, args...)`.
pub const NOTIFY_VIEW: &str = "notifyView";
/// `componentDeleted(instanceId)`.
pub const COMPONENT_DELETED: &str = "componentDeleted";
/// `displayNotification(html, options)`.
pub const DISPLAY_NOTIFICATION: &str = "displayNotification";
/// `openModalDialog(html, options)`.
pub const OPEN_MODAL_DIALOG: &str = "openModalDialog";

/// Methods the browser sends.
pub const INBOUND: [&str; 7] = [
    CONSOLE_READY,
    KEEP_ALIVE,
    ADD_COMPONENT,
    RENDER_COMPONENT,
    UPDATE_COMPONENT,
    DELETE_COMPONENT,
    SET_LOCALE,
];

/// Methods the server sends.
pub const OUTBOUND: [&str; 10] = [
    RESOURCES_TO_LOAD,
    RESOURCE_LOAD_FAILED,
    ADD_COMPONENT_TYPE,
    UPDATE_COMPONENT_TYPE,
    COMPONENT_ADDED,
    COMPONENT_RENDERED,
    NOTIFY_VIEW,
    COMPONENT_DELETED,
    DISPLAY_NOTIFICATION,
    OPEN_MODAL_DIALOG,
];
