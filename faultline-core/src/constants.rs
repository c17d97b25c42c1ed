use std::sync::LazyLock;

use crate::protocol::ClientSdkInfo;

/// The version of this SDK.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The user agent the SDK reports to the relay.
pub static USER_AGENT: LazyLock<String> = LazyLock::new(|| format!("faultline.rust/{VERSION}"));

/// The default SDK info attached to every event.
pub static SDK_INFO: LazyLock<ClientSdkInfo> = LazyLock::new(|| ClientSdkInfo {
    name: "faultline.rust".into(),
    version: VERSION.into(),
    integrations: Vec::new(),
});
