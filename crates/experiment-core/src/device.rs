//! Device visibility for the downstream numeric runtime

use tracing::info;

use crate::config::ToolConfig;

/// Restrict visible accelerator devices, e.g. `set_gpu(&config, "0,1")`
pub fn set_gpu(config: &ToolConfig, devices: &str) {
    info!(var = %config.device_env_var, devices, "Setting visible devices");
    std::env::set_var(&config.device_env_var, devices);
}
