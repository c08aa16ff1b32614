use crate::core::config::NoxisConfig;
use crate::core::tools::ToolProbe;
use crate::plugins::Plugin;
use crate::plugins::python::PythonPlugin;

/// Static plugin registry. Callers iterate whatever `load_all` returns and
/// must not assume a count or identity; this is the seam for dynamic
/// discovery later.
pub struct PluginManager {
    probe: ToolProbe,
    config: NoxisConfig,
}

impl PluginManager {
    pub fn new(config: &NoxisConfig) -> Self {
        Self {
            probe: ToolProbe::new(config.search_path.clone()),
            config: config.clone(),
        }
    }

    pub fn load_all(&self) -> Vec<Box<dyn Plugin>> {
        vec![Box::new(PythonPlugin::new(
            self.config.tools.clone(),
            self.probe.clone(),
        ))]
    }
}
