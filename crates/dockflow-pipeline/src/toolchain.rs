//! Builds command specs for the docking tools from the `[tools]` config section.

use dockflow_config::ToolsConfig;

use crate::process::CommandSpec;

/// Tool environment a command runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolEnv {
    Standard,
    /// Environment carrying the covalent-capable ligand preparation and Vina builds.
    Reactive,
}

#[derive(Debug, Clone)]
pub struct Toolchain {
    tools: ToolsConfig,
}

impl Toolchain {
    pub fn new(tools: ToolsConfig) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &ToolsConfig {
        &self.tools
    }

    /// Command for `program` inside the given tool environment.
    ///
    /// With a launcher configured this is `<launcher> run -n <env> <program>`,
    /// otherwise the program is invoked directly.
    pub fn command(&self, env: ToolEnv, program: &str) -> CommandSpec {
        let env_name = match env {
            ToolEnv::Standard => &self.tools.environment,
            ToolEnv::Reactive => &self.tools.reactive_environment,
        };

        let spec = if self.tools.launcher.is_empty() {
            CommandSpec::new(program)
        } else {
            CommandSpec::new(&self.tools.launcher)
                .args(["run", "-n"])
                .arg(env_name.as_str())
                .arg(program)
        };
        spec.timeout(self.tools.timeout())
    }

    /// Command for a host utility that does not live in a tool environment.
    pub fn host_command(&self, program: &str) -> CommandSpec {
        CommandSpec::new(program).timeout(self.tools.timeout())
    }
}
