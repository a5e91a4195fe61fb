//! Configuration loading for dockflow.
//! Reads dockflow.toml from the current directory or the path in the DOCKFLOW_CONFIG env var.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV_VAR: &str = "DOCKFLOW_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "dockflow.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

fn default_bind() -> String { "0.0.0.0:8080".to_string() }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Parent directory of the per-job scratch directories.
    #[serde(default = "default_scratch_root")]
    pub scratch_root: PathBuf,
    /// Leave a job's scratch directory behind after it finishes.
    #[serde(default)]
    pub keep_scratch: bool,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            scratch_root: default_scratch_root(),
            keep_scratch: false,
        }
    }
}

fn default_scratch_root() -> PathBuf { std::env::temp_dir().join("dockflow") }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Environment launcher (`micromamba run -n <env> ...`). Empty runs tools directly.
    #[serde(default = "default_launcher")]
    pub launcher: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Environment used for reactive ligand preparation and docking.
    #[serde(default = "default_reactive_environment")]
    pub reactive_environment: String,
    #[serde(default = "default_python")]
    pub python: String,
    #[serde(default = "default_scrub")]
    pub scrub: String,
    #[serde(default = "default_prepare_ligand")]
    pub prepare_ligand: String,
    #[serde(default = "default_prepare_receptor")]
    pub prepare_receptor: String,
    #[serde(default = "default_export_pose")]
    pub export_pose: String,
    #[serde(default = "default_vina")]
    pub vina: String,
    #[serde(default = "default_grep")]
    pub grep: String,
    #[serde(default = "default_reduce2_script")]
    pub reduce2_script: PathBuf,
    #[serde(default = "default_reduce2_options")]
    pub reduce2_options: Vec<String>,
    /// Monomer library exported as MMTBX_CCP4_MONOMER_LIB during hydrogenation.
    #[serde(default = "default_monomer_library")]
    pub monomer_library: PathBuf,
    /// ProDy selection applied when extracting receptor atoms.
    #[serde(default = "default_atom_selection")]
    pub atom_selection: String,
    /// Upper bound for a single tool invocation. 0 disables the bound.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            launcher: default_launcher(),
            environment: default_environment(),
            reactive_environment: default_reactive_environment(),
            python: default_python(),
            scrub: default_scrub(),
            prepare_ligand: default_prepare_ligand(),
            prepare_receptor: default_prepare_receptor(),
            export_pose: default_export_pose(),
            vina: default_vina(),
            grep: default_grep(),
            reduce2_script: default_reduce2_script(),
            reduce2_options: default_reduce2_options(),
            monomer_library: default_monomer_library(),
            atom_selection: default_atom_selection(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ToolsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

fn default_launcher()             -> String { "micromamba".to_string() }
fn default_environment()          -> String { "adapter_autodock_env".to_string() }
fn default_reactive_environment() -> String { "dwa_env".to_string() }
fn default_python()               -> String { "python3".to_string() }
fn default_scrub()                -> String { "scrub.py".to_string() }
fn default_prepare_ligand()       -> String { "mk_prepare_ligand.py".to_string() }
fn default_prepare_receptor()     -> String { "mk_prepare_receptor.py".to_string() }
fn default_export_pose()          -> String { "mk_export.py".to_string() }
fn default_vina()                 -> String { "vina".to_string() }
fn default_grep()                 -> String { "grep".to_string() }
fn default_reduce2_script() -> PathBuf {
    PathBuf::from("/opt/conda/envs/adapter_autodock_env/lib/python3.11/site-packages/mmtbx/command_line/reduce2.py")
}
fn default_reduce2_options() -> Vec<String> {
    vec!["approach=add".to_string(), "add_flip_movers=True".to_string()]
}
fn default_monomer_library()      -> PathBuf { PathBuf::from("geostd") }
fn default_atom_selection()       -> String { "chain A and not water and not hetero".to_string() }
fn default_timeout_secs()         -> u64 { 1800 }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Directory on the local filesystem acting as the bucket.
    #[default]
    Local,
    /// Plain HTTP object endpoint (GET to download, PUT to upload).
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    pub base_url: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            root: default_storage_root(),
            base_url: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_storage_root()    -> PathBuf { PathBuf::from("./bucket") }
fn default_request_timeout() -> u64 { 60 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Destination prefix for basic jobs that do not name one.
    #[serde(default = "default_output_dir")]
    pub default_output_dir: String,
    /// Margin (Å) added around the enveloping docking box.
    #[serde(default = "default_box_padding")]
    pub box_padding: f64,
    #[serde(default = "default_ph_low")]
    pub ph_low: f64,
    #[serde(default = "default_ph_high")]
    pub ph_high: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_output_dir: default_output_dir(),
            box_padding: default_box_padding(),
            ph_low: default_ph_low(),
            ph_high: default_ph_high(),
        }
    }
}

fn default_output_dir()  -> String { "adapter_autodock/basic_docking/".to_string() }
fn default_box_padding() -> f64 { 5.0 }
fn default_ph_low()      -> f64 { 5.0 }
fn default_ph_high()     -> f64 { 9.0 }

mod tests;

impl Config {
    /// Load configuration from dockflow.toml.
    /// Checks DOCKFLOW_CONFIG first; an explicitly named file must exist,
    /// a missing default file falls back to built-in defaults.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) => Self::from_path(&path),
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_path(DEFAULT_CONFIG_FILE),
            Err(_) => {
                tracing::warn!(
                    "No {} found and {} not set; using built-in defaults",
                    DEFAULT_CONFIG_FILE,
                    CONFIG_ENV_VAR
                );
                Ok(Self::default())
            }
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!(
                "Config file not found: {}\n\
                 Copy dockflow.example.toml to dockflow.toml and edit it.",
                path.display()
            );
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.storage.backend == StorageBackend::Http && self.storage.base_url.is_none() {
            anyhow::bail!("storage.base_url is required when storage.backend = \"http\"");
        }
        if self.pipeline.ph_low > self.pipeline.ph_high {
            anyhow::bail!(
                "pipeline.ph_low ({}) must not exceed pipeline.ph_high ({})",
                self.pipeline.ph_low,
                self.pipeline.ph_high
            );
        }
        if self.pipeline.box_padding < 0.0 {
            anyhow::bail!("pipeline.box_padding must be non-negative");
        }
        Ok(())
    }
}
