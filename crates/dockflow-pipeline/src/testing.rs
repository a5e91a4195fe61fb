//! Test doubles: a command runner that imitates the docking tools and an
//! in-memory artifact store.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tokio::fs;

use dockflow_common::{DockflowError, Result};
use dockflow_config::ToolsConfig;

use crate::process::{CommandOutput, CommandRunner, CommandSpec, ExitPolicy};
use crate::storage::{ArtifactStore, StoreError};

pub const LIGAND_REF: &str = "inputs/ligand.smi";
pub const RECEPTOR_REF: &str = "inputs/receptor.pdb";
pub const BOX_REF: &str = "inputs/box.pdb";

pub const CRYST1_LINE: &str =
    "CRYST1   58.400   58.400  151.300  90.00  90.00 120.00 P 61 2 2    12";

pub const RECEPTOR_PDB: &str = "HEADER    TRANSFERASE\n\
CRYST1   58.400   58.400  151.300  90.00  90.00 120.00 P 61 2 2    12\n\
ATOM      1  N   MET A   1      11.104   6.134  -6.504  1.00  0.00           N\n\
HETATM    2  O   HOH A 101       1.000   1.000   1.000  1.00  0.00           O\n\
END\n";

pub const VINA_OUTPUT: &str = "MODEL 1\nREMARK VINA RESULT:    -7.5      0.000      0.000\nENDMDL\n";

/// Tools config whose commands run without a launcher, as the scripted runner expects.
pub fn scripted_tools() -> ToolsConfig {
    ToolsConfig {
        launcher: String::new(),
        ..ToolsConfig::default()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── Scripted runner ───────────────────────────────────────────────────────────

/// Records every command and writes the files the real tool would write.
#[derive(Default)]
pub struct ScriptedRunner {
    commands: Mutex<Vec<CommandSpec>>,
    failing: HashSet<String>,
    silent: HashSet<String>,
    vina_output: Option<String>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `program` exit non-zero.
    pub fn fail_on(mut self, program: &str) -> Self {
        self.failing.insert(program.to_string());
        self
    }

    /// Make `program` succeed without writing its outputs.
    pub fn skip_output(mut self, program: &str) -> Self {
        self.silent.insert(program.to_string());
        self
    }

    pub fn with_vina_output(mut self, text: &str) -> Self {
        self.vina_output = Some(text.to_string());
        self
    }

    pub fn commands(&self) -> Vec<CommandSpec> {
        lock(&self.commands).clone()
    }

    /// First recorded command whose program is `program`.
    pub fn command_for(&self, program: &str) -> Option<CommandSpec> {
        lock(&self.commands).iter().find(|c| c.program == program).cloned()
    }

    pub fn programs(&self) -> Vec<String> {
        lock(&self.commands).iter().map(|c| c.program.clone()).collect()
    }

    async fn simulate(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let out = |flag: &str| -> Result<PathBuf> {
            spec.flag_value(flag)
                .map(PathBuf::from)
                .ok_or_else(|| DockflowError::InvalidParameter(format!("{} called without {}", spec.program, flag)))
        };

        match spec.program.as_str() {
            "scrub.py" => write(&out("-o")?, "protomers\n$$$$\n").await?,
            "mk_prepare_ligand.py" => {
                write(&out("--multimol_outdir")?.join("_i0.pdbqt"), "REMARK ligand\n").await?
            }
            "python3" if spec.args.first().map(String::as_str) == Some("-c") => {
                let dest = spec.args.get(3).map(PathBuf::from).unwrap_or_default();
                write(&dest, "ATOM      1  N   MET A   1\nEND\n").await?
            }
            "python3" => {
                // reduce2 writes <input stem>FH.pdb into its working directory
                let input = spec.args.get(1).map(PathBuf::from).unwrap_or_default();
                let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("receptor");
                let cwd = spec.working_dir.clone().unwrap_or_default();
                write(&cwd.join(format!("{}FH.pdb", stem)), "ATOM      1  H   MET A   1\nEND\n").await?
            }
            "grep" => return grep(spec).await,
            "mk_prepare_receptor.py" => {
                let prefix = out("-o")?.to_string_lossy().into_owned();
                write(Path::new(&format!("{}.pdbqt", prefix)), "ATOM receptor\n").await?;
                write(Path::new(&format!("{}.box.txt", prefix)), "center_x = 0.0\nsize_x = 20.0\n").await?;
            }
            "vina" => {
                write(&out("--out")?, self.vina_output.as_deref().unwrap_or(VINA_OUTPUT)).await?
            }
            "mk_export.py" => write(&out("-s")?, "pose\n$$$$\n").await?,
            _ => {
                return Err(DockflowError::StageExecution {
                    command: spec.display(),
                    exit_code: None,
                    stderr: format!("{}: command not found", spec.program),
                })
            }
        }
        Ok(CommandOutput { exit_code: Some(0), ..CommandOutput::default() })
    }
}

async fn write(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, contents).await?;
    Ok(())
}

async fn grep(spec: &CommandSpec) -> Result<CommandOutput> {
    let pattern = spec.args.first().cloned().unwrap_or_default();
    let file = spec.args.get(1).map(PathBuf::from).unwrap_or_default();
    let text = fs::read_to_string(&file).await.unwrap_or_default();
    let stdout: String = text
        .lines()
        .filter(|l| l.contains(&pattern))
        .map(|l| format!("{}\n", l))
        .collect();
    let exit_code = if stdout.is_empty() { 1 } else { 0 };
    if exit_code != 0 && spec.exit_policy == ExitPolicy::Strict {
        return Err(DockflowError::StageExecution {
            command: spec.display(),
            exit_code: Some(exit_code),
            stderr: String::new(),
        });
    }
    Ok(CommandOutput { stdout, stderr: String::new(), exit_code: Some(exit_code) })
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        lock(&self.commands).push(spec.clone());

        if self.failing.contains(&spec.program) {
            return Err(DockflowError::StageExecution {
                command: spec.display(),
                exit_code: Some(1),
                stderr: format!("{} failed", spec.program),
            });
        }
        if self.silent.contains(&spec.program) {
            return Ok(CommandOutput { exit_code: Some(0), ..CommandOutput::default() });
        }
        self.simulate(spec).await
    }
}

// ── Memory store ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    uploaded: Mutex<Vec<String>>,
    rejected_suffixes: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with a ligand, receptor and box under the `*_REF` keys.
    pub fn with_inputs() -> Self {
        Self::new()
            .with_object(LIGAND_REF, b"CC(=O)Nc1ccc(O)cc1\n")
            .with_object(RECEPTOR_REF, RECEPTOR_PDB.as_bytes())
            .with_object(BOX_REF, b"HETATM    1  C1  LIG A 900       0.000   0.000   0.000\n")
    }

    pub fn with_object(self, key: &str, bytes: &[u8]) -> Self {
        lock(&self.objects).insert(key.trim_start_matches('/').to_string(), bytes.to_vec());
        self
    }

    /// Reject uploads whose key ends with `suffix`.
    pub fn reject_suffix(mut self, suffix: &str) -> Self {
        self.rejected_suffixes.push(suffix.to_string());
        self
    }

    /// Keys successfully uploaded, in upload order.
    pub fn uploaded_keys(&self) -> Vec<String> {
        lock(&self.uploaded).clone()
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        lock(&self.objects).get(key).cloned()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn download(&self, reference: &str, dest: &Path) -> std::result::Result<(), StoreError> {
        let key = reference.trim_start_matches('/');
        let bytes = self
            .object(key)
            .ok_or_else(|| StoreError::NotFound(reference.to_string()))?;
        fs::write(dest, bytes).await?;
        Ok(())
    }

    async fn upload(&self, local: &Path, key: &str) -> std::result::Result<(), StoreError> {
        if self.rejected_suffixes.iter().any(|s| key.ends_with(s.as_str())) {
            return Err(StoreError::Rejected { key: key.to_string(), status: 503 });
        }
        let bytes = fs::read(local).await?;
        lock(&self.objects).insert(key.to_string(), bytes);
        lock(&self.uploaded).push(key.to_string());
        Ok(())
    }
}
