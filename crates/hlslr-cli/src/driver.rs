//! Batch generation: input discovery, staleness and the build loop.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use hlslr_core::{ReflectConfig, ReflectError};
use hlslr_lang::Bytecode;

/// A shader to process. `relative` is its path below the scanned root, or
/// just its file name when it was named directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub path: PathBuf,
    pub relative: PathBuf,
}

/// Expands files and directories into a sorted list of inputs.
///
/// Files named directly are taken regardless of extension.
pub fn collect_inputs(paths: &[PathBuf], extensions: &[String]) -> Result<Vec<Input>> {
    let mut inputs = Vec::new();
    for path in paths {
        if path.is_dir() {
            scan_dir(path, path, extensions, &mut inputs)?;
        } else if path.is_file() {
            let relative = path
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| path.clone());
            inputs.push(Input {
                path: path.clone(),
                relative,
            });
        } else {
            anyhow::bail!("input not found: {}", path.display());
        }
    }
    Ok(inputs)
}

fn scan_dir(root: &Path, dir: &Path, extensions: &[String], out: &mut Vec<Input>) -> Result<()> {
    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') || name == "target" {
                continue;
            }
            scan_dir(root, &path, extensions, out)?;
        } else if has_extension(&path, extensions) {
            let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            out.push(Input { path, relative });
        }
    }
    Ok(())
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
}

/// `<path>.<extension>`, keeping the original extension.
fn append_extension(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

pub fn output_path(input: &Input, out_dir: Option<&Path>, extension: &str) -> PathBuf {
    match out_dir {
        Some(dir) => append_extension(&dir.join(&input.relative), extension),
        None => append_extension(&input.path, extension),
    }
}

/// Compiled bytecode stored next to the shader, if there is one.
pub fn companion_path(input: &Input, config: &ReflectConfig) -> Option<PathBuf> {
    if !config.bytecode.enabled {
        return None;
    }
    let path = input.path.with_extension(&config.bytecode.extension);
    path.is_file().then_some(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    UpToDate,
    Stale,
}

impl Freshness {
    /// An output is up to date when it is at least as new as the input, every
    /// companion and the tool itself. Unreadable timestamps count as stale.
    pub fn check(input: &Path, output: &Path, companions: &[&Path], tool: Option<&Path>) -> Self {
        let Some(built) = modified(output) else {
            return Freshness::Stale;
        };
        let dependencies = std::iter::once(input)
            .chain(companions.iter().copied())
            .chain(tool);
        for dependency in dependencies {
            match modified(dependency) {
                Some(time) if time <= built => {}
                _ => return Freshness::Stale,
            }
        }
        Freshness::UpToDate
    }

    pub fn is_up_to_date(self) -> bool {
        self == Freshness::UpToDate
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub out_dir: Option<PathBuf>,
    pub force: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum Outcome {
    Generated(PathBuf),
    Skipped(PathBuf),
}

/// Headers and bytecode files already taken by an earlier input. Two shaders
/// writing the same header, or embedding the same bytecode, would silently
/// clobber each other.
#[derive(Default)]
struct Claims<'a> {
    outputs: HashMap<PathBuf, &'a Path>,
    companions: HashMap<PathBuf, &'a Path>,
}

impl<'a> Claims<'a> {
    /// Records `input`'s paths, failing if an earlier input holds either one.
    fn claim(&mut self, input: &'a Input, output: &Path, companion: Option<&Path>) -> Result<()> {
        if let Some(first) = self.outputs.get(output) {
            anyhow::bail!(
                "{} is also generated from {}",
                output.display(),
                first.display()
            );
        }
        if let Some(companion) = companion {
            if let Some(first) = self.companions.get(companion) {
                anyhow::bail!(
                    "bytecode {} is already embedded for {}",
                    companion.display(),
                    first.display()
                );
            }
        }
        self.outputs.insert(output.to_path_buf(), &input.path);
        if let Some(companion) = companion {
            self.companions.insert(companion.to_path_buf(), &input.path);
        }
        Ok(())
    }
}

/// Generates a header for every input. Failures are logged and counted; the
/// loop keeps going and reports them at the end.
pub fn build(paths: &[PathBuf], options: &BuildOptions, config: &ReflectConfig) -> Result<BuildSummary> {
    let inputs = collect_inputs(paths, &config.scan.extensions)?;
    let tool = std::env::current_exe().ok();
    let mut summary = BuildSummary::default();
    let mut claims = Claims::default();

    for input in &inputs {
        let output = output_path(input, options.out_dir.as_deref(), &config.output.extension);
        let companion = companion_path(input, config);
        let result = claims
            .claim(input, &output, companion.as_deref())
            .and_then(|()| build_one(input, output, companion, options, config, tool.as_deref()));
        match result {
            Ok(Outcome::Generated(output)) => {
                tracing::info!("generated {}", output.display());
                summary.generated += 1;
            }
            Ok(Outcome::Skipped(output)) => {
                tracing::debug!("{} is up to date", output.display());
                summary.skipped += 1;
            }
            Err(err) => {
                tracing::error!("{}: {:#}", input.path.display(), err);
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        generated = summary.generated,
        skipped = summary.skipped,
        failed = summary.failed,
        "processed {} shader(s)",
        inputs.len()
    );
    if summary.failed > 0 {
        anyhow::bail!("{} of {} shader(s) failed", summary.failed, inputs.len());
    }
    Ok(summary)
}

fn build_one(
    input: &Input,
    output: PathBuf,
    companion: Option<PathBuf>,
    options: &BuildOptions,
    config: &ReflectConfig,
    tool: Option<&Path>,
) -> Result<Outcome> {
    let companions: Vec<&Path> = companion.iter().map(PathBuf::as_path).collect();

    if !options.force && Freshness::check(&input.path, &output, &companions, tool).is_up_to_date() {
        return Ok(Outcome::Skipped(output));
    }

    let source = std::fs::read_to_string(&input.path)
        .map_err(|e| ReflectError::io("cannot read shader", &input.path, e))?;
    let bytecode = match &companion {
        Some(path) => {
            let bytes = std::fs::read(path)
                .map_err(|e| ReflectError::io("cannot read bytecode", path, e))?;
            Some(Bytecode::new(bytes))
        }
        None => None,
    };

    let file = input.path.display().to_string();
    let header = hlslr_lang::reflect(&source, &file, bytecode.as_ref(), &config.emit)?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory: {}", parent.display()))?;
    }
    std::fs::write(&output, header)
        .with_context(|| format!("failed to write header: {}", output.display()))?;
    Ok(Outcome::Generated(output))
}
