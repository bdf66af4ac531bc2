use anyhow::{Context, Result, bail};
use log::debug;
use snipsmith_engine::{EvalContext, Evaluator, FragmentKind};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Runs shell fragments through an external interpreter.
///
/// The fragment is written to a temporary script file. A leading `#!` line
/// picks the interpreter, otherwise the configured shell runs it. Program and
/// script fragments need an embedded interpreter this host does not have.
pub struct ShellEvaluator {
    shell: PathBuf,
}

impl ShellEvaluator {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    fn run_shell(&self, code: &str) -> Result<String> {
        let mut script = tempfile::NamedTempFile::new().context("Failed to create script file")?;
        script.write_all(code.as_bytes())?;
        script.flush()?;

        let (program, args) = self.interpreter(code);
        debug!("running shell fragment with {}", program.display());

        let output = Command::new(program)
            .args(args)
            .arg(script.path())
            .output()
            .with_context(|| format!("Failed to run {}", program.display()))?;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn interpreter<'a>(&'a self, code: &'a str) -> (&'a Path, Vec<&'a str>) {
        if let Some(shebang) = code.strip_prefix("#!")
            && let Some(first_line) = shebang.lines().next()
        {
            let mut words = first_line.split_whitespace();
            if let Some(program) = words.next() {
                return (Path::new(program), words.collect());
            }
        }
        (self.shell.as_path(), Vec::new())
    }
}

impl Evaluator for ShellEvaluator {
    fn evaluate(
        &mut self,
        kind: FragmentKind,
        code: &str,
        _ctx: &mut EvalContext<'_>,
    ) -> Result<String> {
        match kind {
            FragmentKind::Shell => self.run_shell(code),
            FragmentKind::Script | FragmentKind::Program => {
                bail!("no {kind} interpreter is available in snipsmith-cli")
            }
        }
    }
}
