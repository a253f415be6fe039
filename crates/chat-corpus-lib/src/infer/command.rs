//! Local-program backend.
//!
//! Runs `command args...`, writes the prompt to stdin and reads the reply
//! from stdout. Works with anything that answers a prompt on stdin
//! (`ollama run <model>`, `llama-cli -f /dev/stdin`, small wrapper scripts).

use std::io::Write;
use std::process::{Command, Stdio};

use super::{GenerateError, Generator};

/// Generator backed by a local command.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn spawn_error(&self, source: std::io::Error) -> GenerateError {
        GenerateError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

impl Generator for CommandGenerator {
    fn name(&self) -> &str {
        &self.program
    }

    fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // The prompt is fed from a scoped thread while this one drains stdout
        // and stderr, so neither side can fill a pipe and block the other.
        // Dropping stdin at the end of the write closes it and the program
        // sees EOF. A program that exits without reading stdin is judged by
        // its exit status below.
        let stdin = child.stdin.take();
        let (output, written) = std::thread::scope(|scope| {
            let writer = stdin.map(|mut stdin| {
                scope.spawn(move || match stdin.write_all(prompt.as_bytes()) {
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
                    other => other,
                })
            });
            let output = child.wait_with_output();
            let written = match writer {
                Some(handle) => handle.join().unwrap_or_else(|_| {
                    Err(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        "stdin writer panicked",
                    ))
                }),
                None => Ok(()),
            };
            (output, written)
        });
        let output = output.map_err(|e| self.spawn_error(e))?;
        written.map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(GenerateError::ExitCode {
                program: self.program.clone(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
