// Install-state sidecar files marking an environment as fully materialized
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::filesystem::FileSystem;

pub const STATE_FILE_V1: &str = ".install_state_v1";
pub const STATE_FILE_V2: &str = ".install_state_v2";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallState {
    pub additional_dependencies: Vec<String>,
}

/// serde_json formatter reproducing Python's `json.dumps` defaults:
/// `", "` between items, `": "` after keys and `\uXXXX` for non-ASCII.
#[derive(Debug, Default, Clone, Copy)]
pub struct PythonJsonFormatter;

impl serde_json::ser::Formatter for PythonJsonFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        for ch in fragment.chars() {
            // Printable ASCII passes through; DEL and everything above becomes \uXXXX
            if (ch as u32) < 0x7f {
                writer.write_all(&[ch as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}

/// Serialize `value` the way Python's `json.dumps` would
pub fn to_python_json<T: Serialize>(value: &T) -> Result<String> {
    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, PythonJsonFormatter);
    value.serialize(&mut serializer)?;
    // Formatter output is ASCII-only
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Mark `env_path` ready: `.install_state_v1` first, then the empty `.install_state_v2`
pub fn write(env_path: &Path, additional_dependencies: &[String]) -> Result<()> {
    let state = InstallState {
        additional_dependencies: additional_dependencies.to_vec(),
    };
    let json = to_python_json(&state)?;

    FileSystem::write_private(&env_path.join(STATE_FILE_V1), json.as_bytes())?;
    FileSystem::write_private(&env_path.join(STATE_FILE_V2), b"")?;

    debug!(env_path = %env_path.display(), "Wrote install state");
    Ok(())
}

/// True iff both state files exist
pub fn is_ready(env_path: &Path) -> bool {
    env_path.join(STATE_FILE_V1).is_file() && env_path.join(STATE_FILE_V2).is_file()
}

/// Dependency list recorded in `.install_state_v1`; `None` when the file is absent
pub fn read(env_path: &Path) -> Result<Option<Vec<String>>> {
    let path = env_path.join(STATE_FILE_V1);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let state: InstallState = serde_json::from_str(&contents)?;
    Ok(Some(state.additional_dependencies))
}
