use crate::session::{AuthSession, SCHEMA_VERSION};
use crate::storage::write_atomic;
use std::fs;
use std::io;
use std::path::Path;

fn read_session_file(path: &Path) -> Result<AuthSession, String> {
    let data = fs::read(path).map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    let session: AuthSession = serde_json::from_slice(&data)
        .map_err(|err| format!("failed to parse {}: {err}", path.display()))?;

    if session.schema_version != SCHEMA_VERSION {
        return Err(format!(
            "unknown schema_version in {}: {}",
            path.display(),
            session.schema_version
        ));
    }
    if session.token.trim().is_empty() {
        return Err(format!("session in {} has an empty token", path.display()));
    }
    Ok(session)
}

pub fn save(path: &Path, session: &AuthSession) -> io::Result<()> {
    write_atomic(path, session)
}

pub fn load(path: &Path) -> (Option<AuthSession>, Option<String>) {
    if !path.exists() {
        return (None, None);
    }

    match read_session_file(path) {
        Ok(session) => (Some(session), None),
        Err(err) => (None, Some(err)),
    }
}

pub fn clear(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}
