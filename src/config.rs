use anyhow::{Context, Result};
use std::path::PathBuf;

const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Backend base URL, overridable via PURSUIT_API_URL.
pub fn base_url() -> String {
    std::env::var("PURSUIT_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

fn token_path() -> Result<PathBuf> {
    // Use XDG data directory or fallback
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "pursuit") {
        Ok(proj_dirs.data_dir().join("token"))
    } else {
        Ok(PathBuf::from(".pursuit-token"))
    }
}

/// Bearer token cached from the last `pursuit login`. The token itself is
/// opaque to us.
pub fn load_token() -> Result<Option<String>> {
    let path = token_path()?;
    match std::fs::read_to_string(&path) {
        Ok(token) => {
            let token = token.trim().to_string();
            Ok((!token.is_empty()).then_some(token))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read token from {}", path.display())),
    }
}

pub fn save_token(token: &str) -> Result<()> {
    let path = token_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, token)
        .with_context(|| format!("Failed to write token to {}", path.display()))?;
    Ok(())
}
