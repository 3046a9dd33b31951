//! In-place editing of the persisted consent flag.

use std::path::Path;

use anyhow::{Context, Result};
use toml_edit::DocumentMut;

/// Set `[consent] accepted` in the config file at `path`.
///
/// The rest of the file, comments included, is left as written. A missing
/// file is created.
pub fn set_consent(path: &Path, accepted: bool) -> Result<()> {
    let content = if path.exists() {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?
    } else {
        String::new()
    };

    let updated = with_consent(&content, accepted)
        .with_context(|| format!("failed to parse config: {}", path.display()))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, updated)
        .with_context(|| format!("failed to write config: {}", path.display()))?;
    tracing::info!(
        "consent {} in {}",
        if accepted { "accepted" } else { "revoked" },
        path.display()
    );
    Ok(())
}

fn with_consent(content: &str, accepted: bool) -> Result<String> {
    let mut doc = content.parse::<DocumentMut>()?;
    let has_table = doc.get("consent").is_some_and(|item| item.is_table_like());
    if !has_table {
        doc["consent"] = toml_edit::table();
    }
    doc["consent"]["accepted"] = toml_edit::value(accepted);
    Ok(doc.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from;

    #[test]
    fn preserves_comments_and_other_keys() {
        let original = "# practice settings\nseed = 9\n\n[consent]\n# set by the CLI\naccepted = false\n\n[devices]\nspeech = \"silent\"\n";
        let updated = with_consent(original, true).unwrap();
        assert!(updated.contains("# practice settings"));
        assert!(updated.contains("# set by the CLI"));
        assert!(updated.contains("accepted = true"));
        assert!(updated.contains("speech = \"silent\""));
    }

    #[test]
    fn adds_missing_table() {
        let updated = with_consent("seed = 1\n", true).unwrap();
        assert!(updated.contains("[consent]"));
        assert!(updated.contains("accepted = true"));
    }

    #[test]
    fn replaces_non_table_value() {
        let updated = with_consent("consent = \"yes\"\n", false).unwrap();
        let parsed: toml::Value = toml::from_str(&updated).unwrap();
        assert_eq!(parsed["consent"]["accepted"].as_bool(), Some(false));
    }

    #[test]
    fn round_trips_through_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bandscore.toml");

        set_consent(&path, true).unwrap();
        assert!(load_config_from(Some(&path)).unwrap().consent.accepted);

        set_consent(&path, false).unwrap();
        assert!(!load_config_from(Some(&path)).unwrap().consent.accepted);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bandscore.toml");
        std::fs::write(&path, "[consent\n").unwrap();
        assert!(set_consent(&path, true).is_err());
        // the broken file is left alone
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[consent\n");
    }
}
