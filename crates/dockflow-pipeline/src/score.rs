//! Docking score extraction from Vina result headers.

use std::path::Path;
use tokio::fs;
use tracing::warn;

/// Returned when no score can be read.
pub const DEFAULT_SCORE: f64 = 0.0;

const VINA_RESULT_TAG: &str = "REMARK VINA RESULT:";

/// Affinity of the first `REMARK VINA RESULT:` line, i.e. the top-ranked pose.
pub fn parse_vina_score(text: &str) -> Option<f64> {
    text.lines()
        .find_map(|line| line.trim_start().strip_prefix(VINA_RESULT_TAG))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|field| field.parse::<f64>().ok())
}

/// Best-effort score lookup: logs and returns [`DEFAULT_SCORE`] on any problem.
pub async fn extract_score(path: &Path) -> f64 {
    match fs::read_to_string(path).await {
        Ok(text) => parse_vina_score(&text).unwrap_or_else(|| {
            warn!("No VINA RESULT score in {:?}; using {}", path, DEFAULT_SCORE);
            DEFAULT_SCORE
        }),
        Err(e) => {
            warn!("Could not read {:?} for score extraction: {}; using {}", path, e, DEFAULT_SCORE);
            DEFAULT_SCORE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const POSES: &str = "MODEL 1\n\
        REMARK VINA RESULT:    -7.5      0.000      0.000\n\
        REMARK INTER + INTRA:  -9.1\n\
        ENDMDL\n\
        MODEL 2\n\
        REMARK VINA RESULT:    -6.9      1.802      2.411\n\
        ENDMDL\n";

    #[test]
    fn test_parse_first_result_line() {
        assert_eq!(parse_vina_score("REMARK VINA RESULT: -7.5 0.0 0.0"), Some(-7.5));
        assert_eq!(parse_vina_score(POSES), Some(-7.5));
    }

    #[test]
    fn test_parse_without_result_line() {
        assert_eq!(parse_vina_score("MODEL 1\nENDMDL\n"), None);
        assert_eq!(parse_vina_score("REMARK VINA RESULT: n/a"), None);
    }

    #[tokio::test]
    async fn test_extract_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("docking.pdbqt");
        std::fs::write(&path, POSES).unwrap();
        assert_eq!(extract_score(&path).await, -7.5);
    }

    #[tokio::test]
    async fn test_extract_defaults_when_line_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("docking.pdbqt");
        std::fs::write(&path, "MODEL 1\nENDMDL\n").unwrap();
        assert_eq!(extract_score(&path).await, 0.0);
    }

    #[tokio::test]
    async fn test_extract_defaults_when_file_unreadable() {
        let dir = tempdir().unwrap();
        assert_eq!(extract_score(&dir.path().join("absent.pdbqt")).await, 0.0);
    }
}
