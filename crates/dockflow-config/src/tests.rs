#[cfg(test)]
mod tests {
    use super::super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.tools.environment, "adapter_autodock_env");
        assert_eq!(config.tools.reactive_environment, "dwa_env");
        assert_eq!(config.pipeline.default_output_dir, "adapter_autodock/basic_docking/");
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert!(!config.workspace.keep_scratch);
    }

    #[test]
    fn test_default_selection_is_single_chain_without_solvent() {
        let selection = default_atom_selection();
        assert!(selection.contains("chain A"));
        assert!(selection.contains("not water"));
        assert!(selection.contains("not hetero"));
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [tools]
            launcher = ""
            vina = "/usr/local/bin/vina"
            timeout_secs = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.tools.launcher, "");
        assert_eq!(config.tools.vina, "/usr/local/bin/vina");
        assert_eq!(config.tools.scrub, "scrub.py");
        assert!(config.tools.timeout().is_none());
    }

    #[test]
    fn test_timeout_in_seconds() {
        let tools = ToolsConfig::default();
        assert_eq!(tools.timeout(), Some(Duration::from_secs(1800)));
    }

    #[test]
    fn test_http_backend_requires_base_url() {
        let err = Config::from_toml_str("[storage]\nbackend = \"http\"\n").unwrap_err();
        assert!(err.to_string().contains("base_url"));

        let config = Config::from_toml_str(
            "[storage]\nbackend = \"http\"\nbase_url = \"http://objects.local/bucket\"\n",
        )
        .unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Http);
    }

    #[test]
    fn test_inverted_ph_range_rejected() {
        let err = Config::from_toml_str("[pipeline]\nph_low = 9.0\nph_high = 5.0\n").unwrap_err();
        assert!(err.to_string().contains("ph_low"));
    }

    #[test]
    fn test_from_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbind = \"127.0.0.1:9000\"").unwrap();
        let config = Config::from_path(file.path()).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9000");
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = Config::from_path("/nonexistent/dockflow.toml").unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }
}
