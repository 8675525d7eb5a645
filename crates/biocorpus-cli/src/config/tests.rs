#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let cfg = Config::parse("").unwrap();
        assert_eq!(cfg.paths.metadata, PathBuf::from("data/lung_metadata.json"));
        assert_eq!(cfg.embedding.backend, EmbeddingBackend::Local);
        assert_eq!(cfg.embedding.batch_size, 32);
        assert_eq!(cfg.web.timeout_secs, 10);
        assert_eq!(cfg.web.keywords, vec!["lung cancer", "screening", "web"]);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let cfg = Config::parse(
            r#"
            [paths]
            index = "/srv/corpus.index"

            [embedding]
            backend = "ollama"
            model = "nomic-embed-text"
            dim = 768

            [web]
            urls = ["https://www.cancer.gov/types/lung/research/nlst"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.paths.index, PathBuf::from("/srv/corpus.index"));
        assert_eq!(cfg.paths.backup, default_backup());
        assert_eq!(cfg.embedding.backend, EmbeddingBackend::Ollama);
        assert_eq!(cfg.embedding.timeout_secs, 120);
        assert_eq!(cfg.web.urls.len(), 1);
        assert_eq!(cfg.web.year, "2025");
    }

    #[test]
    fn test_client_config_uses_configured_key() {
        let section = EmbeddingSection {
            backend: EmbeddingBackend::OpenAi,
            api_key: Some("sk-test".to_string()),
            batch_size: 0,
            ..Default::default()
        };
        let client = section.to_client_config();
        assert_eq!(client.api_key.as_deref(), Some("sk-test"));
        assert_eq!(client.batch_size, 1);
    }

    #[test]
    fn test_web_defaults_follow_section() {
        let web = WebSection { year: "2024".to_string(), max_paragraphs: 3, ..Default::default() };
        let defaults = web.defaults();
        assert_eq!(defaults.year, "2024");
        assert_eq!(defaults.max_paragraphs, 3);
        assert_eq!(web.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        assert!(Config::parse("[embedding]\nbackend = \"gemini\"").is_err());
    }

    #[test]
    fn test_explicit_missing_file_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(Config::load_from(&dir.path().join("absent.toml")).is_err());

        let path = dir.path().join("biocorpus.toml");
        std::fs::write(&path, "[web]\nmax_paragraphs = 4\n").unwrap();
        assert_eq!(Config::load_from(&path).unwrap().web.max_paragraphs, 4);
    }
}
