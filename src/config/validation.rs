use crate::config::types::{Config, CrawlerConfig, HttpConfig, OutputConfig, SiteConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_http_config(&config.http)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the site endpoints
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    for (name, path) in [
        ("listing-path", &config.listing_path),
        ("phone-path", &config.phone_path),
    ] {
        if !path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "{} must start with '/', got '{}'",
                name, path
            )));
        }
    }

    Ok(())
}

/// Validates crawler limits
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1".to_string(),
        ));
    }

    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(
            "request-timeout must be >= 1 second".to_string(),
        ));
    }

    if config.empty_page_threshold < 1 {
        return Err(ConfigError::Validation(
            "empty-page-threshold must be >= 1".to_string(),
        ));
    }

    if config.flush_interval < 1 {
        return Err(ConfigError::Validation(
            "flush-interval must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output paths
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    let paths = [
        ("checkpoint-path", &config.checkpoint_path),
        ("intermediate-path", &config.intermediate_path),
        ("json-path", &config.json_path),
        ("csv-path", &config.csv_path),
        ("partial-json-path", &config.partial_json_path),
        ("partial-csv-path", &config.partial_csv_path),
    ];

    for (name, path) in paths {
        if path.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    // Partial results must never overwrite a completed run's output
    if config.partial_json_path == config.json_path || config.partial_csv_path == config.csv_path {
        return Err(ConfigError::Validation(
            "partial output paths must differ from the final output paths".to_string(),
        ));
    }

    if config.checkpoint_path == config.intermediate_path {
        return Err(ConfigError::Validation(
            "checkpoint-path and intermediate-path must differ".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config {
            site: SiteConfig {
                base_url: "https://ustasi.az".to_string(),
                listing_path: "/homelist/".to_string(),
                phone_path: "/ajax.php".to_string(),
            },
            crawler: CrawlerConfig {
                max_pages: 100,
                max_concurrent_requests: 10,
                request_timeout: 30,
                page_delay: 200,
                task_delay: 100,
                empty_page_threshold: 10,
                flush_interval: 50,
            },
            http: HttpConfig::default(),
            output: OutputConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = create_valid_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = create_valid_config();
        config.site.base_url = "not a url".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_non_http_base_url() {
        let mut config = create_valid_config();
        config.site.base_url = "ftp://ustasi.az".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_relative_listing_path() {
        let mut config = create_valid_config();
        config.site.listing_path = "homelist/".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_max_pages() {
        let mut config = create_valid_config();
        config.crawler.max_pages = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_concurrency_bounds() {
        let mut config = create_valid_config();
        config.crawler.max_concurrent_requests = 0;
        assert!(validate(&config).is_err());

        config.crawler.max_concurrent_requests = 101;
        assert!(validate(&config).is_err());

        config.crawler.max_concurrent_requests = 100;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_flush_interval() {
        let mut config = create_valid_config();
        config.crawler.flush_interval = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_empty_page_threshold() {
        let mut config = create_valid_config();
        config.crawler.empty_page_threshold = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_delays_are_allowed() {
        let mut config = create_valid_config();
        config.crawler.page_delay = 0;
        config.crawler.task_delay = 0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_user_agent() {
        let mut config = create_valid_config();
        config.http.user_agent = "  ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_partial_path_collides_with_final() {
        let mut config = create_valid_config();
        config.output.partial_csv_path = config.output.csv_path.clone();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_checkpoint_path() {
        let mut config = create_valid_config();
        config.output.checkpoint_path = String::new();
        assert!(validate(&config).is_err());
    }
}
