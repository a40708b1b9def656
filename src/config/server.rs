use serde::Deserialize;

/// Configuration for the HTTP API server.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address and port for the HTTP server to listen on.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Bearer token securing the non-ingestion API endpoints.
    /// Falls back to the `PULSE_API_KEY` env var when not set in config.
    #[serde(rename = "api_key", default = "default_api_key_from_env")]
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            api_key: default_api_key_from_env(),
        }
    }
}

fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_api_key_from_env() -> Option<String> {
    std::env::var("PULSE_API_KEY").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_listen_address_applies() {
        let config = config::Config::builder()
            .add_source(config::File::from_str("", config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize::<ServerConfig>()
            .unwrap();
        assert_eq!(config.listen_address, default_listen_address());
    }

    #[test]
    fn custom_listen_address_wins() {
        let yaml = r#"
          listen_address: "127.0.0.1:3333"
        "#;
        let config = config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize::<ServerConfig>()
            .unwrap();
        assert_eq!(config.listen_address, "127.0.0.1:3333");
    }
}
