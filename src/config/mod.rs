use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 客户端配置
///
/// 客户端不持久化任何会话状态，配置之外的一切都只存活于进程内存中
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClientConfig {
    /// 服务端地址 (host:port)
    pub endpoint: String,
    /// 建立连接的超时时间（毫秒）
    pub connect_timeout_ms: u64,
    /// 单个请求的默认超时时间（毫秒），0 表示不限时
    pub request_timeout_ms: u64,
    /// 传输失败后的最大重连次数，0 表示不重连
    pub max_reconnect_attempts: u32,
    /// 重连退避的初始延迟（毫秒）
    pub reconnect_initial_delay_ms: u64,
    /// 重连退避的倍率
    pub reconnect_backoff_multiplier: f64,
    /// 重连退避的延迟上限（毫秒）
    pub reconnect_max_delay_ms: u64,
    /// 同一连接上允许的最大在途请求数
    pub max_in_flight_requests: usize,
    /// 请求服务端单批次返回的最大结果项数
    pub batch_size: u32,
    pub log: LogConfig,
}

/// 日志配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LogConfig {
    pub level: String,
    pub dir: String,
    pub file: String,
    pub max_file_size: u64,
    pub max_files: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:9758".to_string(),
            connect_timeout_ms: 5_000,
            request_timeout_ms: 30_000,
            max_reconnect_attempts: 3,
            reconnect_initial_delay_ms: 100,
            reconnect_backoff_multiplier: 2.0,
            reconnect_max_delay_ms: 5_000,
            max_in_flight_requests: 64,
            batch_size: 64,
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: "logs".to_string(),
            file: "graphdb-client".to_string(),
            max_file_size: 100 * 1024 * 1024, // 100MB
            max_files: 5,
        }
    }
}

impl ClientConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// 请求超时；配置为 0 时返回 `None` 表示不限时
    pub fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.request_timeout_ms))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, "127.0.0.1:9758");
        assert_eq!(config.max_in_flight_requests, 64);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_config_load_save() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temporary file");

        let config = ClientConfig::default();
        let toml_content =
            toml::to_string_pretty(&config).expect("Failed to serialize config to TOML");
        temp_file
            .write_all(toml_content.as_bytes())
            .expect("Failed to write TOML content to temporary file");

        let loaded_config =
            ClientConfig::load(temp_file.path()).expect("Failed to load config from temporary file");
        assert_eq!(config.endpoint, loaded_config.endpoint);
        assert_eq!(config.batch_size, loaded_config.batch_size);
    }

    #[test]
    fn test_zero_request_timeout_means_unlimited() {
        let mut config = ClientConfig::default();
        config.request_timeout_ms = 0;
        assert!(config.request_timeout().is_none());
    }
}
