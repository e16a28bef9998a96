//! 解码配置.
//!
//! 从 JSON 加载日志与 slice 解码选项:
//!
//! ```json
//! {
//!     "logging": { "level": "debug", "directory": "logs" },
//!     "decoder": { "check_trailing_bytes": true, "debug_ctu": 42 }
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use vslice_codec::SliceDecoderOptions;

pub use crate::logging::LoggingConfig;

/// slice 解码选项
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DecoderSection {
    /// 在子流与 slice 末尾检查剩余字节
    #[serde(default = "default_true")]
    pub check_trailing_bytes: bool,
    /// 在该 CTU 地址处停止解码 (调试用)
    #[serde(default)]
    pub debug_ctu: Option<u32>,
}

impl Default for DecoderSection {
    fn default() -> Self {
        Self {
            check_trailing_bytes: true,
            debug_ctu: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// 顶层配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DecoderConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub decoder: DecoderSection,
}

impl DecoderConfig {
    /// 从 JSON 字符串解析
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("解析解码配置失败")
    }

    /// 从 JSON 文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败, path={}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("配置文件格式错误, path={}", path.display()))
    }

    /// 调试停止的 CTU 地址
    pub fn debug_ctu(&self) -> Option<u32> {
        self.decoder.debug_ctu
    }

    /// 转换为 slice 解码器选项
    pub fn slice_decoder_options(&self) -> SliceDecoderOptions {
        SliceDecoderOptions {
            check_trailing_bytes: self.decoder.check_trailing_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = DecoderConfig::from_json_str("{}").unwrap();
        assert_eq!(config, DecoderConfig::default());
        assert!(config.slice_decoder_options().check_trailing_bytes);
        assert_eq!(config.debug_ctu(), None);
    }

    #[test]
    fn test_parse_full_config() {
        let config = DecoderConfig::from_json_str(
            r#"{
                "logging": { "level": "debug", "directory": "logs", "file_prefix": "dec" },
                "decoder": { "check_trailing_bytes": false, "debug_ctu": 42 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.directory.as_deref(), Some("logs"));
        assert_eq!(config.logging.file_prefix, "dec");
        assert!(!config.slice_decoder_options().check_trailing_bytes);
        assert_eq!(config.debug_ctu(), Some(42));
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(DecoderConfig::from_json_str("{ \"decoder\": 1 }").is_err());
    }
}
