//! 错误类型定义

use thiserror::Error;

/// Tweak 配置错误类型
#[derive(Error, Debug)]
pub enum TweaksError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置文件读取失败: {source}")]
    FileReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("JSON 解析失败: {source}")]
    JsonError {
        #[from]
        source: serde_json::Error,
    },

    #[error("Tweak 定义无效: {feature}.{variable}, 原因: {message}")]
    InvalidDefinition {
        feature: String,
        variable: String,
        message: String,
    },

    #[error("配置文档结构无效: {message}")]
    InvalidDocument { message: String },

    #[error("配置持久化失败: {path}, 原因: {source}")]
    Persistence {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("启动配置加载失败: {source}")]
    SettingsError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("没有可用的配置提供者")]
    NoProviders,
}

impl TweaksError {
    /// 创建 Tweak 定义无效错误
    pub fn invalid_definition(
        feature: impl Into<String>,
        variable: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidDefinition {
            feature: feature.into(),
            variable: variable.into(),
            message: message.into(),
        }
    }

    /// 创建文档结构无效错误
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// 创建持久化失败错误
    pub fn persistence(
        path: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Persistence {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// 结果类型别名
pub type TweaksResult<T> = Result<T, TweaksError>;
