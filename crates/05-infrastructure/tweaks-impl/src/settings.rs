//! 启动配置

use infrastructure_common::{TweaksError, TweaksResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tweaks_abstractions::TweakPriority;

/// 环境变量前缀
pub const SETTINGS_ENV_PREFIX: &str = "TWEAKS";

/// 各配置提供者的优先级
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrioritySettings {
    /// 打包默认值
    pub defaults: TweakPriority,
    /// 远程实验配置
    pub remote: TweakPriority,
    /// 本地用户覆盖
    pub local: TweakPriority,
}

impl Default for PrioritySettings {
    fn default() -> Self {
        Self {
            defaults: TweakPriority::DEFAULTS,
            remote: TweakPriority::REMOTE,
            local: TweakPriority::LOCAL,
        }
    }
}

/// Tweak 启动配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TweaksSettings {
    /// JSON 默认值文件路径
    pub defaults_path: Option<PathBuf>,
    /// 是否启用远程实验配置提供者
    pub remote_enabled: bool,
    /// 是否启用本地覆盖提供者
    pub local_enabled: bool,
    /// 本地覆盖持久化文件路径，不设置时仅保存在内存中
    pub local_store_path: Option<PathBuf>,
    /// 优先级
    pub priorities: PrioritySettings,
}

impl Default for TweaksSettings {
    fn default() -> Self {
        Self {
            defaults_path: None,
            remote_enabled: true,
            local_enabled: true,
            local_store_path: None,
            priorities: PrioritySettings::default(),
        }
    }
}

impl TweaksSettings {
    /// 加载启动配置
    ///
    /// 依次叠加可选的配置文件（按扩展名识别格式）和 `TWEAKS__` 前缀的环境变量，
    /// 例如 `TWEAKS__PRIORITIES__LOCAL=20`
    pub fn load(path: Option<&Path>) -> TweaksResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            debug!("加载启动配置文件: {}", path.display());
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix(SETTINGS_ENV_PREFIX).separator("__"))
            .build()
            .and_then(|config| config.try_deserialize::<Self>())
            .map_err(|e| TweaksError::SettingsError {
                source: Box::new(e),
            })?;

        info!("启动配置加载完成: {:?}", settings);
        Ok(settings)
    }
}
