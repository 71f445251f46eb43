//! Tweak 数据模型

use serde::{Deserialize, Serialize};
use std::fmt;

/// 配置提供者优先级
///
/// 数值越大越先被查询，相同优先级按注册顺序决定先后
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TweakPriority(i32);

impl TweakPriority {
    /// 打包默认值的优先级
    pub const DEFAULTS: Self = Self(0);
    /// 远程实验配置的优先级
    pub const REMOTE: Self = Self(5);
    /// 本地用户覆盖的优先级
    pub const LOCAL: Self = Self(10);

    /// 创建优先级
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// 获取原始数值
    pub const fn value(self) -> i32 {
        self.0
    }
}

impl Default for TweakPriority {
    fn default() -> Self {
        Self::DEFAULTS
    }
}

impl From<i32> for TweakPriority {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for TweakPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Tweak 取值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TweakValue {
    /// 布尔值
    Bool(bool),
    /// 整数
    Integer(i64),
    /// 浮点数
    Float(f64),
    /// 字符串
    Text(String),
}

impl TweakValue {
    /// 作为布尔值读取
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// 作为整数读取
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// 作为浮点数读取，整数会被放宽为浮点数
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// 作为字符串读取
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// 取值能否无损写入 JSON
    ///
    /// `NaN` 与无穷大会被序列化为 `null`，之后无法再读回
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Float(value) => value.is_finite(),
            _ => true,
        }
    }

    /// 从命令行等文本输入推断取值类型
    ///
    /// 非有限浮点数（`NaN`、`inf`）按原文保留为字符串
    pub fn parse_lossy(input: &str) -> Self {
        if let Ok(value) = input.parse::<bool>() {
            return Self::Bool(value);
        }
        if let Ok(value) = input.parse::<i64>() {
            return Self::Integer(value);
        }
        match input.parse::<f64>() {
            Ok(value) if value.is_finite() => Self::Float(value),
            _ => Self::Text(input.to_string()),
        }
    }
}

impl fmt::Display for TweakValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<bool> for TweakValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for TweakValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for TweakValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for TweakValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for TweakValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// 解析后的 Tweak 记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tweak {
    /// 变量标识
    pub identifier: String,
    /// 展示标题
    pub title: Option<String>,
    /// 展示分组
    pub group: Option<String>,
    /// 取值
    pub value: TweakValue,
}

impl Tweak {
    /// 创建不带展示信息的 Tweak
    pub fn new(identifier: impl Into<String>, value: impl Into<TweakValue>) -> Self {
        Self {
            identifier: identifier.into(),
            title: None,
            group: None,
            value: value.into(),
        }
    }

    /// 设置标题
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// 设置分组
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}
