//! # Tweaks Abstractions
//!
//! Tweak 配置抽象层，定义多配置源协调所依赖的核心接口和数据类型。
//!
//! ## 核心接口
//!
//! - [`TweaksProvider`] - 只读配置提供者接口
//! - [`MutableTweaksProvider`] - 可写配置提供者接口
//! - [`TweaksEventPublisher`] - 配置变更事件发布接口
//! - [`Tweak`] / [`TweakValue`] / [`TweakPriority`] - 数据模型

pub mod events;
pub mod provider;
pub mod tweak;

pub use events::*;
pub use provider::*;
pub use tweak::*;
