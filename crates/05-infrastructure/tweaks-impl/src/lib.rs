//! # Tweaks Implementation
//!
//! Tweak 多配置源协调的具体实现。
//!
//! ## 主要组件
//!
//! - [`TweaksCoordinator`] - 按优先级协调多个配置提供者
//! - [`TweaksEventBus`] - 配置变更事件总线
//! - [`ObserverRegistry`] - 变更观察者注册表
//! - [`JsonTweaksProvider`] - 打包默认值提供者
//! - [`RemoteTweaksProvider`] - 远程实验配置提供者
//! - [`LocalTweaksProvider`] - 本地用户覆盖提供者
//! - [`TweaksSettings`] / [`TweaksBootstrapper`] - 启动配置与组装

pub mod bootstrapper;
pub mod coordinator;
pub mod event_bus;
pub mod observers;
pub mod providers;
pub mod settings;

pub use bootstrapper::*;
pub use coordinator::*;
pub use event_bus::*;
pub use observers::*;
pub use providers::*;
pub use settings::*;
