//! # Infrastructure Common
//!
//! 这个 crate 提供了 Lorn Tweaks 基础设施层共享的错误类型。
//!
//! ## 核心组件
//!
//! - [`TweaksError`] - 配置提供者、持久化与启动配置的统一错误类型
//! - [`TweaksResult`] - 结果类型别名
//!
//! ## 设计原则
//!
//! - 查询路径永不报错，只有提供者加载、写入和启动阶段返回错误
//! - 错误信息携带定位所需的上下文（路径、特性、变量）

pub mod errors;

pub use errors::*;
