//! Tweak 配置启动器

use crate::coordinator::TweaksCoordinator;
use crate::event_bus::TweaksEventBus;
use crate::providers::{JsonTweaksProvider, LocalTweaksProvider, RemoteTweaksProvider};
use crate::settings::TweaksSettings;
use infrastructure_common::{TweaksError, TweaksResult};
use std::sync::Arc;
use tracing::{error, info};
use tweaks_abstractions::TweaksProvider;

/// 组装完成的 Tweak 配置栈
///
/// 持有各提供者的具体句柄，便于调用方直接更新远程快照或本地覆盖
#[derive(Debug)]
pub struct TweaksStack {
    /// 事件总线
    pub event_bus: Arc<TweaksEventBus>,
    /// 打包默认值提供者
    pub defaults: Option<Arc<JsonTweaksProvider>>,
    /// 远程实验配置提供者
    pub remote: Option<Arc<RemoteTweaksProvider>>,
    /// 本地用户覆盖提供者
    pub local: Option<Arc<LocalTweaksProvider>>,
    /// 配置协调器
    pub coordinator: TweaksCoordinator,
}

/// Tweak 配置启动器
///
/// 根据启动配置创建事件总线、已启用的配置提供者和配置协调器
#[derive(Debug, Clone, Default)]
pub struct TweaksBootstrapper {
    settings: TweaksSettings,
}

impl TweaksBootstrapper {
    /// 创建新的启动器
    pub fn new(settings: TweaksSettings) -> Self {
        Self { settings }
    }

    /// 组装配置栈
    pub fn bootstrap(self) -> TweaksResult<TweaksStack> {
        info!("开始组装 Tweak 配置栈");
        let priorities = &self.settings.priorities;
        let event_bus = TweaksEventBus::shared();

        let defaults = match &self.settings.defaults_path {
            Some(path) => Some(Arc::new(
                JsonTweaksProvider::from_path(path)?.with_priority(priorities.defaults),
            )),
            None => None,
        };

        let remote = self.settings.remote_enabled.then(|| {
            Arc::new(RemoteTweaksProvider::new(event_bus.clone()).with_priority(priorities.remote))
        });

        let local = if self.settings.local_enabled {
            let local = match &self.settings.local_store_path {
                Some(path) => LocalTweaksProvider::with_persistence(event_bus.clone(), path)?,
                None => LocalTweaksProvider::new(event_bus.clone()),
            };
            Some(Arc::new(local.with_priority(priorities.local)))
        } else {
            None
        };

        let mut providers: Vec<Arc<dyn TweaksProvider>> = Vec::with_capacity(3);
        if let Some(local) = &local {
            providers.push(Arc::clone(local) as Arc<dyn TweaksProvider>);
        }
        if let Some(remote) = &remote {
            providers.push(Arc::clone(remote) as Arc<dyn TweaksProvider>);
        }
        if let Some(defaults) = &defaults {
            providers.push(Arc::clone(defaults) as Arc<dyn TweaksProvider>);
        }

        let coordinator =
            TweaksCoordinator::new(providers, Arc::clone(&event_bus)).ok_or_else(|| {
                error!("没有启用任何配置提供者");
                TweaksError::NoProviders
            })?;

        info!("Tweak 配置栈组装完成");
        Ok(TweaksStack {
            event_bus,
            defaults,
            remote,
            local,
            coordinator,
        })
    }
}
