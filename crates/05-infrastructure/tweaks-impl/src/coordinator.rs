//! Tweak 配置协调器实现

use crate::event_bus::TweaksEventBus;
use crate::observers::ObserverRegistry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tweaks_abstractions::{
    MutableTweaksProvider, ObserverId, SubscriptionId, Tweak, TweakValue, TweaksProvider,
    TWEAKS_CONFIGURATION_DID_CHANGE,
};

/// Tweak 配置协调器
///
/// 按优先级协调多个配置提供者，对外提供统一的查询接口：
/// 按优先级从高到低依次查询，第一个给出确定答案的提供者胜出。
///
/// 构造时订阅事件总线上的 [`TWEAKS_CONFIGURATION_DID_CHANGE`] 事件，
/// 任一提供者发布变更时同步通知所有已注册的观察者；销毁时取消订阅。
pub struct TweaksCoordinator {
    /// 配置提供者列表（按优先级排序，构造后不变）
    providers: Vec<Arc<dyn TweaksProvider>>,
    /// 观察者注册表
    observers: Arc<ObserverRegistry>,
    /// 事件总线
    event_bus: Arc<TweaksEventBus>,
    /// 事件总线订阅
    subscription: SubscriptionId,
}

impl std::fmt::Debug for TweaksCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("TweaksCoordinator")
            .field("providers", &names)
            .field("observers_count", &self.observers.len())
            .field("subscription", &self.subscription)
            .finish()
    }
}

impl TweaksCoordinator {
    /// 创建新的配置协调器
    ///
    /// 提供者按优先级从高到低稳定排序，相同优先级保持传入顺序。
    /// 提供者列表为空时返回 `None`。
    pub fn new(
        mut providers: Vec<Arc<dyn TweaksProvider>>,
        event_bus: Arc<TweaksEventBus>,
    ) -> Option<Self> {
        if providers.is_empty() {
            warn!("配置提供者列表为空，无法创建配置协调器");
            return None;
        }

        // 按优先级排序（优先级高的在前）
        providers.sort_by(|a, b| b.priority().cmp(&a.priority()));

        let observers = Arc::new(ObserverRegistry::new());
        let registry = Arc::clone(&observers);
        let subscription = event_bus.subscribe(TWEAKS_CONFIGURATION_DID_CHANGE, move || {
            registry.notify_all();
        });

        for provider in &providers {
            info!(
                "注册配置提供者: {} (优先级 {})",
                provider.name(),
                provider.priority()
            );
        }

        Some(Self {
            providers,
            observers,
            event_bus,
            subscription,
        })
    }

    /// 获取 Tweak 取值
    pub fn value_for_tweak(&self, feature: &str, variable: &str) -> Option<TweakValue> {
        self.tweak_with(feature, variable).map(|tweak| tweak.value)
    }

    /// 获取完整的 Tweak 记录，包含标题与分组
    pub fn tweak_with(&self, feature: &str, variable: &str) -> Option<Tweak> {
        let resolved = self.providers.iter().find_map(|provider| {
            provider.tweak(feature, variable).map(|tweak| {
                debug!(
                    "从提供者 {} 获取 Tweak: {}.{}",
                    provider.name(),
                    feature,
                    variable
                );
                tweak
            })
        });

        if resolved.is_none() {
            debug!("Tweak 未定义: {}.{}", feature, variable);
        }
        resolved
    }

    /// 特性是否启用
    pub fn is_feature_enabled(&self, feature: &str) -> bool {
        self.providers
            .iter()
            .find(|provider| provider.is_feature_enabled(feature))
            .map_or(false, |provider| {
                debug!("提供者 {} 启用特性: {}", provider.name(), feature);
                true
            })
    }

    /// 获取实验当前生效的分组
    pub fn active_variation(&self, experiment: &str) -> Option<String> {
        self.providers.iter().find_map(|provider| {
            provider.active_variation(experiment).map(|variation| {
                debug!(
                    "从提供者 {} 获取实验分组: {} -> {}",
                    provider.name(),
                    experiment,
                    variation
                );
                variation
            })
        })
    }

    /// 获取优先级最高的可写提供者
    ///
    /// 协调器只会通过这个提供者写入，保证用户覆盖在读取时总是胜出
    pub fn top_customizable_configuration(&self) -> Option<&dyn MutableTweaksProvider> {
        self.providers
            .iter()
            .find_map(|provider| provider.as_mutable())
    }

    /// 注册配置变更回调
    ///
    /// 同一观察者重复注册会替换其回调。观察者销毁前必须调用 [`Self::deregister`]。
    pub fn register_for_updates<F>(&self, observer: ObserverId, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.observers.register(observer, Arc::new(callback));
    }

    /// 注销配置变更回调，未注册时为空操作
    pub fn deregister(&self, observer: ObserverId) {
        self.observers.deregister(observer);
    }

    /// 汇总所有提供者定义的特性及其变量名称
    pub fn features(&self) -> BTreeMap<String, Vec<String>> {
        let mut merged: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for provider in &self.providers {
            for (feature, variables) in provider.features() {
                merged.entry(feature).or_default().extend(variables);
            }
        }

        merged
            .into_iter()
            .map(|(feature, variables)| (feature, variables.into_iter().collect()))
            .collect()
    }

    /// 获取按优先级排序的提供者列表
    pub fn providers(&self) -> &[Arc<dyn TweaksProvider>] {
        &self.providers
    }

    /// 获取已注册的观察者数量
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl Drop for TweaksCoordinator {
    fn drop(&mut self) {
        self.event_bus.unsubscribe(self.subscription);
    }
}
