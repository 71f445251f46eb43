//! 配置变更事件总线实现

use parking_lot::RwLock;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tweaks_abstractions::{SubscriptionId, TweaksEventPublisher, UpdateCallback};

/// 事件订阅
struct Subscription {
    id: SubscriptionId,
    event_name: String,
    callback: UpdateCallback,
}

/// 配置变更事件总线
///
/// 显式创建并在提供者与协调器之间共享，替代进程级全局通知中心。
/// 发布是同步的：`publish` 返回时所有订阅者都已处理完毕。
pub struct TweaksEventBus {
    /// 订阅列表（按订阅顺序）
    subscriptions: RwLock<Vec<Subscription>>,
}

impl std::fmt::Debug for TweaksEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TweaksEventBus")
            .field("subscriptions_count", &self.subscriptions.read().len())
            .finish()
    }
}

impl TweaksEventBus {
    /// 创建新的事件总线
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
        }
    }

    /// 创建共享的事件总线
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// 订阅事件
    pub fn subscribe<F>(&self, event_name: impl Into<String>, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = SubscriptionId::next();
        let event_name = event_name.into();
        info!("订阅配置事件: {} -> {}", event_name, id);

        self.subscriptions.write().push(Subscription {
            id,
            event_name,
            callback: Arc::new(callback),
        });
        id
    }

    /// 取消订阅，返回订阅是否存在
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.write();
        let initial_count = subscriptions.len();
        subscriptions.retain(|s| s.id != id);

        if subscriptions.len() < initial_count {
            info!("取消订阅配置事件: {}", id);
            true
        } else {
            warn!("订阅不存在: {}", id);
            false
        }
    }

    /// 获取订阅数量
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }
}

impl Default for TweaksEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl TweaksEventPublisher for TweaksEventBus {
    fn publish(&self, event_name: &str) -> usize {
        // 回调可能重新订阅或取消订阅，分发前释放锁
        let callbacks: Vec<(SubscriptionId, UpdateCallback)> = self
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.event_name == event_name)
            .map(|s| (s.id, Arc::clone(&s.callback)))
            .collect();

        if callbacks.is_empty() {
            debug!("事件 {} 没有订阅者", event_name);
            return 0;
        }

        debug!("发布配置事件: {} -> {} 个订阅者", event_name, callbacks.len());

        let mut delivered = 0;
        for (id, callback) in &callbacks {
            if invoke_isolated(&id.to_string(), callback) {
                delivered += 1;
            }
        }
        delivered
    }
}

/// 调用回调并隔离 panic，返回回调是否正常完成
pub(crate) fn invoke_isolated(label: &str, callback: &UpdateCallback) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| callback())) {
        Ok(()) => true,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "未知错误".to_string());
            error!("回调 {} 执行失败: {}", label, message);
            false
        }
    }
}
