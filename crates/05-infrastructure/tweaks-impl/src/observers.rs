//! 配置变更观察者注册表

use crate::event_bus::invoke_isolated;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tweaks_abstractions::{ObserverId, UpdateCallback};

/// 观察者注册表
///
/// 每个观察者标识最多对应一个回调，重复注册会原地替换回调并保留原有的通知顺序
#[derive(Default)]
pub struct ObserverRegistry {
    /// 观察者列表（按首次注册顺序）
    entries: RwLock<Vec<(ObserverId, UpdateCallback)>>,
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers_count", &self.len())
            .finish()
    }
}

impl ObserverRegistry {
    /// 创建新的观察者注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册观察者，返回是否替换了已有回调
    pub fn register(&self, observer: ObserverId, callback: UpdateCallback) -> bool {
        let mut entries = self.entries.write();

        if let Some(entry) = entries.iter_mut().find(|(id, _)| *id == observer) {
            entry.1 = callback;
            debug!("替换观察者回调: {}", observer);
            return true;
        }

        entries.push((observer, callback));
        info!("注册配置观察者: {}", observer);
        false
    }

    /// 注销观察者，返回观察者是否存在
    pub fn deregister(&self, observer: ObserverId) -> bool {
        let mut entries = self.entries.write();
        let initial_count = entries.len();
        entries.retain(|(id, _)| *id != observer);

        if entries.len() < initial_count {
            info!("注销配置观察者: {}", observer);
            true
        } else {
            warn!("观察者未注册: {}", observer);
            false
        }
    }

    /// 通知所有观察者，返回正常完成的回调数量
    pub fn notify_all(&self) -> usize {
        let snapshot: Vec<(ObserverId, UpdateCallback)> = self
            .entries
            .read()
            .iter()
            .map(|(id, callback)| (*id, Arc::clone(callback)))
            .collect();

        debug!("通知配置观察者: {} 个", snapshot.len());

        let mut completed = 0;
        for (id, callback) in &snapshot {
            if invoke_isolated(&id.to_string(), callback) {
                completed += 1;
            }
        }
        completed
    }

    /// 观察者是否已注册
    pub fn contains(&self, observer: ObserverId) -> bool {
        self.entries.read().iter().any(|(id, _)| *id == observer)
    }

    /// 获取观察者数量
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// 注册表是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
