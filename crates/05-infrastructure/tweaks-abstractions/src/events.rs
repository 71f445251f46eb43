//! 配置变更事件定义

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 配置变更事件名称
///
/// 任何提供者在写入完成后都向此事件发布，事件本身不携带数据，
/// 订阅者需要重新查询当前取值
pub const TWEAKS_CONFIGURATION_DID_CHANGE: &str = "TweaksConfigurationDidChange";

/// 变更回调
pub type UpdateCallback = Arc<dyn Fn() + Send + Sync>;

/// 配置变更事件发布者 trait
pub trait TweaksEventPublisher: Send + Sync {
    /// 同步发布事件，返回正常处理完成的订阅者数量
    fn publish(&self, event_name: &str) -> usize;
}

static OBSERVER_TOKEN_COUNTER: AtomicU64 = AtomicU64::new(1);

/// 观察者标识
///
/// 两种来源：[`ObserverId::of`] 以共享对象的分配地址区分观察者，
/// [`ObserverId::next`] 分配进程内唯一的令牌。结构相同但分别创建的两个观察者
/// 总是不同的标识，零大小类型也不例外。
/// 观察者销毁前必须显式注销，否则其回调会一直保留在注册表中。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(ObserverKey);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ObserverKey {
    Address(usize),
    Token(u64),
}

impl ObserverId {
    /// 以 `Arc` 分配地址作为标识
    ///
    /// `Arc` 的分配总是包含引用计数，存活期间地址不会与其他 `Arc` 重合
    pub fn of<T: ?Sized>(observer: &Arc<T>) -> Self {
        Self(ObserverKey::Address(
            Arc::as_ptr(observer).cast::<()>() as usize
        ))
    }

    /// 分配新的观察者令牌
    pub fn next() -> Self {
        Self(ObserverKey::Token(
            OBSERVER_TOKEN_COUNTER.fetch_add(1, Ordering::Relaxed),
        ))
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            ObserverKey::Address(address) => write!(f, "observer-{address:#x}"),
            ObserverKey::Token(token) => write!(f, "observer#{token}"),
        }
    }
}

static SUBSCRIPTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// 事件总线订阅标识，进程内不重复
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// 生成新的订阅标识
    pub fn next() -> Self {
        Self(SUBSCRIPTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// 获取原始数值
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscription-{}", self.0)
    }
}
