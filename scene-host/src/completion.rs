//! 切换完成回调
//!
//! 在每次 `OnSceneTransitionComplete` 时调用给定回调；被丢弃时自动取消订阅。

use scene_runtime::{HookEvent, HookRegistry, HookSlot, SceneId, SubscriptionId};
use tracing::debug;

pub struct CompletionTrigger {
    hooks: HookRegistry,
    subscription: SubscriptionId,
}

impl CompletionTrigger {
    pub fn new<F>(hooks: &HookRegistry, mut callback: F) -> Self
    where
        F: FnMut(&SceneId) + 'static,
    {
        let subscription = hooks.subscribe(HookSlot::Complete, move |event, _| {
            if let HookEvent::Complete { to } = event {
                callback(to);
            }
        });
        debug!(subscription = %subscription, "注册切换完成回调");
        Self {
            hooks: hooks.clone(),
            subscription,
        }
    }

    pub fn subscription(&self) -> SubscriptionId {
        self.subscription
    }
}

impl Drop for CompletionTrigger {
    fn drop(&mut self) {
        self.hooks.unsubscribe(self.subscription);
    }
}
