//! # Barrier 模块
//!
//! 阻塞操作屏障：追踪一组动态注册、各自独立推进的阻塞操作，
//! 将它们的进度聚合为单个数值，并在集合清空时报告完成。
//!
//! ## 等待周期
//!
//! ```text
//! begin_wait_cycle()        // 完成计数归零
//! loop {
//!     match poll() {
//!         Pending { progress } => 挂起到下一 tick,
//!         Drained { .. } => break,
//!     }
//! }
//! ```
//!
//! 每次 `poll` 把已完成（`progress >= 1`）的操作移出集合并计入本周期的完成数，
//! 聚合进度为：
//!
//! ```text
//! (未完成操作的进度之和 + 本周期完成数) / (剩余操作数 + 本周期完成数)
//! ```
//!
//! 分母包含本周期内早先完成并已移除的操作，因此聚合值是本周期注册过的全部操作的
//! 累计平均，操作完成并消失时进度不会回退。

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::OperationError;

/// 阻塞操作 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(u64);

impl OperationId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// 单个阻塞操作
#[derive(Debug, Clone, Copy, PartialEq)]
struct Operation {
    /// 约定在 [0, 1]，不强制
    progress: f32,
}

impl Operation {
    fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }
}

/// 一次轮询的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrainPoll {
    /// 仍有未完成的操作
    Pending { progress: f32 },
    /// 集合已清空
    ///
    /// 本周期从未注册过任何操作时 `progress` 为 `None`（聚合值未定义）。
    Drained { progress: Option<f32> },
}

impl DrainPoll {
    pub fn is_drained(&self) -> bool {
        matches!(self, DrainPoll::Drained { .. })
    }

    /// 本次轮询的聚合进度
    pub fn progress(&self) -> Option<f32> {
        match *self {
            DrainPoll::Pending { progress } => Some(progress),
            DrainPoll::Drained { progress } => progress,
        }
    }
}

#[derive(Debug, Default)]
struct BarrierState {
    operations: BTreeMap<OperationId, Operation>,
    /// 本等待周期内已完成并移除的操作数
    completed_in_cycle: usize,
    next_id: u64,
}

/// 阻塞操作屏障
///
/// 单线程共享句柄，克隆后指向同一个操作集合。
/// 调度器持有一份，钩子实现者通过钩子参数获得（需要时自行克隆保存）。
#[derive(Clone, Default)]
pub struct OperationBarrier {
    inner: Rc<RefCell<BarrierState>>,
}

impl fmt::Debug for OperationBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("OperationBarrier")
            .field("operations", &state.operations.len())
            .field("completed_in_cycle", &state.completed_in_cycle)
            .finish()
    }
}

impl OperationBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== 操作管理 ==========

    /// 开始一个新的阻塞操作
    ///
    /// 初始进度为 0。调用方负责最终将进度推进到 1（或调用 `complete`/`release`），
    /// 否则当前切换会一直停在该阶段。
    pub fn start_operation(&self) -> OperationHandle {
        let mut state = self.inner.borrow_mut();
        state.next_id += 1;
        let id = OperationId(state.next_id);
        state.operations.insert(id, Operation { progress: 0.0 });
        OperationHandle {
            id,
            barrier: self.clone(),
        }
    }

    /// 覆盖操作进度
    ///
    /// 只存储数值，达到 1 的操作在下一次 `poll` 时才会被移除。
    pub fn set_progress(&self, handle: &OperationHandle, value: f32) -> Result<(), OperationError> {
        self.set_progress_by_id(handle.id, value)
    }

    fn set_progress_by_id(&self, id: OperationId, value: f32) -> Result<(), OperationError> {
        let mut state = self.inner.borrow_mut();
        let op = state
            .operations
            .get_mut(&id)
            .ok_or(OperationError::Unknown(id))?;
        op.progress = value;
        Ok(())
    }

    /// 标记操作完成（进度置 1）
    ///
    /// 与 `release` 不同，完成的操作会计入本周期的完成数。
    pub fn complete(&self, handle: &OperationHandle) -> Result<(), OperationError> {
        self.set_progress_by_id(handle.id, 1.0)
    }

    /// 无条件移除操作
    ///
    /// 用于不需要上报进度的"即发即弃"操作。重复释放是无操作，返回 `false`。
    pub fn release(&self, handle: &OperationHandle) -> bool {
        self.release_by_id(handle.id)
    }

    fn release_by_id(&self, id: OperationId) -> bool {
        self.inner.borrow_mut().operations.remove(&id).is_some()
    }

    /// 丢弃全部存活操作（不计为完成）
    ///
    /// 返回被丢弃的操作数。
    pub fn clear(&self) -> usize {
        let mut state = self.inner.borrow_mut();
        let count = state.operations.len();
        state.operations.clear();
        state.completed_in_cycle = 0;
        count
    }

    // ========== 查询 ==========

    /// 当前存活的操作数
    pub fn len(&self) -> usize {
        self.inner.borrow().operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().operations.is_empty()
    }

    /// 查询操作进度，操作已不在集合中时返回 `None`
    pub fn progress(&self, handle: &OperationHandle) -> Option<f32> {
        self.inner
            .borrow()
            .operations
            .get(&handle.id)
            .map(|op| op.progress)
    }

    pub fn contains(&self, handle: &OperationHandle) -> bool {
        self.inner.borrow().operations.contains_key(&handle.id)
    }

    // ========== 等待周期 ==========

    /// 开始新的等待周期，完成计数归零
    pub fn begin_wait_cycle(&self) {
        self.inner.borrow_mut().completed_in_cycle = 0;
    }

    /// 本周期内已完成的操作数
    pub fn completed_in_cycle(&self) -> usize {
        self.inner.borrow().completed_in_cycle
    }

    /// 执行一次清空轮询
    ///
    /// 1. 移除已完成的操作并累加完成数，累加未完成操作的进度
    /// 2. 计算累计平均进度
    /// 3. 集合为空时返回 `Drained`，否则返回 `Pending`
    pub fn poll(&self) -> DrainPoll {
        let mut state = self.inner.borrow_mut();

        let mut sum = 0.0_f32;
        let mut newly_completed = 0;
        state.operations.retain(|_, op| {
            if op.is_complete() {
                newly_completed += 1;
                false
            } else {
                sum += op.progress;
                true
            }
        });
        state.completed_in_cycle += newly_completed;

        let remaining = state.operations.len();
        let completed = state.completed_in_cycle;
        let total = remaining + completed;

        // 本周期从未注册过操作：直接视为已满足
        if total == 0 {
            return DrainPoll::Drained { progress: None };
        }

        let progress = (sum + completed as f32) / total as f32;
        if remaining == 0 {
            DrainPoll::Drained {
                progress: Some(progress),
            }
        } else {
            DrainPoll::Pending { progress }
        }
    }
}

/// 阻塞操作句柄
///
/// 由创建它的钩子订阅者持有。句柄被丢弃不会影响操作本身：
/// 未完成的操作仍会阻塞切换，直到下一次切换开始时作为过期操作被清除。
#[derive(Debug)]
pub struct OperationHandle {
    id: OperationId,
    barrier: OperationBarrier,
}

impl OperationHandle {
    pub fn id(&self) -> OperationId {
        self.id
    }

    /// 等价于 `barrier.set_progress(self, value)`
    pub fn set_progress(&self, value: f32) -> Result<(), OperationError> {
        self.barrier.set_progress_by_id(self.id, value)
    }

    /// 等价于 `barrier.complete(self)`
    pub fn complete(&self) -> Result<(), OperationError> {
        self.barrier.set_progress_by_id(self.id, 1.0)
    }

    /// 等价于 `barrier.release(self)`，消耗句柄
    pub fn release(self) -> bool {
        self.barrier.release_by_id(self.id)
    }

    /// 操作是否仍在屏障中
    pub fn is_tracked(&self) -> bool {
        self.barrier.contains(self)
    }
}
