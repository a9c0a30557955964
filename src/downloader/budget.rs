// src/downloader/budget.rs

use crate::error::{AppError, AppResult};
use log::debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// 活跃下载计数器，超过上限的请求会被立即拒绝而不是排队。
#[derive(Debug, Clone)]
pub struct ConcurrencyBudget {
    active: Arc<Mutex<usize>>,
    max: usize,
}

impl ConcurrencyBudget {
    pub fn new(max: usize) -> Self {
        Self {
            active: Arc::new(Mutex::new(0)),
            max,
        }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn active(&self) -> usize {
        *self.lock()
    }

    pub fn try_acquire(&self) -> AppResult<BudgetPermit> {
        let mut active = self.lock();
        if *active >= self.max {
            debug!("并发已满 ({}/{})，拒绝新的下载", *active, self.max);
            return Err(AppError::TooManyActiveDownloads { max: self.max });
        }
        *active += 1;
        Ok(BudgetPermit {
            active: Arc::clone(&self.active),
        })
    }

    // 计数器只做加减，持锁期间不会 panic，中毒时直接取回内部值
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 离开作用域时归还名额，无论任务成功、失败、panic 还是被取消。
#[derive(Debug)]
pub struct BudgetPermit {
    active: Arc<Mutex<usize>>,
}

impl Drop for BudgetPermit {
    fn drop(&mut self) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        *active = active.saturating_sub(1);
    }
}
