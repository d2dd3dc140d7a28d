//! Event - 리스너 목록 유틸리티
//!
//! 명시적으로 소유되는 옵저버 목록. 전역 디스패치 없이
//! 등록/해제가 `Arc` 동일성 기준으로 동작한다.

use parking_lot::Mutex;
use std::sync::Arc;

// ============================================================================
// ListenerSet<L> - 소유된 리스너 목록
// ============================================================================

/// 리스너 목록 (등록 순서 유지)
pub struct ListenerSet<L: ?Sized> {
    listeners: Mutex<Vec<Arc<L>>>,
}

impl<L: ?Sized> ListenerSet<L> {
    /// 빈 목록 생성
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// 리스너 등록
    pub fn add(&self, listener: Arc<L>) {
        self.listeners.lock().push(listener);
    }

    /// 리스너 해제 (Arc 동일성 기준)
    ///
    /// 제거되었으면 true
    pub fn remove(&self, listener: &Arc<L>) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        listeners.len() != before
    }

    /// 등록된 리스너 수
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// 비어있는지 확인
    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }

    /// 모든 리스너에 대해 순서대로 실행
    ///
    /// 호출 중 등록/해제와 겹치지 않도록 스냅샷을 뜬 뒤 실행한다.
    pub fn notify(&self, mut f: impl FnMut(&L)) {
        let snapshot: Vec<Arc<L>> = self.listeners.lock().clone();
        for listener in &snapshot {
            f(listener);
        }
    }
}

impl<L: ?Sized> Default for ListenerSet<L> {
    fn default() -> Self {
        Self::new()
    }
}
