//! 구성 수명주기 - 활성화 게이트와 변경 통지
//!
//! `ConfigurationLifecycle`은 구성 위에 활성화 의미를 얹는다. 첫 프록시
//! 생성이 활성화이며, 활성화 이후의 advice 변경은 등록된 관찰자에게
//! 통지된다. 관찰자 목록은 명시적 등록/해제로만 바뀐다.

use crate::advice::Advice;
use crate::advisor::Advisor;
use crate::config::ProxyConfiguration;
use crate::proxy::{DefaultProxyBackend, ProxyBackend, ProxyObject};
use crate::target::{TargetObject, TargetSource};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;
use weave_foundation::{ListenerSet, Result};

// ============================================================================
// ConfigurationListener
// ============================================================================

/// 활성화와 advice 변경을 관찰한다
pub trait ConfigurationListener: Send + Sync {
    /// 첫 프록시 생성 직전에 정확히 한 번 불린다
    fn activated(&self, _config: &ProxyConfiguration) {}

    /// 활성 상태에서 advisor나 인터페이스 집합이 바뀔 때마다 불린다
    fn advice_changed(&self, _config: &ProxyConfiguration) {}
}

// ============================================================================
// ConfigurationLifecycle
// ============================================================================

/// 구성 + 활성화 플래그 + 관찰자 목록 + 프록시 백엔드
pub struct ConfigurationLifecycle {
    config: Arc<ProxyConfiguration>,
    listeners: ListenerSet<dyn ConfigurationListener>,
    backend: Mutex<Arc<dyn ProxyBackend>>,
    active: AtomicBool,
    /// 동시 첫 접근에서도 활성화가 한 번만 일어나게 한다
    activation: Mutex<()>,
}

impl ConfigurationLifecycle {
    pub fn new() -> Self {
        Self::with_config(Arc::new(ProxyConfiguration::new()))
    }

    pub fn with_config(config: Arc<ProxyConfiguration>) -> Self {
        Self {
            config,
            listeners: ListenerSet::new(),
            backend: Mutex::new(Arc::new(DefaultProxyBackend)),
            active: AtomicBool::new(false),
            activation: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Arc<ProxyConfiguration> {
        &self.config
    }

    pub fn set_proxy_backend(&self, backend: Arc<dyn ProxyBackend>) {
        *self.backend.lock() = backend;
    }

    // ------------------------------------------------------------------
    // 관찰자
    // ------------------------------------------------------------------

    pub fn add_listener(&self, listener: Arc<dyn ConfigurationListener>) {
        self.listeners.add(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn ConfigurationListener>) -> bool {
        self.listeners.remove(listener)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    // ------------------------------------------------------------------
    // 프록시 생성 게이트
    // ------------------------------------------------------------------

    /// 프록시를 만든다. 첫 호출이 구성을 활성화한다.
    pub fn create_proxy(&self) -> Result<ProxyObject> {
        let _guard = self.activation.lock();
        if !self.active.swap(true, Ordering::AcqRel) {
            debug!("proxy configuration activated");
            self.listeners.notify(|listener| listener.activated(&self.config));
        }
        let backend = self.backend.lock().clone();
        backend.create_proxy(self.config.clone())
    }

    fn fire_advice_changed(&self) {
        if self.is_active() {
            self.listeners
                .notify(|listener| listener.advice_changed(&self.config));
        }
    }

    // ------------------------------------------------------------------
    // 위임 변경 연산 (실제 변경 시에만 통지)
    // ------------------------------------------------------------------

    pub fn add_advisor(&self, advisor: Arc<dyn Advisor>) -> Result<()> {
        self.config.add_advisor(advisor)?;
        self.fire_advice_changed();
        Ok(())
    }

    pub fn add_advisor_at(&self, position: usize, advisor: Arc<dyn Advisor>) -> Result<()> {
        self.config.add_advisor_at(position, advisor)?;
        self.fire_advice_changed();
        Ok(())
    }

    pub fn remove_advisor_at(&self, index: usize) -> Result<()> {
        self.config.remove_advisor_at(index)?;
        self.fire_advice_changed();
        Ok(())
    }

    pub fn remove_advisor(&self, advisor: &Arc<dyn Advisor>) -> Result<bool> {
        let removed = self.config.remove_advisor(advisor)?;
        if removed {
            self.fire_advice_changed();
        }
        Ok(removed)
    }

    pub fn replace_advisor(
        &self,
        old: &Arc<dyn Advisor>,
        new: Arc<dyn Advisor>,
    ) -> Result<bool> {
        let replaced = self.config.replace_advisor(old, new)?;
        if replaced {
            self.fire_advice_changed();
        }
        Ok(replaced)
    }

    pub fn add_advice(&self, advice: Arc<dyn Advice>) -> Result<()> {
        self.config.add_advice(advice)?;
        self.fire_advice_changed();
        Ok(())
    }

    pub fn remove_advice(&self, advice: &Arc<dyn Advice>) -> Result<bool> {
        let removed = self.config.remove_advice(advice)?;
        if removed {
            self.fire_advice_changed();
        }
        Ok(removed)
    }

    pub fn add_interface(&self, interface: impl Into<String>) -> Result<bool> {
        let added = self.config.add_interface(interface)?;
        if added {
            self.fire_advice_changed();
        }
        Ok(added)
    }

    pub fn remove_interface(&self, interface: &str) -> Result<bool> {
        let removed = self.config.remove_interface(interface)?;
        if removed {
            self.fire_advice_changed();
        }
        Ok(removed)
    }

    pub fn set_target(&self, target: Arc<dyn TargetObject>) {
        self.config.set_target(target);
    }

    pub fn set_target_source(&self, target_source: Arc<dyn TargetSource>) {
        self.config.set_target_source(target_source);
    }

    pub fn set_frozen(&self, frozen: bool) {
        self.config.set_frozen(frozen);
    }
}

impl Default for ConfigurationLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
