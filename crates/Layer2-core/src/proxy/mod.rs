//! Proxy - 호출 가능한 대리 객체
//!
//! `ProxyObject`는 구성을 공유하는 가벼운 핸들이다. 연산 호출마다
//! 체인을 해석해 (대개 캐시 히트) 대상까지 실행한다. 실제 대리 객체
//! 생성 방식은 `ProxyBackend` 경계 뒤에 숨긴다.

use crate::chain::execute_chain;
use crate::config::ProxyConfiguration;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::trace;
use weave_foundation::{Error, Result};

// ============================================================================
// ProxyBackend
// ============================================================================

/// 구성으로부터 대리 객체를 만드는 경계
pub trait ProxyBackend: Send + Sync {
    fn create_proxy(&self, config: Arc<ProxyConfiguration>) -> Result<ProxyObject>;
}

/// 기본 백엔드: 체인 실행 핸들을 그대로 내어준다
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProxyBackend;

impl ProxyBackend for DefaultProxyBackend {
    fn create_proxy(&self, config: Arc<ProxyConfiguration>) -> Result<ProxyObject> {
        Ok(ProxyObject::new(config))
    }
}

// ============================================================================
// ProxyObject
// ============================================================================

/// 대상 앞에 선 호출 핸들
///
/// 복제는 같은 구성을 공유한다. 동일성 비교는 `ptr_eq`로 한다.
#[derive(Clone)]
pub struct ProxyObject {
    config: Arc<ProxyConfiguration>,
}

impl fmt::Debug for ProxyObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyObject")
            .field("config", &self.config.to_string())
            .finish()
    }
}

impl ProxyObject {
    pub fn new(config: Arc<ProxyConfiguration>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Arc<ProxyConfiguration> {
        &self.config
    }

    /// 두 핸들이 같은 구성을 가리키는지
    pub fn ptr_eq(&self, other: &ProxyObject) -> bool {
        Arc::ptr_eq(&self.config, &other.config)
    }

    /// 노출 인터페이스 집합
    pub fn interfaces(&self) -> Vec<String> {
        self.config.interfaces()
    }

    /// 선언된 인터페이스 또는 동적 introduction이 답하는 인터페이스인지
    pub fn implements_interface(&self, interface: &str) -> bool {
        if self.config.is_interface_proxied(interface) {
            return true;
        }
        for advisor in self.config.advisors().iter() {
            if advisor.prototype_placeholder().is_some() {
                continue;
            }
            let advice = advisor.advice();
            if let Some(dynamic) = advice.as_dynamic_introduction() {
                if dynamic.implements_interface(interface) {
                    return true;
                }
            }
        }
        false
    }

    /// 연산 하나를 체인을 거쳐 실행한다
    ///
    /// 동적 대상 소스는 호출마다 새 대상을 받고 끝나면 반납한다.
    pub fn invoke(&self, operation: &str, args: Value) -> Result<Value> {
        let target_source = self.config.target_source();
        let target = target_source.get_target()?.ok_or_else(|| {
            Error::Target(format!("no target available for operation '{operation}'"))
        })?;
        let target_type = target_source
            .target_type()
            .unwrap_or_else(|| target.type_name().to_string());

        let chain = self.config.resolve_chain(operation, &target_type)?;
        trace!(operation, entries = chain.len(), "invoking through chain");

        let result = execute_chain(target.clone(), operation, args, chain.as_ref().clone());
        if !target_source.is_static() {
            target_source.release_target(target);
        }
        result
    }
}
