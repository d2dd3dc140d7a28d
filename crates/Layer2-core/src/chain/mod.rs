//! Chain - 연산별 인터셉터 체인 해석
//!
//! 설정의 advisor 목록을 순서대로 훑어 (타입, 연산)에 적용되는
//! 인터셉터 열을 만든다. 순서가 곧 우선순위다: 앞선 advisor가 바깥에서
//! 실행된다. 동적 포인트컷은 호출 시점 검사 단위로 감싸 체인에 넣으므로
//! 해석 결과 자체는 캐시 가능하다.

use crate::config::ProxyConfiguration;
use crate::pointcut::Pointcut;
use crate::advice::Interceptor;
use std::sync::Arc;
use tracing::trace;
use weave_foundation::Result;

mod invocation;

pub use invocation::{execute_chain, ChainInvocation};

// ============================================================================
// ChainEntry - 체인 구성 단위
// ============================================================================

/// 해석된 체인의 한 단계
#[derive(Clone)]
pub enum ChainEntry {
    /// 항상 실행되는 인터셉터
    Interceptor(Arc<dyn Interceptor>),

    /// 호출 시점에 인자 검사를 통과해야 실행되는 인터셉터
    Dynamic {
        interceptor: Arc<dyn Interceptor>,
        pointcut: Arc<dyn Pointcut>,
    },
}

impl ChainEntry {
    /// 호출 시점 검사가 붙어 있는지
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic { .. })
    }
}

// ============================================================================
// ChainResolver trait
// ============================================================================

/// (설정, 연산, 대상 타입) → 인터셉터 체인
pub trait ChainResolver: Send + Sync {
    /// 적용되는 인터셉터 열을 advisor 순서대로 만든다
    ///
    /// `target_type`이 미상이면 빈 문자열.
    fn resolve(
        &self,
        config: &ProxyConfiguration,
        operation: &str,
        target_type: &str,
    ) -> Result<Vec<ChainEntry>>;
}

// ============================================================================
// DefaultChainResolver
// ============================================================================

/// 기본 해석기
///
/// `pre_filtered`가 켜져 있으면 호출자가 타입 적합성을 보장한 것으로
/// 보고 타입 필터를 건너뛴다 (연산 매칭은 그대로 수행).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultChainResolver;

impl ChainResolver for DefaultChainResolver {
    fn resolve(
        &self,
        config: &ProxyConfiguration,
        operation: &str,
        target_type: &str,
    ) -> Result<Vec<ChainEntry>> {
        let registry = config.adapter_registry();
        let advisors = config.advisors();
        let pre_filtered = config.is_pre_filtered();
        let mut chain = Vec::with_capacity(advisors.len());

        for advisor in advisors.iter() {
            if let Some(introduction) = advisor.as_introduction() {
                // introduction은 타입 단위로만 판정
                if pre_filtered || introduction.matches_type(target_type) {
                    for interceptor in registry.interceptors(advisor)? {
                        chain.push(ChainEntry::Interceptor(interceptor));
                    }
                }
                continue;
            }

            let pointcut = advisor.pointcut();
            if !pre_filtered && !pointcut.matches_type(target_type) {
                continue;
            }
            if !pointcut.matches(operation, target_type) {
                continue;
            }

            let interceptors = registry.interceptors(advisor)?;
            if pointcut.is_dynamic() {
                // 인자 수준 검사는 호출 시점으로 미룬다
                for interceptor in interceptors {
                    chain.push(ChainEntry::Dynamic {
                        interceptor,
                        pointcut: pointcut.clone(),
                    });
                }
            } else {
                for interceptor in interceptors {
                    chain.push(ChainEntry::Interceptor(interceptor));
                }
            }
        }

        trace!(
            operation,
            target_type,
            entries = chain.len(),
            "resolved interceptor chain"
        );
        Ok(chain)
    }
}
