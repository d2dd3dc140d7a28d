//! Adapter - 이질적인 advice를 표준 인터셉터로 변환
//!
//! 등록 순서대로 검사되는 개방형 어댑터 목록. advice 형태가 여러 단계를
//! 필요로 하면 어댑터 여러 개가 각각 인터셉터를 보탠다 (누적, 첫 매칭이
//! 아님). 내장 어댑터는 before / after-normal-return / on-thrown-error
//! 세 형태를 다룬다.

use crate::advice::{
    Advice, AfterReturningInterceptor, BeforeAdviceInterceptor, Interceptor, ThrowsInterceptor,
};
use crate::advisor::{Advisor, DefaultPointcutAdvisor};
use crate::registry::Component;
use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::sync::Arc;
use weave_foundation::{Error, Result};

// ============================================================================
// AdviceAdapter trait
// ============================================================================

/// advice 형태 하나를 표준 인터셉터로 변환하는 단위
pub trait AdviceAdapter: Send + Sync {
    /// 이 어댑터가 주어진 advice를 다룰 수 있는지
    fn supports_advice(&self, advice: &Arc<dyn Advice>) -> bool;

    /// advisor의 advice를 실행 단계 인터셉터로 변환
    ///
    /// `supports_advice`가 true인 advisor에 대해서만 호출된다.
    fn interceptor(&self, advisor: &Arc<dyn Advisor>) -> Result<Arc<dyn Interceptor>>;
}

// ============================================================================
// 내장 어댑터
// ============================================================================

/// before-call advice 어댑터
struct BeforeAdviceAdapter;

impl AdviceAdapter for BeforeAdviceAdapter {
    fn supports_advice(&self, advice: &Arc<dyn Advice>) -> bool {
        advice.clone().into_before().is_some()
    }

    fn interceptor(&self, advisor: &Arc<dyn Advisor>) -> Result<Arc<dyn Interceptor>> {
        let advice = advisor.advice().into_before().ok_or_else(|| {
            Error::UnknownAdviceType("advisor advice is not a before advice".to_string())
        })?;
        Ok(Arc::new(BeforeAdviceInterceptor::new(advice)))
    }
}

/// after-normal-return advice 어댑터
struct AfterReturningAdviceAdapter;

impl AdviceAdapter for AfterReturningAdviceAdapter {
    fn supports_advice(&self, advice: &Arc<dyn Advice>) -> bool {
        advice.clone().into_after_returning().is_some()
    }

    fn interceptor(&self, advisor: &Arc<dyn Advisor>) -> Result<Arc<dyn Interceptor>> {
        let advice = advisor.advice().into_after_returning().ok_or_else(|| {
            Error::UnknownAdviceType("advisor advice is not an after-returning advice".to_string())
        })?;
        Ok(Arc::new(AfterReturningInterceptor::new(advice)))
    }
}

/// on-thrown-error advice 어댑터
struct ThrowsAdviceAdapter;

impl AdviceAdapter for ThrowsAdviceAdapter {
    fn supports_advice(&self, advice: &Arc<dyn Advice>) -> bool {
        advice.clone().into_throws().is_some()
    }

    fn interceptor(&self, advisor: &Arc<dyn Advisor>) -> Result<Arc<dyn Interceptor>> {
        let advice = advisor.advice().into_throws().ok_or_else(|| {
            Error::UnknownAdviceType("advisor advice is not a throws advice".to_string())
        })?;
        Ok(Arc::new(ThrowsInterceptor::new(advice)))
    }
}

// ============================================================================
// AdviceAdapterRegistry
// ============================================================================

/// advice → 인터셉터 변환 레지스트리
///
/// 등록 순서가 곧 우선순위다.
pub struct AdviceAdapterRegistry {
    adapters: RwLock<Vec<Arc<dyn AdviceAdapter>>>,
}

impl AdviceAdapterRegistry {
    /// 내장 어댑터 3종이 등록된 레지스트리 생성
    pub fn new() -> Self {
        let registry = Self {
            adapters: RwLock::new(Vec::with_capacity(3)),
        };
        registry.register_adapter(Arc::new(BeforeAdviceAdapter));
        registry.register_adapter(Arc::new(AfterReturningAdviceAdapter));
        registry.register_adapter(Arc::new(ThrowsAdviceAdapter));
        registry
    }

    /// 어댑터 추가 등록 (목록 끝에 붙는다)
    pub fn register_adapter(&self, adapter: Arc<dyn AdviceAdapter>) {
        self.adapters.write().push(adapter);
    }

    /// 임의 컴포넌트를 advisor로 감싼다
    ///
    /// - 이미 advisor면 그대로 반환
    /// - 표준 인터셉터면 어댑터 없이 항상-매칭 advisor로 감싼다 (fast path)
    /// - 그 외 advice는 등록 순서대로 어댑터를 찾는다
    pub fn wrap(&self, component: Component) -> Result<Arc<dyn Advisor>> {
        let advice = match component {
            Component::Advisor(advisor) => return Ok(advisor),
            Component::Advice(advice) => advice,
            other => {
                return Err(Error::UnknownAdviceType(other.describe().to_string()));
            }
        };

        if advice.clone().into_interceptor().is_some() {
            // 표준 인터셉터는 어댑터 없이 바로 감싼다
            return Ok(Arc::new(DefaultPointcutAdvisor::always(advice)));
        }
        for adapter in self.adapters.read().iter() {
            if adapter.supports_advice(&advice) {
                return Ok(Arc::new(DefaultPointcutAdvisor::always(advice)));
            }
        }
        Err(Error::UnknownAdviceType(
            "advice accepted by no registered adapter".to_string(),
        ))
    }

    /// advisor를 실행 단계 인터셉터 목록으로 확장
    ///
    /// 표준 인터셉터는 직접 포함하고, 지원을 주장하는 모든 어댑터의
    /// 결과를 누적한다. 결과가 비면 에러.
    pub fn interceptors(&self, advisor: &Arc<dyn Advisor>) -> Result<Vec<Arc<dyn Interceptor>>> {
        let mut interceptors: Vec<Arc<dyn Interceptor>> = Vec::with_capacity(3);
        let advice = advisor.advice();

        if let Some(interceptor) = advice.clone().into_interceptor() {
            interceptors.push(interceptor);
        }
        for adapter in self.adapters.read().iter() {
            if adapter.supports_advice(&advice) {
                interceptors.push(adapter.interceptor(advisor)?);
            }
        }

        if interceptors.is_empty() {
            return Err(Error::UnknownAdviceType(
                "advisor advice yields no interceptors".to_string(),
            ));
        }
        Ok(interceptors)
    }
}

impl Default for AdviceAdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    static ref GLOBAL_ADAPTER_REGISTRY: Arc<AdviceAdapterRegistry> =
        Arc::new(AdviceAdapterRegistry::new());
}

/// 프로세스 전역 기본 어댑터 레지스트리
///
/// 여러 설정이 공유한다 (읽기 위주, 외부 소유).
pub fn global_adapter_registry() -> Arc<AdviceAdapterRegistry> {
    GLOBAL_ADAPTER_REGISTRY.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::{BeforeAdvice, Invocation, ThrowsAdvice};
    use crate::target::TargetObject;
    use serde_json::Value;
    use std::any::Any;

    struct LogBefore;

    impl Advice for LogBefore {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn into_before(self: Arc<Self>) -> Option<Arc<dyn BeforeAdvice>> {
            Some(self)
        }
    }

    impl BeforeAdvice for LogBefore {
        fn before(&self, _operation: &str, _args: &Value) -> Result<()> {
            Ok(())
        }
    }

    /// before와 throws를 동시에 구현하는 advice
    struct BeforeAndThrows;

    impl Advice for BeforeAndThrows {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn into_before(self: Arc<Self>) -> Option<Arc<dyn BeforeAdvice>> {
            Some(self)
        }

        fn into_throws(self: Arc<Self>) -> Option<Arc<dyn ThrowsAdvice>> {
            Some(self)
        }
    }

    impl BeforeAdvice for BeforeAndThrows {
        fn before(&self, _operation: &str, _args: &Value) -> Result<()> {
            Ok(())
        }
    }

    impl ThrowsAdvice for BeforeAndThrows {
        fn on_error(
            &self,
            _error: &Error,
            _operation: &str,
            _args: &Value,
        ) -> Option<Result<Value>> {
            None
        }
    }

    struct Passthrough;

    impl Advice for Passthrough {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn into_interceptor(self: Arc<Self>) -> Option<Arc<dyn Interceptor>> {
            Some(self)
        }
    }

    impl Interceptor for Passthrough {
        fn invoke(&self, invocation: &mut dyn Invocation) -> Result<Value> {
            invocation.proceed()
        }
    }

    /// 어떤 내장 형태도 아닌 advice
    struct Opaque;

    impl Advice for Opaque {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct Echo;

    impl TargetObject for Echo {
        fn type_name(&self) -> &str {
            "Echo"
        }

        fn invoke(&self, _operation: &str, args: &Value) -> Result<Value> {
            Ok(args.clone())
        }
    }

    #[test]
    fn test_wrap_advisor_passthrough() {
        let registry = AdviceAdapterRegistry::new();
        let advisor: Arc<dyn Advisor> =
            Arc::new(DefaultPointcutAdvisor::always(Arc::new(LogBefore)));
        let wrapped = registry.wrap(Component::Advisor(advisor.clone())).unwrap();
        assert!(Arc::ptr_eq(&wrapped, &advisor));
    }

    #[test]
    fn test_wrap_interceptor_fast_path() {
        let registry = AdviceAdapterRegistry::new();
        let wrapped = registry
            .wrap(Component::Advice(Arc::new(Passthrough)))
            .unwrap();
        // 인터셉터가 하나 나와야 한다
        assert_eq!(registry.interceptors(&wrapped).unwrap().len(), 1);
    }

    #[test]
    fn test_wrap_before_advice_via_adapter() {
        let registry = AdviceAdapterRegistry::new();
        let wrapped = registry
            .wrap(Component::Advice(Arc::new(LogBefore)))
            .unwrap();
        assert_eq!(registry.interceptors(&wrapped).unwrap().len(), 1);
    }

    #[test]
    fn test_wrap_unknown_advice_fails() {
        let registry = AdviceAdapterRegistry::new();
        let err = registry
            .wrap(Component::Advice(Arc::new(Opaque)))
            .err()
            .unwrap();
        assert!(matches!(err, Error::UnknownAdviceType(_)));
    }

    #[test]
    fn test_wrap_target_fails() {
        let registry = AdviceAdapterRegistry::new();
        let err = registry
            .wrap(Component::Target(Arc::new(Echo)))
            .err()
            .unwrap();
        assert!(matches!(err, Error::UnknownAdviceType(_)));
    }

    #[test]
    fn test_interceptors_accumulate_across_adapters() {
        let registry = AdviceAdapterRegistry::new();
        let advisor: Arc<dyn Advisor> =
            Arc::new(DefaultPointcutAdvisor::always(Arc::new(BeforeAndThrows)));
        // before 어댑터와 throws 어댑터가 각각 단계를 보탠다
        assert_eq!(registry.interceptors(&advisor).unwrap().len(), 2);
    }

    #[test]
    fn test_interceptors_empty_fails() {
        let registry = AdviceAdapterRegistry::new();
        let advisor: Arc<dyn Advisor> =
            Arc::new(DefaultPointcutAdvisor::always(Arc::new(Opaque)));
        let err = registry.interceptors(&advisor).err().unwrap();
        assert!(matches!(err, Error::UnknownAdviceType(_)));
    }

    #[test]
    fn test_custom_adapter_registration() {
        struct OpaqueAdapter;

        impl AdviceAdapter for OpaqueAdapter {
            fn supports_advice(&self, advice: &Arc<dyn Advice>) -> bool {
                advice.as_any().is::<Opaque>()
            }

            fn interceptor(&self, _advisor: &Arc<dyn Advisor>) -> Result<Arc<dyn Interceptor>> {
                Ok(Arc::new(Passthrough))
            }
        }

        let registry = AdviceAdapterRegistry::new();
        registry.register_adapter(Arc::new(OpaqueAdapter));

        let wrapped = registry
            .wrap(Component::Advice(Arc::new(Opaque)))
            .unwrap();
        assert_eq!(registry.interceptors(&wrapped).unwrap().len(), 1);
    }

    #[test]
    fn test_global_registry_is_shared() {
        let a = global_adapter_registry();
        let b = global_adapter_registry();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
