//! TargetSource - 프록시가 최종 위임하는 대상 공급
//!
//! 정적 소스는 고정 인스턴스 하나를, 동적 소스는 접근마다 새(또는 풀에서
//! 꺼낸) 인스턴스를 공급한다. 설정은 TargetSource를 배타적으로 소유하며
//! 교체 시 이전 참조는 버린다.

use serde_json::Value;
use std::sync::Arc;
use weave_foundation::Result;

// ============================================================================
// TargetObject - 대상 객체
// ============================================================================

/// 호출이 최종 적용되는 대상 객체
///
/// 연산은 이름으로 디스패치되고 인자는 JSON 값으로 전달된다.
pub trait TargetObject: Send + Sync {
    /// 대상 타입 이름
    fn type_name(&self) -> &str;

    /// 대상이 스스로 선언하는 인터페이스 목록 (인터페이스 자동 감지용)
    fn interfaces(&self) -> Vec<String> {
        Vec::new()
    }

    /// 연산 실행
    fn invoke(&self, operation: &str, args: &Value) -> Result<Value>;
}

// ============================================================================
// TargetSource trait
// ============================================================================

/// 대상 객체 공급자
pub trait TargetSource: Send + Sync {
    /// 공급하는 대상의 타입 이름 (알 수 없으면 None)
    fn target_type(&self) -> Option<String>;

    /// 정적 소스 여부 (항상 같은 인스턴스를 돌려주면 true)
    fn is_static(&self) -> bool;

    /// 대상 획득. 대상이 없는 소스는 `Ok(None)`
    fn get_target(&self) -> Result<Option<Arc<dyn TargetObject>>>;

    /// 대상 반환 hook (풀링 소스용; 기본은 no-op)
    fn release_target(&self, _target: Arc<dyn TargetObject>) {}

    /// 대상 없는(empty) 소스 여부
    fn is_empty(&self) -> bool {
        false
    }
}

// ============================================================================
// SingletonTargetSource - 고정 인스턴스
// ============================================================================

/// 고정 인스턴스 하나를 공급하는 정적 소스
pub struct SingletonTargetSource {
    target: Arc<dyn TargetObject>,
}

impl SingletonTargetSource {
    pub fn new(target: Arc<dyn TargetObject>) -> Self {
        Self { target }
    }
}

impl TargetSource for SingletonTargetSource {
    fn target_type(&self) -> Option<String> {
        Some(self.target.type_name().to_string())
    }

    fn is_static(&self) -> bool {
        true
    }

    fn get_target(&self) -> Result<Option<Arc<dyn TargetObject>>> {
        Ok(Some(self.target.clone()))
    }
}

// ============================================================================
// EmptyTargetSource - 대상 없음
// ============================================================================

/// 대상이 없는 소스 (동작 전부를 advisor가 공급하는 경우)
///
/// 타입 이름만 들고 있을 수도 있다.
#[derive(Debug, Clone, Default)]
pub struct EmptyTargetSource {
    type_name: Option<String>,
}

impl EmptyTargetSource {
    pub fn new() -> Self {
        Self { type_name: None }
    }

    /// 타입 이름만 아는 empty 소스
    pub fn for_type(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
        }
    }
}

impl TargetSource for EmptyTargetSource {
    fn target_type(&self) -> Option<String> {
        self.type_name.clone()
    }

    fn is_static(&self) -> bool {
        true
    }

    fn get_target(&self) -> Result<Option<Arc<dyn TargetObject>>> {
        Ok(None)
    }

    fn is_empty(&self) -> bool {
        true
    }
}

// ============================================================================
// ProviderTargetSource - 접근마다 새 인스턴스
// ============================================================================

/// 접근할 때마다 공급 클로저로 새 대상을 만드는 동적 소스
pub struct ProviderTargetSource {
    type_name: String,
    provider: Arc<dyn Fn() -> Arc<dyn TargetObject> + Send + Sync>,
}

impl ProviderTargetSource {
    pub fn new(
        type_name: impl Into<String>,
        provider: impl Fn() -> Arc<dyn TargetObject> + Send + Sync + 'static,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            provider: Arc::new(provider),
        }
    }
}

impl TargetSource for ProviderTargetSource {
    fn target_type(&self) -> Option<String> {
        Some(self.type_name.clone())
    }

    fn is_static(&self) -> bool {
        false
    }

    fn get_target(&self) -> Result<Option<Arc<dyn TargetObject>>> {
        Ok(Some((self.provider)()))
    }
}
