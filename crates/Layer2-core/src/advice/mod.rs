//! Advice 타입 정의
//!
//! 횡단 관심사(cross-cutting) 동작 단위. `Advice`는 개방형 trait이며,
//! 표준 실행 형태는 `Interceptor` 하나로 수렴한다. before / after-returning /
//! throws 같은 내장 형태는 어댑터 레지스트리를 거쳐 `Interceptor`로 변환된다.

use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use weave_foundation::{Error, Result};

mod interceptor;

pub use interceptor::{AfterReturningInterceptor, BeforeAdviceInterceptor, ThrowsInterceptor};

// ============================================================================
// Invocation - 진행 중인 호출 1건
// ============================================================================

/// 진행 중인 호출 컨텍스트
///
/// 인터셉터는 `proceed()`로 체인의 다음 단계(마지막은 대상 객체)를 실행한다.
pub trait Invocation: Send {
    /// 연산 이름
    fn operation(&self) -> &str;

    /// 대상 타입 이름 (미상이면 빈 문자열)
    fn target_type(&self) -> &str;

    /// 호출 인자
    fn args(&self) -> &Value;

    /// 인자 교체 (다음 단계부터 적용)
    fn set_args(&mut self, args: Value);

    /// 체인의 다음 단계를 실행하고 결과를 반환
    fn proceed(&mut self) -> Result<Value>;
}

// ============================================================================
// Advice - 개방형 동작 단위
// ============================================================================

/// 횡단 동작 단위
///
/// 닫힌 enum 대신 캐스팅 hook으로 형태를 판별한다. 내장 형태를 구현하는
/// 타입은 대응하는 `into_*` hook을 재정의해야 한다 (예: `Interceptor`
/// 구현체는 `into_interceptor`가 `Some(self)`를 돌려주도록). 외부에서
/// 정의하는 형태는 `as_any` 다운캐스트로 자체 어댑터에서 판별한다.
pub trait Advice: Send + Sync + 'static {
    /// 커스텀 어댑터용 다운캐스트 hook
    fn as_any(&self) -> &dyn Any;

    /// 표준 인터셉터라면 자신을 반환
    fn into_interceptor(self: Arc<Self>) -> Option<Arc<dyn Interceptor>> {
        None
    }

    /// before-call 형태라면 자신을 반환
    fn into_before(self: Arc<Self>) -> Option<Arc<dyn BeforeAdvice>> {
        None
    }

    /// after-normal-return 형태라면 자신을 반환
    fn into_after_returning(self: Arc<Self>) -> Option<Arc<dyn AfterReturningAdvice>> {
        None
    }

    /// on-thrown-error 형태라면 자신을 반환
    fn into_throws(self: Arc<Self>) -> Option<Arc<dyn ThrowsAdvice>> {
        None
    }

    /// introduction을 스스로 기술하는 advice라면 그 정보
    fn introduction_info(&self) -> Option<&dyn IntroductionInfo> {
        None
    }

    /// 동적 introduction advice 여부
    fn as_dynamic_introduction(&self) -> Option<&dyn DynamicIntroduction> {
        None
    }
}

// ============================================================================
// Interceptor - 표준 실행 단위
// ============================================================================

/// 표준(canonical) 인터셉터
///
/// 체인에 들어가는 최종 실행 형태. 구현체는 `Advice`의 `into_interceptor`
/// hook도 함께 재정의해야 한다.
pub trait Interceptor: Advice {
    /// 호출을 가로채 실행. 결과를 직접 만들거나 `invocation.proceed()`로
    /// 다음 단계에 위임한다.
    fn invoke(&self, invocation: &mut dyn Invocation) -> Result<Value>;
}

// ============================================================================
// 내장 advice 형태
// ============================================================================

/// before-call advice: 대상 실행 전에 관찰/검증
///
/// 에러를 반환하면 대상 실행이 차단되고 에러가 호출자에게 전파된다.
pub trait BeforeAdvice: Send + Sync {
    fn before(&self, operation: &str, args: &Value) -> Result<()>;
}

/// after-normal-return advice: 정상 반환 후에 관찰
///
/// 대상이 에러를 낸 경우에는 호출되지 않는다.
pub trait AfterReturningAdvice: Send + Sync {
    fn after_returning(&self, result: &Value, operation: &str, args: &Value) -> Result<()>;
}

/// on-thrown-error advice: 에러 전파 경로에서 관찰
pub trait ThrowsAdvice: Send + Sync {
    /// 체인 아래쪽에서 올라온 에러를 처리한다.
    ///
    /// `None`이면 원래 에러를 그대로 전파, `Some(outcome)`이면 해당
    /// 결과(성공 또는 대체 에러)로 바꾼다.
    fn on_error(&self, error: &Error, operation: &str, args: &Value) -> Option<Result<Value>>;
}

// ============================================================================
// Introduction 형태
// ============================================================================

/// 프록시에 추가 인터페이스를 노출하는 advice의 자기 기술 정보
pub trait IntroductionInfo {
    /// 이 advice가 구현을 제공하는 인터페이스 이름 목록
    fn introduced_interfaces(&self) -> Vec<String>;
}

/// 동적 introduction advice
///
/// 추가 인터페이스를 선언하지만 스스로 기술하지 않으므로, 반드시
/// introduction advisor에 감싸져야만 설정에 추가될 수 있다.
pub trait DynamicIntroduction: Send + Sync {
    /// 주어진 인터페이스를 구현하는지 여부
    fn implements_interface(&self, interface: &str) -> bool;
}
