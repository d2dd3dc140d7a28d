//! Pointcut - advisor 적용 범위 판정
//!
//! (대상 타입, 연산) 위에서 advisor의 적용 여부를 결정하는 술어.
//! 정적 포인트컷은 체인 해석 시점에 한 번 판정되어 캐시 가능하고,
//! 동적 포인트컷은 호출 시점에 인자까지 본다.

use glob::Pattern;
use serde_json::Value;
use std::sync::Arc;
use weave_foundation::Result;

// ============================================================================
// Pointcut trait
// ============================================================================

/// advisor 적용 범위 술어
pub trait Pointcut: Send + Sync {
    /// 타입 수준 필터 (`target_type`이 미상이면 빈 문자열)
    fn matches_type(&self, _target_type: &str) -> bool {
        true
    }

    /// 정적 매칭: 타입과 연산만으로 판정 (해석 시점에 한 번 평가)
    fn matches(&self, operation: &str, target_type: &str) -> bool;

    /// 동적 포인트컷 여부
    ///
    /// true면 정적 매칭을 통과한 뒤에도 호출 시점마다 `matches_args`로
    /// 인자를 재검사한다. 해석된 체인은 그대로 캐시된다.
    fn is_dynamic(&self) -> bool {
        false
    }

    /// 호출 시점 인자 매칭 (`is_dynamic()`이 true일 때만 의미 있음)
    fn matches_args(&self, _operation: &str, _target_type: &str, _args: &Value) -> bool {
        true
    }
}

// ============================================================================
// TruePointcut - 항상 매칭
// ============================================================================

/// 항상 매칭되는 포인트컷
#[derive(Debug, Clone, Copy, Default)]
pub struct TruePointcut;

impl Pointcut for TruePointcut {
    fn matches(&self, _operation: &str, _target_type: &str) -> bool {
        true
    }
}

// ============================================================================
// GlobPointcut - 연산 이름 glob 매칭
// ============================================================================

/// 연산 이름을 glob 패턴으로 매칭하는 정적 포인트컷
///
/// 예: `"get_*"`, `"*"`, `"save"`
pub struct GlobPointcut {
    pattern: Pattern,
    /// 타입 필터 패턴 (없으면 모든 타입)
    type_pattern: Option<Pattern>,
}

impl GlobPointcut {
    /// 연산 패턴으로 생성
    pub fn new(operation_pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: Pattern::new(operation_pattern)?,
            type_pattern: None,
        })
    }

    /// 타입 필터 추가
    pub fn with_type_pattern(mut self, type_pattern: &str) -> Result<Self> {
        self.type_pattern = Some(Pattern::new(type_pattern)?);
        Ok(self)
    }
}

impl Pointcut for GlobPointcut {
    fn matches_type(&self, target_type: &str) -> bool {
        match &self.type_pattern {
            Some(pattern) => pattern.matches(target_type),
            None => true,
        }
    }

    fn matches(&self, operation: &str, _target_type: &str) -> bool {
        self.pattern.matches(operation)
    }
}

// ============================================================================
// ArgsPointcut - 동적(인자 검사) 포인트컷
// ============================================================================

/// 호출 인자를 검사하는 동적 포인트컷
///
/// 정적 부분은 내부 포인트컷에 위임하고, 통과한 호출만 인자 술어로
/// 재검사한다.
pub struct ArgsPointcut {
    static_part: Arc<dyn Pointcut>,
    predicate: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
}

impl ArgsPointcut {
    pub fn new(
        static_part: Arc<dyn Pointcut>,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            static_part,
            predicate: Arc::new(predicate),
        }
    }

    /// 정적 부분 없이 (항상 매칭) 인자 술어만으로 생성
    pub fn for_args(predicate: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Self::new(Arc::new(TruePointcut), predicate)
    }
}

impl Pointcut for ArgsPointcut {
    fn matches_type(&self, target_type: &str) -> bool {
        self.static_part.matches_type(target_type)
    }

    fn matches(&self, operation: &str, target_type: &str) -> bool {
        self.static_part.matches(operation, target_type)
    }

    fn is_dynamic(&self) -> bool {
        true
    }

    fn matches_args(&self, _operation: &str, _target_type: &str, args: &Value) -> bool {
        (self.predicate)(args)
    }
}
