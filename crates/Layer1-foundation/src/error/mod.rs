//! Error types for WeaveCode
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// WeaveCode 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정(Configuration) 관련
    // ========================================================================
    #[error("Cannot {operation}: configuration is frozen")]
    ConfigurationFrozen { operation: String },

    #[error("Position {position} is out of bounds: this configuration only has {size} advisors")]
    InvalidPosition { position: usize, size: usize },

    #[error("Invalid introduction: advice does not implement interface '{interface}'")]
    InvalidIntroduction { interface: String },

    #[error("Dynamic introduction advice may only be added as part of an introduction advisor")]
    RequiresIntroductionAdvisor,

    // ========================================================================
    // 어댑터(Adapter) 관련
    // ========================================================================
    #[error("Unknown advice type: {0}")]
    UnknownAdviceType(String),

    // ========================================================================
    // 팩토리(Factory) 관련
    // ========================================================================
    #[error("Target required after globals")]
    GlobalsRequireTarget,

    #[error("Cannot determine target type for proxy")]
    TargetTypeUndetermined,

    #[error("No component registry available anymore - cannot resolve '{0}'")]
    FactoryUnavailable(String),

    // ========================================================================
    // 레지스트리(Registry) 관련
    // ========================================================================
    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    // ========================================================================
    // 호출(Invocation) 관련
    // ========================================================================
    #[error("Target error: {0}")]
    Target(String),

    #[error("Invocation error: {0}")]
    Invocation(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("Pattern error: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// 동결 상태 위반 에러 생성
    pub fn frozen(operation: impl Into<String>) -> Self {
        Self::ConfigurationFrozen {
            operation: operation.into(),
        }
    }

    /// 동결 위반 여부
    pub fn is_frozen(&self) -> bool {
        matches!(self, Self::ConfigurationFrozen { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frozen_message() {
        let err = Error::frozen("add advisor");
        assert_eq!(
            err.to_string(),
            "Cannot add advisor: configuration is frozen"
        );
        assert!(err.is_frozen());
    }

    #[test]
    fn test_invalid_position_message() {
        let err = Error::InvalidPosition {
            position: 3,
            size: 1,
        };
        assert!(err.to_string().contains("3"));
        assert!(err.to_string().contains("1 advisors"));
    }

    #[test]
    fn test_pattern_conversion() {
        // 잘못된 glob 패턴은 Pattern 에러로 변환
        let result: Result<glob::Pattern> = glob::Pattern::new("[").map_err(Into::into);
        assert!(matches!(result, Err(Error::Pattern(_))));
    }
}
