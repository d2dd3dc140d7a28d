//! Registry Entry - 컴포넌트 등록 항목 정의

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// ComponentScope - 컴포넌트 수명
// ============================================================================

/// 등록된 컴포넌트의 수명
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentScope {
    /// 공유 인스턴스 하나
    Singleton,

    /// 조회할 때마다 새 인스턴스
    Prototype,
}

impl Default for ComponentScope {
    fn default() -> Self {
        Self::Singleton
    }
}

impl std::fmt::Display for ComponentScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Singleton => write!(f, "singleton"),
            Self::Prototype => write!(f, "prototype"),
        }
    }
}

// ============================================================================
// ComponentMetadata - 항목 메타데이터
// ============================================================================

/// 컴포넌트 등록 항목의 메타데이터
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentMetadata {
    /// 고유 이름
    pub name: String,

    /// 수명
    pub scope: ComponentScope,

    /// 전역 그룹 확장 시 정렬에 쓰이는 우선순위 (낮을수록 먼저, 없으면 마지막)
    pub priority: Option<i32>,

    /// 등록 시간
    pub registered_at: DateTime<Utc>,
}

impl ComponentMetadata {
    /// 기본 메타데이터 생성 (singleton, 우선순위 없음)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: ComponentScope::default(),
            priority: None,
            registered_at: Utc::now(),
        }
    }

    /// 수명 지정
    pub fn with_scope(mut self, scope: ComponentScope) -> Self {
        self.scope = scope;
        self
    }

    /// 우선순위 지정
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// singleton 스코프 여부
    pub fn is_singleton(&self) -> bool {
        self.scope == ComponentScope::Singleton
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_metadata() {
        let meta = ComponentMetadata::new("audit");
        assert_eq!(meta.name, "audit");
        assert!(meta.is_singleton());
        assert_eq!(meta.priority, None);
    }

    #[test]
    fn test_builder_style() {
        let meta = ComponentMetadata::new("audit")
            .with_scope(ComponentScope::Prototype)
            .with_priority(5);
        assert!(!meta.is_singleton());
        assert_eq!(meta.priority, Some(5));
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(ComponentScope::Singleton.to_string(), "singleton");
        assert_eq!(ComponentScope::Prototype.to_string(), "prototype");
    }
}
