//! Registry - 이름 기반 컴포넌트 조회
//!
//! 선언적 설정 리더가 채워 넣는 조회 레지스트리와의 경계. 팩토리는 이
//! 계약(`ComponentLookup`)만 소비한다. 테스트와 단독 사용을 위한
//! 인메모리 구현(`StaticComponentRegistry`)을 함께 제공한다.

use crate::advice::Advice;
use crate::advisor::Advisor;
use crate::target::{TargetObject, TargetSource};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use weave_foundation::{Error, Result};

mod entry;

pub use entry::{ComponentMetadata, ComponentScope};

// ============================================================================
// Component - 레지스트리가 공급하는 값
// ============================================================================

/// 이름으로 조회되는 컴포넌트 값
#[derive(Clone)]
pub enum Component {
    /// 횡단 동작 단위
    Advice(Arc<dyn Advice>),
    /// Pointcut이 결합된 advisor
    Advisor(Arc<dyn Advisor>),
    /// 프록시 대상 객체
    Target(Arc<dyn TargetObject>),
    /// 대상 공급자
    TargetSource(Arc<dyn TargetSource>),
}

impl Component {
    /// 컴포넌트 종류
    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::Advice(_) => ComponentType::Advice,
            Self::Advisor(_) => ComponentType::Advisor,
            Self::Target(_) => ComponentType::Target,
            Self::TargetSource(_) => ComponentType::TargetSource,
        }
    }

    /// 진단 메시지용 설명
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Advice(_) => "advice component",
            Self::Advisor(_) => "advisor component",
            Self::Target(_) => "target component",
            Self::TargetSource(_) => "target source component",
        }
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

/// 레지스트리가 보고하는 컴포넌트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    Advice,
    Advisor,
    Target,
    TargetSource,
}

impl ComponentType {
    /// advisor 또는 advice 계열인지 (체인에 들어갈 수 있는지)
    pub fn is_advice_or_advisor(&self) -> bool {
        matches!(self, Self::Advice | Self::Advisor)
    }
}

// ============================================================================
// ComponentLookup - 팩토리가 소비하는 최소 계약
// ============================================================================

/// 전역 그룹 확장 후보
pub struct AdvisorCandidate {
    pub name: String,
    pub component: Component,
    pub priority: Option<i32>,
}

/// 이름 기반 조회 레지스트리 계약
pub trait ComponentLookup: Send + Sync {
    /// 이름으로 컴포넌트 획득. 없으면 에러
    fn get_component(&self, name: &str) -> Result<Component>;

    /// 이름의 컴포넌트 종류. 보고할 수 없으면 None
    fn get_component_type(&self, name: &str) -> Option<ComponentType>;

    /// 이름이 singleton 스코프인지 (미등록 이름은 true로 취급)
    fn is_singleton_scoped(&self, name: &str) -> bool;

    /// 주어진 종류로 등록된 모든 컴포넌트 (전역 그룹 확장용)
    fn find_by_type(&self, component_type: ComponentType) -> Vec<AdvisorCandidate>;
}

// ============================================================================
// StaticComponentRegistry - 인메모리 구현
// ============================================================================

enum ComponentSource {
    /// 공유 인스턴스
    Instance(Component),
    /// 조회마다 새로 공급
    Provider(Arc<dyn Fn() -> Component + Send + Sync>),
}

struct RegistryEntry {
    source: ComponentSource,
    metadata: ComponentMetadata,
}

/// 인메모리 컴포넌트 레지스트리
pub struct StaticComponentRegistry {
    entries: RwLock<HashMap<String, RegistryEntry>>,
    name: String,
}

impl StaticComponentRegistry {
    /// 새 레지스트리 생성
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            name: name.into(),
        }
    }

    /// singleton 스코프 컴포넌트 등록
    pub fn register(&self, name: impl Into<String>, component: Component) {
        let name = name.into();
        self.register_with_metadata(component, ComponentMetadata::new(&name));
    }

    /// 우선순위를 지정해 singleton 컴포넌트 등록
    pub fn register_with_priority(
        &self,
        name: impl Into<String>,
        component: Component,
        priority: i32,
    ) {
        let name = name.into();
        self.register_with_metadata(
            component,
            ComponentMetadata::new(&name).with_priority(priority),
        );
    }

    /// prototype 스코프 컴포넌트 등록 (조회마다 공급 클로저 호출)
    pub fn register_prototype(
        &self,
        name: impl Into<String>,
        provider: impl Fn() -> Component + Send + Sync + 'static,
    ) {
        let name = name.into();
        let metadata = ComponentMetadata::new(&name).with_scope(ComponentScope::Prototype);
        let mut entries = self.entries.write();
        debug!("[{}] Registered prototype: {}", self.name, name);
        entries.insert(
            name,
            RegistryEntry {
                source: ComponentSource::Provider(Arc::new(provider)),
                metadata,
            },
        );
    }

    /// 메타데이터를 직접 지정해 등록
    pub fn register_with_metadata(&self, component: Component, metadata: ComponentMetadata) {
        let mut entries = self.entries.write();
        debug!("[{}] Registered: {}", self.name, metadata.name);
        entries.insert(
            metadata.name.clone(),
            RegistryEntry {
                source: ComponentSource::Instance(component),
                metadata,
            },
        );
    }

    /// 항목 등록 해제
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.entries.write().remove(name).is_some();
        if removed {
            debug!("[{}] Unregistered: {}", self.name, name);
        }
        removed
    }

    /// 항목 존재 여부
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// 등록된 항목 수
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// 비어있는지 확인
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// 항목 메타데이터 조회
    pub fn metadata(&self, name: &str) -> Option<ComponentMetadata> {
        self.entries.read().get(name).map(|e| e.metadata.clone())
    }
}

impl ComponentLookup for StaticComponentRegistry {
    fn get_component(&self, name: &str) -> Result<Component> {
        let entries = self.entries.read();
        let entry = entries
            .get(name)
            .ok_or_else(|| Error::ComponentNotFound(name.to_string()))?;
        match &entry.source {
            ComponentSource::Instance(component) => Ok(component.clone()),
            ComponentSource::Provider(provider) => Ok(provider()),
        }
    }

    fn get_component_type(&self, name: &str) -> Option<ComponentType> {
        let entries = self.entries.read();
        let entry = entries.get(name)?;
        match &entry.source {
            ComponentSource::Instance(component) => Some(component.component_type()),
            // provider 기반 항목은 한 번 공급받아 종류를 본다
            ComponentSource::Provider(provider) => Some(provider().component_type()),
        }
    }

    fn is_singleton_scoped(&self, name: &str) -> bool {
        self.entries
            .read()
            .get(name)
            .map(|e| e.metadata.is_singleton())
            .unwrap_or(true)
    }

    fn find_by_type(&self, component_type: ComponentType) -> Vec<AdvisorCandidate> {
        let entries = self.entries.read();
        let mut candidates: Vec<AdvisorCandidate> = entries
            .iter()
            .filter_map(|(name, entry)| {
                let component = match &entry.source {
                    ComponentSource::Instance(c) => c.clone(),
                    ComponentSource::Provider(provider) => provider(),
                };
                if component.component_type() == component_type {
                    Some(AdvisorCandidate {
                        name: name.clone(),
                        component,
                        priority: entry.metadata.priority,
                    })
                } else {
                    None
                }
            })
            .collect();
        // HashMap 순회 순서를 이름순으로 고정
        candidates.sort_by(|a, b| a.name.cmp(&b.name));
        candidates
    }
}
