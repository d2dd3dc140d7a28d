//! Config - 프록시 구성 상태
//!
//! `ProxyConfiguration`은 대상 소스, 노출 인터페이스 집합, 순서 있는
//! advisor 목록, 그리고 연산별 체인 캐시를 하나로 묶는다. 구조 변경은
//! 구성 단위 뮤텍스로 직렬화하고, 체인 해석의 캐시 히트 경로는 그
//! 뮤텍스를 치지 않는다. 모든 구조 변경은 캐시 전체를 비운다.

use crate::adapter::{global_adapter_registry, AdviceAdapterRegistry};
use crate::advice::Advice;
use crate::advisor::{Advisor, DefaultIntroductionAdvisor, DefaultPointcutAdvisor};
use crate::chain::{ChainEntry, ChainResolver, DefaultChainResolver};
use crate::target::{EmptyTargetSource, SingletonTargetSource, TargetObject, TargetSource};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;
use weave_foundation::{Error, Result};

mod lifecycle;

pub use lifecycle::{ConfigurationLifecycle, ConfigurationListener};

// ============================================================================
// OperationKey - 체인 캐시 키
// ============================================================================

/// 연산 식별자만으로 캐시를 구분한다
///
/// 하나의 구성은 한 타입 계열만 프록시하므로 타입은 키에 넣지 않는다.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationKey(String);

impl OperationKey {
    pub fn new(operation: impl Into<String>) -> Self {
        Self(operation.into())
    }

    pub fn operation(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// ProxyConfiguration
// ============================================================================

/// 뮤텍스로 보호되는 구조 상태
struct ConfigState {
    target_source: Arc<dyn TargetSource>,
    interfaces: Vec<String>,
    advisors: Vec<Arc<dyn Advisor>>,
    adapter_registry: Arc<AdviceAdapterRegistry>,
    resolver: Arc<dyn ChainResolver>,
}

/// 하나의 프록시가 실행할 동작 집합에 대한 가변 기록
///
/// advisor 목록과 인터페이스 집합은 이 구성이 단독 소유한다.
/// 대상 소스는 교체 가능하며 교체 시 이전 참조는 버린다.
pub struct ProxyConfiguration {
    state: Mutex<ConfigState>,
    /// 해석기가 잠금 없이 읽는 advisor 스냅샷
    snapshot: RwLock<Arc<Vec<Arc<dyn Advisor>>>>,
    chain_cache: RwLock<HashMap<OperationKey, Arc<Vec<ChainEntry>>>>,
    frozen: AtomicBool,
    pre_filtered: AtomicBool,
}

impl ProxyConfiguration {
    /// 빈 구성을 만든다 (대상 없음, advisor 없음)
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ConfigState {
                target_source: Arc::new(EmptyTargetSource::new()),
                interfaces: Vec::new(),
                advisors: Vec::new(),
                adapter_registry: global_adapter_registry(),
                resolver: Arc::new(DefaultChainResolver),
            }),
            snapshot: RwLock::new(Arc::new(Vec::new())),
            chain_cache: RwLock::new(HashMap::new()),
            frozen: AtomicBool::new(false),
            pre_filtered: AtomicBool::new(false),
        }
    }

    // ------------------------------------------------------------------
    // 동결 / 사전 필터
    // ------------------------------------------------------------------

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// 동결 상태를 바꾼다. 바뀌면 캐시를 비운다.
    ///
    /// 상태 뮤텍스를 잡고 바꾸므로 진행 중인 구조 변경과 직렬화된다.
    /// 동결이 보인 뒤에 변경이 끼어드는 일은 없다.
    pub fn set_frozen(&self, frozen: bool) {
        let _state = self.state.lock();
        let previous = self.frozen.swap(frozen, Ordering::AcqRel);
        if previous != frozen {
            self.chain_cache.write().clear();
        }
    }

    pub fn is_pre_filtered(&self) -> bool {
        self.pre_filtered.load(Ordering::Acquire)
    }

    pub fn set_pre_filtered(&self, pre_filtered: bool) {
        self.pre_filtered.store(pre_filtered, Ordering::Release);
    }

    /// 상태 뮤텍스를 든 채 부른다. 가드 참조를 받아 이를 강제한다.
    fn check_not_frozen(&self, _state: &ConfigState, operation: &str) -> Result<()> {
        if self.is_frozen() {
            return Err(Error::frozen(operation));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // 대상
    // ------------------------------------------------------------------

    /// 고정 대상 하나를 감싼 소스를 건다
    pub fn set_target(&self, target: Arc<dyn TargetObject>) {
        self.set_target_source(Arc::new(SingletonTargetSource::new(target)));
    }

    pub fn set_target_source(&self, target_source: Arc<dyn TargetSource>) {
        self.state.lock().target_source = target_source;
    }

    /// 대상 인스턴스 없이 타입 이름만 기록한다
    pub fn set_target_type(&self, type_name: impl Into<String>) {
        self.set_target_source(Arc::new(EmptyTargetSource::for_type(type_name)));
    }

    pub fn target_source(&self) -> Arc<dyn TargetSource> {
        self.state.lock().target_source.clone()
    }

    pub fn target_type(&self) -> Option<String> {
        self.state.lock().target_source.target_type()
    }

    // ------------------------------------------------------------------
    // 인터페이스 집합
    // ------------------------------------------------------------------

    /// 중복 없이 추가한다. 실제로 추가됐을 때만 true.
    pub fn add_interface(&self, interface: impl Into<String>) -> Result<bool> {
        let interface = interface.into();
        let mut state = self.state.lock();
        self.check_not_frozen(&state, "add interface")?;
        if state.interfaces.contains(&interface) {
            return Ok(false);
        }
        state.interfaces.push(interface);
        self.invalidate(&state);
        Ok(true)
    }

    pub fn remove_interface(&self, interface: &str) -> Result<bool> {
        let mut state = self.state.lock();
        self.check_not_frozen(&state, "remove interface")?;
        let before = state.interfaces.len();
        state.interfaces.retain(|existing| existing != interface);
        let removed = state.interfaces.len() != before;
        if removed {
            self.invalidate(&state);
        }
        Ok(removed)
    }

    /// 집합을 통째로 교체한다 (비우고 다시 추가, 중복 제거)
    pub fn set_interfaces(&self, interfaces: Vec<String>) -> Result<()> {
        let mut state = self.state.lock();
        self.check_not_frozen(&state, "set interfaces")?;
        state.interfaces.clear();
        for interface in interfaces {
            if !state.interfaces.contains(&interface) {
                state.interfaces.push(interface);
            }
        }
        self.invalidate(&state);
        Ok(())
    }

    pub fn is_interface_proxied(&self, interface: &str) -> bool {
        self.state
            .lock()
            .interfaces
            .iter()
            .any(|existing| existing == interface)
    }

    pub fn interfaces(&self) -> Vec<String> {
        self.state.lock().interfaces.clone()
    }

    // ------------------------------------------------------------------
    // advisor 목록
    // ------------------------------------------------------------------

    pub fn advisor_count(&self) -> usize {
        self.snapshot.read().len()
    }

    /// 현재 advisor 목록의 스냅샷
    pub fn advisors(&self) -> Arc<Vec<Arc<dyn Advisor>>> {
        self.snapshot.read().clone()
    }

    /// 맨 뒤에 추가한다
    pub fn add_advisor(&self, advisor: Arc<dyn Advisor>) -> Result<()> {
        let position = self.advisor_count();
        self.add_advisor_at(position, advisor)
    }

    /// 지정 위치에 끼워 넣는다
    pub fn add_advisor_at(&self, position: usize, advisor: Arc<dyn Advisor>) -> Result<()> {
        let mut state = self.state.lock();
        self.check_not_frozen(&state, "add advisor")?;
        self.insert_advisor(&mut state, position, advisor)
    }

    /// 상태 뮤텍스를 든 채 삽입한다. 검증이 끝나기 전에는 아무것도 바꾸지 않는다.
    fn insert_advisor(
        &self,
        state: &mut ConfigState,
        position: usize,
        advisor: Arc<dyn Advisor>,
    ) -> Result<()> {
        if position > state.advisors.len() {
            return Err(Error::InvalidPosition {
                position,
                size: state.advisors.len(),
            });
        }
        if let Some(introduction) = advisor.as_introduction() {
            introduction.validate_interfaces()?;
            for interface in introduction.interfaces() {
                if !state.interfaces.contains(&interface) {
                    state.interfaces.push(interface);
                }
            }
        }
        state.advisors.insert(position, advisor);
        self.invalidate(state);
        Ok(())
    }

    pub fn add_advisors(&self, advisors: Vec<Arc<dyn Advisor>>) -> Result<()> {
        for advisor in advisors {
            self.add_advisor(advisor)?;
        }
        Ok(())
    }

    /// 인덱스로 제거한다. introduction advisor였다면 그 인터페이스 중
    /// 남은 advisor가 선언하지 않는 것만 집합에서 걷어낸다.
    pub fn remove_advisor_at(&self, index: usize) -> Result<()> {
        let mut state = self.state.lock();
        self.check_not_frozen(&state, "remove advisor")?;
        self.take_advisor(&mut state, index)
    }

    /// 상태 뮤텍스를 든 채 제거한다
    fn take_advisor(&self, state: &mut ConfigState, index: usize) -> Result<()> {
        if index >= state.advisors.len() {
            return Err(Error::InvalidPosition {
                position: index,
                size: state.advisors.len(),
            });
        }
        let removed = state.advisors.remove(index);
        if let Some(introduction) = removed.as_introduction() {
            for interface in introduction.interfaces() {
                let still_declared = state.advisors.iter().any(|remaining| {
                    remaining
                        .as_introduction()
                        .map_or(false, |other| other.interfaces().contains(&interface))
                });
                if !still_declared {
                    state.interfaces.retain(|existing| existing != &interface);
                }
            }
        }
        self.invalidate(state);
        Ok(())
    }

    /// 참조로 제거한다. 목록에 없었으면 false.
    pub fn remove_advisor(&self, advisor: &Arc<dyn Advisor>) -> Result<bool> {
        let mut state = self.state.lock();
        self.check_not_frozen(&state, "remove advisor")?;
        let position = state
            .advisors
            .iter()
            .position(|existing| Arc::ptr_eq(existing, advisor));
        match position {
            Some(index) => {
                self.take_advisor(&mut state, index)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// 포인터 동일성으로 위치를 찾는다
    pub fn index_of(&self, advisor: &Arc<dyn Advisor>) -> Option<usize> {
        self.snapshot
            .read()
            .iter()
            .position(|existing| Arc::ptr_eq(existing, advisor))
    }

    /// old를 제거하고 같은 위치에 new를 넣는다. old가 없으면 false.
    ///
    /// new의 introduction 검증은 old를 건드리기 전에 끝낸다.
    /// 검증에 실패하면 목록은 그대로다.
    pub fn replace_advisor(
        &self,
        old: &Arc<dyn Advisor>,
        new: Arc<dyn Advisor>,
    ) -> Result<bool> {
        let mut state = self.state.lock();
        self.check_not_frozen(&state, "replace advisor")?;
        let index = match state
            .advisors
            .iter()
            .position(|existing| Arc::ptr_eq(existing, old))
        {
            Some(index) => index,
            None => return Ok(false),
        };
        if let Some(introduction) = new.as_introduction() {
            introduction.validate_interfaces()?;
        }
        self.take_advisor(&mut state, index)?;
        self.insert_advisor(&mut state, index, new)?;
        Ok(true)
    }

    // ------------------------------------------------------------------
    // advice 편의 연산
    // ------------------------------------------------------------------

    /// advice를 advisor로 감싸 맨 뒤에 추가한다
    ///
    /// introduction 정보를 스스로 기술하는 advice는 introduction
    /// advisor로, 그 외는 항상 매칭되는 advisor로 감싼다. 동적
    /// introduction advice는 자동으로 감쌀 수 없으므로 거부한다.
    pub fn add_advice(&self, advice: Arc<dyn Advice>) -> Result<()> {
        let position = self.advisor_count();
        self.add_advice_at(position, advice)
    }

    pub fn add_advice_at(&self, position: usize, advice: Arc<dyn Advice>) -> Result<()> {
        if advice.introduction_info().is_some() {
            return self.add_advisor_at(position, Arc::new(DefaultIntroductionAdvisor::new(advice)));
        }
        if advice.as_dynamic_introduction().is_some() {
            return Err(Error::RequiresIntroductionAdvisor);
        }
        self.add_advisor_at(position, Arc::new(DefaultPointcutAdvisor::always(advice)))
    }

    /// 해당 advice를 드는 첫 advisor를 제거한다
    pub fn remove_advice(&self, advice: &Arc<dyn Advice>) -> Result<bool> {
        let mut state = self.state.lock();
        self.check_not_frozen(&state, "remove advice")?;
        let position = state.advisors.iter().position(|advisor| {
            advisor.prototype_placeholder().is_none() && Arc::ptr_eq(&advisor.advice(), advice)
        });
        match position {
            Some(index) => {
                self.take_advisor(&mut state, index)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn index_of_advice(&self, advice: &Arc<dyn Advice>) -> Option<usize> {
        self.snapshot.read().iter().position(|advisor| {
            advisor.prototype_placeholder().is_none() && Arc::ptr_eq(&advisor.advice(), advice)
        })
    }

    pub fn advice_included(&self, advice: &Arc<dyn Advice>) -> bool {
        self.index_of_advice(advice).is_some()
    }

    /// 구체 타입 A의 advice를 드는 advisor 수
    pub fn count_advices_of_type<A: 'static>(&self) -> usize {
        self.snapshot
            .read()
            .iter()
            .filter(|advisor| advisor.prototype_placeholder().is_none())
            .filter(|advisor| advisor.advice().as_any().is::<A>())
            .count()
    }

    // ------------------------------------------------------------------
    // 해석기 / 어댑터 레지스트리
    // ------------------------------------------------------------------

    pub fn set_chain_resolver(&self, resolver: Arc<dyn ChainResolver>) {
        self.state.lock().resolver = resolver;
        self.chain_cache.write().clear();
    }

    pub fn set_adapter_registry(&self, registry: Arc<AdviceAdapterRegistry>) {
        self.state.lock().adapter_registry = registry;
        self.chain_cache.write().clear();
    }

    pub fn adapter_registry(&self) -> Arc<AdviceAdapterRegistry> {
        self.state.lock().adapter_registry.clone()
    }

    // ------------------------------------------------------------------
    // 체인 해석
    // ------------------------------------------------------------------

    /// 연산에 적용될 체인을 돌려준다. 캐시 히트면 같은 객체를 공유한다.
    ///
    /// 미스 시 재계산 경쟁은 허용한다. 해석은 결정적이므로 늦게 쓴
    /// 쪽이 동등한 값을 덮어쓸 뿐이다.
    pub fn resolve_chain(&self, operation: &str, target_type: &str) -> Result<Arc<Vec<ChainEntry>>> {
        let key = OperationKey::new(operation);
        if let Some(chain) = self.chain_cache.read().get(&key) {
            return Ok(chain.clone());
        }

        let resolver = self.state.lock().resolver.clone();
        let chain = Arc::new(resolver.resolve(self, operation, target_type)?);
        self.chain_cache
            .write()
            .insert(key, chain.clone());
        Ok(chain)
    }

    /// 스냅샷을 갱신하고 캐시 전체를 버린다. 상태 뮤텍스를 든 채 부른다.
    fn invalidate(&self, state: &ConfigState) {
        *self.snapshot.write() = Arc::new(state.advisors.clone());
        self.chain_cache.write().clear();
    }

    // ------------------------------------------------------------------
    // 복사
    // ------------------------------------------------------------------

    /// 다른 구성의 내용을 이 구성으로 복사한다
    pub fn copy_configuration_from(&self, other: &ProxyConfiguration) -> Result<()> {
        let advisors = other.advisors().as_ref().clone();
        self.copy_from(other, other.target_source(), advisors)
    }

    /// 대상 소스와 advisor 목록을 바꿔 끼우며 복사한다
    ///
    /// advisor는 add 경로를 다시 타므로 introduction 검증도 다시 한다.
    pub fn copy_from(
        &self,
        other: &ProxyConfiguration,
        target_source: Arc<dyn TargetSource>,
        advisors: Vec<Arc<dyn Advisor>>,
    ) -> Result<()> {
        debug!(
            advisors = advisors.len(),
            "copying proxy configuration"
        );
        let adapter_registry = other.adapter_registry();
        let resolver = other.state.lock().resolver.clone();
        let interfaces = other.interfaces();
        self.set_target_source(target_source);
        self.set_pre_filtered(other.is_pre_filtered());
        {
            let mut state = self.state.lock();
            state.adapter_registry = adapter_registry;
            state.resolver = resolver;
            state.interfaces = interfaces;
            state.advisors.clear();
            self.invalidate(&state);
        }
        self.add_advisors(advisors)?;
        self.set_frozen(other.is_frozen());
        Ok(())
    }
}

impl Default for ProxyConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProxyConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        write!(
            f,
            "{} interfaces [{}]; {} advisors; targetSource [{}]; frozen: {}; preFiltered: {}",
            state.interfaces.len(),
            state.interfaces.join(", "),
            state.advisors.len(),
            state
                .target_source
                .target_type()
                .unwrap_or_else(|| "none".into()),
            self.is_frozen(),
            self.is_pre_filtered(),
        )
    }
}
