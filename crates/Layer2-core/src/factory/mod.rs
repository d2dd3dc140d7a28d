//! Factory - 이름 기반 체인 조립과 수명주기
//!
//! `ChainProxyFactory`는 순서 있는 참조 이름 목록을 레지스트리에서
//! 해석해 프록시 구성을 조립한다. 뒤에 붙는 `*` 이름은 전역 그룹으로
//! 확장되고, 마지막 이름이 advisor로 해석되지 않으면 암묵적 대상으로
//! 돌린다. 싱글턴 모드는 한 번 조립한 인스턴스를 공유하고, 프로토타입
//! 모드는 접근마다 독립 구성 사본을 만든다.

use crate::advisor::{Advisor, PrototypePlaceholderAdvisor};
use crate::config::{ConfigurationLifecycle, ProxyConfiguration};
use crate::proxy::ProxyObject;
use crate::registry::{Component, ComponentLookup, ComponentType};
use crate::target::{SingletonTargetSource, TargetObject, TargetSource};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};
use weave_foundation::{Error, Result};

/// 전역 그룹 접미사. `"tx*"`는 tx로 시작하는 모든 전역 advisor를 뜻한다.
pub const GLOBAL_SUFFIX: &str = "*";

// ============================================================================
// ChainProxyFactory
// ============================================================================

struct FactoryState {
    chain_names: Vec<String>,
    target_name: Option<String>,
    registry: Option<Arc<dyn ComponentLookup>>,
    singleton: bool,
    autodetect_interfaces: bool,
    freeze_proxy: bool,
    /// 마지막 이름의 타입을 레지스트리가 모를 때 대상으로 간주할지.
    /// 문서화된 레거시 동작이라 기본값은 true.
    unknown_trailing_name_is_target: bool,
    advisor_chain_initialized: bool,
    singleton_instance: Option<ProxyObject>,
}

/// 이름 목록으로부터 프록시를 조립하는 팩토리
pub struct ChainProxyFactory {
    lifecycle: ConfigurationLifecycle,
    state: Mutex<FactoryState>,
}

impl ChainProxyFactory {
    pub fn new() -> Self {
        Self {
            lifecycle: ConfigurationLifecycle::new(),
            state: Mutex::new(FactoryState {
                chain_names: Vec::new(),
                target_name: None,
                registry: None,
                singleton: true,
                autodetect_interfaces: true,
                freeze_proxy: false,
                unknown_trailing_name_is_target: true,
                advisor_chain_initialized: false,
                singleton_instance: None,
            }),
        }
    }

    // ------------------------------------------------------------------
    // 구성 입력
    // ------------------------------------------------------------------

    pub fn config(&self) -> &Arc<ProxyConfiguration> {
        self.lifecycle.config()
    }

    pub fn lifecycle(&self) -> &ConfigurationLifecycle {
        &self.lifecycle
    }

    /// 해석할 참조 이름 목록. 레지스트리가 이미 붙어 있으면 꼬리
    /// 이름 검사를 즉시 다시 수행한다.
    pub fn set_chain_names(&self, names: Vec<impl Into<String>>) {
        let mut state = self.state.lock();
        state.chain_names = names.into_iter().map(Into::into).collect();
        if state.registry.is_some() {
            self.check_chain_names(&mut state);
        }
    }

    pub fn set_target(&self, target: Arc<dyn TargetObject>) {
        self.lifecycle.set_target(target);
    }

    pub fn set_target_source(&self, target_source: Arc<dyn TargetSource>) {
        self.lifecycle.set_target_source(target_source);
    }

    pub fn set_target_name(&self, name: impl Into<String>) {
        self.state.lock().target_name = Some(name.into());
    }

    pub fn set_singleton(&self, singleton: bool) {
        self.state.lock().singleton = singleton;
    }

    pub fn is_singleton(&self) -> bool {
        self.state.lock().singleton
    }

    pub fn set_autodetect_interfaces(&self, autodetect: bool) {
        self.state.lock().autodetect_interfaces = autodetect;
    }

    /// 조립이 끝난 구성을 동결할지
    pub fn set_freeze_proxy(&self, freeze: bool) {
        self.state.lock().freeze_proxy = freeze;
    }

    pub fn set_unknown_trailing_name_is_target(&self, value: bool) {
        self.state.lock().unknown_trailing_name_is_target = value;
    }

    /// 레지스트리를 붙인다. 붙는 즉시 꼬리 이름 검사를 수행한다.
    pub fn set_registry(&self, registry: Arc<dyn ComponentLookup>) {
        let mut state = self.state.lock();
        state.registry = Some(registry);
        self.check_chain_names(&mut state);
    }

    /// 레지스트리 참조를 버린다. 이후 이름 해석은 `FactoryUnavailable`.
    pub fn detach_registry(&self) {
        self.state.lock().registry = None;
    }

    // ------------------------------------------------------------------
    // 프록시 획득
    // ------------------------------------------------------------------

    /// 싱글턴이면 공유 인스턴스, 프로토타입이면 매번 새 사본
    pub fn get_proxy(&self) -> Result<ProxyObject> {
        if self.is_singleton() {
            self.get_singleton_instance()
        } else {
            self.new_prototype_instance()
        }
    }

    // ------------------------------------------------------------------
    // 꼬리 이름 검사
    // ------------------------------------------------------------------

    /// 마지막 체인 이름이 advisor/advice가 아니면 암묵적 대상으로 옮긴다
    ///
    /// 레지스트리가 타입을 모르면 기본적으로 대상으로 간주하고 그
    /// 모호함을 로그에 남긴다.
    fn check_chain_names(&self, state: &mut FactoryState) {
        let last = match state.chain_names.last() {
            Some(last) => last.clone(),
            None => return,
        };
        if last.ends_with(GLOBAL_SUFFIX) {
            return;
        }
        if state.target_name.is_some() || !self.config().target_source().is_empty() {
            return;
        }

        let registry = match state.registry.clone() {
            Some(registry) => registry,
            None => return,
        };
        let treat_as_target = match registry.get_component_type(&last) {
            Some(component_type) => !component_type.is_advice_or_advisor(),
            None => {
                if state.unknown_trailing_name_is_target {
                    info!(
                        name = %last,
                        "registry cannot report a type for the trailing chain name; assuming it is the target"
                    );
                    true
                } else {
                    false
                }
            }
        };
        if treat_as_target {
            debug!(
                name = %last,
                "trailing chain name is not an advisor: treating it as a target"
            );
            state.chain_names.pop();
            state.target_name = Some(last);
        }
    }

    // ------------------------------------------------------------------
    // 체인 초기화
    // ------------------------------------------------------------------

    /// 이름 목록을 advisor 목록으로 구체화한다. 한 번만 수행된다.
    fn initialize_advisor_chain(&self, state: &mut FactoryState) -> Result<()> {
        if state.advisor_chain_initialized || state.chain_names.is_empty() {
            state.advisor_chain_initialized = true;
            return Ok(());
        }

        let registry = state
            .registry
            .clone()
            .ok_or_else(|| Error::FactoryUnavailable(state.chain_names[0].clone()))?;

        let count = state.chain_names.len();
        for (position, name) in state.chain_names.clone().into_iter().enumerate() {
            if name.ends_with(GLOBAL_SUFFIX) {
                let is_last = position == count - 1;
                let target_established =
                    state.target_name.is_some() || !self.config().target_source().is_empty();
                if is_last && !target_established {
                    return Err(Error::GlobalsRequireTarget);
                }
                let prefix = &name[..name.len() - GLOBAL_SUFFIX.len()];
                self.add_global_advisors(registry.as_ref(), prefix)?;
            } else if state.singleton || registry.is_singleton_scoped(&name) {
                // 싱글턴 팩토리거나 싱글턴 스코프 컴포넌트면 지금 받아 공유
                let component = registry.get_component(&name)?;
                self.add_named_advisor(component, &name)?;
            } else {
                // 프로토타입 스코프: 사본 구체화 시점까지 자리표시자로 미룬다
                debug!(name = %name, "deferring prototype-scoped advisor behind a placeholder");
                self.config()
                    .add_advisor(Arc::new(PrototypePlaceholderAdvisor::new(name)))?;
            }
        }

        state.advisor_chain_initialized = true;
        Ok(())
    }

    /// 전역 advisor/advice 가운데 접두사가 맞는 것을 우선순위 순서로 추가
    fn add_global_advisors(&self, registry: &dyn ComponentLookup, prefix: &str) -> Result<()> {
        let mut candidates = registry.find_by_type(ComponentType::Advisor);
        candidates.extend(registry.find_by_type(ComponentType::Advice));
        candidates.retain(|candidate| candidate.name.starts_with(prefix));
        // 우선순위 오름차순, 미선언은 가장 낮게. 동순위는 종류와 무관하게 이름순.
        candidates.sort_by(|a, b| {
            (a.priority.unwrap_or(i32::MAX), &a.name)
                .cmp(&(b.priority.unwrap_or(i32::MAX), &b.name))
        });

        debug!(prefix, matched = candidates.len(), "expanding global group");
        for candidate in candidates {
            self.add_named_advisor(candidate.component, &candidate.name)?;
        }
        Ok(())
    }

    /// 이름으로 얻은 컴포넌트를 advisor로 감싸 구성에 단다
    fn add_named_advisor(&self, component: Component, name: &str) -> Result<()> {
        let advisor = self.config().adapter_registry().wrap(component)?;
        debug!(name, "adding advisor from named component");
        self.config().add_advisor(advisor)
    }

    // ------------------------------------------------------------------
    // 싱글턴 수명주기
    // ------------------------------------------------------------------

    fn get_singleton_instance(&self) -> Result<ProxyObject> {
        let mut state = self.state.lock();
        if let Some(instance) = &state.singleton_instance {
            return Ok(instance.clone());
        }

        self.initialize_advisor_chain(&mut state)?;
        if let Some(target_source) = self.fresh_target_source(&state)? {
            self.config().set_target_source(target_source);
        }
        if state.autodetect_interfaces && self.config().interfaces().is_empty() {
            Self::autodetect_interfaces(self.config(), true)?;
        }
        if state.freeze_proxy {
            self.config().set_frozen(true);
        }

        let proxy = self.lifecycle.create_proxy()?;
        debug!("singleton proxy instance assembled");
        state.singleton_instance = Some(proxy.clone());
        Ok(proxy)
    }

    /// 대상의 선언 능력으로 인터페이스 집합을 채운다
    ///
    /// `strict`면 대상 타입조차 세울 수 없을 때 실패하고, 아니면
    /// 조용히 건너뛴다.
    fn autodetect_interfaces(config: &ProxyConfiguration, strict: bool) -> Result<()> {
        let target_source = config.target_source();
        if let Some(target) = target_source.get_target()? {
            let interfaces = target.interfaces();
            debug!(count = interfaces.len(), "autodetected target interfaces");
            config.set_interfaces(interfaces)?;
            return Ok(());
        }
        if strict && target_source.target_type().is_none() {
            return Err(Error::TargetTypeUndetermined);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // 프로토타입 수명주기
    // ------------------------------------------------------------------

    fn new_prototype_instance(&self) -> Result<ProxyObject> {
        let mut state = self.state.lock();
        self.initialize_advisor_chain(&mut state)?;
        if state.target_name.is_none() {
            warn!(
                "prototype proxy requested without a target name; the shared target source will be reused"
            );
        }

        let target_source = match self.fresh_target_source(&state)? {
            Some(fresh) => fresh,
            None => self.config().target_source(),
        };
        let advisors = self.fresh_advisor_chain(&state)?;

        debug!("materializing independent prototype configuration");
        let copy = Arc::new(ProxyConfiguration::new());
        copy.copy_from(self.config(), target_source, advisors)?;
        if state.autodetect_interfaces && copy.interfaces().is_empty() {
            Self::autodetect_interfaces(&copy, false)?;
        }
        if state.freeze_proxy {
            copy.set_frozen(true);
        }
        drop(state);

        ConfigurationLifecycle::with_config(copy).create_proxy()
    }

    /// 대상 이름이 있으면 레지스트리에서 새로 받아 소스로 감싼다
    fn fresh_target_source(&self, state: &FactoryState) -> Result<Option<Arc<dyn TargetSource>>> {
        let name = match &state.target_name {
            Some(name) => name,
            None => return Ok(None),
        };
        let registry = state
            .registry
            .as_ref()
            .ok_or_else(|| Error::FactoryUnavailable(name.clone()))?;
        match registry.get_component(name)? {
            Component::TargetSource(target_source) => Ok(Some(target_source)),
            Component::Target(target) => Ok(Some(Arc::new(SingletonTargetSource::new(target)))),
            other => Err(Error::Target(format!(
                "component '{name}' is not usable as a target: {}",
                other.describe()
            ))),
        }
    }

    /// 자리표시자를 방금 받은 컴포넌트로 바꾼 advisor 목록 사본
    fn fresh_advisor_chain(&self, state: &FactoryState) -> Result<Vec<Arc<dyn Advisor>>> {
        let advisors = self.config().advisors();
        let mut fresh = Vec::with_capacity(advisors.len());
        for advisor in advisors.iter() {
            match advisor.prototype_placeholder() {
                Some(name) => {
                    debug!(name, "refreshing prototype-scoped advisor");
                    let registry = state
                        .registry
                        .as_ref()
                        .ok_or_else(|| Error::FactoryUnavailable(name.to_string()))?;
                    let component = registry.get_component(name)?;
                    fresh.push(self.config().adapter_registry().wrap(component)?);
                }
                None => fresh.push(advisor.clone()),
            }
        }
        Ok(fresh)
    }
}

impl Default for ChainProxyFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::{Advice, Interceptor, Invocation};
    use crate::registry::StaticComponentRegistry;
    use serde_json::{json, Value};
    use std::any::Any;

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

    struct Echo;

    impl TargetObject for Echo {
        fn type_name(&self) -> &str {
            "Echo"
        }

        fn invoke(&self, operation: &str, _args: &Value) -> Result<Value> {
            Ok(json!(operation))
        }
    }

    fn registry_with_target() -> Arc<StaticComponentRegistry> {
        let registry = Arc::new(StaticComponentRegistry::new("test"));
        registry.register("logging", Component::Advice(Arc::new(Passthrough)));
        registry.register("service", Component::Target(Arc::new(Echo)));
        registry
    }

    #[test]
    fn test_trailing_name_moved_to_target() {
        let factory = ChainProxyFactory::new();
        factory.set_chain_names(vec!["logging", "service"]);
        factory.set_registry(registry_with_target());

        let proxy = factory.get_proxy().unwrap();
        assert_eq!(proxy.invoke("ping", json!([])).unwrap(), json!("ping"));
        assert_eq!(factory.config().advisor_count(), 1);
    }

    #[test]
    fn test_trailing_advisor_name_stays_in_chain() {
        let factory = ChainProxyFactory::new();
        factory.set_target(Arc::new(Echo));
        factory.set_chain_names(vec!["logging"]);
        factory.set_registry(registry_with_target());

        factory.get_proxy().unwrap();
        assert_eq!(factory.config().advisor_count(), 1);
    }

    #[test]
    fn test_unknown_trailing_name_heuristic_disabled() {
        let factory = ChainProxyFactory::new();
        factory.set_unknown_trailing_name_is_target(false);
        factory.set_chain_names(vec!["missing"]);
        factory.set_registry(registry_with_target());

        // 이름이 체인에 남았으므로 해석 시점에 조회 실패가 드러난다
        let err = factory.get_proxy().unwrap_err();
        assert!(matches!(err, Error::ComponentNotFound(_)));
    }

    #[test]
    fn test_globals_require_target() {
        let factory = ChainProxyFactory::new();
        factory.set_chain_names(vec!["log*"]);
        factory.set_registry(registry_with_target());

        let err = factory.get_proxy().unwrap_err();
        assert!(matches!(err, Error::GlobalsRequireTarget));
    }

    #[test]
    fn test_detached_registry_fails_resolution() {
        let factory = ChainProxyFactory::new();
        factory.set_target(Arc::new(Echo));
        factory.set_chain_names(vec!["logging"]);
        factory.set_registry(registry_with_target());
        factory.detach_registry();

        let err = factory.get_proxy().unwrap_err();
        assert!(matches!(err, Error::FactoryUnavailable(_)));
    }

    #[test]
    fn test_autodetect_without_target_type_fails() {
        let factory = ChainProxyFactory::new();
        let err = factory.get_proxy().unwrap_err();
        assert!(matches!(err, Error::TargetTypeUndetermined));
    }
}
