//! 팩토리 통합 테스트 - 조립, 수명주기, 전역 그룹 확장 검증
//!
//! `cargo test -p weave-core --test factory_test -- --nocapture`

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use weave_core::{
    Advice, ChainProxyFactory, Component, DefaultPointcutAdvisor, Error, Interceptor, Invocation,
    ProxyObject, Result, StaticComponentRegistry, TargetObject,
};

// ============================================================================
// 테스트 픽스처
// ============================================================================

/// 테스트 출력에 trace 로그를 실어 보낸다 (RUST_LOG로 조절)
fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "weave_core=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// 잔고를 드는 간단한 대상
struct Account {
    balance: Mutex<i64>,
}

impl Account {
    fn new(balance: i64) -> Self {
        Self {
            balance: Mutex::new(balance),
        }
    }
}

impl TargetObject for Account {
    fn type_name(&self) -> &str {
        "Account"
    }

    fn interfaces(&self) -> Vec<String> {
        vec!["Balance".into(), "Transfer".into()]
    }

    fn invoke(&self, operation: &str, args: &Value) -> Result<Value> {
        match operation {
            "balance" => Ok(json!(*self.balance.lock())),
            "deposit" => {
                let amount = args["amount"].as_i64().unwrap_or(0);
                let mut balance = self.balance.lock();
                *balance += amount;
                Ok(json!(*balance))
            }
            other => Err(Error::Target(format!("unknown operation '{other}'"))),
        }
    }
}

/// 자기 이름과 인스턴스 id를 호출 로그에 남기는 인터셉터
struct Tagging {
    label: String,
    id: usize,
    log: Arc<Mutex<Vec<String>>>,
}

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

impl Tagging {
    fn new(label: impl Into<String>, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            label: label.into(),
            id: NEXT_ID.fetch_add(1, Ordering::SeqCst),
            log,
        }
    }
}

impl Advice for Tagging {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_interceptor(self: Arc<Self>) -> Option<Arc<dyn Interceptor>> {
        Some(self)
    }
}

impl Interceptor for Tagging {
    fn invoke(&self, invocation: &mut dyn Invocation) -> Result<Value> {
        self.log.lock().push(format!("{}#{}", self.label, self.id));
        invocation.proceed()
    }
}

fn tagging(label: &str, log: &Arc<Mutex<Vec<String>>>) -> Component {
    Component::Advice(Arc::new(Tagging::new(label, log.clone())))
}

fn labels(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    log.lock()
        .iter()
        .map(|entry| entry.split('#').next().unwrap_or(entry).to_string())
        .collect()
}

// ============================================================================
// 싱글턴 수명주기
// ============================================================================

#[test]
fn test_singleton_instance_is_shared() -> anyhow::Result<()> {
    init_tracing();
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(StaticComponentRegistry::new("app"));
    registry.register("logging", tagging("logging", &log));
    registry.register("account", Component::Target(Arc::new(Account::new(100))));

    let factory = ChainProxyFactory::new();
    factory.set_chain_names(vec!["logging", "account"]);
    factory.set_registry(registry);

    let first = factory.get_proxy()?;
    let second = factory.get_proxy()?;
    assert!(first.ptr_eq(&second), "singleton accesses must share one instance");

    // 대상 상태도 공유된다
    assert_eq!(first.invoke("deposit", json!({"amount": 50}))?, json!(150));
    assert_eq!(second.invoke("balance", json!({}))?, json!(150));

    // 자동 감지된 인터페이스
    assert!(first.implements_interface("Balance"));
    assert!(first.implements_interface("Transfer"));
    assert!(!first.implements_interface("Audit"));
    Ok(())
}

#[test]
fn test_singleton_survives_mutation_with_fresh_chain() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(StaticComponentRegistry::new("app"));
    registry.register("logging", tagging("logging", &log));

    let factory = ChainProxyFactory::new();
    factory.set_target(Arc::new(Account::new(0)));
    factory.set_chain_names(vec!["logging"]);
    factory.set_registry(registry);

    let proxy = factory.get_proxy().unwrap();
    let before = factory.config().resolve_chain("balance", "Account").unwrap();

    // 이후의 advice 변경은 인스턴스를 버리지 않는다
    factory
        .config()
        .add_advice(Arc::new(Tagging::new("audit", log.clone())))
        .unwrap();
    let again = factory.get_proxy().unwrap();
    assert!(proxy.ptr_eq(&again));

    // 체인은 다시 계산된다
    let after = factory.config().resolve_chain("balance", "Account").unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after.len(), 2);

    proxy.invoke("balance", json!({})).unwrap();
    assert_eq!(labels(&log), vec!["logging", "audit"]);
}

#[test]
fn test_frozen_singleton_rejects_mutation() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(StaticComponentRegistry::new("app"));
    registry.register("logging", tagging("logging", &log));

    let factory = ChainProxyFactory::new();
    factory.set_target(Arc::new(Account::new(0)));
    factory.set_chain_names(vec!["logging"]);
    factory.set_freeze_proxy(true);
    factory.set_registry(registry);

    let proxy = factory.get_proxy().unwrap();
    let err = factory
        .config()
        .add_advice(Arc::new(Tagging::new("late", log)))
        .unwrap_err();
    assert!(err.is_frozen());

    // 읽기는 계속 허용된다
    assert_eq!(factory.config().advisor_count(), 1);
    proxy.invoke("balance", json!({})).unwrap();
}

// ============================================================================
// 프로토타입 수명주기
// ============================================================================

#[test]
fn test_prototype_instances_are_independent() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(StaticComponentRegistry::new("app"));
    registry.register("logging", tagging("logging", &log));
    registry.register_prototype("account", || {
        Component::Target(Arc::new(Account::new(0)))
    });

    let factory = ChainProxyFactory::new();
    factory.set_singleton(false);
    factory.set_chain_names(vec!["logging", "account"]);
    factory.set_registry(registry);

    let first = factory.get_proxy().unwrap();
    let second = factory.get_proxy().unwrap();
    assert!(!first.ptr_eq(&second), "prototype accesses must be distinct");

    // 대상도 독립이다
    first.invoke("deposit", json!({"amount": 30})).unwrap();
    assert_eq!(second.invoke("balance", json!({})).unwrap(), json!(0));
}

#[test]
fn test_prototype_scoped_advisor_is_fresh_per_instance() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(StaticComponentRegistry::new("app"));
    registry.register("shared", tagging("shared", &log));
    {
        let log = log.clone();
        registry.register_prototype("scoped", move || tagging("scoped", &log));
    }
    registry.register_prototype("account", || {
        Component::Target(Arc::new(Account::new(0)))
    });

    let factory = ChainProxyFactory::new();
    factory.set_singleton(false);
    factory.set_chain_names(vec!["shared", "scoped", "account"]);
    factory.set_registry(registry);

    let first = factory.get_proxy().unwrap();
    let second = factory.get_proxy().unwrap();
    first.invoke("balance", json!({})).unwrap();
    second.invoke("balance", json!({})).unwrap();

    let entries = log.lock().clone();
    assert_eq!(entries.len(), 4);
    // singleton 스코프 advisor는 두 사본이 같은 인스턴스를 공유한다
    assert_eq!(entries[0], entries[2]);
    // prototype 스코프 advisor는 사본마다 새로 받는다
    assert_ne!(entries[1], entries[3]);
    assert!(entries[1].starts_with("scoped#"));
    assert!(entries[3].starts_with("scoped#"));
}

#[test]
fn test_placeholder_never_escapes_to_prototype_copy() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(StaticComponentRegistry::new("app"));
    {
        let log = log.clone();
        registry.register_prototype("scoped", move || tagging("scoped", &log));
    }

    let factory = ChainProxyFactory::new();
    factory.set_singleton(false);
    factory.set_target(Arc::new(Account::new(0)));
    factory.set_chain_names(vec!["scoped"]);
    factory.set_registry(registry);

    let proxy = factory.get_proxy().unwrap();
    // 공유 구성에는 자리표시자가 남아 있다
    assert!(factory.config().advisors()[0].prototype_placeholder().is_some());
    // 사본에는 실제 advisor만 있다
    assert!(proxy.config().advisors()[0].prototype_placeholder().is_none());
    proxy.invoke("balance", json!({})).unwrap();
    assert_eq!(labels(&log), vec!["scoped"]);
}

// ============================================================================
// 전역 그룹 확장
// ============================================================================

#[test]
fn test_global_group_expansion_orders_by_priority() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(StaticComponentRegistry::new("app"));
    registry.register_with_priority("global1", tagging("global1", &log), 1);
    registry.register_with_priority("global2", tagging("global2", &log), 0);
    registry.register("other", tagging("other", &log));

    let factory = ChainProxyFactory::new();
    factory.set_target(Arc::new(Account::new(0)));
    factory.set_chain_names(vec!["global*"]);
    factory.set_registry(registry);

    let proxy = factory.get_proxy().unwrap();
    proxy.invoke("balance", json!({})).unwrap();

    // 우선순위 낮은 값이 먼저, 접두사가 다른 것은 절대 포함되지 않는다
    assert_eq!(labels(&log), vec!["global2", "global1"]);
}

#[test]
fn test_global_group_unprioritized_entries_sort_last() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(StaticComponentRegistry::new("app"));
    registry.register("tx_plain", tagging("plain", &log));
    registry.register_with_priority("tx_first", tagging("first", &log), 5);

    let factory = ChainProxyFactory::new();
    factory.set_target(Arc::new(Account::new(0)));
    factory.set_chain_names(vec!["tx*"]);
    factory.set_registry(registry);

    let proxy = factory.get_proxy().unwrap();
    proxy.invoke("balance", json!({})).unwrap();
    assert_eq!(labels(&log), vec!["first", "plain"]);
}

#[test]
fn test_global_group_ties_order_by_name_across_kinds() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(StaticComponentRegistry::new("app"));
    // 같은 우선순위의 advisor와 advice가 섞여도 이름순을 지킨다
    registry.register_with_priority(
        "gx_zeta",
        Component::Advisor(Arc::new(DefaultPointcutAdvisor::always(Arc::new(
            Tagging::new("zeta", log.clone()),
        )))),
        1,
    );
    registry.register_with_priority("gx_alpha", tagging("alpha", &log), 1);

    let factory = ChainProxyFactory::new();
    factory.set_target(Arc::new(Account::new(0)));
    factory.set_chain_names(vec!["gx*"]);
    factory.set_registry(registry);

    let proxy = factory.get_proxy().unwrap();
    proxy.invoke("balance", json!({})).unwrap();
    assert_eq!(labels(&log), vec!["alpha", "zeta"]);
}

// ============================================================================
// 오류 경로
// ============================================================================

#[test]
fn test_unwrappable_component_fails() {
    let registry = Arc::new(StaticComponentRegistry::new("app"));
    registry.register("bogus", Component::Target(Arc::new(Account::new(0))));

    let factory = ChainProxyFactory::new();
    factory.set_target(Arc::new(Account::new(0)));
    factory.set_chain_names(vec!["bogus"]);
    factory.set_registry(registry);

    let err = factory.get_proxy().unwrap_err();
    assert!(matches!(err, Error::UnknownAdviceType(_)));
}

#[test]
fn test_detach_registry_breaks_prototype_refresh() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(StaticComponentRegistry::new("app"));
    {
        let log = log.clone();
        registry.register_prototype("scoped", move || tagging("scoped", &log));
    }

    let factory = ChainProxyFactory::new();
    factory.set_singleton(false);
    factory.set_target(Arc::new(Account::new(0)));
    factory.set_chain_names(vec!["scoped"]);
    factory.set_registry(registry);

    // 한 번은 성공한다
    factory.get_proxy().expect("first prototype failed");

    factory.detach_registry();
    let err = factory.get_proxy().unwrap_err();
    assert!(matches!(err, Error::FactoryUnavailable(_)));
}

// ============================================================================
// 체인 캐시 동작
// ============================================================================

#[test]
fn test_resolved_chains_are_cached_per_operation() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(StaticComponentRegistry::new("app"));
    registry.register("logging", tagging("logging", &log));

    let factory = ChainProxyFactory::new();
    factory.set_target(Arc::new(Account::new(0)));
    factory.set_chain_names(vec!["logging"]);
    factory.set_registry(registry);

    let proxy: ProxyObject = factory.get_proxy().unwrap();
    proxy.invoke("balance", json!({})).unwrap();

    let config = factory.config();
    let first = config.resolve_chain("balance", "Account").unwrap();
    let second = config.resolve_chain("balance", "Account").unwrap();
    assert!(Arc::ptr_eq(&first, &second), "cache hit must share one chain");

    // 연산이 다르면 별도 항목이다
    let other = config.resolve_chain("deposit", "Account").unwrap();
    assert!(!Arc::ptr_eq(&first, &other));
}
