//! WeaveCode Core - 런타임 인터셉션 체인 조립 엔진
//!
//! 대상 객체와 순서 있는 advisor 목록으로부터 연산별 인터셉터 체인을
//! 계산하고, 캐시하고, 실행한다. 구성은 동결 가능하며, 어댑터
//! 레지스트리로 advice 형태를 확장하고, 이름 기반 팩토리로
//! 싱글턴/프로토타입 수명주기를 관리한다.
//!
//! # 계층
//!
//! - `advice` / `pointcut` / `advisor`: 행동 단위와 적용 조건
//! - `target` / `registry`: 대상 공급과 이름 조회 경계
//! - `adapter` / `chain`: 정규화와 체인 해석/실행
//! - `config` / `proxy` / `factory`: 구성 상태, 호출 핸들, 조립

pub mod adapter;
pub mod advice;
pub mod advisor;
pub mod chain;
pub mod config;
pub mod factory;
pub mod pointcut;
pub mod proxy;
pub mod registry;
pub mod target;

// 행동 단위
pub use advice::{
    Advice, AfterReturningAdvice, BeforeAdvice, DynamicIntroduction, Interceptor,
    IntroductionInfo, Invocation, ThrowsAdvice,
};
pub use advisor::{
    Advisor, DefaultIntroductionAdvisor, DefaultPointcutAdvisor, IntroductionAdvisor,
    PrototypePlaceholderAdvisor,
};
pub use pointcut::{ArgsPointcut, GlobPointcut, Pointcut, TruePointcut};

// 대상 공급
pub use target::{
    EmptyTargetSource, ProviderTargetSource, SingletonTargetSource, TargetObject, TargetSource,
};

// 정규화와 체인
pub use adapter::{global_adapter_registry, AdviceAdapter, AdviceAdapterRegistry};
pub use chain::{execute_chain, ChainEntry, ChainInvocation, ChainResolver, DefaultChainResolver};

// 구성과 조립
pub use config::{
    ConfigurationLifecycle, ConfigurationListener, OperationKey, ProxyConfiguration,
};
pub use factory::{ChainProxyFactory, GLOBAL_SUFFIX};
pub use proxy::{DefaultProxyBackend, ProxyBackend, ProxyObject};
pub use registry::{
    AdvisorCandidate, Component, ComponentLookup, ComponentMetadata, ComponentScope,
    ComponentType, StaticComponentRegistry,
};

pub use weave_foundation::{Error, Result};
