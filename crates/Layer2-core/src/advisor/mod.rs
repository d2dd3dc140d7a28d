//! Advisor - Pointcut과 Advice의 결합
//!
//! 설정의 advisor 목록에 들어가는 단위. introduction advisor는 추가로
//! 프록시가 노출할 인터페이스를 선언하고, 그 advice가 실제로 해당
//! 인터페이스를 구현하는지 검증할 수 있어야 한다.

use crate::advice::Advice;
use crate::pointcut::{Pointcut, TruePointcut};
use std::sync::Arc;
use weave_foundation::{Error, Result};

// ============================================================================
// Advisor trait
// ============================================================================

/// Pointcut이 정하는 범위에서 Advice를 실행하는 단위
pub trait Advisor: Send + Sync {
    /// 결합된 advice
    ///
    /// `PrototypePlaceholderAdvisor`는 치환 전에 읽으면 panic한다.
    fn advice(&self) -> Arc<dyn Advice>;

    /// 적용 범위
    fn pointcut(&self) -> Arc<dyn Pointcut>;

    /// introduction advisor라면 해당 뷰
    fn as_introduction(&self) -> Option<&dyn IntroductionAdvisor> {
        None
    }

    /// 프로토타입 placeholder라면 참조하는 컴포넌트 이름
    fn prototype_placeholder(&self) -> Option<&str> {
        None
    }
}

/// 추가 인터페이스를 선언하는 advisor
pub trait IntroductionAdvisor: Send + Sync {
    /// 프록시에 추가할 인터페이스 이름 목록
    fn interfaces(&self) -> Vec<String>;

    /// 타입 필터 (introduction은 연산 단위가 아닌 타입 단위로 적용)
    fn matches_type(&self, _target_type: &str) -> bool {
        true
    }

    /// 선언한 인터페이스를 advice가 실제로 구현하는지 검증
    fn validate_interfaces(&self) -> Result<()>;
}

// ============================================================================
// DefaultPointcutAdvisor
// ============================================================================

/// 가장 일반적인 advisor: 임의의 Pointcut + 임의의 Advice
pub struct DefaultPointcutAdvisor {
    pointcut: Arc<dyn Pointcut>,
    advice: Arc<dyn Advice>,
}

impl DefaultPointcutAdvisor {
    pub fn new(pointcut: Arc<dyn Pointcut>, advice: Arc<dyn Advice>) -> Self {
        Self { pointcut, advice }
    }

    /// 항상 매칭되는 포인트컷으로 감싼다
    pub fn always(advice: Arc<dyn Advice>) -> Self {
        Self::new(Arc::new(TruePointcut), advice)
    }
}

impl Advisor for DefaultPointcutAdvisor {
    fn advice(&self) -> Arc<dyn Advice> {
        self.advice.clone()
    }

    fn pointcut(&self) -> Arc<dyn Pointcut> {
        self.pointcut.clone()
    }
}

// ============================================================================
// DefaultIntroductionAdvisor
// ============================================================================

/// 기본 introduction advisor
///
/// 선언 인터페이스를 advice의 자기 기술 정보에서 가져오거나 직접 지정한다.
pub struct DefaultIntroductionAdvisor {
    advice: Arc<dyn Advice>,
    interfaces: Vec<String>,
}

impl DefaultIntroductionAdvisor {
    /// advice의 `introduction_info`에서 인터페이스 목록을 가져온다
    pub fn new(advice: Arc<dyn Advice>) -> Self {
        let interfaces = advice
            .introduction_info()
            .map(|info| info.introduced_interfaces())
            .unwrap_or_default();
        Self { advice, interfaces }
    }

    /// 인터페이스 목록을 직접 지정
    pub fn with_interfaces(advice: Arc<dyn Advice>, interfaces: Vec<String>) -> Self {
        Self { advice, interfaces }
    }
}

impl Advisor for DefaultIntroductionAdvisor {
    fn advice(&self) -> Arc<dyn Advice> {
        self.advice.clone()
    }

    fn pointcut(&self) -> Arc<dyn Pointcut> {
        Arc::new(TruePointcut)
    }

    fn as_introduction(&self) -> Option<&dyn IntroductionAdvisor> {
        Some(self)
    }
}

impl IntroductionAdvisor for DefaultIntroductionAdvisor {
    fn interfaces(&self) -> Vec<String> {
        self.interfaces.clone()
    }

    fn validate_interfaces(&self) -> Result<()> {
        for interface in &self.interfaces {
            let self_described = self
                .advice
                .introduction_info()
                .map(|info| info.introduced_interfaces().contains(interface))
                .unwrap_or(false);
            let dynamic = self
                .advice
                .as_dynamic_introduction()
                .map(|d| d.implements_interface(interface))
                .unwrap_or(false);
            if !self_described && !dynamic {
                return Err(Error::InvalidIntroduction {
                    interface: interface.clone(),
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// PrototypePlaceholderAdvisor
// ============================================================================

/// 프로토타입 복사 시점까지 치환을 미루는 placeholder
///
/// 공유되면 안 되는(프로토타입 스코프) 컴포넌트 이름만 들고 있으며,
/// 독립 사본이 구체화될 때 실제 advisor로 치환된다. 치환 전에 advice를
/// 읽는 것은 프로그래밍 오류다.
pub struct PrototypePlaceholderAdvisor {
    component_name: String,
    message: String,
}

impl PrototypePlaceholderAdvisor {
    pub fn new(component_name: impl Into<String>) -> Self {
        let component_name = component_name.into();
        let message = format!(
            "Placeholder for prototype advisor/advice with component name '{component_name}'"
        );
        Self {
            component_name,
            message,
        }
    }

    pub fn component_name(&self) -> &str {
        &self.component_name
    }
}

impl Advisor for PrototypePlaceholderAdvisor {
    fn advice(&self) -> Arc<dyn Advice> {
        panic!("Cannot read advice: {}", self.message);
    }

    fn pointcut(&self) -> Arc<dyn Pointcut> {
        panic!("Cannot read pointcut: {}", self.message);
    }

    fn prototype_placeholder(&self) -> Option<&str> {
        Some(&self.component_name)
    }
}

impl std::fmt::Display for PrototypePlaceholderAdvisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}
