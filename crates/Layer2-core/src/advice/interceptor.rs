//! 내장 advice 형태를 표준 인터셉터로 실행하는 래퍼들
//!
//! 어댑터 레지스트리의 내장 어댑터가 생성한다.

use super::{
    Advice, AfterReturningAdvice, BeforeAdvice, Interceptor, Invocation, ThrowsAdvice,
};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use weave_foundation::Result;

// ============================================================================
// BeforeAdviceInterceptor
// ============================================================================

/// before advice를 체인 앞 단계로 실행
pub struct BeforeAdviceInterceptor {
    advice: Arc<dyn BeforeAdvice>,
}

impl BeforeAdviceInterceptor {
    pub fn new(advice: Arc<dyn BeforeAdvice>) -> Self {
        Self { advice }
    }
}

impl Advice for BeforeAdviceInterceptor {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_interceptor(self: Arc<Self>) -> Option<Arc<dyn Interceptor>> {
        Some(self)
    }
}

impl Interceptor for BeforeAdviceInterceptor {
    fn invoke(&self, invocation: &mut dyn Invocation) -> Result<Value> {
        self.advice
            .before(invocation.operation(), invocation.args())?;
        invocation.proceed()
    }
}

// ============================================================================
// AfterReturningInterceptor
// ============================================================================

/// after-returning advice를 정상 반환 경로에서 실행
pub struct AfterReturningInterceptor {
    advice: Arc<dyn AfterReturningAdvice>,
}

impl AfterReturningInterceptor {
    pub fn new(advice: Arc<dyn AfterReturningAdvice>) -> Self {
        Self { advice }
    }
}

impl Advice for AfterReturningInterceptor {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_interceptor(self: Arc<Self>) -> Option<Arc<dyn Interceptor>> {
        Some(self)
    }
}

impl Interceptor for AfterReturningInterceptor {
    fn invoke(&self, invocation: &mut dyn Invocation) -> Result<Value> {
        let result = invocation.proceed()?;
        self.advice
            .after_returning(&result, invocation.operation(), invocation.args())?;
        Ok(result)
    }
}

// ============================================================================
// ThrowsInterceptor
// ============================================================================

/// throws advice를 에러 전파 경로에서 실행
pub struct ThrowsInterceptor {
    advice: Arc<dyn ThrowsAdvice>,
}

impl ThrowsInterceptor {
    pub fn new(advice: Arc<dyn ThrowsAdvice>) -> Self {
        Self { advice }
    }
}

impl Advice for ThrowsInterceptor {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_interceptor(self: Arc<Self>) -> Option<Arc<dyn Interceptor>> {
        Some(self)
    }
}

impl Interceptor for ThrowsInterceptor {
    fn invoke(&self, invocation: &mut dyn Invocation) -> Result<Value> {
        match invocation.proceed() {
            Ok(value) => Ok(value),
            Err(error) => {
                let operation = invocation.operation().to_string();
                match self.advice.on_error(&error, &operation, invocation.args()) {
                    Some(outcome) => outcome,
                    None => Err(error),
                }
            }
        }
    }
}
