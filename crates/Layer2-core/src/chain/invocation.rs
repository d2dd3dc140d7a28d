//! 체인 실행 - proceed 기반 재귀 호출
//!
//! 체인의 각 인터셉터는 `invocation.proceed()`를 불러 다음 단계로
//! 제어를 넘긴다. 마지막 단계는 대상 연산 자체다. 동적 항목은
//! proceed 시점에 인자를 다시 검사해 탈락하면 건너뛴다.

use crate::advice::Invocation;
use crate::chain::ChainEntry;
use crate::target::TargetObject;
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;
use weave_foundation::Result;

// ============================================================================
// ChainInvocation
// ============================================================================

/// 한 번의 연산 호출을 표현하는 실행 컨텍스트
///
/// 인터셉터가 proceed를 여러 번 부르는 것도 허용된다 (재시도 패턴).
/// 그 경우 현재 위치부터 체인 끝까지를 다시 실행한다.
pub struct ChainInvocation {
    target: Arc<dyn TargetObject>,
    operation: String,
    args: Value,
    chain: Vec<ChainEntry>,
    /// 다음에 실행할 체인 인덱스
    index: usize,
}

impl ChainInvocation {
    pub fn new(
        target: Arc<dyn TargetObject>,
        operation: impl Into<String>,
        args: Value,
        chain: Vec<ChainEntry>,
    ) -> Self {
        Self {
            target,
            operation: operation.into(),
            args,
            chain,
            index: 0,
        }
    }

    pub fn target(&self) -> &Arc<dyn TargetObject> {
        &self.target
    }
}

impl Invocation for ChainInvocation {
    fn operation(&self) -> &str {
        &self.operation
    }

    fn target_type(&self) -> &str {
        self.target.type_name()
    }

    fn args(&self) -> &Value {
        &self.args
    }

    fn set_args(&mut self, args: Value) {
        self.args = args;
    }

    fn proceed(&mut self) -> Result<Value> {
        while self.index < self.chain.len() {
            let entry = self.chain[self.index].clone();
            self.index += 1;

            match entry {
                ChainEntry::Interceptor(interceptor) => {
                    let result = interceptor.invoke(self);
                    self.index -= 1;
                    return result;
                }
                ChainEntry::Dynamic {
                    interceptor,
                    pointcut,
                } => {
                    if pointcut.matches_args(&self.operation, self.target.type_name(), &self.args) {
                        let result = interceptor.invoke(self);
                        self.index -= 1;
                        return result;
                    }
                    trace!(
                        operation = %self.operation,
                        "dynamic interceptor skipped at invocation time"
                    );
                    // 탈락한 항목은 건너뛰고 다음 단계로
                }
            }
        }

        self.target.invoke(&self.operation, &self.args)
    }
}

/// 체인을 처음부터 끝까지 실행한다
pub fn execute_chain(
    target: Arc<dyn TargetObject>,
    operation: &str,
    args: Value,
    chain: Vec<ChainEntry>,
) -> Result<Value> {
    let mut invocation = ChainInvocation::new(target, operation, args, chain);
    invocation.proceed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::{Advice, Interceptor};
    use crate::pointcut::ArgsPointcut;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::any::Any;
    use weave_foundation::Error;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Advice for Recorder {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn into_interceptor(self: Arc<Self>) -> Option<Arc<dyn Interceptor>> {
            Some(self)
        }
    }

    impl Interceptor for Recorder {
        fn invoke(&self, invocation: &mut dyn Invocation) -> Result<Value> {
            self.log.lock().push(format!("{}:enter", self.name));
            let result = invocation.proceed()?;
            self.log.lock().push(format!("{}:exit", self.name));
            Ok(result)
        }
    }

    struct Echo;

    impl TargetObject for Echo {
        fn type_name(&self) -> &str {
            "Echo"
        }

        fn invoke(&self, operation: &str, args: &Value) -> Result<Value> {
            Ok(json!({ "op": operation, "args": args }))
        }
    }

    struct Failing;

    impl TargetObject for Failing {
        fn type_name(&self) -> &str {
            "Failing"
        }

        fn invoke(&self, _operation: &str, _args: &Value) -> Result<Value> {
            Err(Error::Target("boom".into()))
        }
    }

    fn recorder(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> ChainEntry {
        ChainEntry::Interceptor(Arc::new(Recorder {
            name,
            log: log.clone(),
        }))
    }

    #[test]
    fn test_empty_chain_invokes_target() {
        let result = execute_chain(Arc::new(Echo), "ping", json!([1]), Vec::new()).unwrap();
        assert_eq!(result["op"], "ping");
    }

    #[test]
    fn test_nesting_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = vec![recorder("a", &log), recorder("b", &log)];
        execute_chain(Arc::new(Echo), "op", json!([]), chain).unwrap();

        assert_eq!(
            *log.lock(),
            vec!["a:enter", "b:enter", "b:exit", "a:exit"]
        );
    }

    #[test]
    fn test_dynamic_entry_rechecked() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pointcut = Arc::new(ArgsPointcut::for_args(|args| {
            args.as_array().map(|a| !a.is_empty()).unwrap_or(false)
        }));
        let chain = vec![
            ChainEntry::Dynamic {
                interceptor: Arc::new(Recorder {
                    name: "dyn",
                    log: log.clone(),
                }),
                pointcut,
            },
            recorder("tail", &log),
        ];

        // 빈 인자: 동적 항목은 건너뛰지만 뒤의 항목과 대상은 실행된다
        execute_chain(Arc::new(Echo), "op", json!([]), chain.clone()).unwrap();
        assert_eq!(*log.lock(), vec!["tail:enter", "tail:exit"]);

        log.lock().clear();
        execute_chain(Arc::new(Echo), "op", json!([1]), chain).unwrap();
        assert_eq!(
            *log.lock(),
            vec!["dyn:enter", "tail:enter", "tail:exit", "dyn:exit"]
        );
    }

    #[test]
    fn test_target_error_propagates() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = vec![recorder("a", &log)];
        let err = execute_chain(Arc::new(Failing), "op", json!([]), chain).unwrap_err();
        assert!(matches!(err, Error::Target(_)));
        // 에러 경로에서는 exit가 기록되지 않는다
        assert_eq!(*log.lock(), vec!["a:enter"]);
    }

    #[test]
    fn test_retry_via_repeated_proceed() {
        struct Retry {
            attempts: Arc<Mutex<u32>>,
        }

        impl Advice for Retry {
            fn as_any(&self) -> &dyn Any {
                self
            }

            fn into_interceptor(self: Arc<Self>) -> Option<Arc<dyn Interceptor>> {
                Some(self)
            }
        }

        impl Interceptor for Retry {
            fn invoke(&self, invocation: &mut dyn Invocation) -> Result<Value> {
                let first = invocation.proceed();
                if first.is_ok() {
                    return first;
                }
                *self.attempts.lock() += 1;
                invocation.proceed()
            }
        }

        let attempts = Arc::new(Mutex::new(0));
        let chain = vec![ChainEntry::Interceptor(Arc::new(Retry {
            attempts: attempts.clone(),
        }))];
        let err = execute_chain(Arc::new(Failing), "op", json!([]), chain).unwrap_err();
        assert!(matches!(err, Error::Target(_)));
        assert_eq!(*attempts.lock(), 1);
    }
}
