//! weave-foundation: Foundation Layer for WeaveCode
//!
//! Layer1 - 상위 레이어가 공유하는 기반 타입
//!
//! # 주요 모듈
//!
//! - `error`: 중앙 에러 타입 (`Error`, `Result`)
//! - `event`: 리스너 목록 유틸리티 (`ListenerSet`)

pub mod error;
pub mod event;

// Re-exports
pub use error::{Error, Result};
pub use event::ListenerSet;
