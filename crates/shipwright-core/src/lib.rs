//! Shipwright Core
//!
//! リリースイメージのカタログ、公開プラン、パイプライン実行を提供します。
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 shipwright CLI                   │
//! │           (shipwright <TAG> [DEBUG])             │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               shipwright-core                    │
//! │  ┌──────────────┐  ┌──────────────┐             │
//! │  │   Catalog    │─▶│ PublishPlan  │             │
//! │  └──────────────┘  └──────┬───────┘             │
//! │  ┌──────────────┐  ┌──────▼───────┐             │
//! │  │ DebugProfile │◀─│   Pipeline   │──┐          │
//! │  │   RunLock    │  └──────────────┘  │          │
//! │  └──────────────┘                    │          │
//! │          trait ImageEngine { ... } ◀─┘          │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼───────┐
//!           │shipwright-build│
//!           │ (Docker Engine)│
//!           └───────────────┘
//! ```

pub mod catalog;
pub mod engine;
pub mod error;
pub mod lock;
pub mod model;
pub mod pipeline;
pub mod plan;
pub mod profile;

// Re-exports
pub use catalog::{BASE_IMAGE, BASE_TAG, Catalog, REGISTRY_NAMESPACE, SERVICE_IMAGES};
pub use engine::{EngineError, EngineResult, ImageEngine};
pub use error::{PublishError, Result};
pub use lock::{LOCK_DIR, LockInfo, RunLock};
pub use model::{ContextKind, DebugFlag, ImageRef, ImageSpec, ReleaseTag};
pub use pipeline::{Pipeline, PublishReport};
pub use plan::{BuildStep, PlanOptions, PublishPlan, PushStep, Step};
pub use profile::{DEBUG_DIRECTIVE, DebugProfile, ProfileGuard};
