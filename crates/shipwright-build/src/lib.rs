//! Shipwright Docker Image Build functionality
//!
//! This crate provides the Docker Engine backed implementation of
//! `shipwright_core::ImageEngine`: build source resolution, build context
//! archives, image building and pushing to container registries.

pub mod auth;
pub mod builder;
pub mod context;
pub mod engine;
pub mod error;
pub mod progress;
pub mod pusher;
pub mod resolver;

pub use auth::RegistryAuth;
pub use builder::ImageBuilder;
pub use context::{BuildContext, ContextBuilder};
pub use engine::DockerEngine;
pub use error::{BuildError, BuildResult};
pub use progress::PushProgress;
pub use pusher::ImagePusher;
pub use resolver::{BuildResolver, ResolvedBuild};
