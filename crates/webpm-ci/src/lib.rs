//! webpm-ci - declarative pipeline configuration
//!
//! Assembles the build/test/publish configuration of a webpm package:
//! - Loads project metadata from `package.json`
//! - Validates dependency partitions and bundle modules
//! - Builds an immutable pipeline config per project kind
//! - Copies scaffold files from a template directory
//! - Hands the config to a pipeline executor

pub mod artifact;
pub mod bundle;
pub mod config;
pub mod dependencies;
pub mod descriptor;
pub mod error;
pub mod executor;
pub mod factory;
pub mod fakes;
pub mod runner;
pub mod setup;
pub mod step;
pub mod telemetry;
pub mod template;

// Re-export key types
pub use artifact::{ArtifactSpec, FileListing, Link};
pub use bundle::{BundleSpec, ModuleSpec, MAIN_MODULE};
pub use config::{
    PackageJsonEntries, PipelineConfig, PipelineConfigBuilder, PublishConfig, Target, TestConfig,
};
pub use dependencies::{is_npm_range, DependencyMap, DependencySpec};
pub use descriptor::ProjectDescriptor;
pub use error::{CiError, Result};
pub use executor::{run_pipeline, ExecutionContext, PipelineExecutor, PipelineOutcome, StepResult};
pub use factory::{
    BrowserAppOptions, DocSiteOptions, Environment, LibraryOptions, PipelineFactory, ProjectKind,
};
pub use runner::ShellExecutor;
pub use setup::ProjectSetup;
pub use step::{BuildStep, DefaultStep};
pub use template::TemplateMaterializer;
