#![deny(missing_docs)]
//! Core types for the study runner: configuration model, deterministic
//! randomization, clocks and the shared error taxonomy.

pub mod clock;
pub mod config;
pub mod errors;
pub mod rng;
pub mod shuffle;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    canonical_key, normalize_categories, AgeField, Category, ComprehensionCheck,
    ComprehensionOption, ConsentConfig, DemographicsConfig, DependentVariable, DesignConfig,
    DesignType, FreeResponseConfig, GenderField, OrderPolicy, RatingMode, StimulusExposure,
    StimulusImage, StudyConfig, StudyInfo,
};
pub use errors::{ErrorInfo, StudyError};
pub use rng::{derive_substream_seed, RngHandle};
pub use shuffle::{shuffle, shuffle_with_index, Indexed};
