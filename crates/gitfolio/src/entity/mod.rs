//! SeaORM entity definitions for the gitfolio database schema.

pub mod commit;
pub mod github_profile;
pub mod prelude;
pub mod repository;
pub mod sync_frequency;
pub mod sync_log;
pub mod sync_status;
pub mod sync_type;
