//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled                          |
//! |------------|-------------------------------------------|
//! | `project`  | `Init`, `Status`, `Export`                |
//! | `run`      | `Start`, `Resume`                         |
//! | `control`  | `Pause`, `Continue`, `Stop`, `Save`       |
//! | `config`   | `Config`                                  |

pub mod config;
pub mod control;
pub mod project;
pub mod run;

pub use config::cmd_config;
pub use control::{cmd_continue, cmd_pause, cmd_save, cmd_stop};
pub use project::{cmd_export, cmd_init, cmd_status};
pub use run::{StartRequest, cmd_resume, cmd_start};
