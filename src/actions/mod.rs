//! File actions module.
//!
//! Removal of files reported as duplicates, either permanently (default)
//! or by moving them to the system trash.
//!
//! ```no_run
//! use picgrab::actions::{delete_file, DeleteConfig};
//! use std::path::Path;
//!
//! let result = delete_file(Path::new("./Saved_Pic/dup.jpg"), &DeleteConfig::trash());
//! ```

pub mod delete;

// Re-export commonly used types
pub use delete::{
    delete_batch, delete_file, delete_to_trash, permanent_delete, BatchDeleteResult,
    DeleteConfig, DeleteError, DeleteFailure, DeleteResult,
};
