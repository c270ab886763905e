// src/ui/widgets/mod.rs

// Module declarations for every widget drawn by `ui::render`.

pub mod disclaimer_popup; // Usage disclaimer shown at start-up.
pub mod footer;           // Key hints for the current state.
pub mod input;            // Target input box.
pub mod results_view;     // Per-task results and chain details.
pub mod summary;          // Counts and key-type mix.
