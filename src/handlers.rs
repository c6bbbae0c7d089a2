pub mod general;
pub mod mobility;
pub mod runs;
pub mod selection;
pub mod structure;

pub use general::{health_check, list_projects, move_targets, open_project, project_tree};
pub use mobility::{copy_cases, copy_suite, delete_cases, move_cases, move_suite};
pub use runs::{
    add_cases, available_cases, case_history, create_run, execute_case, get_run, list_runs,
    remove_case, run_metrics, set_run_status,
};
pub use selection::{
    clear_selected, get_selected, get_selection, toggle_scope, toggle_selected, update_selection,
};
pub use structure::{create_module, create_test_case, create_test_suite, update_test_case};
