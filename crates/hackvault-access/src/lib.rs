/// HackVault access rules
///
/// Pure predicates shared by the data service and the client cache, so both
/// sides filter and gate content the same way:
/// - `visibility`: who may see an item and which mutation controls they get
/// - `approval`: the pending / approved / admin registration states

pub mod approval;
pub mod visibility;

pub use approval::{ApprovalError, account_status, approve, can_authenticate, reject};
pub use visibility::{
    Controls, PROTECTED_CATEGORY_SLUGS, Viewer, can_delete, can_toggle_visibility, can_view, controls,
    filter_visible, is_protected,
};
