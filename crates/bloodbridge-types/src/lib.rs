/// BloodBridge shared types.
///
/// Domain logic that has no I/O lives here: the blood-group compatibility
/// table, the request lifecycle, badge rules and phone number handling.
/// The database, notifier and HTTP layers all speak these types.
pub mod api;
pub mod badges;
pub mod blood;
pub mod lifecycle;
pub mod models;
pub mod phone;

pub use blood::BloodGroup;
pub use lifecycle::TransitionError;
