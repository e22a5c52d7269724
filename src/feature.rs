//! Constraints layered on top of the base energy system model.
//!
//! These are explicit functions taking the optimisation model and the input data, to be called
//! after [`OptimisationModel::new`](crate::optimisation::OptimisationModel::new) and before
//! solving.
pub mod custom;
pub mod techgroup;
pub use custom::{CustomConstraintKeys, add_custom_constraints};
pub use techgroup::add_tech_group_constraints;
